//! Intent classification for chat messages
//!
//! A stateless keyword classifier deciding how a user message is routed.
//! The keyword sets are data, not inline logic, so the classification
//! rules stay reviewable. Matching is case-insensitive and English-only;
//! this is a heuristic, not a guarantee.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Where a chat message is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Edit the existing plan (requires one to exist)
    Modification,
    /// Generate a fresh plan
    NewPlan,
    /// Free-form question, answered conversationally
    GeneralQuery,
}

/// Verbs that signal editing an existing artifact
const EDIT_VERBS: &[&str] = &[
    "update", "change", "modify", "revise", "adjust", "edit", "rework", "refine", "tweak", "add", "remove", "drop",
    "rename", "reorder", "merge", "split", "expand", "shorten",
];

/// Nouns that refer to the plan or its parts
const PLAN_NOUNS: &[&str] = &["plan", "phase", "phases", "step", "steps", "milestone", "milestones"];

/// Verbs that signal creating a plan from scratch
const CREATE_VERBS: &[&str] = &[
    "create", "generate", "make", "build", "draft", "write", "plan", "design", "implement", "develop",
];

static EDIT_VERB_RE: LazyLock<Regex> = LazyLock::new(|| word_set_regex(EDIT_VERBS));
static PLAN_NOUN_RE: LazyLock<Regex> = LazyLock::new(|| word_set_regex(PLAN_NOUNS));
static CREATE_VERB_RE: LazyLock<Regex> = LazyLock::new(|| word_set_regex(CREATE_VERBS));

fn word_set_regex(words: &[&str]) -> Regex {
    let alternation = words.join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("keyword regex must compile")
}

/// Classify the latest user message
///
/// Modification requires an edit verb AND a plan noun AND an existing
/// plan. Creation verbs (or the absence of any current plan) route to
/// new-plan generation; everything else with a plan present is a general
/// query.
pub fn classify_intent(text: &str, has_plan: bool) -> Intent {
    let intent = if has_plan && EDIT_VERB_RE.is_match(text) && PLAN_NOUN_RE.is_match(text) {
        Intent::Modification
    } else if CREATE_VERB_RE.is_match(text) || !has_plan {
        Intent::NewPlan
    } else {
        Intent::GeneralQuery
    };

    debug!(?intent, has_plan, "Classified chat message");
    intent
}
