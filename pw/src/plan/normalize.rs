//! Plan normalization
//!
//! Coerces whatever the generation backend returned - clean JSON, fenced
//! JSON, JSON buried in prose, garbage, or an outright failure - into a
//! structurally valid `PlanDocument`. The pipeline is a chain of small
//! pure stages: strip-known-fences, parse-attempt, greedy-brace-extract,
//! parse-attempt, fall-back. `normalize` is total: it never raises past
//! its own boundary.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::document::{Phase, PlanDocument, PlanMode, PlanRequest, Step};
use super::fallback::{fallback_phases, synthesize_fallback};
use crate::llm::GenerationError;
use crate::scan::ProjectContext;

/// Default title for a phase the backend left unnamed
const UNTITLED_PHASE: &str = "Untitled Phase";

/// Default title for a step the backend left unnamed
const UNTITLED_STEP: &str = "Untitled Step";

/// Raised by the strict parse path when no usable plan JSON is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Backend response contained no usable plan JSON")]
pub struct UnparseableResponse;

/// What to do when backend output fails to parse
///
/// Fresh generation always falls back; plan modification propagates the
/// failure by default so the user sees that their edit was not applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseFailurePolicy {
    /// Surface the parse failure to the caller
    #[default]
    #[serde(rename = "error")]
    Propagate,
    /// Silently substitute the deterministic fallback plan
    #[serde(rename = "fallback")]
    Fallback,
}

/// Normalizes backend output against a request and project context
pub struct Normalizer<'a> {
    request: &'a PlanRequest,
    context: &'a ProjectContext,
    file_cap: usize,
}

impl<'a> Normalizer<'a> {
    pub fn new(request: &'a PlanRequest, context: &'a ProjectContext, file_cap: usize) -> Self {
        Self {
            request,
            context,
            file_cap,
        }
    }

    /// Produce a valid plan from any backend outcome
    ///
    /// Total: for any input, including failure signals, the result
    /// satisfies every document invariant (at least one phase, non-null
    /// step lists, no missing ids, valid timestamp, computed raw text).
    pub fn normalize(&self, outcome: Result<String, GenerationError>) -> PlanDocument {
        let mut document = match outcome {
            Err(error) => {
                warn!(
                    %error,
                    unavailable = error.is_unavailable(),
                    "Generation failed; synthesizing fallback plan"
                );
                synthesize_fallback(self.request, self.context, self.file_cap)
            }
            Ok(text) => match self.parse(&text) {
                Ok(document) => document,
                Err(UnparseableResponse) => {
                    warn!(
                        response_len = text.len(),
                        "No usable plan JSON in backend response; synthesizing fallback plan"
                    );
                    synthesize_fallback(self.request, self.context, self.file_cap)
                }
            },
        };

        document.ensure_raw_text();
        document
    }

    /// Parse and canonicalize backend text, failing if no plan JSON is
    /// recoverable
    ///
    /// This is the strict path used by plan modification under
    /// [`ParseFailurePolicy::Propagate`].
    pub fn parse(&self, text: &str) -> Result<PlanDocument, UnparseableResponse> {
        let value = extract_plan_object(text).ok_or(UnparseableResponse)?;
        let mut document = self.canonicalize(&value);
        document.ensure_raw_text();
        Ok(document)
    }

    /// Canonicalize a parsed plan object field-by-field
    ///
    /// Every missing or invalid field is replaced from the request, the
    /// project context, or a deterministic default; nothing is rejected.
    fn canonicalize(&self, value: &Value) -> PlanDocument {
        let task = non_empty_str(value.get("task")).unwrap_or(&self.request.task).to_string();

        let mode = value
            .get("mode")
            .and_then(Value::as_str)
            .and_then(PlanMode::parse)
            .unwrap_or(self.request.mode);

        let summary = non_empty_str(value.get("summary"))
            .unwrap_or(&self.context.summary)
            .to_string();

        let generated_at = value
            .get("generatedAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let raw_phases = value.get("phases").and_then(Value::as_array).cloned().unwrap_or_default();

        let phases = if raw_phases.is_empty() {
            // Degraded outcome, not a hard failure: the backend produced a
            // valid envelope with nothing in it
            warn!("Backend plan has empty phases array; substituting fallback phases");
            fallback_phases(mode, self.context, self.file_cap)
        } else {
            repair_phases(&raw_phases)
        };

        let raw_text = value.get("rawText").and_then(Value::as_str).map(String::from);

        PlanDocument {
            task,
            mode,
            summary,
            generated_at,
            phases,
            raw_text,
        }
    }
}

/// Try to recover a plan object from backend text
///
/// Stage order: strip a surrounding code fence and parse; failing that,
/// greedily take the first-`{`-to-last-`}` span of the raw text and parse
/// that. A result only counts if it is an object with an array-valued
/// `phases` key.
fn extract_plan_object(text: &str) -> Option<Value> {
    let candidate = strip_code_fence(text).unwrap_or(text);
    if let Some(value) = parse_usable(candidate) {
        debug!("Plan JSON parsed directly");
        return Some(value);
    }

    if let Some(span) = extract_brace_span(text)
        && let Some(value) = parse_usable(span)
    {
        debug!("Plan JSON recovered via brace extraction");
        return Some(value);
    }

    None
}

/// Parse text as JSON and require an object with an array-valued `phases`
fn parse_usable(text: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    if value.is_object() && value.get("phases").is_some_and(Value::is_array) {
        Some(value)
    } else {
        None
    }
}

/// Strip one pair of surrounding code-fence markers, if present
///
/// A fence explicitly tagged as JSON is tried before an untagged fence;
/// the text between the first opening and the first subsequent closing
/// marker is returned.
fn strip_code_fence(text: &str) -> Option<&str> {
    for opener in ["```json", "```"] {
        if let Some(start) = text.find(opener) {
            let body = &text[start + opener.len()..];
            if let Some(end) = body.find("```") {
                return Some(body[..end].trim());
            }
        }
    }
    None
}

/// Greedy first-`{`-to-last-`}` extraction
fn extract_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Structural repair of the phases array
///
/// Existing ids are kept verbatim; missing ids are assigned from position
/// and never collide with ids already present in the document.
fn repair_phases(raw_phases: &[Value]) -> Vec<Phase> {
    let mut used_ids: HashSet<String> = raw_phases
        .iter()
        .filter_map(|p| non_empty_str(p.get("id")).map(String::from))
        .collect();

    raw_phases
        .iter()
        .enumerate()
        .map(|(idx, raw)| repair_phase(idx, raw, &mut used_ids))
        .collect()
}

fn repair_phase(idx: usize, raw: &Value, used_ids: &mut HashSet<String>) -> Phase {
    let id = match non_empty_str(raw.get("id")) {
        Some(id) => id.to_string(),
        None => assign_unique_id(&format!("phase-{}", idx + 1), used_ids),
    };

    let title = non_empty_str(raw.get("title")).unwrap_or(UNTITLED_PHASE).to_string();
    let summary = raw.get("summary").and_then(Value::as_str).unwrap_or("").to_string();

    let raw_steps = raw.get("steps").and_then(Value::as_array).cloned().unwrap_or_default();

    let mut used_step_ids: HashSet<String> = raw_steps
        .iter()
        .filter_map(|s| non_empty_str(s.get("id")).map(String::from))
        .collect();

    let steps = raw_steps
        .iter()
        .enumerate()
        .map(|(step_idx, raw_step)| repair_step(idx, step_idx, raw_step, &mut used_step_ids))
        .collect();

    Phase {
        id,
        title,
        summary,
        steps,
    }
}

fn repair_step(phase_idx: usize, step_idx: usize, raw: &Value, used_ids: &mut HashSet<String>) -> Step {
    let id = match non_empty_str(raw.get("id")) {
        Some(id) => id.to_string(),
        None => assign_unique_id(&format!("step-{}-{}", phase_idx + 1, step_idx + 1), used_ids),
    };

    let references = raw
        .get("references")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();

    Step {
        id,
        title: non_empty_str(raw.get("title")).unwrap_or(UNTITLED_STEP).to_string(),
        description: raw.get("description").and_then(Value::as_str).unwrap_or("").to_string(),
        references,
        reasoning: non_empty_str(raw.get("reasoning")).map(String::from),
        estimated_effort: non_empty_str(raw.get("estimatedEffort")).map(String::from),
    }
}

/// Reserve a fresh id, suffixing the positional candidate until unique
fn assign_unique_id(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::scan::{ProjectContext, ScannedFile};

    fn context() -> ProjectContext {
        let files = (0..4)
            .map(|i| ScannedFile {
                path: format!("src/mod{}.rs", i),
                language: "Rust".to_string(),
                size: 50,
            })
            .collect();
        ProjectContext::from_files(Path::new("/proj"), files)
    }

    fn request() -> PlanRequest {
        PlanRequest::new("Refactor the parser", PlanMode::MultiPhase).unwrap()
    }

    fn valid_plan_json() -> String {
        serde_json::json!({
            "task": "Refactor the parser",
            "mode": "multi-phase",
            "summary": "Backend summary",
            "generatedAt": "2026-08-30T10:00:00Z",
            "phases": [
                {
                    "id": "phase-1",
                    "title": "Analysis",
                    "summary": "Look around",
                    "steps": [
                        {
                            "id": "step-1-1",
                            "title": "Read the lexer",
                            "description": "Understand tokenization",
                            "references": ["src/lexer.rs"],
                            "reasoning": "Entry point",
                            "estimatedEffort": "Low"
                        }
                    ]
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_strip_code_fence_tagged() {
        let text = "```json\n{\"phases\": []}\n```";
        assert_eq!(strip_code_fence(text), Some("{\"phases\": []}"));
    }

    #[test]
    fn test_strip_code_fence_untagged() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_strip_code_fence_prefers_tagged() {
        let text = "intro\n```json\n{\"a\": 1}\n```\noutro";
        assert_eq!(strip_code_fence(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_strip_code_fence_absent() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), None);
        assert_eq!(strip_code_fence("no fences here"), None);
    }

    #[test]
    fn test_extract_brace_span() {
        assert_eq!(extract_brace_span("before {\"a\": 1} after"), Some("{\"a\": 1}"));
        assert_eq!(extract_brace_span("no braces"), None);
        assert_eq!(extract_brace_span("} reversed {"), None);
    }

    #[test]
    fn test_fenced_and_bare_json_normalize_identically() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let bare = normalizer.normalize(Ok(valid_plan_json()));
        let fenced = normalizer.normalize(Ok(format!("```json\n{}\n```", valid_plan_json())));

        assert_eq!(bare.phases, fenced.phases);
        assert_eq!(bare.summary, fenced.summary);
        assert_eq!(bare.generated_at, fenced.generated_at);
    }

    #[test]
    fn test_prose_wrapped_json_is_recovered() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let wrapped = format!("Sure, here is your plan:\n{}\nLet me know!", valid_plan_json());
        let doc = normalizer.normalize(Ok(wrapped));

        assert_eq!(doc.phases.len(), 1);
        assert_eq!(doc.phases[0].title, "Analysis");
    }

    #[test]
    fn test_prose_without_braces_falls_back() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let doc = normalizer.normalize(Ok("I cannot help with that.".to_string()));

        // Deterministic fallback, not a panic
        assert_eq!(doc.phases.len(), 3);
        assert_eq!(doc.phases[0].title, "Analysis & Discovery");
        assert!(doc.summary.contains("Heuristic plan"));
    }

    #[test]
    fn test_backend_failure_falls_back() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let doc = normalizer.normalize(Err(GenerationError::MissingApiKey {
            env: "OPENAI_API_KEY".to_string(),
        }));

        assert_eq!(doc.phases.len(), 3);
        assert_eq!(doc.task, "Refactor the parser");
    }

    #[test]
    fn test_empty_phases_substituted_with_fallback() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let json = r#"{"task": "Refactor the parser", "summary": "Thin plan", "phases": []}"#;
        let doc = normalizer.normalize(Ok(json.to_string()));

        // Envelope fields survive; phases come from the fallback
        assert_eq!(doc.summary, "Thin plan");
        assert_eq!(doc.phases.len(), 3);
        assert!(!doc.phases.iter().any(|p| p.steps.is_empty() && p.title == "Implementation"));
    }

    #[test]
    fn test_object_without_phases_key_falls_back() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let doc = normalizer.normalize(Ok(r#"{"task": "x", "summary": "y"}"#.to_string()));
        assert_eq!(doc.phases.len(), 3);
        assert!(doc.summary.contains("Heuristic plan"));
    }

    #[test]
    fn test_canonicalize_fills_missing_envelope_fields() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let before = Utc::now();
        let doc = normalizer
            .parse(r#"{"phases": [{"title": "Only phase"}], "generatedAt": "not-a-date", "mode": "bogus"}"#)
            .unwrap();

        assert_eq!(doc.task, "Refactor the parser");
        assert_eq!(doc.mode, PlanMode::MultiPhase);
        assert_eq!(doc.summary, ctx.summary);
        assert!(doc.generated_at >= before);
        assert!(doc.raw_text.is_some());
    }

    #[test]
    fn test_structural_repair_defaults() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let json = r#"{"phases": [
            {"steps": [{}, {"title": "  "}]},
            {"title": "Named", "steps": [{"references": "not-an-array"}]}
        ]}"#;
        let doc = normalizer.parse(json).unwrap();

        assert_eq!(doc.phases[0].id, "phase-1");
        assert_eq!(doc.phases[0].title, UNTITLED_PHASE);
        assert_eq!(doc.phases[0].steps[0].id, "step-1-1");
        assert_eq!(doc.phases[0].steps[0].title, UNTITLED_STEP);
        assert_eq!(doc.phases[0].steps[1].title, UNTITLED_STEP);
        assert!(doc.phases[1].steps[0].references.is_empty());
    }

    #[test]
    fn test_missing_ids_never_collide_with_existing() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        // Second phase already claims "phase-1"; the unnamed first phase
        // must not be given the same id
        let json = r#"{"phases": [
            {"title": "A"},
            {"id": "phase-1", "title": "B"}
        ]}"#;
        let doc = normalizer.parse(json).unwrap();

        assert_eq!(doc.phases[1].id, "phase-1");
        assert_ne!(doc.phases[0].id, doc.phases[1].id);
    }

    #[test]
    fn test_idempotence_of_repair() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let first = normalizer.normalize(Ok(valid_plan_json()));
        let reserialized = serde_json::to_string(&first).unwrap();
        let second = normalizer.normalize(Ok(reserialized));

        // A document with all ids present keeps them unchanged
        assert_eq!(first.phases, second.phases);
        assert_eq!(first.task, second.task);
        assert_eq!(first.mode, second.mode);
    }

    #[test]
    fn test_normalize_is_total_over_all_outcomes() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let outcomes: Vec<Result<String, GenerationError>> = vec![
            Ok(valid_plan_json()),
            Ok(format!("```json\n{}\n```", valid_plan_json())),
            Ok(format!("Here you go: {}", valid_plan_json())),
            Ok("complete garbage %%%".to_string()),
            Ok(String::new()),
            Ok("{\"phases\": \"wrong type\"}".to_string()),
            Err(GenerationError::EmptyResponse),
            Err(GenerationError::Rejected {
                reason: "safety".to_string(),
            }),
            Err(GenerationError::UnsupportedProvider {
                provider: "none".to_string(),
            }),
        ];

        for outcome in outcomes {
            let doc = normalizer.normalize(outcome);
            assert!(!doc.phases.is_empty(), "document must have at least one phase");
            assert!(doc.raw_text.is_some(), "raw text must be computed");
            for phase in &doc.phases {
                assert!(!phase.id.is_empty());
                assert!(!phase.title.is_empty());
                for step in &phase.steps {
                    assert!(!step.id.is_empty());
                    assert!(!step.title.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_parse_rejects_unusable_text() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        assert_eq!(normalizer.parse("not json at all"), Err(UnparseableResponse));
        assert_eq!(normalizer.parse("{\"no\": \"phases\"}"), Err(UnparseableResponse));
        assert!(normalizer.parse(&valid_plan_json()).is_ok());
    }

    #[test]
    fn test_effort_passed_through_unvalidated() {
        let req = request();
        let ctx = context();
        let normalizer = Normalizer::new(&req, &ctx, 10);

        let json = r#"{"phases": [{"steps": [{"estimatedEffort": "Gigantic"}]}]}"#;
        let doc = normalizer.parse(json).unwrap();
        assert_eq!(doc.phases[0].steps[0].estimated_effort.as_deref(), Some("Gigantic"));
    }

    #[test]
    fn test_parse_failure_policy_serde() {
        assert_eq!(
            serde_yaml::from_str::<ParseFailurePolicy>("error").unwrap(),
            ParseFailurePolicy::Propagate
        );
        assert_eq!(
            serde_yaml::from_str::<ParseFailurePolicy>("fallback").unwrap(),
            ParseFailurePolicy::Fallback
        );
        assert_eq!(ParseFailurePolicy::default(), ParseFailurePolicy::Propagate);
    }
}
