//! Plan document data model
//!
//! The normalized output contract shared by every code path: the backend
//! parser, the deterministic fallback synthesizer, and the presentation
//! layer all produce or consume `PlanDocument`.

use chrono::{DateTime, Utc};
use eyre::{Result, bail};
use serde::{Deserialize, Serialize};

/// How the plan should be structured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanMode {
    #[serde(rename = "single-phase")]
    SinglePhase,
    #[serde(rename = "multi-phase")]
    MultiPhase,
}

impl PlanMode {
    /// Parse from the wire-format literal, if valid
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single-phase" => Some(Self::SinglePhase),
            "multi-phase" => Some(Self::MultiPhase),
            _ => None,
        }
    }

    /// The wire-format literal for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SinglePhase => "single-phase",
            Self::MultiPhase => "multi-phase",
        }
    }
}

impl std::fmt::Display for PlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to generate a plan
///
/// Immutable once constructed; the task text must be non-empty.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub task: String,
    pub mode: PlanMode,
    pub hints: Vec<String>,
}

impl PlanRequest {
    /// Create a new request, rejecting empty task text
    pub fn new(task: impl Into<String>, mode: PlanMode) -> Result<Self> {
        let task = task.into();
        if task.trim().is_empty() {
            bail!("Task description must not be empty");
        }
        Ok(Self {
            task,
            mode,
            hints: Vec::new(),
        })
    }

    /// Attach ordered free-text hints
    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }
}

/// The normalized plan - always structurally valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    pub task: String,
    pub mode: PlanMode,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
    /// Ordered, never empty after normalization
    pub phases: Vec<Phase>,
    /// Canonical markdown rendering, computed lazily if absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

/// A named grouping of steps representing one stage of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    /// Unique within the document
    pub id: String,
    pub title: String,
    pub summary: String,
    /// May be empty, never null
    pub steps: Vec<Step>,
}

/// One actionable unit within a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Unique within its phase
    pub id: String,
    pub title: String,
    pub description: String,
    /// Workspace-relative file paths
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Documented as Low/Medium/High; not strictly enforced on input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
}

impl PlanDocument {
    /// Fill in `raw_text` with the canonical markdown rendering if absent
    pub fn ensure_raw_text(&mut self) {
        if self.raw_text.is_none() {
            self.raw_text = Some(self.to_markdown());
        }
    }

    /// Render the plan as exportable markdown
    ///
    /// This is the literal text users copy out of the system: a task
    /// heading with mode/summary line, one `##` section per phase, one
    /// numbered sub-item per step with `References:` and `Reasoning:`
    /// lines when present.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# {}\n\n", self.task));
        md.push_str(&format!("_{} plan — {}_\n\n", self.mode, self.summary));

        for phase in &self.phases {
            md.push_str(&format!("## {}\n\n", phase.title));
            if !phase.summary.is_empty() {
                md.push_str(&format!("{}\n\n", phase.summary));
            }

            for (idx, step) in phase.steps.iter().enumerate() {
                md.push_str(&format!("{}. **{}**", idx + 1, step.title));
                if !step.description.is_empty() {
                    md.push_str(&format!(": {}", step.description));
                }
                md.push('\n');

                if !step.references.is_empty() {
                    let refs: Vec<String> = step.references.iter().map(|r| format!("`{}`", r)).collect();
                    md.push_str(&format!("   - References: {}\n", refs.join(", ")));
                }
                if let Some(reasoning) = &step.reasoning {
                    md.push_str(&format!("   - Reasoning: {}\n", reasoning));
                }
            }
            md.push('\n');
        }

        md
    }
}
