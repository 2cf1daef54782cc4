//! Prompt construction
//!
//! Renders requests and project context into backend prompts via
//! Handlebars templates. Templates load from a user override directory
//! (`.planweaver/prompts/{name}.pmt`) when present, falling back to the
//! embedded defaults. Rendering is pure: same inputs, same prompt.

mod embedded;

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use crate::plan::{PlanDocument, PlanRequest};
use crate::scan::ProjectContext;

/// Template context for plan generation
#[derive(Debug, Serialize)]
struct GenerationContext {
    task: String,
    mode: String,
    multi_phase: bool,
    hints: Vec<String>,
    summary: String,
    tech_stack: Vec<String>,
    files: Vec<String>,
}

/// Template context for plan modification
#[derive(Debug, Serialize)]
struct ModificationContext {
    task: String,
    mode: String,
    summary: String,
    phase_titles: Vec<String>,
    exchanges: Vec<ExchangeContext>,
    request: String,
}

#[derive(Debug, Serialize)]
struct ExchangeContext {
    user: String,
    assistant: String,
}

/// Template context for general queries
#[derive(Debug, Serialize)]
struct ConverseContext {
    summary: String,
    plan_summary: Option<String>,
    question: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (`.planweaver/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader rooted at a workspace
    pub fn new(root: impl AsRef<Path>) -> Self {
        let user_dir = root.as_ref().join(".planweaver").join("prompts");
        let exists = user_dir.exists();
        debug!(?user_dir, exists, "PromptLoader created");

        Self {
            hbs: Handlebars::new(),
            user_dir: exists.then_some(user_dir),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        Self {
            hbs: Handlebars::new(),
            user_dir: None,
        }
    }

    /// Load a template by name, preferring the user override
    fn load_template(&self, name: &str) -> Result<String> {
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "Using user override template");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        let template = self.load_template(name)?;
        self.hbs
            .render_template(&template, data)
            .map_err(|e| eyre!("Failed to render template {}: {}", name, e))
    }

    /// Render the plan generation prompt
    ///
    /// The file list is truncated to `file_cap` entries in scan order; the
    /// task text is escaped so the instructed JSON schema stays valid if
    /// the backend copies the literal string.
    pub fn render_generation(
        &self,
        request: &PlanRequest,
        context: &ProjectContext,
        file_cap: usize,
    ) -> Result<String> {
        let data = GenerationContext {
            task: escape_json_literal(&request.task),
            mode: request.mode.to_string(),
            multi_phase: request.mode == crate::plan::PlanMode::MultiPhase,
            hints: request.hints.clone(),
            summary: context.summary.clone(),
            tech_stack: context.tech_stack.clone(),
            files: context.capped_files(file_cap).iter().map(|f| f.path.clone()).collect(),
        };

        self.render("generate", &data)
    }

    /// Render the plan modification prompt
    ///
    /// Embeds the current plan's summary and phase titles, the trailing
    /// window of recent exchanges, and the literal modification request.
    pub fn render_modification(
        &self,
        request_text: &str,
        plan: &PlanDocument,
        recent_exchanges: &[(String, String)],
    ) -> Result<String> {
        let data = ModificationContext {
            task: escape_json_literal(&plan.task),
            mode: plan.mode.to_string(),
            summary: plan.summary.clone(),
            phase_titles: plan.phases.iter().map(|p| p.title.clone()).collect(),
            exchanges: recent_exchanges
                .iter()
                .map(|(user, assistant)| ExchangeContext {
                    user: user.clone(),
                    assistant: assistant.clone(),
                })
                .collect(),
            request: escape_json_literal(request_text),
        };

        self.render("modify", &data)
    }

    /// Render the conversational prompt for general queries
    pub fn render_conversational(
        &self,
        question: &str,
        context: &ProjectContext,
        plan: Option<&PlanDocument>,
    ) -> Result<String> {
        let data = ConverseContext {
            summary: context.summary.clone(),
            plan_summary: plan.map(|p| p.summary.clone()),
            question: question.to_string(),
        };

        self.render("converse", &data)
    }
}

/// Escape quotes and backslashes so the text can sit inside a JSON string
fn escape_json_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
