//! Chat session state and message handling
//!
//! The session owns what the original kept in module-level globals: the
//! memoized project context, the single mutable current-plan slot, and
//! the conversation history. One in-flight request per session is the
//! expected discipline; nothing here locks, and a second concurrent call
//! would race on the plan slot, last write wins.

use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result, eyre};
use tracing::{info, warn};
use uuid::Uuid;

use super::intent::{Intent, classify_intent};
use crate::config::{Config, ScanConfig};
use crate::llm::{GenerationClient, GenerationError};
use crate::plan::{Normalizer, ParseFailurePolicy, PlanDocument, PlanMode, PlanRequest};
use crate::prompts::PromptLoader;
use crate::scan::ProjectContext;

/// Hard cap on retained conversation exchanges
const MAX_HISTORY: usize = 50;

/// Configuration for a chat session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Workspace root to scan
    pub root: PathBuf,
    /// Provider name, used for error wording when no client exists
    pub provider: String,
    pub scan: ScanConfig,
    pub prompt_file_cap: usize,
    pub modify_parse_failure: ParseFailurePolicy,
    /// Exchanges embedded in modification prompts
    pub history_window: usize,
}

impl SessionConfig {
    pub fn new(root: PathBuf, config: &Config) -> Self {
        Self {
            root,
            provider: config.llm.provider.clone(),
            scan: config.scan.clone(),
            prompt_file_cap: config.plan.prompt_file_cap,
            modify_parse_failure: config.plan.modify_parse_failure,
            history_window: config.plan.history_window,
        }
    }
}

/// Reply to one chat message
#[derive(Debug)]
pub enum ChatReply {
    /// A new or replaced plan
    Plan(PlanDocument),
    /// A conversational answer
    Text(String),
}

/// One chat session: context cache, plan slot, history
pub struct ChatSession {
    id: Uuid,
    /// None when the provider is unconfigured; plan generation then goes
    /// straight to fallback synthesis
    client: Option<Arc<dyn GenerationClient>>,
    prompts: PromptLoader,
    config: SessionConfig,
    context: Option<ProjectContext>,
    current_plan: Option<PlanDocument>,
    history: Vec<(String, String)>,
}

impl ChatSession {
    pub fn new(config: SessionConfig, client: Option<Arc<dyn GenerationClient>>) -> Self {
        let id = Uuid::now_v7();
        let prompts = PromptLoader::new(&config.root);
        info!(session_id = %id, root = %config.root.display(), "Chat session created");
        Self {
            id,
            client,
            prompts,
            config,
            context: None,
            current_plan: None,
            history: Vec::new(),
        }
    }

    /// Stable identifier for this session, used in log correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The plan currently held by the session, if any
    pub fn current_plan(&self) -> Option<&PlanDocument> {
        self.current_plan.as_ref()
    }

    /// Clear conversation history and drop the current plan
    pub fn clear(&mut self) {
        self.history.clear();
        self.current_plan = None;
        info!("Chat session cleared");
    }

    /// Drop the cached project context so the next request rescans
    pub fn invalidate_context(&mut self) {
        self.context = None;
    }

    /// Handle one user message, routing by classified intent
    ///
    /// On error the session state (history, current plan) is untouched;
    /// the caller renders the error as a chat message.
    pub async fn handle_message(&mut self, input: &str) -> Result<ChatReply> {
        match classify_intent(input, self.current_plan.is_some()) {
            Intent::NewPlan => {
                let request = PlanRequest::new(input, PlanMode::MultiPhase)?;
                let document = self.generate_plan(request).await?;
                let reply = format!(
                    "Generated a {}-phase plan for: {}",
                    document.phases.len(),
                    document.task
                );
                self.record_exchange(input, &reply);
                Ok(ChatReply::Plan(document))
            }
            Intent::Modification => {
                let document = self.modify_plan(input).await?;
                self.record_exchange(input, "Replaced the plan with your requested changes.");
                Ok(ChatReply::Plan(document))
            }
            Intent::GeneralQuery => {
                let answer = self.general_query(input).await?;
                self.record_exchange(input, &answer);
                Ok(ChatReply::Text(answer))
            }
        }
    }

    /// Generate a fresh plan and store it in the current-plan slot
    ///
    /// Always succeeds once the workspace scan does: backend failures and
    /// unusable output degrade to deterministic fallback synthesis.
    pub async fn generate_plan(&mut self, request: PlanRequest) -> Result<PlanDocument> {
        self.ensure_context()?;
        let context = self.context.as_ref().ok_or_else(|| eyre!("Project context missing"))?;

        let outcome = match self.client.clone() {
            Some(client) => {
                let prompt = self
                    .prompts
                    .render_generation(&request, context, self.config.prompt_file_cap)?;
                client.generate_structured(&prompt).await
            }
            None => Err(GenerationError::UnsupportedProvider {
                provider: self.config.provider.clone(),
            }),
        };

        let normalizer = Normalizer::new(&request, context, self.config.prompt_file_cap);
        let document = normalizer.normalize(outcome);

        info!(phase_count = document.phases.len(), task = %document.task, "Plan ready");
        self.current_plan = Some(document.clone());
        Ok(document)
    }

    /// Modify the current plan via full regeneration
    ///
    /// Unlike fresh generation this path surfaces failures: backend errors
    /// propagate, and under [`ParseFailurePolicy::Propagate`] so does
    /// unparseable output, leaving the current plan untouched.
    async fn modify_plan(&mut self, input: &str) -> Result<PlanDocument> {
        let current = self
            .current_plan
            .clone()
            .ok_or_else(|| eyre!("No current plan to modify"))?;
        let client = self
            .client
            .clone()
            .ok_or_else(|| eyre!("Generation backend '{}' is unavailable; cannot modify the plan", self.config.provider))?;

        self.ensure_context()?;
        let context = self.context.as_ref().ok_or_else(|| eyre!("Project context missing"))?;

        let recent = self.recent_exchanges();
        let prompt = self.prompts.render_modification(input, &current, &recent)?;
        let text = client
            .generate_structured(&prompt)
            .await
            .context("Plan modification request failed")?;

        let request = PlanRequest::new(current.task.clone(), current.mode)?;
        let normalizer = Normalizer::new(&request, context, self.config.prompt_file_cap);

        let document = match self.config.modify_parse_failure {
            ParseFailurePolicy::Propagate => normalizer.parse(&text)?,
            ParseFailurePolicy::Fallback => {
                warn!("Modification configured to fall back on parse failure");
                normalizer.normalize(Ok(text))
            }
        };

        self.current_plan = Some(document.clone());
        Ok(document)
    }

    /// Answer a general question conversationally
    async fn general_query(&mut self, input: &str) -> Result<String> {
        let client = self.client.clone().ok_or_else(|| {
            eyre!(
                "Generation backend '{}' is unavailable; only plan generation works offline",
                self.config.provider
            )
        })?;

        self.ensure_context()?;
        let context = self.context.as_ref().ok_or_else(|| eyre!("Project context missing"))?;

        let prompt = self
            .prompts
            .render_conversational(input, context, self.current_plan.as_ref())?;

        client
            .generate_conversational(&prompt)
            .await
            .context("Conversational request failed")
    }

    /// Scan the workspace once and memoize the result
    fn ensure_context(&mut self) -> Result<()> {
        if self.context.is_none() {
            let context = ProjectContext::scan(&self.config.root, &self.config.scan)
                .context("Workspace scan failed")?;
            self.context = Some(context);
        }
        Ok(())
    }

    /// The trailing window of exchanges embedded in modification prompts
    fn recent_exchanges(&self) -> Vec<(String, String)> {
        let window = self.config.history_window;
        let start = self.history.len().saturating_sub(window);
        self.history[start..].to_vec()
    }

    fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.history.push((user.to_string(), assistant.to_string()));
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
    }
}
