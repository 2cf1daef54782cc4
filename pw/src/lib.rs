//! Planweaver - task-to-plan assistant grounded in a project scan
//!
//! Planweaver turns a short task description into a structured, multi-phase
//! implementation plan. The plan is grounded in a metadata-only scan of the
//! workspace and generated by an LLM backend, but the pipeline is total:
//! whatever the backend returns (or fails to return), normalization always
//! produces a well-formed plan, degrading to deterministic heuristic
//! synthesis from the scan alone.
//!
//! # Core Concepts
//!
//! - **Total normalization**: Every backend outcome becomes a valid plan
//! - **Scan-grounded fallback**: Heuristic plans derive from real file paths
//! - **Replace, never patch**: Modifications regenerate the whole plan
//! - **Deterministic shape**: Ids, phase partition, and defaults are stable
//!
//! # Modules
//!
//! - [`scan`] - Workspace scanning and project context
//! - [`plan`] - Plan document, normalization, fallback synthesis
//! - [`prompts`] - Template loading and prompt construction
//! - [`llm`] - Generation backend trait and OpenAI-compatible client
//! - [`chat`] - Interactive session, intent routing, REPL
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod chat;
pub mod cli;
pub mod config;
pub mod llm;
pub mod plan;
pub mod prompts;
pub mod scan;

// Re-export commonly used types
pub use chat::{ChatReply, ChatSession, Intent, SessionConfig, classify_intent};
pub use config::{Config, LlmConfig, PlanConfig, ScanConfig};
pub use llm::{GenerationClient, GenerationError, OpenAiCompatClient, create_client};
pub use plan::{
    Normalizer, ParseFailurePolicy, Phase, PlanDocument, PlanMode, PlanRequest, Step, UnparseableResponse,
    fallback_phases, synthesize_fallback,
};
pub use prompts::PromptLoader;
pub use scan::{ProjectContext, ScanError, ScannedFile};
