//! Planweaver - task-to-plan assistant
//!
//! CLI entry point for plan generation, the interactive planner, and
//! workspace scan inspection.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{info, warn};

use planweaver::chat::{ChatSession, Repl, SessionConfig, print_plan};
use planweaver::cli::{Cli, Command, OutputFormat};
use planweaver::config::Config;
use planweaver::llm::{self, GenerationClient};
use planweaver::plan::{PlanDocument, PlanMode, PlanRequest};
use planweaver::scan::ProjectContext;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planweaver")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to a log file, not stdout/stderr - the terminal belongs to the planner
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("planweaver.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "Planweaver loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Some(Command::Plan {
            task,
            single_phase,
            hint,
            out,
            format,
        }) => cmd_plan(&config, root, &task, single_phase, hint, out, format).await,
        Some(Command::Chat { task }) => cmd_chat(&config, root, task).await,
        Some(Command::Scan { format }) => cmd_scan(&config, root, format),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

/// Create the generation client, degrading to heuristic planning when the
/// backend cannot be constructed
fn build_client(config: &Config) -> Option<Arc<dyn GenerationClient>> {
    match llm::create_client(&config.llm) {
        Ok(client) => Some(client),
        Err(err) => {
            warn!(error = %err, "Generation backend unavailable; plans fall back to heuristics");
            None
        }
    }
}

/// Generate a plan for one task and print or write it
async fn cmd_plan(
    config: &Config,
    root: PathBuf,
    task: &str,
    single_phase: bool,
    hints: Vec<String>,
    out: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mode = if single_phase { PlanMode::SinglePhase } else { PlanMode::MultiPhase };
    let request = PlanRequest::new(task, mode)?.with_hints(hints);

    let client = build_client(config);
    let mut session = ChatSession::new(SessionConfig::new(root, config), client);
    let mut document = session.generate_plan(request).await?;

    match out {
        Some(path) => {
            let rendered = render_plan(&mut document, &format)?;
            fs::write(&path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Plan written to {}", path.display());
        }
        None => match format {
            OutputFormat::Text => print_plan(&document),
            _ => println!("{}", render_plan(&mut document, &format)?),
        },
    }

    Ok(())
}

/// Render a plan for file output or non-terminal formats
fn render_plan(document: &mut PlanDocument, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            document.ensure_raw_text();
            Ok(serde_json::to_string_pretty(document)?)
        }
        // Plain text output is the markdown rendering
        OutputFormat::Text | OutputFormat::Markdown => Ok(document.to_markdown()),
    }
}

/// Run the interactive planner
async fn cmd_chat(config: &Config, root: PathBuf, task: Option<String>) -> Result<()> {
    let client = build_client(config);
    let session = ChatSession::new(SessionConfig::new(root, config), client);
    Repl::new(session).run(task).await
}

/// Scan the workspace and print what the planner sees
fn cmd_scan(config: &Config, root: PathBuf, format: OutputFormat) -> Result<()> {
    let context = ProjectContext::scan(&root, &config.scan)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&context)?);
        }
        OutputFormat::Text | OutputFormat::Markdown => {
            println!("{}", context.summary);
            if !context.tech_stack.is_empty() {
                println!("Languages: {}", context.tech_stack.join(", "));
            }
            println!();
            for file in &context.files {
                println!("  {} ({}, {} bytes)", file.path, file.language, file.size);
            }
            println!();
            println!("{} files scanned", context.files.len());
        }
    }

    Ok(())
}
