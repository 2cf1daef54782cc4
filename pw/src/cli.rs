//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Planweaver - task-to-plan assistant grounded in a project scan
#[derive(Parser)]
#[command(
    name = "pw",
    about = "Turn a task description into a phased implementation plan",
    version,
    after_help = "Logs are written to: ~/.local/share/planweaver/logs/planweaver.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Workspace root to scan (defaults to the current directory)
    #[arg(short, long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Generate a plan for a task
    Plan {
        /// Task description
        task: String,

        /// Produce a single consolidated phase instead of a phased plan
        #[arg(long)]
        single_phase: bool,

        /// Extra direction for the generator (repeatable)
        #[arg(long, value_name = "TEXT")]
        hint: Vec<String>,

        /// Write the rendered plan to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Start an interactive planning session
    Chat {
        /// Initial task to plan before handing over the prompt
        task: Option<String>,
    },

    /// Scan the workspace and print what the planner sees
    Scan {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for plan/scan commands
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {}. Use: text, json, or markdown", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}
