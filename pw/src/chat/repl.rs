//! Interactive planning REPL

use std::fs;
use std::path::Path;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::session::{ChatReply, ChatSession};
use crate::plan::PlanDocument;

/// Interactive REPL wrapping a chat session
pub struct Repl {
    session: ChatSession,
}

impl Repl {
    pub fn new(session: ChatSession) -> Self {
        Self { session }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_task: Option<String>) -> Result<()> {
        self.print_welcome();

        // If an initial task was given on the command line, process it first
        if let Some(task) = initial_task {
            println!("{} {}", ">".bright_green(), task);
            self.process_input(&task).await;
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input) {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Print welcome message
    fn print_welcome(&self) {
        println!();
        println!("{}", "Planweaver Interactive Planner".bright_cyan().bold());
        println!("Describe a task to generate a plan, then refine it in conversation.");
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    /// Process one non-command message
    ///
    /// Errors become chat output; the session survives them.
    async fn process_input(&mut self, input: &str) {
        match self.session.handle_message(input).await {
            Ok(ChatReply::Plan(document)) => {
                println!();
                print_plan(&document);
            }
            Ok(ChatReply::Text(answer)) => {
                println!();
                println!("{}", answer);
                println!();
            }
            Err(err) => {
                println!("{} {:#}", "Error:".red(), err);
                println!();
            }
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");

        match cmd {
            "/help" | "/h" => {
                self.print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/clear" | "/c" => {
                self.session.clear();
                println!("{}", "Session cleared.".dimmed());
                SlashResult::Continue
            }
            "/plan" | "/p" => {
                match self.session.current_plan() {
                    Some(document) => {
                        println!();
                        print_plan(document);
                    }
                    None => println!("{}", "No current plan. Describe a task to generate one.".dimmed()),
                }
                SlashResult::Continue
            }
            "/export" => {
                let path = parts.get(1).copied().unwrap_or("plan.md");
                match self.export_plan(Path::new(path)) {
                    Ok(true) => println!("Plan written to {}", path.bright_white()),
                    Ok(false) => println!("{}", "No current plan to export.".dimmed()),
                    Err(err) => println!("{} {:#}", "Error:".red(), err),
                }
                SlashResult::Continue
            }
            "/rescan" => {
                self.session.invalidate_context();
                println!("{}", "Project context dropped; the next message rescans.".dimmed());
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                SlashResult::Continue
            }
        }
    }

    /// Print help message
    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:16} Show this help", "/help".yellow());
        println!("  {:16} Exit the planner", "/quit".yellow());
        println!("  {:16} Clear the plan and conversation", "/clear".yellow());
        println!("  {:16} Show the current plan", "/plan".yellow());
        println!("  {:16} Write the plan as markdown", "/export [file]".yellow());
        println!("  {:16} Rescan the workspace on next message", "/rescan".yellow());
        println!();
        println!("Anything else is treated as a task to plan, a change to the");
        println!("current plan, or a question about it.");
        println!();
    }

    /// Write the current plan as markdown, returning false when no plan exists
    fn export_plan(&self, path: &Path) -> Result<bool> {
        match self.session.current_plan() {
            Some(document) => {
                fs::write(path, document.to_markdown())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Render a plan to the terminal
pub fn print_plan(document: &PlanDocument) {
    println!("{}", document.task.bright_white().bold());
    println!("{}", document.summary.dimmed());
    println!();

    for (i, phase) in document.phases.iter().enumerate() {
        println!("{} {}", format!("Phase {}:", i + 1).bright_cyan(), phase.title.bold());
        for (j, step) in phase.steps.iter().enumerate() {
            if step.description.is_empty() {
                println!("  {}. {}", j + 1, step.title);
            } else {
                println!("  {}. {}: {}", j + 1, step.title, step.description.dimmed());
            }
            if !step.references.is_empty() {
                println!("     {} {}", "refs:".dimmed(), step.references.join(", ").dimmed());
            }
            if let Some(ref effort) = step.estimated_effort {
                println!("     {} {}", "effort:".dimmed(), effort.dimmed());
            }
        }
        println!();
    }
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}
