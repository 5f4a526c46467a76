//! REPL (Read-Eval-Print Loop) over the theory engines

use crate::commands::{create_registry, CommandContext, CommandRegistry, CommandResult};
use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RustylineResult};
use tonality_core::EngineConfig;
use tracing::{debug, info};

/// What the loop should do after handling one line
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Command state shared by every line of a session
struct Session {
    registry: CommandRegistry,
    ctx: CommandContext,
}

impl Session {
    fn new(config: EngineConfig) -> Self {
        Session {
            registry: create_registry(),
            ctx: CommandContext::new(config),
        }
    }

    /// Dispatch one line and print its outcome
    fn handle_line(&mut self, line: &str) -> Flow {
        debug!(line, "dispatching");
        match self.registry.execute(line, &mut self.ctx) {
            CommandResult::Message(msg) => println!("{}", msg),
            CommandResult::Exit => {
                println!("{} 🎼", "Goodbye!".bright_cyan());
                return Flow::Exit;
            }
            CommandResult::Error(e) => {
                println!("{} {}", "Error:".bright_red().bold(), e.red());
            }
            CommandResult::NotACommand => {
                let word = line.split_whitespace().next().unwrap_or(line);
                println!(
                    "{} unknown command '{}', type '{}' for a list",
                    "Error:".bright_red().bold(),
                    word,
                    "help".bright_green()
                );
            }
        }
        Flow::Continue
    }
}

/// Interactive REPL for the theory engines
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(config: EngineConfig) -> RustylineResult<Self> {
        Ok(Repl {
            editor: DefaultEditor::new()?,
            session: Session::new(config),
        })
    }

    /// Start the REPL loop
    pub fn run(&mut self) -> Result<()> {
        println!(
            "{} {}",
            "🎼".bright_yellow(),
            "Tonality Music Theory Engine".bright_cyan().bold()
        );
        println!(
            "Try: {}, {}, {}",
            "scale D dorian".cyan(),
            "identify E4 G4 C5".cyan(),
            "voice C I vi ii V7 I".cyan()
        );
        println!(
            "Type '{}' for more information, '{}' or {} to exit.\n",
            "help".bright_green(),
            "quit".bright_red(),
            "Ctrl+C".bright_red()
        );
        info!("repl started");

        loop {
            let prompt = format!("{} ", "tonality>".bright_magenta().bold());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(line)?;
                    if self.session.handle_line(line) == Flow::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    println!("{} 🎼", "Goodbye!".bright_cyan());
                    break;
                }
                Err(err) => {
                    println!(
                        "{} {}",
                        "Error reading input:".bright_red().bold(),
                        err.to_string().red()
                    );
                }
            }
        }

        Ok(())
    }
}

/// Convenience function to start the REPL
pub fn start(config: EngineConfig) -> Result<()> {
    let mut repl =
        Repl::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize REPL: {}", e))?;
    repl.run()
}
