//! # Tonality
//!
//! Interactive front-end for the `tonality-core` theory engines: a
//! line-oriented REPL whose commands build scales and chords, estimate keys,
//! resolve and extend progressions, and voice them in four parts.
//!
//! ## Modules
//!
//! - `commands`: The command registry and one handler per REPL command.
//! - `repl`: The Read-Eval-Print Loop itself.

pub mod commands;
pub mod repl;

pub use crate::commands::{create_registry, CommandContext, CommandRegistry, CommandResult};
pub use crate::repl::{start, Repl};
