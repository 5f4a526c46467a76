//! Command registry for REPL commands
//!
//! Every command carries its names, usage and argument floor; the registry
//! dispatches a line to the longest matching name and reports usage when
//! too few arguments follow it.

pub mod general;
pub mod harmony;
pub mod theory;

use anyhow::{anyhow, Result};
use tonality_core::types::{Key, Pitch, PitchClass, Spelling};
use tonality_core::EngineConfig;

/// Result of executing a command
#[derive(Debug)]
pub enum CommandResult {
    /// Command executed, show this message
    Message(String),
    /// Exit the REPL
    Exit,
    /// No registered command matches the input
    NotACommand,
    /// Error occurred
    Error(String),
}

/// Context passed to command handlers
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub config: EngineConfig,
}

impl CommandContext {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

/// A command handler function
pub type CommandHandler = fn(&str, &mut CommandContext) -> CommandResult;

/// Help section a command is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Scales,
    Chords,
    Keys,
    Progressions,
    General,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Scales,
        Section::Chords,
        Section::Keys,
        Section::Progressions,
        Section::General,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Scales => "Scales and intervals:",
            Section::Chords => "Chords:",
            Section::Keys => "Keys:",
            Section::Progressions => "Progressions and voice leading:",
            Section::General => "Other Commands:",
        }
    }
}

/// A registered command: its names, help text and argument floor
#[derive(Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub section: Section,
    /// Argument pattern shown in help and in usage errors
    pub usage: &'static str,
    pub summary: &'static str,
    /// Fewer whitespace-separated arguments than this is a usage error
    pub min_args: usize,
    pub handler: CommandHandler,
}

impl Command {
    pub fn new(name: &'static str, section: Section, handler: CommandHandler) -> Self {
        Self {
            name,
            aliases: &[],
            section,
            usage: name,
            summary: "",
            min_args: 0,
            handler,
        }
    }

    pub fn usage(mut self, usage: &'static str, min_args: usize) -> Self {
        self.usage = usage;
        self.min_args = min_args;
        self
    }

    pub fn summary(mut self, summary: &'static str) -> Self {
        self.summary = summary;
        self
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

/// Registry of available commands, kept in registration order
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn register(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// The command whose name or alias is the longest prefix of `input`,
    /// with the remaining argument text
    pub fn lookup<'a>(&self, input: &'a str) -> Option<(&Command, &'a str)> {
        self.commands
            .iter()
            .flat_map(|command| command.names().map(move |name| (command, name)))
            .filter(|(_, name)| input == *name || input.starts_with(&format!("{} ", name)))
            .max_by_key(|(_, name)| name.len())
            .map(|(command, name)| (command, input[name.len()..].trim()))
    }

    /// Execute a command, returning NotACommand if no match found
    pub fn execute(&self, input: &str, ctx: &mut CommandContext) -> CommandResult {
        let Some((command, args)) = self.lookup(input) else {
            return CommandResult::NotACommand;
        };
        if args.split_whitespace().count() < command.min_args {
            return CommandResult::Error(format!("Usage: {}", command.usage));
        }
        (command.handler)(args, ctx)
    }

    /// Every registered command in registration order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Get all registered names and aliases
    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.iter().flat_map(|c| c.names()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a fully populated command registry with all built-in commands
pub fn create_registry() -> CommandRegistry {
    use Section::*;
    let mut registry = CommandRegistry::new();

    let commands = [
        Command::new("scale", Scales, theory::cmd_scale)
            .usage("scale <root> <type> [octaves]", 2)
            .summary("Build a scale, e.g. scale D dorian"),
        Command::new("degrees", Scales, theory::cmd_degrees)
            .usage("degrees <root> <type>", 2)
            .summary("Scale degrees with their names"),
        Command::new("intervals", Scales, theory::cmd_intervals)
            .usage("intervals <pitch> <pitch> [pitch…]", 2)
            .summary("Name consecutive intervals, e.g. intervals C4 G4 E5"),
        Command::new("transpose", Scales, theory::cmd_transpose)
            .usage("transpose <from-key> <to-key> <pitch…>", 3)
            .summary("Move pitches between keys"),
        Command::new("findscale", Scales, theory::cmd_findscale)
            .usage("findscale <pitch…>", 5)
            .summary("Scales that contain a set of pitches"),
        Command::new("compare", Scales, theory::cmd_compare)
            .usage("compare <root> <type> / <root> <type>", 5)
            .summary("Shared and differing notes of two scales"),
        Command::new("chord", Chords, theory::cmd_chord)
            .usage("chord <root> <quality> [inversion] [voicing]", 2)
            .summary("Build a chord, e.g. chord F# m7 1 drop2"),
        Command::new("identify", Chords, theory::cmd_identify)
            .usage("identify <pitch…>", 1)
            .summary("Ranked chord readings of a pitch set"),
        Command::new("subs", Chords, theory::cmd_subs)
            .usage("subs <symbol> [style]", 1)
            .summary("Substitutes for a chord, e.g. subs G7 jazz"),
        Command::new("key", Keys, theory::cmd_key)
            .usage("key <pitch…>", 1)
            .summary("Krumhansl-Schmuckler key estimate"),
        Command::new("signature", Keys, theory::cmd_signature)
            .usage("signature <key>", 1)
            .summary("Key signature, relative and parallel keys"),
        Command::new("related", Keys, theory::cmd_related)
            .usage("related <key>", 1)
            .summary("Closely related keys"),
        Command::new("pivots", Keys, theory::cmd_pivots)
            .usage("pivots <key> <key>", 2)
            .summary("Chords shared by two keys"),
        Command::new("progression", Progressions, harmony::cmd_progression)
            .usage("progression <key> <numeral…>", 2)
            .summary("Resolve numerals, e.g. progression Bb ii7 V7 Imaj7"),
        Command::new("cadence", Progressions, harmony::cmd_cadence)
            .usage("cadence <key> <numeral> <numeral>", 3)
            .summary("Classify a cadence"),
        Command::new("suggest", Progressions, harmony::cmd_suggest)
            .usage("suggest <key> <style> [numeral…]", 2)
            .summary("Rank next chords (classical, pop, jazz)"),
        Command::new("validate", Progressions, harmony::cmd_validate)
            .usage("validate <key> <style> <numeral…>", 3)
            .summary("Grade a progression against a style"),
        Command::new("voice", Progressions, harmony::cmd_voice)
            .usage("voice <key> <numeral…>", 2)
            .summary("Four-part voicing with rule checks"),
        Command::new("motion", Progressions, harmony::cmd_motion)
            .usage("motion <pitch…> / <pitch…>", 3)
            .summary("Parallel, similar, contrary and oblique motion between voicings"),
        Command::new("common", Progressions, harmony::cmd_common)
            .usage("common [style]", 0)
            .summary("Library of common progressions"),
        Command::new("config", General, general::cmd_config).summary("Show engine settings"),
        Command::new("set", General, general::cmd_set)
            .usage("set <field> <value>", 2)
            .summary("Change a setting, e.g. set profile temperley"),
        Command::new("help", General, general::cmd_help).summary("Show this help"),
        Command::new("quit", General, general::cmd_quit)
            .aliases(&["exit"])
            .summary("Exit the REPL"),
    ];
    for command in commands {
        registry.register(command);
    }

    registry
}

/// Turn a handler's outcome into a REPL result
pub(crate) fn respond(result: Result<String>) -> CommandResult {
    match result {
        Ok(message) => CommandResult::Message(message),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

pub(crate) fn parse_pitch_class(token: &str) -> Result<PitchClass> {
    Ok(token.parse()?)
}

pub(crate) fn parse_key(token: &str) -> Result<Key> {
    Ok(token.parse()?)
}

pub(crate) fn parse_pitches(tokens: &[&str]) -> Result<Vec<Pitch>> {
    if tokens.is_empty() {
        return Err(anyhow!("Expected at least one pitch, e.g. C4 E4 G4"));
    }
    tokens
        .iter()
        .map(|t| t.trim_matches(',').parse::<Pitch>().map_err(Into::into))
        .collect()
}

/// Accidental preference implied by how a note was typed ("Bb" vs "A#")
pub(crate) fn spelling_of(token: &str) -> Spelling {
    if token.chars().skip(1).any(|c| c == 'b' || c == '♭') {
        Spelling::Flat
    } else {
        Spelling::Sharp
    }
}

/// Split arguments on whitespace; the registry has already checked the count
pub(crate) fn words(input: &str) -> Vec<&str> {
    input.split_whitespace().collect()
}

#[cfg(test)]
pub(crate) fn run_line(line: &str) -> CommandResult {
    colored::control::set_override(false);
    let registry = create_registry();
    let mut ctx = CommandContext::default();
    registry.execute(line, &mut ctx)
}

#[cfg(test)]
pub(crate) fn message(line: &str) -> String {
    match run_line(line) {
        CommandResult::Message(msg) => msg,
        other => panic!("expected a message for {:?}, got {:?}", line, other),
    }
}
