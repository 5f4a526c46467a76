//! General REPL commands (help, quit, config, set)

use crate::commands::{create_registry, respond, CommandContext, CommandResult, Section};
use anyhow::{anyhow, Result};
use colored::*;
use std::str::FromStr;
use tonality_core::KeyProfile;

/// Handle `help` command
pub fn cmd_help(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Message(help_text())
}

/// Handle `quit` or `exit` command
pub fn cmd_quit(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Exit
}

/// Handle `config` command
pub fn cmd_config(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let key = &ctx.config.key_detection;
    let voice = &ctx.config.voice_leading;
    let suggest = &ctx.config.suggestion;

    let rows = [
        ("profile", key.profile.name().to_string()),
        ("tie_epsilon", key.tie_epsilon.to_string()),
        ("modulation_threshold", key.modulation_threshold.to_string()),
        ("max_leap", voice.max_leap.to_string()),
        ("neighborhood", voice.neighborhood.to_string()),
        ("options_per_voice", voice.options_per_voice.to_string()),
        ("hard_penalty", voice.hard_penalty.to_string()),
        ("soft_penalty", voice.soft_penalty.to_string()),
        ("keep_bass", voice.keep_bass.to_string()),
        ("omit_fifth", voice.omit_fifth.to_string()),
        ("functional_weight", suggest.functional_weight.to_string()),
        ("voice_leading_weight", suggest.voice_leading_weight.to_string()),
    ];
    let lines: Vec<String> = rows
        .iter()
        .map(|(name, value)| format!("  {:<22} {}", name.green().to_string(), value))
        .collect();
    CommandResult::Message(lines.join("\n"))
}

/// Handle `set <field> <value>` command
pub fn cmd_set(args: &str, ctx: &mut CommandContext) -> CommandResult {
    respond(set(args, ctx))
}

fn value<T: FromStr>(field: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| anyhow!("Invalid value for {}: {}", field, raw))
}

fn set(input: &str, ctx: &mut CommandContext) -> Result<String> {
    let mut parts = input.split_whitespace();
    let (Some(field), Some(raw), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(anyhow!("Usage: set <field> <value>"));
    };

    let config = &mut ctx.config;
    match field {
        "profile" => {
            config.key_detection.profile = KeyProfile::from_str(raw).map_err(|e| anyhow!(e))?
        }
        "tie_epsilon" => config.key_detection.tie_epsilon = value(field, raw)?,
        "modulation_threshold" => {
            let threshold: f64 = value(field, raw)?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(anyhow!("modulation_threshold must be between 0 and 1"));
            }
            config.key_detection.modulation_threshold = threshold;
        }
        "max_leap" => config.voice_leading.max_leap = value(field, raw)?,
        "neighborhood" => config.voice_leading.neighborhood = value(field, raw)?,
        "options_per_voice" => {
            config.voice_leading = config
                .voice_leading
                .with_options_per_voice(value(field, raw)?)
        }
        "hard_penalty" => config.voice_leading.hard_penalty = value(field, raw)?,
        "soft_penalty" => config.voice_leading.soft_penalty = value(field, raw)?,
        "keep_bass" => config.voice_leading.keep_bass = value(field, raw)?,
        "omit_fifth" => config.voice_leading.omit_fifth = value(field, raw)?,
        "functional_weight" => config.suggestion.functional_weight = value(field, raw)?,
        "voice_leading_weight" => config.suggestion.voice_leading_weight = value(field, raw)?,
        other => return Err(anyhow!("Unknown setting: {} (see 'config')", other)),
    }
    Ok(format!("{} = {}", field.green(), raw).bright_green().to_string())
}

fn help_text() -> String {
    let registry = create_registry();
    let mut out = vec![
        "🎼 Tonality Help".bold().to_string(),
        "===============".bold().to_string(),
    ];
    for section in Section::ALL {
        out.push(String::new());
        out.push(section.title().green().to_string());
        for command in registry.commands().iter().filter(|c| c.section == section) {
            let usage = match (section, command.name) {
                (_, "quit") => command.usage.bright_red(),
                (Section::General, _) => command.usage.bright_green(),
                _ => command.usage.cyan(),
            };
            out.push(format!("  {:<46} {}", usage.to_string(), command.summary));
        }
    }
    out.join("\n")
}
