//! Progression, cadence, suggestion and voice-leading commands

use crate::commands::{parse_key, parse_pitches, respond, words, CommandContext, CommandResult};
use anyhow::{anyhow, Result};
use colored::*;
use tonality_core::types::{
    analyze_voice_motion, classify_function, common_progressions, identify_cadence,
    parse_numerals, resolve_progression, suggest_next_chord, validate_progression, Chord,
    HarmonicFunction, Key, Motion, PitchRange, RomanNumeral, Style, VoiceLeader,
};

fn resolve(key: Key, numerals: &[&str]) -> Result<(Vec<RomanNumeral>, Vec<Chord>)> {
    let numerals = parse_numerals(&numerals.join(" "))?;
    let chords = resolve_progression(key, &numerals)?;
    Ok((numerals, chords))
}

fn colored_function(function: HarmonicFunction) -> ColoredString {
    match function {
        HarmonicFunction::Tonic => function.symbol().blue(),
        HarmonicFunction::Subdominant => function.symbol().yellow(),
        HarmonicFunction::Dominant => function.symbol().red(),
    }
}

/// Handle `progression <key> <numerals…>`
pub fn cmd_progression(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(progression(args))
}

fn progression(input: &str) -> Result<String> {
    let parts = words(input);
    let key = parse_key(parts[0])?;
    let (numerals, chords) = resolve(key, &parts[1..])?;

    let mut lines = vec![format!("{}", key.to_string().bold())];
    for (numeral, chord) in numerals.iter().zip(&chords) {
        let notes: Vec<String> = chord
            .pitches()
            .iter()
            .map(|p| p.spelled(key.spelling()))
            .collect();
        lines.push(format!(
            "  {:<8} {:<10} {} [{}]",
            numeral.to_string(),
            chord.symbol(key.spelling()).cyan().to_string(),
            colored_function(classify_function(chord, key)),
            notes.join(" ")
        ));
    }
    lines.push(format!("cadence: {}", identify_cadence(&chords, key)));
    Ok(lines.join("\n"))
}

/// Handle `cadence <key> <numeral> <numeral>`
pub fn cmd_cadence(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(cadence(args))
}

fn cadence(input: &str) -> Result<String> {
    let parts = words(input);
    let key = parse_key(parts[0])?;
    let (_, chords) = resolve(key, &parts[1..])?;
    let symbols: Vec<String> = chords.iter().map(|c| c.symbol(key.spelling())).collect();
    Ok(format!(
        "{} in {}: {}",
        symbols.join(" → "),
        key,
        identify_cadence(&chords, key).to_string().bold()
    ))
}

/// Handle `suggest <key> <style> <numerals…>`
pub fn cmd_suggest(args: &str, ctx: &mut CommandContext) -> CommandResult {
    respond(suggest(args, ctx))
}

fn suggest(input: &str, ctx: &CommandContext) -> Result<String> {
    let parts = words(input);
    let key = parse_key(parts[0])?;
    let style: Style = parts[1].parse().map_err(|e: String| anyhow!(e))?;
    let (_, history) = resolve(key, &parts[2..])?;

    let suggestions = suggest_next_chord(&history, key, style, &ctx.config);
    let lines: Vec<String> = suggestions
        .iter()
        .take(5)
        .map(|s| {
            format!(
                "  {:<8} {:<8} {:.3}  (function {:.2}, voice leading {:.2})",
                s.numeral.to_string(),
                s.chord.symbol(key.spelling()).cyan().to_string(),
                s.score,
                s.functional,
                s.voice_leading
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Handle `validate <key> <style> <numerals…>`
pub fn cmd_validate(args: &str, ctx: &mut CommandContext) -> CommandResult {
    respond(validate(args, ctx))
}

fn validate(input: &str, ctx: &CommandContext) -> Result<String> {
    let parts = words(input);
    let key = parse_key(parts[0])?;
    let style: Style = parts[1].parse().map_err(|e: String| anyhow!(e))?;
    let (_, chords) = resolve(key, &parts[2..])?;

    let validation = validate_progression(&chords, key, style, &ctx.config);
    let verdict = if validation.is_valid() {
        "✓ valid".green()
    } else {
        "✗ weak".red()
    };
    let mut lines = vec![format!(
        "score {}/100 {}",
        validation.score.to_string().bold(),
        verdict
    )];
    for issue in &validation.issues {
        lines.push(format!("  {}", issue.to_string().yellow()));
    }
    for suggestion in &validation.suggestions {
        lines.push(format!("  → {}", suggestion.dimmed()));
    }
    Ok(lines.join("\n"))
}

/// Handle `voice <key> <numerals…>`
pub fn cmd_voice(args: &str, ctx: &mut CommandContext) -> CommandResult {
    respond(voice(args, ctx))
}

fn voice(input: &str, ctx: &CommandContext) -> Result<String> {
    let parts = words(input);
    let key = parse_key(parts[0])?;
    let (numerals, chords) = resolve(key, &parts[1..])?;

    let leader = VoiceLeader::new(ctx.config.voice_leading);
    let (voiced, reports) = leader.voice_progression(&chords, 4, &PitchRange::defaults(4))?;

    let mut lines = Vec::new();
    for ((numeral, voicing), report) in numerals.iter().zip(&voiced).zip(&reports) {
        // Soprano first, as read on a score
        let notes: Vec<String> = voicing
            .pitches()
            .iter()
            .rev()
            .map(|p| format!("{:<4}", p.spelled(key.spelling())))
            .collect();
        let status = if report.is_clean() {
            "✓".green()
        } else if report.hard_violations() == 0 {
            "~".yellow()
        } else {
            "✗".red()
        };
        lines.push(format!(
            "  {:<8} {} motion {:>2} {}",
            numeral.to_string(),
            notes.join(" "),
            report.cost,
            status
        ));
        for violation in &report.violations {
            lines.push(format!("           {}", violation.to_string().dimmed()));
        }
    }
    let total: u32 = reports.iter().map(|r| r.cost).sum();
    lines.push(format!("total motion: {}", total));
    Ok(lines.join("\n"))
}

/// Handle `motion <pitches…> / <pitches…>`
pub fn cmd_motion(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(motion(args))
}

fn motion(input: &str) -> Result<String> {
    let parts = words(input);
    let split = parts
        .iter()
        .position(|&p| p == "/")
        .ok_or_else(|| anyhow!("Separate the two voicings with '/'"))?;
    let from = parse_pitches(&parts[..split])?;
    let to = parse_pitches(&parts[split + 1..])?;
    if from.len() != to.len() {
        return Err(anyhow!(
            "Voicings differ in size: {} and {} voices",
            from.len(),
            to.len()
        ));
    }

    let analysis = analyze_voice_motion(&from, &to);
    let mut lines: Vec<String> = analysis
        .pairs
        .iter()
        .map(|pair| {
            let label = match pair.motion {
                Motion::Parallel => pair.motion.to_string().red(),
                Motion::Similar => pair.motion.to_string().yellow(),
                Motion::Contrary | Motion::Oblique => pair.motion.to_string().green(),
            };
            format!(
                "  voices {}-{}  {:<9} {} → {}",
                pair.lower + 1,
                pair.upper + 1,
                label.to_string(),
                pair.before,
                pair.after
            )
        })
        .collect();
    lines.push(format!(
        "total motion {}, largest leap {}",
        analysis.total_motion, analysis.largest_leap
    ));
    Ok(lines.join("\n"))
}

/// Handle `common [style]`
pub fn cmd_common(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    let style = args.split_whitespace().next();
    let progressions = common_progressions(style);
    if progressions.is_empty() {
        return CommandResult::Error(format!(
            "No progressions for style '{}' (try classical, jazz, pop or blues)",
            args
        ));
    }

    let lines: Vec<String> = progressions
        .iter()
        .map(|p| {
            format!(
                "  {:<20} {:<10} {}",
                p.name.cyan().to_string(),
                p.style,
                p.numerals.join(" ")
            )
        })
        .collect();
    CommandResult::Message(lines.join("\n"))
}
