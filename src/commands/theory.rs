//! Scale, chord and key commands

use crate::commands::{
    parse_key, parse_pitch_class, parse_pitches, respond, spelling_of, words, CommandContext,
    CommandResult,
};
use anyhow::{anyhow, Result};
use colored::*;
use tonality_core::types::{
    analyze_chord, build_chord, build_scale, closely_related_keys, compare_scales, detect_key,
    identify_scale, intervals_between, leading_ties, pivot_chords, suggest_substitutions,
    transpose, Chord, PitchClass, PitchHistogram, Scale, Spelling, Style, Voicing,
};

/// Handle `scale <root> <type> [octaves]`
pub fn cmd_scale(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(scale(args))
}

fn scale(input: &str) -> Result<String> {
    let mut parts = words(input);
    let octaves = match parts.last().and_then(|p| p.parse::<usize>().ok()) {
        Some(n) if parts.len() > 2 => {
            parts.pop();
            n
        }
        _ => 1,
    };
    let root = parse_pitch_class(parts[0])?;
    let scale = build_scale(root, &parts[1..].join(" "), octaves)?;
    let spelling = spelling_of(parts[0]);

    let notes: Vec<String> = scale
        .pitches()
        .iter()
        .map(|p| p.spelled(spelling).cyan().to_string())
        .collect();
    Ok(format!(
        "{} {}: {}",
        root.name(spelling).bold(),
        scale.scale_type(),
        notes.join(" ")
    ))
}

/// Handle `degrees <root> <type>`
pub fn cmd_degrees(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(degrees(args))
}

fn degrees(input: &str) -> Result<String> {
    let parts = words(input);
    let root = parse_pitch_class(parts[0])?;
    let scale = build_scale(root, &parts[1..].join(" "), 1)?;
    let spelling = spelling_of(parts[0]);

    let mut lines = Vec::new();
    for (i, pc) in scale.pitch_classes().iter().enumerate() {
        let name = scale
            .degree_name(i + 1)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!("  {} {:<3} {}", i + 1, pc.name(spelling).cyan(), name));
    }
    Ok(lines.join("\n"))
}

/// Handle `intervals <pitches…>`
pub fn cmd_intervals(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(intervals(args))
}

fn intervals(input: &str) -> Result<String> {
    let parts = words(input);
    let pitches = parse_pitches(&parts)?;
    let names: Vec<String> = intervals_between(&pitches)
        .iter()
        .zip(pitches.windows(2))
        .map(|(interval, pair)| {
            format!("{} → {}: {}", pair[0], pair[1], interval.to_string().green())
        })
        .collect();
    Ok(names.join("\n"))
}

/// Handle `transpose <from-key> <to-key> <pitches…>`
pub fn cmd_transpose(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(transpose_pitches(args))
}

fn transpose_pitches(input: &str) -> Result<String> {
    let parts = words(input);
    let from = parse_key(parts[0])?;
    let to = parse_key(parts[1])?;
    let pitches = parse_pitches(&parts[2..])?;

    let moved: Vec<String> = transpose(&pitches, from, to)
        .iter()
        .map(|p| p.spelled(to.spelling()).cyan().to_string())
        .collect();
    Ok(format!("{} → {}: {}", from, to, moved.join(" ")))
}

/// Handle `findscale <pitches…>`
pub fn cmd_findscale(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(findscale(args))
}

fn findscale(input: &str) -> Result<String> {
    let parts = words(input);
    let pitches = parse_pitches(&parts)?;
    let matches = identify_scale(&pitches);
    if matches.is_empty() {
        return Ok("No scale reading (need five distinct pitch classes that fit a scale)".into());
    }

    let spelling = spelling_of(parts[0]);
    let lines: Vec<String> = matches
        .iter()
        .take(5)
        .map(|m| {
            let name = format!("{} {}", m.scale.root().name(spelling), m.scale.scale_type());
            let mut line = format!("  {:<24} {:.2}", name.bold().to_string(), m.confidence);
            if m.missing > 0 {
                line.push_str(&format!(" missing {}", m.missing).yellow().to_string());
            }
            if m.extra > 0 {
                line.push_str(&format!(" extra {}", m.extra).red().to_string());
            }
            line
        })
        .collect();
    Ok(lines.join("\n"))
}

fn note_list(classes: &[PitchClass], spelling: Spelling) -> String {
    if classes.is_empty() {
        return "-".to_string();
    }
    let names: Vec<&str> = classes.iter().map(|pc| pc.name(spelling)).collect();
    names.join(" ")
}

fn parse_scale(parts: &[&str]) -> Result<(Scale, String)> {
    let [root, scale_type @ ..] = parts else {
        return Err(anyhow!("Expected a root and a scale type"));
    };
    if scale_type.is_empty() {
        return Err(anyhow!("Expected a scale type after {}", root));
    }
    let scale = build_scale(parse_pitch_class(root)?, &scale_type.join(" "), 1)?;
    let label = format!("{} {}", root, scale.scale_type());
    Ok((scale, label))
}

/// Handle `compare <root> <type> / <root> <type>`
pub fn cmd_compare(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(compare(args))
}

fn compare(input: &str) -> Result<String> {
    let parts = words(input);
    let split = parts
        .iter()
        .position(|&p| p == "/")
        .ok_or_else(|| anyhow!("Separate the two scales with '/'"))?;
    let (first, first_label) = parse_scale(&parts[..split])?;
    let (second, second_label) = parse_scale(&parts[split + 1..])?;
    let spelling = spelling_of(parts[0]);

    let comparison = compare_scales(&first, &second);
    let mut lines = vec![
        format!("  {:<20} {}", "common", note_list(&comparison.common, spelling)),
        format!(
            "  {:<20} {}",
            format!("only {}", first_label),
            note_list(&comparison.only_first, spelling)
        ),
        format!(
            "  {:<20} {}",
            format!("only {}", second_label),
            note_list(&comparison.only_second, spelling)
        ),
        format!("similarity {:.0}%", comparison.similarity * 100.0),
    ];
    if comparison.same_collection {
        lines.push("same pitch collection".green().to_string());
    }
    Ok(lines.join("\n"))
}

/// Handle `chord <root> <quality> [inversion] [voicing]`
pub fn cmd_chord(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(chord(args))
}

fn chord(input: &str) -> Result<String> {
    let parts = words(input);
    let root = parse_pitch_class(parts[0])?;
    let inversion = match parts.get(2) {
        Some(inv) => inv
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid inversion: {}", inv))?,
        None => 0,
    };
    let voicing = match parts.get(3) {
        Some(v) => v.parse::<Voicing>().map_err(|e| anyhow!(e))?,
        None => Voicing::Close,
    };

    let chord = build_chord(root, parts[1], inversion, voicing)?;
    let spelling = spelling_of(parts[0]);
    let notes: Vec<String> = chord
        .pitches()
        .iter()
        .map(|p| p.spelled(spelling).cyan().to_string())
        .collect();
    Ok(format!(
        "{} ({}, {}): {}",
        chord.symbol(spelling).bold(),
        chord.quality().name(),
        voicing,
        notes.join(" ")
    ))
}

/// Handle `identify <pitches…>`
pub fn cmd_identify(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(identify(args))
}

fn identify(input: &str) -> Result<String> {
    let parts = words(input);
    let pitches = parse_pitches(&parts)?;
    let candidates = analyze_chord(&pitches);
    if candidates.is_empty() {
        return Ok("No chord reading (need at least three distinct pitch classes)".to_string());
    }

    let mut lines = Vec::new();
    for candidate in candidates.iter().take(6) {
        let mut line = format!(
            "  {} ({})",
            candidate.chord.symbol(Default::default()).bold(),
            candidate.chord.quality().name()
        );
        if !candidate.missing.is_empty() {
            let missing: Vec<String> = candidate.missing.iter().map(|pc| pc.to_string()).collect();
            line.push_str(&format!(" missing {}", missing.join(" ")).yellow().to_string());
        }
        if !candidate.extra.is_empty() {
            let extra: Vec<String> = candidate.extra.iter().map(|pc| pc.to_string()).collect();
            line.push_str(&format!(" extra {}", extra.join(" ")).red().to_string());
        }
        lines.push(line);
    }
    if candidates.len() > 6 {
        lines.push(format!("  … {} more", candidates.len() - 6));
    }
    Ok(lines.join("\n"))
}

/// Handle `subs <symbol> [style]`
pub fn cmd_subs(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(subs(args))
}

fn subs(input: &str) -> Result<String> {
    let parts = words(input);
    let chord = Chord::from_symbol(parts[0])?;
    let style = match parts.get(1..) {
        Some(rest) if !rest.is_empty() => rest.join(" ").parse::<Style>().map_err(|e| anyhow!(e))?,
        _ => Style::Jazz,
    };
    let spelling = spelling_of(parts[0]);

    let substitutions = suggest_substitutions(&chord, style);
    if substitutions.is_empty() {
        return Ok(format!("No {} substitutes for {}", style, chord.symbol(spelling)));
    }
    let lines: Vec<String> = substitutions
        .iter()
        .map(|sub| {
            format!(
                "  {:<12} {} ({})",
                sub.symbols(spelling).cyan().to_string(),
                sub.kind,
                sub.kind.explanation().dimmed()
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Handle `key <pitches…>`
pub fn cmd_key(args: &str, ctx: &mut CommandContext) -> CommandResult {
    respond(key(args, ctx))
}

fn key(input: &str, ctx: &CommandContext) -> Result<String> {
    let parts = words(input);
    let pitches = parse_pitches(&parts)?;
    let histogram = PitchHistogram::from_pitches(&pitches);
    let config = &ctx.config.key_detection;
    let candidates = detect_key(&histogram, config)?;

    let ties = leading_ties(&candidates, config.tie_epsilon).len();
    let mut lines = Vec::new();
    for (i, candidate) in candidates.iter().take(ties.max(5)).enumerate() {
        let bar = "█".repeat((candidate.confidence * 20.0).round() as usize);
        let name = if i < ties {
            candidate.key.to_string().bright_green().bold()
        } else {
            candidate.key.to_string().normal()
        };
        lines.push(format!("  {:<10} {:.3} {}", name, candidate.confidence, bar.blue()));
    }
    if ties > 1 {
        lines.push(format!("{} {} keys tie for first", "~".yellow(), ties));
    }
    Ok(lines.join("\n"))
}

/// Handle `signature <key>`
pub fn cmd_signature(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(signature(args))
}

fn signature(input: &str) -> Result<String> {
    let parts = words(input);
    let key = parse_key(parts[0])?;
    let signature = key.signature();
    let notes: Vec<&str> = key.pitch_classes().iter().map(|&pc| key.spell(pc)).collect();

    Ok([
        format!("{}: {}", key.to_string().bold(), signature),
        format!("  {:<10} {}", "relative", key.relative()),
        format!("  {:<10} {}", "parallel", key.parallel()),
        format!("  {:<10} {}", "scale", notes.join(" ").cyan()),
        format!("  {:<10} {}", "circle", signature.circle_position()),
    ]
    .join("\n"))
}

/// Handle `related <key>`
pub fn cmd_related(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(related(args))
}

fn related(input: &str) -> Result<String> {
    let parts = words(input);
    let key = parse_key(parts[0])?;
    let lines: Vec<String> = closely_related_keys(key)
        .iter()
        .map(|other| {
            format!(
                "  {:<10} {} ({} on the circle of fifths)",
                other.to_string().cyan(),
                key.relationship(other),
                key.fifths_distance(other)
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Handle `pivots <key> <key>`
pub fn cmd_pivots(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    respond(pivots(args))
}

fn pivots(input: &str) -> Result<String> {
    let parts = words(input);
    let from = parse_key(parts[0])?;
    let to = parse_key(parts[1])?;
    let chords = pivot_chords(from, to);
    if chords.is_empty() {
        return Ok(format!("No pivot chords between {} and {}", from, to));
    }

    let symbols: Vec<String> = chords
        .iter()
        .map(|c| c.symbol(from.spelling()).cyan().to_string())
        .collect();
    Ok(format!(
        "{} → {} ({}): {}",
        from,
        to,
        from.relationship(&to),
        symbols.join(" ")
    ))
}

#[cfg(test)]
mod tests {
    use crate::commands::{message, run_line, CommandResult};

    #[test]
    fn test_scale_command() {
        assert_eq!(message("scale C major"), "C major: C4 D4 E4 F4 G4 A4 B4 C5");
        let flats = message("scale Bb natural minor");
        assert!(flats.starts_with("Bb natural minor: Bb4 C5 Db5"), "{}", flats);
        let two = message("scale A minor_pentatonic 2");
        assert_eq!(two.split_whitespace().count(), 3 + 11);
    }

    #[test]
    fn test_scale_errors() {
        match run_line("scale C bebop") {
            CommandResult::Error(e) => assert!(e.contains("bebop"), "{}", e),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(run_line("scale C"), CommandResult::Error(_)));
    }

    #[test]
    fn test_degrees_command() {
        let output = message("degrees C major");
        assert!(output.contains("1 C   tonic"), "{}", output);
        assert!(output.contains("7 B   leading tone"), "{}", output);
    }

    #[test]
    fn test_chord_command() {
        let output = message("chord C maj7 1");
        assert!(output.starts_with("Cmaj7/E"), "{}", output);
        assert!(output.ends_with("E4 G4 B4 C5"), "{}", output);
        assert!(matches!(run_line("chord C maj 3"), CommandResult::Error(_)));
    }

    #[test]
    fn test_identify_command() {
        let output = message("identify E4 G4 C5");
        assert!(output.lines().next().unwrap().contains("C/E"), "{}", output);
    }

    #[test]
    fn test_key_command() {
        let output = message("key C4 E4 G4 C5 D4 F4 A4 B4 G4");
        assert!(output.lines().next().unwrap().contains("C major"), "{}", output);
    }

    #[test]
    fn test_intervals_command() {
        let output = message("intervals C4 E4 G5");
        assert!(output.contains("C4 → E4: major 3rd"), "{}", output);
        assert!(output.contains("E4 → G5: minor 10th"), "{}", output);
    }

    #[test]
    fn test_transpose_command() {
        let output = message("transpose C D C4 E4 G4");
        assert!(output.ends_with("D4 F#4 A4"), "{}", output);
        let flat = message("transpose C F C4 E4");
        assert!(flat.ends_with("F4 A4"), "{}", flat);
    }

    #[test]
    fn test_findscale_command() {
        let output = message("findscale C4 D4 E4 F4 G4 A4 B4");
        let first = output.lines().next().unwrap();
        assert!(first.contains("C major"), "{}", output);
        assert!(first.contains("1.00"), "{}", output);
        assert!(output.lines().count() <= 5);
        let blues = message("findscale A3 C4 D4 D#4 E4 G4");
        assert!(blues.lines().next().unwrap().contains("A minor blues"), "{}", blues);
        assert!(matches!(run_line("findscale C4 E4 G4"), CommandResult::Error(_)));
    }

    #[test]
    fn test_compare_command() {
        let output = message("compare C major / G major");
        assert!(output.contains("similarity 86%"), "{}", output);
        let only_g = output.lines().find(|l| l.contains("only G major")).unwrap();
        assert!(only_g.ends_with("F#"), "{}", output);
        assert!(!output.contains("same pitch collection"));

        let relative = message("compare C major / A natural minor");
        assert!(relative.contains("same pitch collection"), "{}", relative);
        assert!(matches!(run_line("compare C major G major x"), CommandResult::Error(_)));
    }

    #[test]
    fn test_subs_command() {
        let jazz = message("subs G7");
        assert!(jazz.contains("C#7"), "{}", jazz);
        assert!(jazz.contains("Dm7 - G7"), "{}", jazz);
        let classical = message("subs C classical");
        assert!(classical.contains("Am"), "{}", classical);
        assert!(classical.contains("Em"), "{}", classical);
        assert_eq!(message("subs Cm pop"), "No pop substitutes for Cm");
        assert!(matches!(run_line("subs C baroque"), CommandResult::Error(_)));
    }

    #[test]
    fn test_signature_command() {
        let output = message("signature Eb");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Eb major: 3 flats (Bb, Eb, Ab)");
        assert!(lines[1].ends_with("C minor"), "{}", output);
        assert!(lines[2].ends_with("Eb minor"), "{}", output);
        assert!(lines[3].ends_with("Eb F G Ab Bb C D"), "{}", output);
        assert!(lines[4].ends_with("9"), "{}", output);
    }

    #[test]
    fn test_related_and_pivots() {
        let related = message("related C");
        assert_eq!(related.lines().count(), 6);
        assert!(related.contains("E minor"), "{}", related);
        assert!(related.contains("D minor"), "{}", related);
        assert!(related.contains("relative"), "{}", related);
        let pivots = message("pivots C G");
        assert!(pivots.ends_with("C Em G Am"), "{}", pivots);
    }
}
