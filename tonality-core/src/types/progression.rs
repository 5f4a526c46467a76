// tonality-core/src/types/progression.rs
//! Functional harmony over chord sequences: numeral resolution, harmonic
//! function, cadences and next-chord suggestions.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::types::chord::Chord;
use crate::types::key::{Key, Mode};
use crate::types::roman_numeral::RomanNumeral;
use crate::types::voice_leading::{PitchRange, VoiceLeader, VoicedChord};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// Resolve a numeral sequence to concrete chords in `key`
pub fn resolve_progression(key: Key, numerals: &[RomanNumeral]) -> Result<Vec<Chord>> {
    let chords = numerals
        .iter()
        .map(|numeral| numeral.resolve(key))
        .collect::<Result<Vec<_>>>()?;
    debug!(key = %key, chords = chords.len(), "resolved progression");
    Ok(chords)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HarmonicFunction {
    Tonic,
    Subdominant,
    Dominant,
}

impl HarmonicFunction {
    /// Bucket for a scale degree 1-7
    pub fn of_degree(degree: u8) -> HarmonicFunction {
        match degree {
            2 | 4 => HarmonicFunction::Subdominant,
            5 | 7 => HarmonicFunction::Dominant,
            _ => HarmonicFunction::Tonic,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            HarmonicFunction::Tonic => "T",
            HarmonicFunction::Subdominant => "S",
            HarmonicFunction::Dominant => "D",
        }
    }
}

impl fmt::Display for HarmonicFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarmonicFunction::Tonic => "tonic",
            HarmonicFunction::Subdominant => "subdominant",
            HarmonicFunction::Dominant => "dominant",
        };
        write!(f, "{}", name)
    }
}

/// Harmonic function of a chord by the scale degree of its root. Borrowed
/// chords fall in the bucket of the degree they replace.
pub fn classify_function(chord: &Chord, key: Key) -> HarmonicFunction {
    HarmonicFunction::of_degree(key.degree_of(chord.root()).degree)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CadenceType {
    Authentic,
    Plagal,
    Deceptive,
    Half,
    None,
}

impl fmt::Display for CadenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CadenceType::Authentic => "authentic",
            CadenceType::Plagal => "plagal",
            CadenceType::Deceptive => "deceptive",
            CadenceType::Half => "half",
            CadenceType::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Cadence formed by the final two chords of `chords`
pub fn identify_cadence(chords: &[Chord], key: Key) -> CadenceType {
    let [.., penultimate, last] = chords else {
        return CadenceType::None;
    };

    let arrival = key.degree_of(last.root());
    let arrives_home = arrival.degree == 1 && arrival.accidental == 0;

    match (
        classify_function(penultimate, key),
        HarmonicFunction::of_degree(arrival.degree),
    ) {
        (_, HarmonicFunction::Dominant) => CadenceType::Half,
        (HarmonicFunction::Dominant, _) if arrives_home => CadenceType::Authentic,
        (HarmonicFunction::Dominant, _) => CadenceType::Deceptive,
        (HarmonicFunction::Subdominant, _) if arrives_home => CadenceType::Plagal,
        _ => CadenceType::None,
    }
}

/// Harmonic vocabulary used to weigh chord successions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Style {
    #[default]
    CommonPractice,
    Pop,
    Jazz,
}

impl Style {
    /// Likelihood of moving from one scale degree to another (1-based)
    fn transition(self, from: u8, to: u8) -> f64 {
        let table = match self {
            Style::CommonPractice => &COMMON_PRACTICE_TRANSITIONS,
            Style::Pop => &POP_TRANSITIONS,
            Style::Jazz => &JAZZ_TRANSITIONS,
        };
        let (Some(row), Some(col)) = (from.checked_sub(1), to.checked_sub(1)) else {
            return 0.0;
        };
        table
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Likelihood of opening a phrase on a degree
    fn opening(self, degree: u8) -> f64 {
        match (self, degree) {
            (Style::Pop, 6) => 0.3,
            (Style::Pop, 1) => 0.25,
            (Style::Pop, 4) => 0.2,
            (Style::Pop, _) => 0.0,
            (_, 1) => 0.4,
            (_, 6) => 0.2,
            (_, 2) => 0.15,
            _ => 0.0,
        }
    }

    /// Diatonic numerals offered as candidates, plus chromatic substitutions
    /// in jazz
    fn candidates(self, mode: Mode) -> &'static [&'static str] {
        match (self, mode) {
            (Style::Jazz, Mode::Major) => &[
                "I", "ii", "iii", "IV", "V", "vi", "vii°", "Imaj7", "ii7", "iii7", "IVmaj7",
                "V7", "vi7", "viiø7", "bII7", "V7/ii", "V7/V", "V7/vi", "bVII7", "iv",
            ],
            (Style::Jazz, Mode::Minor) => &[
                "i", "ii°", "III", "iv", "V", "VI", "vii°", "VII", "i7", "iiø7", "IIImaj7",
                "iv7", "V7", "VImaj7", "vii°7", "bII7", "V7/V", "V7/iv",
            ],
            (_, Mode::Major) => &["I", "ii", "iii", "IV", "V", "vi", "vii°"],
            (_, Mode::Minor) => &["i", "ii°", "III", "iv", "V", "VI", "vii°", "VII"],
        }
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "common_practice" | "classical" | "cp" => Ok(Style::CommonPractice),
            "pop" | "rock" => Ok(Style::Pop),
            "jazz" => Ok(Style::Jazz),
            other => Err(format!("Unknown style: {}", other)),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Style::CommonPractice => "common practice",
            Style::Pop => "pop",
            Style::Jazz => "jazz",
        };
        write!(f, "{}", name)
    }
}

// Rows: from degree 1-7, columns: to degree 1-7
const COMMON_PRACTICE_TRANSITIONS: [[f64; 7]; 7] = [
    [0.00, 0.15, 0.10, 0.20, 0.25, 0.20, 0.05],
    [0.10, 0.00, 0.00, 0.05, 0.80, 0.05, 0.05],
    [0.05, 0.05, 0.00, 0.30, 0.10, 0.40, 0.05],
    [0.20, 0.15, 0.00, 0.00, 0.40, 0.05, 0.15],
    [0.60, 0.03, 0.02, 0.10, 0.00, 0.25, 0.00],
    [0.15, 0.25, 0.05, 0.30, 0.20, 0.00, 0.05],
    [0.80, 0.00, 0.10, 0.00, 0.05, 0.05, 0.00],
];

const POP_TRANSITIONS: [[f64; 7]; 7] = [
    [0.00, 0.15, 0.05, 0.20, 0.30, 0.25, 0.00],
    [0.10, 0.00, 0.00, 0.30, 0.50, 0.10, 0.00],
    [0.10, 0.00, 0.00, 0.40, 0.00, 0.50, 0.00],
    [0.35, 0.10, 0.00, 0.00, 0.30, 0.20, 0.05],
    [0.50, 0.10, 0.00, 0.15, 0.00, 0.25, 0.00],
    [0.20, 0.10, 0.00, 0.40, 0.25, 0.00, 0.05],
    [0.60, 0.00, 0.20, 0.00, 0.00, 0.20, 0.00],
];

const JAZZ_TRANSITIONS: [[f64; 7]; 7] = [
    [0.00, 0.25, 0.15, 0.10, 0.20, 0.30, 0.00],
    [0.10, 0.00, 0.00, 0.00, 0.80, 0.05, 0.05],
    [0.05, 0.10, 0.00, 0.10, 0.00, 0.60, 0.15],
    [0.20, 0.20, 0.10, 0.00, 0.20, 0.00, 0.30],
    [0.50, 0.15, 0.05, 0.10, 0.00, 0.20, 0.00],
    [0.10, 0.40, 0.00, 0.20, 0.25, 0.00, 0.05],
    [0.30, 0.00, 0.60, 0.00, 0.10, 0.00, 0.00],
];

/// (second-to-last, last, next) degrees of familiar cadential patterns
const PATTERN_BONUSES: [(u8, u8, u8, f64); 3] =
    [(2, 5, 1, 0.8), (1, 6, 2, 0.4), (6, 2, 5, 0.6)];

/// A ranked next-chord candidate
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Suggestion {
    pub chord: Chord,
    pub numeral: RomanNumeral,
    /// Weighted combination of the two component scores
    pub score: f64,
    pub functional: f64,
    pub voice_leading: f64,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {:.3} [function {:.2}, voice leading {:.2}]",
            self.numeral, self.chord, self.score, self.functional, self.voice_leading
        )
    }
}

/// Rank candidate chords to follow `history` in `key`.
///
/// Each candidate combines a functional likelihood from the style's
/// transition table with a voice-leading score against the last chord.
pub fn suggest_next_chord(
    history: &[Chord],
    key: Key,
    style: Style,
    config: &EngineConfig,
) -> Vec<Suggestion> {
    let degrees: Vec<u8> = history
        .iter()
        .map(|c| key.degree_of(c.root()).degree)
        .collect();

    let leader = VoiceLeader::new(config.voice_leading);
    let ranges = PitchRange::defaults(4);
    let previous = history
        .last()
        .map(|last| seed_previous(&leader, last, &ranges, config));

    let mut suggestions: Vec<Suggestion> = Vec::new();
    for label in style.candidates(key.mode()) {
        let Ok(numeral) = label.parse::<RomanNumeral>() else {
            continue;
        };
        let Ok(chord) = numeral.resolve(key) else {
            continue;
        };
        if suggestions
            .iter()
            .any(|s| s.chord.root() == chord.root() && s.chord.quality() == chord.quality())
        {
            continue;
        }

        let functional = functional_score(style, &degrees, scoring_degree(&numeral, &chord, key));
        let voice_leading = match &previous {
            None => 1.0,
            Some(None) => 0.0,
            Some(Some(voiced)) => match leader.best_transition(voiced, &chord, &ranges) {
                Ok((_, cost)) => 1.0 / (1.0 + cost as f64 / ranges.len() as f64),
                Err(_) => 0.0,
            },
        };
        let score = config.suggestion.functional_weight * functional
            + config.suggestion.voice_leading_weight * voice_leading;

        trace!(numeral = %numeral, functional, voice_leading, score, "scored candidate");
        suggestions.push(Suggestion {
            chord,
            numeral,
            score,
            functional,
            voice_leading,
        });
    }

    suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
    debug!(
        key = %key,
        style = %style,
        history = history.len(),
        top = ?suggestions.first().map(|s| s.numeral.to_string()),
        "suggested next chords"
    );
    suggestions
}

/// Voicing of the last chord to measure motion from. A chord with more tones
/// than voices is retried with its fifth left out.
fn seed_previous(
    leader: &VoiceLeader,
    last: &Chord,
    ranges: &[PitchRange],
    config: &EngineConfig,
) -> Option<VoicedChord> {
    let err = match leader.seed(last, ranges) {
        Ok(voiced) => return Some(voiced),
        Err(err) => err,
    };
    warn!(chord = %last, error = %err, "retrying previous chord without its fifth");
    VoiceLeader::new(config.voice_leading.with_omit_fifth(true))
        .seed(last, ranges)
        .map_err(|err| warn!(chord = %last, error = %err, "previous chord cannot be voiced"))
        .ok()
}

/// Transition likelihood below which a chord succession counts as weak
const WEAK_TRANSITION: f64 = 0.05;
const WEAK_PENALTY: u32 = 5;
const VOICE_LEADING_PENALTY: u32 = 10;
const CADENCE_PENALTY: u32 = 5;
/// Scores above this pass validation
const PASSING_SCORE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IssueKind {
    /// A succession the style rarely uses
    WeakProgression,
    /// Even the best four-voice realization breaks a hard rule
    VoiceLeading,
    /// A phrase of four or more chords with no authentic cadence
    MissingCadence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Minor,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressionIssue {
    pub kind: IssueKind,
    /// Index of the chord the problem starts at; `None` for the whole phrase
    pub position: Option<usize>,
    pub severity: Severity,
    pub description: String,
}

impl fmt::Display for ProgressionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
        };
        match self.position {
            Some(position) => write!(f, "#{} {} ({})", position, self.description, severity),
            None => write!(f, "{} ({})", self.description, severity),
        }
    }
}

/// Outcome of [`validate_progression`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressionValidation {
    /// Starts at 100 and loses points per issue
    pub score: u32,
    pub issues: Vec<ProgressionIssue>,
    pub suggestions: Vec<String>,
}

impl ProgressionValidation {
    pub fn is_valid(&self) -> bool {
        self.score > PASSING_SCORE
    }
}

/// Grade a progression in `key` against the style's habits.
///
/// Successions the style's transition table rates below 5% cost 5 points.
/// The progression is voiced in four parts, and every arrival that still
/// breaks a hard rule costs 10. Four or more chords without an authentic
/// cadence cost 5. Chords too dense to voice skip the voice-leading check.
pub fn validate_progression(
    chords: &[Chord],
    key: Key,
    style: Style,
    config: &EngineConfig,
) -> ProgressionValidation {
    let mut issues = Vec::new();
    let mut penalty = 0;

    for (position, pair) in chords.windows(2).enumerate() {
        let from = key.degree_of(pair[0].root()).degree;
        let to = key.degree_of(pair[1].root()).degree;
        if from != to && style.transition(from, to) < WEAK_TRANSITION {
            penalty += WEAK_PENALTY;
            issues.push(ProgressionIssue {
                kind: IssueKind::WeakProgression,
                position: Some(position),
                severity: Severity::Minor,
                description: format!(
                    "{} to {} is uncommon in {}",
                    pair[0].symbol(key.spelling()),
                    pair[1].symbol(key.spelling()),
                    style
                ),
            });
        }
    }

    let leader = VoiceLeader::new(config.voice_leading.with_omit_fifth(true));
    match leader.voice_progression(chords, 4, &[]) {
        Ok((_, reports)) => {
            for report in reports.iter().filter(|r| r.position > 0) {
                let hard: Vec<String> = report
                    .violations
                    .iter()
                    .filter(|v| v.is_hard())
                    .map(|v| v.to_string())
                    .collect();
                if hard.is_empty() {
                    continue;
                }
                penalty += VOICE_LEADING_PENALTY;
                issues.push(ProgressionIssue {
                    kind: IssueKind::VoiceLeading,
                    position: Some(report.position - 1),
                    severity: Severity::Moderate,
                    description: hard.join("; "),
                });
            }
        }
        Err(err) => warn!(error = %err, "skipping voice-leading check"),
    }

    let has_authentic = (2..=chords.len())
        .any(|end| identify_cadence(&chords[end - 2..end], key) == CadenceType::Authentic);
    if chords.len() > 3 && !has_authentic {
        penalty += CADENCE_PENALTY;
        issues.push(ProgressionIssue {
            kind: IssueKind::MissingCadence,
            position: None,
            severity: Severity::Minor,
            description: "no authentic cadence".to_string(),
        });
    }

    let has = |kind: IssueKind| issues.iter().any(|i| i.kind == kind);
    let mut suggestions = Vec::new();
    if has(IssueKind::MissingCadence) {
        suggestions.push("Close the phrase with a V-I cadence".to_string());
    }
    if has(IssueKind::WeakProgression) {
        suggestions.push("Lean on ii-V-I or vi-IV-I-V motion".to_string());
    }
    if has(IssueKind::VoiceLeading) {
        suggestions.push("Revoice or reorder chords to avoid the flagged motion".to_string());
    }

    let score = 100u32.saturating_sub(penalty);
    debug!(key = %key, style = %style, score, issues = issues.len(), "validated progression");
    ProgressionValidation {
        score,
        issues,
        suggestions,
    }
}

/// Degree used to look up a candidate in the transition table; tritone and
/// backdoor substitutes stand in for the dominant
fn scoring_degree(numeral: &RomanNumeral, chord: &Chord, key: Key) -> u8 {
    let substitute = numeral.accidental.is_some()
        && numeral.has_seventh()
        && !numeral.is_applied()
        && matches!(numeral.degree, 2 | 7);
    if substitute {
        5
    } else {
        key.degree_of(chord.root()).degree
    }
}

fn functional_score(style: Style, history: &[u8], next: u8) -> f64 {
    let [.., last] = history else {
        return style.opening(next);
    };
    let table = style.transition(*last, next);
    let bonus = match history {
        [.., before, last] => PATTERN_BONUSES
            .iter()
            .find(|(a, b, c, _)| a == before && b == last && *c == next)
            .map_or(0.0, |(_, _, _, bonus)| *bonus),
        _ => 0.0,
    };
    table.max(bonus)
}

/// A named progression from the built-in library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonProgression {
    pub style: &'static str,
    pub name: &'static str,
    pub numerals: &'static [&'static str],
}

impl CommonProgression {
    pub fn resolve(&self, key: Key) -> Result<Vec<Chord>> {
        let numerals = self
            .numerals
            .iter()
            .map(|n| n.parse())
            .collect::<Result<Vec<RomanNumeral>>>()?;
        resolve_progression(key, &numerals)
    }
}

impl fmt::Display for CommonProgression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.style, self.numerals.join(" "))
    }
}

pub const COMMON_PROGRESSIONS: &[CommonProgression] = &[
    CommonProgression {
        style: "classical",
        name: "authentic_cadence",
        numerals: &["V", "I"],
    },
    CommonProgression {
        style: "classical",
        name: "plagal_cadence",
        numerals: &["IV", "I"],
    },
    CommonProgression {
        style: "classical",
        name: "deceptive_cadence",
        numerals: &["V", "vi"],
    },
    CommonProgression {
        style: "classical",
        name: "circle_of_fifths",
        numerals: &["vi", "ii", "V", "I"],
    },
    CommonProgression {
        style: "classical",
        name: "pachelbel",
        numerals: &["I", "V", "vi", "iii", "IV", "I", "IV", "V"],
    },
    CommonProgression {
        style: "jazz",
        name: "ii_V_I",
        numerals: &["ii7", "V7", "Imaj7"],
    },
    CommonProgression {
        style: "jazz",
        name: "ii_V_I_vi",
        numerals: &["ii7", "V7", "Imaj7", "vi7"],
    },
    CommonProgression {
        style: "jazz",
        name: "iii_vi_ii_V",
        numerals: &["iii7", "vi7", "ii7", "V7"],
    },
    CommonProgression {
        style: "jazz",
        name: "rhythm_changes_a",
        numerals: &["Imaj7", "vi7", "ii7", "V7"],
    },
    CommonProgression {
        style: "jazz",
        name: "tritone_turnaround",
        numerals: &["Imaj7", "V7/ii", "ii7", "bII7"],
    },
    CommonProgression {
        style: "pop",
        name: "vi_IV_I_V",
        numerals: &["vi", "IV", "I", "V"],
    },
    CommonProgression {
        style: "pop",
        name: "I_V_vi_IV",
        numerals: &["I", "V", "vi", "IV"],
    },
    CommonProgression {
        style: "pop",
        name: "I_vi_IV_V",
        numerals: &["I", "vi", "IV", "V"],
    },
    CommonProgression {
        style: "pop",
        name: "vi_V_IV_V",
        numerals: &["vi", "V", "IV", "V"],
    },
    CommonProgression {
        style: "blues",
        name: "twelve_bar",
        numerals: &["I7", "I7", "I7", "I7", "IV7", "IV7", "I7", "I7", "V7", "IV7", "I7", "V7"],
    },
    CommonProgression {
        style: "blues",
        name: "quick_change",
        numerals: &["I7", "IV7", "I7", "I7", "IV7", "IV7", "I7", "I7", "V7", "IV7", "I7", "V7"],
    },
    CommonProgression {
        style: "blues",
        name: "minor_blues",
        numerals: &["i7", "i7", "i7", "i7", "iv7", "iv7", "i7", "i7", "V7", "iv7", "i7", "V7"],
    },
];

/// Library entries, optionally restricted to one style
pub fn common_progressions(style: Option<&str>) -> Vec<&'static CommonProgression> {
    COMMON_PROGRESSIONS
        .iter()
        .filter(|p| style.map_or(true, |s| p.style.eq_ignore_ascii_case(s)))
        .collect()
}

/// Move every chord by the signed distance between the two key roots
pub fn transpose_progression(chords: &[Chord], from: Key, to: Key) -> Vec<Chord> {
    let semitones = to.root().value() as i32 - from.root().value() as i32;
    chords.iter().map(|c| c.transpose(semitones)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TheoryError;
    use crate::types::chord::ChordQuality;
    use crate::types::pitch::PitchClass;
    use crate::types::roman_numeral::parse_numerals;

    fn c_major() -> Key {
        Key::major(PitchClass::C)
    }

    fn chords(key: Key, numerals: &str) -> Vec<Chord> {
        resolve_progression(key, &parse_numerals(numerals).unwrap()).unwrap()
    }

    fn shape(chords: &[Chord]) -> Vec<(PitchClass, ChordQuality)> {
        chords.iter().map(|c| (c.root(), c.quality())).collect()
    }

    #[test]
    fn test_resolve_progression() {
        let resolved = chords(c_major(), "I vi IV V");
        assert_eq!(
            shape(&resolved),
            vec![
                (PitchClass::C, ChordQuality::Major),
                (PitchClass::A, ChordQuality::Minor),
                (PitchClass::F, ChordQuality::Major),
                (PitchClass::G, ChordQuality::Major),
            ]
        );
    }

    #[test]
    fn test_resolve_minor_dominant() {
        let resolved = chords(Key::minor(PitchClass::A), "i iv V7 i");
        assert_eq!(resolved[2].root(), PitchClass::E);
        assert_eq!(resolved[2].quality(), ChordQuality::Dominant7);
        assert!(resolved[2].contains(PitchClass::A_FLAT));
    }

    #[test]
    fn test_resolve_reports_bad_numeral() {
        let numerals = parse_numerals("I V/vii°").unwrap();
        assert!(matches!(
            resolve_progression(c_major(), &numerals),
            Err(TheoryError::UnresolvableNumeral(_))
        ));
    }

    #[test]
    fn test_classify_function() {
        let key = c_major();
        let functions: Vec<HarmonicFunction> = chords(key, "I vi IV V iii ii vii°")
            .iter()
            .map(|c| classify_function(c, key))
            .collect();
        use HarmonicFunction::*;
        assert_eq!(
            functions,
            vec![Tonic, Tonic, Subdominant, Dominant, Tonic, Subdominant, Dominant]
        );
        // Borrowed bVII sits in the dominant bucket
        let borrowed = chords(key, "bVII");
        assert_eq!(classify_function(&borrowed[0], key), Dominant);
    }

    #[test]
    fn test_identify_cadence() {
        let key = c_major();
        assert_eq!(identify_cadence(&chords(key, "I vi IV V"), key), CadenceType::Half);
        assert_eq!(identify_cadence(&chords(key, "ii V7 I"), key), CadenceType::Authentic);
        assert_eq!(identify_cadence(&chords(key, "V vi"), key), CadenceType::Deceptive);
        assert_eq!(identify_cadence(&chords(key, "IV I"), key), CadenceType::Plagal);
        assert_eq!(identify_cadence(&chords(key, "I vi"), key), CadenceType::None);
        assert_eq!(identify_cadence(&chords(key, "V"), key), CadenceType::None);
        assert_eq!(identify_cadence(&[], key), CadenceType::None);
    }

    #[test]
    fn test_minor_authentic_cadence() {
        let key = Key::minor(PitchClass::A);
        assert_eq!(identify_cadence(&chords(key, "V i"), key), CadenceType::Authentic);
    }

    #[test]
    fn test_suggest_after_two_five() {
        let key = c_major();
        let history = chords(key, "ii V");
        let suggestions =
            suggest_next_chord(&history, key, Style::CommonPractice, &EngineConfig::default());
        assert_eq!(suggestions.len(), 7);
        assert_eq!(suggestions[0].chord.root(), PitchClass::C);
        assert_eq!(suggestions[0].functional, 0.8);
        assert!(suggestions.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_suggest_opening_chord() {
        let key = c_major();
        let pop = suggest_next_chord(&[], key, Style::Pop, &EngineConfig::default());
        assert_eq!(pop[0].chord.root(), PitchClass::A);
        assert!(pop.iter().all(|s| s.voice_leading == 1.0));

        let classical =
            suggest_next_chord(&[], key, Style::CommonPractice, &EngineConfig::default());
        assert_eq!(classical[0].chord.root(), PitchClass::C);
    }

    #[test]
    fn test_jazz_adds_substitutions() {
        let key = c_major();
        let history = chords(key, "ii7");
        let jazz = suggest_next_chord(&history, key, Style::Jazz, &EngineConfig::default());
        let tritone = jazz
            .iter()
            .find(|s| s.chord.root() == PitchClass::C_SHARP)
            .unwrap();
        assert_eq!(tritone.chord.quality(), ChordQuality::Dominant7);
        // Scored as a dominant: ii -> V is the strongest move in the table
        assert_eq!(tritone.functional, 0.8);
        assert!(jazz.iter().any(|s| {
            s.chord.root() == PitchClass::A && s.chord.quality() == ChordQuality::Dominant7
        }));
    }

    #[test]
    fn test_suggest_after_extended_chord() {
        let key = c_major();
        // Five tones over four voices only fit once the fifth is dropped
        let history = chords(key, "V9");
        assert_eq!(history[0].pitch_classes().len(), 5);
        let suggestions =
            suggest_next_chord(&history, key, Style::CommonPractice, &EngineConfig::default());
        assert!(suggestions.iter().any(|s| s.voice_leading > 0.0));
        assert!(suggestions.iter().all(|s| s.voice_leading < 1.0));
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("jazz".parse(), Ok(Style::Jazz));
        assert_eq!("Common-Practice".parse(), Ok(Style::CommonPractice));
        assert!("polka".parse::<Style>().is_err());
    }

    #[test]
    fn test_common_progressions() {
        assert_eq!(common_progressions(None).len(), COMMON_PROGRESSIONS.len());
        assert_eq!(common_progressions(Some("Jazz")).len(), 5);
        for progression in COMMON_PROGRESSIONS {
            assert!(progression.resolve(c_major()).is_ok(), "{}", progression);
        }
        let blues = common_progressions(Some("blues"));
        let twelve = blues[0].resolve(Key::major(PitchClass::G)).unwrap();
        assert_eq!(twelve.len(), 12);
        assert_eq!(twelve[4].root(), PitchClass::C);
    }

    #[test]
    fn test_transpose_progression() {
        let from = c_major();
        let to = Key::major(PitchClass::D);
        let moved = transpose_progression(&chords(from, "I vi IV V"), from, to);
        assert_eq!(shape(&moved), shape(&chords(to, "I vi IV V")));
    }

    #[test]
    fn test_validate_clean_progression() {
        let key = c_major();
        let validation = validate_progression(
            &chords(key, "I IV V I"),
            key,
            Style::CommonPractice,
            &EngineConfig::default(),
        );
        assert_eq!(validation.score, 100, "{:?}", validation.issues);
        assert!(validation.is_valid());
        assert!(validation.suggestions.is_empty());
    }

    #[test]
    fn test_validate_flags_weak_motion_and_missing_cadence() {
        let key = c_major();
        let validation = validate_progression(
            &chords(key, "I ii iii IV"),
            key,
            Style::CommonPractice,
            &EngineConfig::default(),
        );
        assert!(validation
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::WeakProgression && i.position == Some(1)));
        assert!(validation
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::MissingCadence && i.position.is_none()));
        assert!(validation.score <= 90);
        assert!(validation.suggestions.len() >= 2);

        // Three chords are too short to need a cadence
        let short = validate_progression(
            &chords(key, "I IV I"),
            key,
            Style::CommonPractice,
            &EngineConfig::default(),
        );
        assert!(!short.issues.iter().any(|i| i.kind == IssueKind::MissingCadence));
    }

    #[test]
    fn test_validate_skips_unvoiceable_chords() {
        let key = c_major();
        let validation = validate_progression(
            &chords(key, "I V13 I"),
            key,
            Style::Jazz,
            &EngineConfig::default(),
        );
        assert!(!validation
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::VoiceLeading));
    }
}
