//! Scale construction, degree naming, interval classification and transposition

use crate::error::{Result, TheoryError};
use crate::types::key::Key;
use crate::types::pitch::{IntervalName, Pitch, PitchClass};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Recognized scale and mode types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScaleType {
    Major,
    NaturalMinor,
    HarmonicMinor,
    MelodicMinor,
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
    MajorPentatonic,
    MinorPentatonic,
    MajorBlues,
    MinorBlues,
    Altered,
    WholeTone,
    Diminished,
    HarmonicMajor,
    HungarianMinor,
    NeapolitanMajor,
    NeapolitanMinor,
}

impl ScaleType {
    pub const ALL: [ScaleType; 22] = [
        ScaleType::Major,
        ScaleType::NaturalMinor,
        ScaleType::HarmonicMinor,
        ScaleType::MelodicMinor,
        ScaleType::Ionian,
        ScaleType::Dorian,
        ScaleType::Phrygian,
        ScaleType::Lydian,
        ScaleType::Mixolydian,
        ScaleType::Aeolian,
        ScaleType::Locrian,
        ScaleType::MajorPentatonic,
        ScaleType::MinorPentatonic,
        ScaleType::MajorBlues,
        ScaleType::MinorBlues,
        ScaleType::Altered,
        ScaleType::WholeTone,
        ScaleType::Diminished,
        ScaleType::HarmonicMajor,
        ScaleType::HungarianMinor,
        ScaleType::NeapolitanMajor,
        ScaleType::NeapolitanMinor,
    ];

    /// Step pattern in semitones; always sums to one octave
    pub fn steps(self) -> &'static [u8] {
        match self {
            ScaleType::Major | ScaleType::Ionian => &[2, 2, 1, 2, 2, 2, 1],
            ScaleType::NaturalMinor | ScaleType::Aeolian => &[2, 1, 2, 2, 1, 2, 2],
            ScaleType::HarmonicMinor => &[2, 1, 2, 2, 1, 3, 1],
            ScaleType::MelodicMinor => &[2, 1, 2, 2, 2, 2, 1],
            ScaleType::Dorian => &[2, 1, 2, 2, 2, 1, 2],
            ScaleType::Phrygian => &[1, 2, 2, 2, 1, 2, 2],
            ScaleType::Lydian => &[2, 2, 2, 1, 2, 2, 1],
            ScaleType::Mixolydian => &[2, 2, 1, 2, 2, 1, 2],
            ScaleType::Locrian => &[1, 2, 2, 1, 2, 2, 2],
            ScaleType::MajorPentatonic => &[2, 2, 3, 2, 3],
            ScaleType::MinorPentatonic => &[3, 2, 2, 3, 2],
            ScaleType::MajorBlues => &[2, 1, 1, 3, 2, 3],
            ScaleType::MinorBlues => &[3, 2, 1, 1, 3, 2],
            ScaleType::Altered => &[1, 2, 1, 2, 2, 2, 2],
            ScaleType::WholeTone => &[2, 2, 2, 2, 2, 2],
            ScaleType::Diminished => &[2, 1, 2, 1, 2, 1, 2, 1],
            ScaleType::HarmonicMajor => &[2, 2, 1, 2, 1, 3, 1],
            ScaleType::HungarianMinor => &[2, 1, 3, 1, 1, 3, 1],
            ScaleType::NeapolitanMajor => &[1, 2, 2, 2, 2, 2, 1],
            ScaleType::NeapolitanMinor => &[1, 2, 2, 2, 1, 3, 1],
        }
    }

    /// Semitone offsets of each degree above the root (first is always 0)
    pub fn offsets(self) -> Vec<u8> {
        let steps = self.steps();
        let mut offsets = Vec::with_capacity(steps.len());
        let mut total = 0;
        for step in steps {
            offsets.push(total);
            total += step;
        }
        offsets
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleType::Major => "major",
            ScaleType::NaturalMinor => "natural_minor",
            ScaleType::HarmonicMinor => "harmonic_minor",
            ScaleType::MelodicMinor => "melodic_minor",
            ScaleType::Ionian => "ionian",
            ScaleType::Dorian => "dorian",
            ScaleType::Phrygian => "phrygian",
            ScaleType::Lydian => "lydian",
            ScaleType::Mixolydian => "mixolydian",
            ScaleType::Aeolian => "aeolian",
            ScaleType::Locrian => "locrian",
            ScaleType::MajorPentatonic => "major_pentatonic",
            ScaleType::MinorPentatonic => "minor_pentatonic",
            ScaleType::MajorBlues => "major_blues",
            ScaleType::MinorBlues => "minor_blues",
            ScaleType::Altered => "altered",
            ScaleType::WholeTone => "whole_tone",
            ScaleType::Diminished => "diminished",
            ScaleType::HarmonicMajor => "harmonic_major",
            ScaleType::HungarianMinor => "hungarian_minor",
            ScaleType::NeapolitanMajor => "neapolitan_major",
            ScaleType::NeapolitanMinor => "neapolitan_minor",
        }
    }
}

impl FromStr for ScaleType {
    type Err = TheoryError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        let scale_type = match normalized.as_str() {
            "major" => ScaleType::Major,
            "minor" | "natural_minor" => ScaleType::NaturalMinor,
            "harmonic_minor" => ScaleType::HarmonicMinor,
            "melodic_minor" => ScaleType::MelodicMinor,
            "ionian" => ScaleType::Ionian,
            "dorian" => ScaleType::Dorian,
            "phrygian" => ScaleType::Phrygian,
            "lydian" => ScaleType::Lydian,
            "mixolydian" => ScaleType::Mixolydian,
            "aeolian" => ScaleType::Aeolian,
            "locrian" => ScaleType::Locrian,
            "major_pentatonic" | "pentatonic" => ScaleType::MajorPentatonic,
            "minor_pentatonic" => ScaleType::MinorPentatonic,
            "major_blues" => ScaleType::MajorBlues,
            "minor_blues" | "blues" => ScaleType::MinorBlues,
            "altered" | "super_locrian" => ScaleType::Altered,
            "whole_tone" => ScaleType::WholeTone,
            "diminished" | "octatonic" => ScaleType::Diminished,
            "harmonic_major" => ScaleType::HarmonicMajor,
            "hungarian_minor" => ScaleType::HungarianMinor,
            "neapolitan_major" => ScaleType::NeapolitanMajor,
            "neapolitan_minor" => ScaleType::NeapolitanMinor,
            _ => return Err(TheoryError::InvalidScaleType(s.to_string())),
        };
        Ok(scale_type)
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name().replace('_', " "))
    }
}

/// Functional name of a scale degree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DegreeName {
    Tonic,
    Supertonic,
    Mediant,
    Subdominant,
    Dominant,
    Submediant,
    LeadingTone,
    Subtonic,
}

impl DegreeName {
    pub fn name(self) -> &'static str {
        match self {
            DegreeName::Tonic => "tonic",
            DegreeName::Supertonic => "supertonic",
            DegreeName::Mediant => "mediant",
            DegreeName::Subdominant => "subdominant",
            DegreeName::Dominant => "dominant",
            DegreeName::Submediant => "submediant",
            DegreeName::LeadingTone => "leading tone",
            DegreeName::Subtonic => "subtonic",
        }
    }

    /// Name implied by a semitone offset alone; the tritone has none
    fn from_offset(offset: u8) -> Option<DegreeName> {
        match offset {
            0 => Some(DegreeName::Tonic),
            1 | 2 => Some(DegreeName::Supertonic),
            3 | 4 => Some(DegreeName::Mediant),
            5 => Some(DegreeName::Subdominant),
            7 => Some(DegreeName::Dominant),
            8 | 9 => Some(DegreeName::Submediant),
            10 => Some(DegreeName::Subtonic),
            11 => Some(DegreeName::LeadingTone),
            _ => None,
        }
    }
}

impl fmt::Display for DegreeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Derive degree names from a scale's offsets.
///
/// Heptatonic scales are named by position, with the seventh degree a leading
/// tone only when it sits a semitone under the octave. Other sizes fall back
/// to the offset alone, and a name already claimed by an earlier degree
/// leaves the later degree unnamed.
fn degree_names_for(offsets: &[u8]) -> Vec<Option<DegreeName>> {
    if offsets.len() == 7 {
        let seventh = if offsets[6] == 11 {
            DegreeName::LeadingTone
        } else {
            DegreeName::Subtonic
        };
        return [
            DegreeName::Tonic,
            DegreeName::Supertonic,
            DegreeName::Mediant,
            DegreeName::Subdominant,
            DegreeName::Dominant,
            DegreeName::Submediant,
            seventh,
        ]
        .into_iter()
        .map(Some)
        .collect();
    }

    let mut claimed = Vec::new();
    offsets
        .iter()
        .map(|&offset| match DegreeName::from_offset(offset) {
            Some(name) if !claimed.contains(&name) => {
                claimed.push(name);
                Some(name)
            }
            _ => None,
        })
        .collect()
}

/// A scale rooted on a pitch class and realized over one or more octaves
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scale {
    root: PitchClass,
    scale_type: ScaleType,
    pitches: Vec<Pitch>,
}

impl Scale {
    /// Build a scale starting in octave 4
    pub fn build(root: PitchClass, scale_type: ScaleType, octave_span: usize) -> Self {
        Self::build_from_octave(root, scale_type, 4, octave_span)
    }

    /// Build a scale whose tonic starts in `octave`. The pitch list ends on the
    /// tonic `octave_span` octaves above the start, so consecutive pitches
    /// reproduce the step pattern exactly. A span of 0 is treated as 1.
    pub fn build_from_octave(
        root: PitchClass,
        scale_type: ScaleType,
        octave: i32,
        octave_span: usize,
    ) -> Self {
        let start = Pitch::from_parts(root, octave);
        let steps = scale_type.steps();
        let span = octave_span.max(1);

        let mut pitches = Vec::with_capacity(steps.len() * span + 1);
        let mut current = start;
        pitches.push(current);
        for _ in 0..span {
            for &step in steps {
                current = current + step as i32;
                pitches.push(current);
            }
        }

        Scale {
            root,
            scale_type,
            pitches,
        }
    }

    pub fn root(&self) -> PitchClass {
        self.root
    }

    pub fn scale_type(&self) -> ScaleType {
        self.scale_type
    }

    /// Every pitch of the realized scale, ascending, closing on the top tonic
    pub fn pitches(&self) -> &[Pitch] {
        &self.pitches
    }

    /// One octave of pitch classes in degree order
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        self.scale_type
            .offsets()
            .into_iter()
            .map(|offset| self.root + offset as i32)
            .collect()
    }

    /// Number of distinct degrees per octave
    pub fn len(&self) -> usize {
        self.scale_type.steps().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn contains(&self, pitch_class: PitchClass) -> bool {
        self.degree_of(pitch_class).is_some()
    }

    /// 1-based degree of a pitch class, if it belongs to the scale
    pub fn degree_of(&self, pitch_class: PitchClass) -> Option<usize> {
        self.pitch_classes()
            .iter()
            .position(|&pc| pc == pitch_class)
            .map(|index| index + 1)
    }

    /// Pitch class on a 1-based degree; degrees past the top wrap around
    pub fn pitch_class_at(&self, degree: usize) -> Option<PitchClass> {
        if degree == 0 {
            return None;
        }
        let classes = self.pitch_classes();
        classes.get((degree - 1) % classes.len()).copied()
    }

    /// Names for each degree of one octave, in degree order
    pub fn degree_names(&self) -> Vec<Option<DegreeName>> {
        degree_names_for(&self.scale_type.offsets())
    }

    pub fn degree_name(&self, degree: usize) -> Option<DegreeName> {
        if degree == 0 {
            return None;
        }
        self.degree_names().get(degree - 1).copied().flatten()
    }

    /// The mode starting on `degree`, when that rotation is itself a
    /// recognized scale type (e.g. degree 2 of major is dorian)
    pub fn mode(&self, degree: usize) -> Option<Scale> {
        let steps = self.scale_type.steps();
        if degree == 0 || degree > steps.len() {
            return None;
        }
        let mut rotated = steps.to_vec();
        rotated.rotate_left(degree - 1);

        let scale_type = ScaleType::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.steps() == rotated.as_slice())?;
        let root = self.pitch_class_at(degree)?;
        let octave = self.pitches.first().map(|p| p.octave()).unwrap_or(4);
        let span = (self.pitches.len().saturating_sub(1) / steps.len()).max(1);

        Some(Scale::build_from_octave(root, scale_type, octave, span))
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.pitches.iter().map(|p| p.to_string()).collect();
        write!(f, "{} {}: [{}]", self.root, self.scale_type, names.join(", "))
    }
}

/// Build a scale from a textual type name, failing on unknown names
pub fn build_scale(root: PitchClass, scale_type: &str, octave_span: usize) -> Result<Scale> {
    let scale_type: ScaleType = scale_type.parse()?;
    Ok(Scale::build(root, scale_type, octave_span))
}

/// Classify each consecutive pair of pitches
pub fn intervals_between(pitches: &[Pitch]) -> Vec<IntervalName> {
    pitches
        .windows(2)
        .map(|pair| IntervalName::from_semitones(pair[1] - pair[0]))
        .collect()
}

/// Shift pitches by the signed distance between two key roots, keeping their
/// relative octave placement
pub fn transpose(pitches: &[Pitch], from: Key, to: Key) -> Vec<Pitch> {
    let shift = to.root().value() as i32 - from.root().value() as i32;
    pitches.iter().map(|&p| p + shift).collect()
}

/// Fewest distinct pitch classes worth matching against scales
const MIN_SCALE_CLASSES: usize = 5;
/// Confidence a reading must exceed to be reported
const SCALE_MATCH_THRESHOLD: f64 = 0.6;

/// A scale that could explain a set of pitches
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleMatch {
    pub scale: Scale,
    pub confidence: f64,
    /// Input pitch classes in the scale
    pub matching: usize,
    /// Scale pitch classes absent from the input
    pub missing: usize,
    /// Input pitch classes outside the scale
    pub extra: usize,
}

impl fmt::Display for ScaleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2} ({} matching, {} missing, {} extra)",
            self.scale.root(),
            self.scale.scale_type(),
            self.confidence,
            self.matching,
            self.missing,
            self.extra
        )
    }
}

/// Scales that could explain `pitches`, most confident first.
///
/// Each input pitch class is tried as a root against every scale type.
/// A reading scores two points per matching class, loses one per missing
/// class and half per extra class, normalized by twice the scale size.
/// Fewer than five distinct classes give no readings. Ties favor a root on
/// the first pitch, then scale-table order. A type that repeats another's
/// collection on the same root (ionian, aeolian) is left out.
pub fn identify_scale(pitches: &[Pitch]) -> Vec<ScaleMatch> {
    let input: BTreeSet<PitchClass> = pitches.iter().map(|p| p.pitch_class()).collect();
    let Some(first) = pitches.first().map(|p| p.pitch_class()) else {
        return Vec::new();
    };
    if input.len() < MIN_SCALE_CLASSES {
        return Vec::new();
    }

    let mut matches: Vec<ScaleMatch> = Vec::new();
    for &root in &input {
        let mut seen: Vec<BTreeSet<PitchClass>> = Vec::new();
        for scale_type in ScaleType::ALL {
            let scale = Scale::build(root, scale_type, 1);
            let expected: BTreeSet<PitchClass> = scale.pitch_classes().into_iter().collect();
            if seen.contains(&expected) {
                continue;
            }
            let matching = input.intersection(&expected).count();
            let missing = expected.len() - matching;
            let extra = input.len() - matching;
            let score = 2.0 * matching as f64 - missing as f64 - 0.5 * extra as f64;
            let confidence = (score / (2.0 * expected.len() as f64)).clamp(0.0, 1.0);
            seen.push(expected);
            if matching >= 4 && confidence > SCALE_MATCH_THRESHOLD {
                matches.push(ScaleMatch {
                    scale,
                    confidence,
                    matching,
                    missing,
                    extra,
                });
            }
        }
    }

    // Stable, so equal keys keep root then table order
    matches.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| (b.scale.root() == first).cmp(&(a.scale.root() == first)))
    });
    debug!(
        classes = input.len(),
        found = matches.len(),
        top = ?matches.first().map(|m| m.scale.scale_type()),
        "identified scales"
    );
    matches
}

/// Pitch-class overlap between two scales
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleComparison {
    pub common: Vec<PitchClass>,
    pub only_first: Vec<PitchClass>,
    pub only_second: Vec<PitchClass>,
    /// Shared classes over the larger scale's size
    pub similarity: f64,
    /// Both draw on one pitch collection, as modes of each other do
    pub same_collection: bool,
}

pub fn compare_scales(first: &Scale, second: &Scale) -> ScaleComparison {
    let a: BTreeSet<PitchClass> = first.pitch_classes().into_iter().collect();
    let b: BTreeSet<PitchClass> = second.pitch_classes().into_iter().collect();
    let common: Vec<PitchClass> = a.intersection(&b).copied().collect();
    let larger = a.len().max(b.len()).max(1);
    ScaleComparison {
        similarity: common.len() as f64 / larger as f64,
        common,
        only_first: a.difference(&b).copied().collect(),
        only_second: b.difference(&a).copied().collect(),
        same_collection: a == b,
    }
}
