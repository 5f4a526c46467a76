//! Keys, pitch histograms and correlational key finding

use crate::config::{KeyDetectionConfig, KeyProfile};
use crate::error::{Result, TheoryError};
use crate::types::chord::{Chord, ChordQuality};
use crate::types::event::NoteEvent;
use crate::types::pitch::{Pitch, PitchClass, Spelling};
use crate::types::scale::{Scale, ScaleType};
use crate::types::time::{to_f64, Span, Time};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn other(self) -> Mode {
        match self {
            Mode::Major => Mode::Minor,
            Mode::Minor => Mode::Major,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => write!(f, "major"),
            Mode::Minor => write!(f, "minor"),
        }
    }
}

/// A tonal center: root plus major or minor mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Key {
    root: PitchClass,
    mode: Mode,
}

/// A pitch class located relative to a key: degree 1-7 plus an accidental
/// (-1 flat, +1 sharp)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleDegree {
    pub degree: u8,
    pub accidental: i8,
}

impl fmt::Display for ScaleDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accidental {
            a if a < 0 => write!(f, "b{}", self.degree),
            a if a > 0 => write!(f, "#{}", self.degree),
            _ => write!(f, "{}", self.degree),
        }
    }
}

impl Key {
    pub fn new(root: PitchClass, mode: Mode) -> Self {
        Key { root, mode }
    }

    pub fn major(root: PitchClass) -> Self {
        Key::new(root, Mode::Major)
    }

    pub fn minor(root: PitchClass) -> Self {
        Key::new(root, Mode::Minor)
    }

    pub fn root(&self) -> PitchClass {
        self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn scale_type(&self) -> ScaleType {
        match self.mode {
            Mode::Major => ScaleType::Major,
            Mode::Minor => ScaleType::NaturalMinor,
        }
    }

    /// One octave of the key's scale starting in octave 4
    pub fn scale(&self) -> Scale {
        Scale::build(self.root, self.scale_type(), 1)
    }

    /// The seven diatonic pitch classes, tonic first
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        self.scale().pitch_classes()
    }

    /// Flats for keys sharing a signature with F, Bb, Eb, Ab or Db major
    pub fn spelling(&self) -> Spelling {
        match self.relative_major_root().value() {
            1 | 3 | 5 | 8 | 10 => Spelling::Flat,
            _ => Spelling::Sharp,
        }
    }

    pub fn spell(&self, pitch_class: PitchClass) -> &'static str {
        pitch_class.name(self.spelling())
    }

    fn relative_major_root(&self) -> PitchClass {
        match self.mode {
            Mode::Major => self.root,
            Mode::Minor => self.root + 3,
        }
    }

    pub fn relative(&self) -> Key {
        match self.mode {
            Mode::Major => Key::minor(self.root - 3),
            Mode::Minor => Key::major(self.root + 3),
        }
    }

    pub fn parallel(&self) -> Key {
        Key::new(self.root, self.mode.other())
    }

    /// Same mode, a perfect fifth up
    pub fn dominant(&self) -> Key {
        Key::new(self.root + 7, self.mode)
    }

    /// Same mode, a perfect fifth down
    pub fn subdominant(&self) -> Key {
        Key::new(self.root + 5, self.mode)
    }

    /// Locate a pitch class as a scale degree.
    ///
    /// Diatonic tones map to plain degrees; in minor the raised sixth and
    /// seventh do too. Anything else is named as an altered degree.
    pub fn degree_of(&self, pitch_class: PitchClass) -> ScaleDegree {
        let offset = self.root.interval_to(pitch_class);
        let plain = |degree: u8| ScaleDegree {
            degree,
            accidental: 0,
        };

        if let Some(degree) = self.scale().degree_of(pitch_class) {
            return plain(degree as u8);
        }

        match (self.mode, offset) {
            (Mode::Minor, 9) => plain(6),
            (Mode::Minor, 11) => plain(7),
            (Mode::Minor, 4) => ScaleDegree {
                degree: 3,
                accidental: 1,
            },
            (_, 1) => ScaleDegree {
                degree: 2,
                accidental: -1,
            },
            (_, 3) => ScaleDegree {
                degree: 3,
                accidental: -1,
            },
            (_, 6) => ScaleDegree {
                degree: 4,
                accidental: 1,
            },
            (_, 8) => ScaleDegree {
                degree: 6,
                accidental: -1,
            },
            (_, 10) => ScaleDegree {
                degree: 7,
                accidental: -1,
            },
            // Unreachable for a seven-note scale; keep a total mapping anyway
            _ => plain(1),
        }
    }

    /// Triads stacked in thirds on each degree of the key's scale
    pub fn diatonic_triads(&self) -> Vec<Chord> {
        self.stacked_chords(&[2, 4])
    }

    /// Seventh chords stacked in thirds on each degree of the key's scale
    pub fn diatonic_sevenths(&self) -> Vec<Chord> {
        self.stacked_chords(&[2, 4, 6])
    }

    fn stacked_chords(&self, steps: &[usize]) -> Vec<Chord> {
        let classes = self.pitch_classes();
        (0..classes.len())
            .filter_map(|i| {
                let root = classes[i];
                let shape: Vec<u8> = steps
                    .iter()
                    .map(|&step| root.interval_to(classes[(i + step) % classes.len()]))
                    .collect();
                let quality = quality_for_shape(&shape)?;
                Some(Chord::root_position(root, quality))
            })
            .collect()
    }

    /// Circle-of-fifths distance between key signatures (0-6)
    pub fn fifths_distance(&self, other: &Key) -> u8 {
        let position = |key: &Key| {
            (key.relative_major_root().value() as i32 * 7).rem_euclid(12)
        };
        let diff = (position(self) - position(other)).rem_euclid(12);
        diff.min(12 - diff) as u8
    }

    pub fn relationship(&self, other: &Key) -> KeyRelationship {
        if self == other {
            KeyRelationship::Same
        } else if *other == self.relative() {
            KeyRelationship::Relative
        } else if *other == self.parallel() {
            KeyRelationship::Parallel
        } else if self.fifths_distance(other) == 1 {
            KeyRelationship::CloselyRelated
        } else if self.mode == other.mode
            && matches!(self.root.interval_to(other.root), 3 | 4 | 8 | 9)
        {
            KeyRelationship::ChromaticMediant
        } else {
            KeyRelationship::Distant
        }
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.spell(self.root), self.mode)
    }

    pub fn signature(&self) -> KeySignature {
        let position = (self.relative_major_root().value() as i8 * 7).rem_euclid(12);
        KeySignature {
            accidentals: if position > 6 { position - 12 } else { position },
        }
    }
}

const SHARP_ORDER: [&str; 7] = ["F#", "C#", "G#", "D#", "A#", "E#", "B#"];
const FLAT_ORDER: [&str; 7] = ["Bb", "Eb", "Ab", "Db", "Gb", "Cb", "Fb"];

/// Key signature as a signed accidental count: sharps positive, flats
/// negative. F# major takes six sharps rather than Gb's six flats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeySignature {
    accidentals: i8,
}

impl KeySignature {
    pub fn accidentals(self) -> i8 {
        self.accidentals
    }

    pub fn sharps(self) -> u8 {
        self.accidentals.max(0) as u8
    }

    pub fn flats(self) -> u8 {
        (-self.accidentals).max(0) as u8
    }

    /// Altered notes in the order they are written
    pub fn notes(self) -> &'static [&'static str] {
        if self.accidentals >= 0 {
            &SHARP_ORDER[..self.sharps() as usize]
        } else {
            &FLAT_ORDER[..self.flats() as usize]
        }
    }

    /// Clockwise steps from C major on the circle of fifths (0-11)
    pub fn circle_position(self) -> u8 {
        self.accidentals.rem_euclid(12) as u8
    }
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (count, word) = match self.accidentals {
            0 => return write!(f, "no sharps or flats"),
            n if n > 0 => (self.sharps(), "sharp"),
            _ => (self.flats(), "flat"),
        };
        let plural = if count == 1 { "" } else { "s" };
        write!(f, "{} {}{} ({})", count, word, plural, self.notes().join(", "))
    }
}

fn quality_for_shape(shape: &[u8]) -> Option<ChordQuality> {
    let quality = match shape {
        [4, 7] => ChordQuality::Major,
        [3, 7] => ChordQuality::Minor,
        [3, 6] => ChordQuality::Diminished,
        [4, 8] => ChordQuality::Augmented,
        [4, 7, 11] => ChordQuality::Major7,
        [3, 7, 10] => ChordQuality::Minor7,
        [4, 7, 10] => ChordQuality::Dominant7,
        [3, 6, 10] => ChordQuality::HalfDiminished7,
        [3, 6, 9] => ChordQuality::Diminished7,
        [3, 7, 11] => ChordQuality::MinorMajor7,
        [4, 8, 10] => ChordQuality::Augmented7,
        _ => return None,
    };
    Some(quality)
}

impl FromStr for Key {
    type Err = TheoryError;

    /// Accepts "C", "F# major", "Bb minor", "Am", "Ebmin" and lowercase
    /// tonics for minor keys ("a", "f#")
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || TheoryError::InvalidKey(s.to_string());
        let mut parts = trimmed.split_whitespace();
        let tonic = parts.next().ok_or_else(invalid)?;
        let mode_word = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        if let Some(word) = mode_word {
            let mode = match word.to_lowercase().as_str() {
                "major" | "maj" => Mode::Major,
                "minor" | "min" | "m" => Mode::Minor,
                _ => return Err(invalid()),
            };
            let root: PitchClass = tonic.parse().map_err(|_| invalid())?;
            return Ok(Key::new(root, mode));
        }

        let (root_str, mode) = if let Some(root) = tonic.strip_suffix("min") {
            (root, Mode::Minor)
        } else if let Some(root) = tonic.strip_suffix("maj") {
            (root, Mode::Major)
        } else if tonic.len() > 1 && tonic.ends_with('m') {
            (&tonic[..tonic.len() - 1], Mode::Minor)
        } else if tonic.starts_with(|c: char| c.is_ascii_lowercase()) {
            (tonic, Mode::Minor)
        } else {
            (tonic, Mode::Major)
        };

        let root: PitchClass = root_str.parse().map_err(|_| invalid())?;
        Ok(Key::new(root, mode))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How two keys relate, from nearest to most remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyRelationship {
    Same,
    Relative,
    Parallel,
    /// One step apart on the circle of fifths
    CloselyRelated,
    /// Same mode, roots a third apart
    ChromaticMediant,
    Distant,
}

impl fmt::Display for KeyRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyRelationship::Same => "same key",
            KeyRelationship::Relative => "relative",
            KeyRelationship::Parallel => "parallel",
            KeyRelationship::CloselyRelated => "closely related",
            KeyRelationship::ChromaticMediant => "chromatic mediant",
            KeyRelationship::Distant => "distant",
        };
        write!(f, "{}", name)
    }
}

/// Keys one step away: the relative, the keys a fifth up and down with
/// their own relatives, then the parallel. The first five are the keys whose
/// signatures differ by at most one accidental.
pub fn closely_related_keys(key: Key) -> Vec<Key> {
    let dominant = key.dominant();
    let subdominant = key.subdominant();
    vec![
        key.relative(),
        dominant,
        dominant.relative(),
        subdominant,
        subdominant.relative(),
        key.parallel(),
    ]
}

/// Diatonic triads common to both keys, in the order they occur in `from`
pub fn pivot_chords(from: Key, to: Key) -> Vec<Chord> {
    let targets = to.diatonic_triads();
    from.diatonic_triads()
        .into_iter()
        .filter(|chord| {
            targets
                .iter()
                .any(|t| t.root() == chord.root() && t.quality() == chord.quality())
        })
        .collect()
}

/// Weight per pitch class, from note counts or sounding durations
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchHistogram {
    weights: [f64; 12],
}

impl PitchHistogram {
    pub fn new(weights: [f64; 12]) -> Self {
        PitchHistogram { weights }
    }

    pub fn from_weights(weights: impl IntoIterator<Item = (PitchClass, f64)>) -> Self {
        let mut histogram = PitchHistogram::default();
        for (pc, weight) in weights {
            histogram.add(pc, weight);
        }
        histogram
    }

    /// One unit of weight per occurrence
    pub fn from_pitches(pitches: &[Pitch]) -> Self {
        Self::from_weights(pitches.iter().map(|p| (p.pitch_class(), 1.0)))
    }

    /// Weight each event by how long it sounds
    pub fn from_events(events: &[NoteEvent]) -> Self {
        Self::from_weights(
            events
                .iter()
                .map(|e| (e.pitch.pitch_class(), to_f64(e.duration))),
        )
    }

    /// Slice events into one histogram per window. Window `i` covers
    /// `[boundaries[i], boundaries[i + 1])`; the last window runs until the
    /// latest event ends. Events straddling a boundary contribute only the
    /// overlapping part of their duration.
    pub fn windows(events: &[NoteEvent], boundaries: &[Time]) -> Vec<PitchHistogram> {
        let Some(&last_start) = boundaries.last() else {
            return Vec::new();
        };
        let end = events
            .iter()
            .map(|e| e.end())
            .max()
            .unwrap_or(last_start)
            .max(last_start);

        boundaries
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let stop = boundaries.get(i + 1).copied().unwrap_or(end);
                let window = Span::new(start, stop);
                Self::from_weights(
                    events
                        .iter()
                        .filter(|e| window.overlaps(&e.span()))
                        .map(|e| (e.pitch.pitch_class(), to_f64(window.overlap(&e.span())))),
                )
            })
            .collect()
    }

    pub fn add(&mut self, pitch_class: PitchClass, weight: f64) {
        self.weights[pitch_class.value() as usize] += weight;
    }

    pub fn weight(&self, pitch_class: PitchClass) -> f64 {
        self.weights[pitch_class.value() as usize]
    }

    pub fn weights(&self) -> &[f64; 12] {
        &self.weights
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        !(self.total() > 0.0)
    }
}

/// A key with the confidence that it is the tonal center
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyCandidate {
    pub key: Key,
    /// Correlation mapped from [-1, 1] onto [0, 1]
    pub confidence: f64,
    /// Raw Pearson correlation against the rotated profile
    pub correlation: f64,
}

impl fmt::Display for KeyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3})", self.key, self.confidence)
    }
}

/// Rank all 24 major and minor keys against a pitch histogram.
///
/// Each key's profile is rotated to its root and correlated with the
/// histogram. The full ranking is returned, strongest first; equal scores
/// keep chromatic order with major before minor.
pub fn detect_key(
    histogram: &PitchHistogram,
    config: &KeyDetectionConfig,
) -> Result<Vec<KeyCandidate>> {
    if histogram.is_empty() {
        return Err(TheoryError::EmptyPitchInput);
    }

    let mut candidates = Vec::with_capacity(24);
    for root in PitchClass::all() {
        for mode in [Mode::Major, Mode::Minor] {
            let key = Key::new(root, mode);
            let profile = rotated_profile(config.profile, key);
            let correlation = pearson(histogram.weights(), &profile);
            candidates.push(KeyCandidate {
                key,
                confidence: ((correlation + 1.0) / 2.0).clamp(0.0, 1.0),
                correlation,
            });
        }
    }

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    debug!(
        key = %candidates[0].key,
        confidence = candidates[0].confidence,
        ties = leading_ties(&candidates, config.tie_epsilon).len(),
        "detected key"
    );
    Ok(candidates)
}

/// The top candidate plus everything within `epsilon` of it
pub fn leading_ties(candidates: &[KeyCandidate], epsilon: f64) -> &[KeyCandidate] {
    let Some(top) = candidates.first() else {
        return candidates;
    };
    let count = candidates
        .iter()
        .take_while(|c| top.confidence - c.confidence <= epsilon)
        .count();
    &candidates[..count]
}

fn rotated_profile(profile: KeyProfile, key: Key) -> [f64; 12] {
    let weights = match key.mode {
        Mode::Major => profile.major(),
        Mode::Minor => profile.minor(),
    };
    let mut rotated = [0.0; 12];
    for (pc, slot) in rotated.iter_mut().enumerate() {
        let degree = (pc as i32 - key.root.value() as i32).rem_euclid(12) as usize;
        *slot = weights[degree];
    }
    rotated
}

/// Pearson correlation; zero when either series is constant
fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let mean_x = x.iter().sum::<f64>() / 12.0;
    let mean_y = y.iter().sum::<f64>() / 12.0;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        covariance / denominator
    }
}

/// A change of tonal center detected between analysis windows
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModulationEvent {
    /// Start of the window where the new key takes over
    pub at: Time,
    pub from: Key,
    pub to: KeyCandidate,
    pub relationship: KeyRelationship,
}

/// Track the key across consecutive windows.
///
/// The first non-empty window establishes the key. Later windows report a
/// modulation when their top key differs from the current one and its
/// confidence exceeds the configured threshold; weaker changes are ignored.
/// Empty windows are skipped.
pub fn analyze_modulations(
    windows: &[PitchHistogram],
    boundaries: &[Time],
    config: &KeyDetectionConfig,
) -> Result<Vec<ModulationEvent>> {
    if windows.len() != boundaries.len() {
        return Err(TheoryError::WindowBoundaryMismatch {
            windows: windows.len(),
            boundaries: boundaries.len(),
        });
    }

    let mut current: Option<Key> = None;
    let mut events = Vec::new();
    for (window, &at) in windows.iter().zip(boundaries) {
        if window.is_empty() {
            trace!(at = %at, "skipping empty window");
            continue;
        }
        let candidates = detect_key(window, config)?;
        let top = candidates[0];

        match current {
            None => current = Some(top.key),
            Some(from) if from != top.key && top.confidence > config.modulation_threshold => {
                debug!(at = %at, from = %from, to = %top.key, "modulation");
                events.push(ModulationEvent {
                    at,
                    from,
                    to: top,
                    relationship: from.relationship(&top.key),
                });
                current = Some(top.key);
            }
            Some(_) => {}
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::time::beats;

    fn c_major_histogram() -> PitchHistogram {
        PitchHistogram::from_weights([0u8, 2, 4, 5, 7, 9, 11].map(|pc| {
            (PitchClass::wrapping(pc as i32), 1.0)
        }))
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!("C".parse::<Key>().unwrap(), Key::major(PitchClass::C));
        assert_eq!("Am".parse::<Key>().unwrap(), Key::minor(PitchClass::A));
        assert_eq!(
            "F# minor".parse::<Key>().unwrap(),
            Key::minor(PitchClass::F_SHARP)
        );
        assert_eq!("Bb".parse::<Key>().unwrap(), Key::major(PitchClass::B_FLAT));
        assert_eq!("bb".parse::<Key>().unwrap(), Key::minor(PitchClass::B_FLAT));
        assert_eq!(
            "Ebmin".parse::<Key>().unwrap(),
            Key::minor(PitchClass::E_FLAT)
        );
        assert!("H major".parse::<Key>().is_err());
        assert!("C dorian".parse::<Key>().is_err());
        assert!("".parse::<Key>().is_err());
    }

    #[test]
    fn test_spelling_follows_signature() {
        assert_eq!(Key::major(PitchClass::F).spelling(), Spelling::Flat);
        assert_eq!(Key::major(PitchClass::C_SHARP).spelling(), Spelling::Flat);
        assert_eq!(Key::minor(PitchClass::D).spelling(), Spelling::Flat);
        assert_eq!(Key::major(PitchClass::E).spelling(), Spelling::Sharp);
        assert_eq!(Key::minor(PitchClass::E).spelling(), Spelling::Sharp);
        assert_eq!(Key::major(PitchClass::A_FLAT).name(), "Ab major");
    }

    #[test]
    fn test_key_signatures() {
        let c = Key::major(PitchClass::C).signature();
        assert_eq!(c.accidentals(), 0);
        assert!(c.notes().is_empty());
        assert_eq!(c.to_string(), "no sharps or flats");

        let g = Key::major(PitchClass::G).signature();
        assert_eq!(g.notes(), ["F#"]);
        assert_eq!(g.to_string(), "1 sharp (F#)");

        let d_minor = Key::minor(PitchClass::D).signature();
        assert_eq!(d_minor.flats(), 1);
        assert_eq!(d_minor.circle_position(), 11);

        let c_minor: Key = "Cm".parse().unwrap();
        assert_eq!(c_minor.signature().to_string(), "3 flats (Bb, Eb, Ab)");
        assert_eq!(Key::major(PitchClass::A_FLAT).signature().flats(), 4);
        assert_eq!(Key::major(PitchClass::B).signature().sharps(), 5);
        assert_eq!(Key::major(PitchClass::F_SHARP).signature().notes().last(), Some(&"E#"));
        // Relative keys share a signature
        let e_minor = Key::minor(PitchClass::E);
        assert_eq!(e_minor.signature(), e_minor.relative().signature());
    }

    #[test]
    fn test_related_keys() {
        let c = Key::major(PitchClass::C);
        assert_eq!(
            closely_related_keys(c),
            vec![
                Key::minor(PitchClass::A),
                Key::major(PitchClass::G),
                Key::minor(PitchClass::E),
                Key::major(PitchClass::F),
                Key::minor(PitchClass::D),
                Key::minor(PitchClass::C),
            ]
        );
        assert_eq!(
            closely_related_keys(Key::minor(PitchClass::A)),
            vec![
                Key::major(PitchClass::C),
                Key::minor(PitchClass::E),
                Key::major(PitchClass::G),
                Key::minor(PitchClass::D),
                Key::major(PitchClass::F),
                Key::major(PitchClass::A),
            ]
        );
        // Everything but the parallel sits one accidental away
        for related in &closely_related_keys(c)[..5] {
            assert!(c.fifths_distance(related) <= 1, "{}", related);
        }
        assert_eq!(c.relationship(&Key::minor(PitchClass::A)), KeyRelationship::Relative);
        assert_eq!(c.relationship(&Key::minor(PitchClass::C)), KeyRelationship::Parallel);
        assert_eq!(
            c.relationship(&Key::minor(PitchClass::E)),
            KeyRelationship::CloselyRelated
        );
        assert_eq!(
            c.relationship(&Key::major(PitchClass::A_FLAT)),
            KeyRelationship::ChromaticMediant
        );
        assert_eq!(
            c.relationship(&Key::major(PitchClass::F_SHARP)),
            KeyRelationship::Distant
        );
        assert_eq!(c.fifths_distance(&Key::major(PitchClass::F_SHARP)), 6);
    }

    #[test]
    fn test_degrees() {
        let c = Key::major(PitchClass::C);
        assert_eq!(c.degree_of(PitchClass::G).to_string(), "5");
        assert_eq!(c.degree_of(PitchClass::A_FLAT).to_string(), "b6");
        assert_eq!(c.degree_of(PitchClass::F_SHARP).to_string(), "#4");

        let a = Key::minor(PitchClass::A);
        assert_eq!(a.degree_of(PitchClass::A_FLAT).to_string(), "7");
        assert_eq!(a.degree_of(PitchClass::G).to_string(), "7");
        assert_eq!(a.degree_of(PitchClass::C).to_string(), "3");
    }

    #[test]
    fn test_diatonic_triads() {
        let qualities: Vec<ChordQuality> = Key::major(PitchClass::C)
            .diatonic_triads()
            .iter()
            .map(|c| c.quality())
            .collect();
        assert_eq!(
            qualities,
            vec![
                ChordQuality::Major,
                ChordQuality::Minor,
                ChordQuality::Minor,
                ChordQuality::Major,
                ChordQuality::Major,
                ChordQuality::Minor,
                ChordQuality::Diminished,
            ]
        );
        let sevenths = Key::major(PitchClass::C).diatonic_sevenths();
        assert_eq!(sevenths[4].quality(), ChordQuality::Dominant7);
        assert_eq!(sevenths[6].quality(), ChordQuality::HalfDiminished7);
    }

    #[test]
    fn test_pivot_chords() {
        let pivots = pivot_chords(Key::major(PitchClass::C), Key::major(PitchClass::G));
        let symbols: Vec<String> = pivots.iter().map(|c| c.symbol(Spelling::Sharp)).collect();
        assert_eq!(symbols, vec!["C", "Em", "G", "Am"]);
    }

    #[test]
    fn test_detect_c_major() {
        let candidates = detect_key(&c_major_histogram(), &KeyDetectionConfig::default()).unwrap();
        assert_eq!(candidates.len(), 24);
        assert_eq!(candidates[0].key, Key::major(PitchClass::C));
        assert!(candidates[..3]
            .iter()
            .any(|c| c.key == Key::minor(PitchClass::A)));
        assert!(candidates.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!(candidates
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.confidence)));
    }

    #[test]
    fn test_detect_with_temperley_profile() {
        let config = KeyDetectionConfig::default().with_profile(KeyProfile::Temperley);
        let candidates = detect_key(&c_major_histogram(), &config).unwrap();
        assert_eq!(candidates[0].key, Key::major(PitchClass::C));
    }

    #[test]
    fn test_empty_histogram_is_an_error() {
        let result = detect_key(&PitchHistogram::default(), &KeyDetectionConfig::default());
        assert_eq!(result, Err(TheoryError::EmptyPitchInput));
    }

    #[test]
    fn test_flat_histogram_ties_everything() {
        let histogram = PitchHistogram::new([1.0; 12]);
        let candidates = detect_key(&histogram, &KeyDetectionConfig::default()).unwrap();
        assert_eq!(leading_ties(&candidates, 0.01).len(), 24);
        assert_eq!(candidates[0].confidence, 0.5);
    }

    #[test]
    fn test_windows_split_events() {
        let events = vec![
            NoteEvent::new(Pitch::new(60), beats(0), beats(2), 100),
            NoteEvent::new(Pitch::new(67), beats(1), beats(4), 100),
        ];
        let windows = PitchHistogram::windows(&events, &[beats(0), beats(2)]);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].weight(PitchClass::C), 2.0);
        assert_eq!(windows[0].weight(PitchClass::G), 1.0);
        assert_eq!(windows[1].weight(PitchClass::C), 0.0);
        assert_eq!(windows[1].weight(PitchClass::G), 3.0);
    }

    #[test]
    fn test_modulation_tracking() {
        let c = c_major_histogram();
        let g = PitchHistogram::from_weights([7u8, 9, 11, 0, 2, 4, 6].map(|pc| {
            (PitchClass::wrapping(pc as i32), 1.0)
        }));
        let windows = vec![c, PitchHistogram::default(), c, g];
        let boundaries = vec![beats(0), beats(4), beats(8), beats(12)];
        let events =
            analyze_modulations(&windows, &boundaries, &KeyDetectionConfig::default()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].at, beats(12));
        assert_eq!(events[0].from, Key::major(PitchClass::C));
        assert_eq!(events[0].to.key, Key::major(PitchClass::G));
        assert_eq!(events[0].relationship, KeyRelationship::CloselyRelated);

        let strict = KeyDetectionConfig::default().with_modulation_threshold(0.99);
        assert!(analyze_modulations(&windows, &boundaries, &strict)
            .unwrap()
            .is_empty());

        assert_eq!(
            analyze_modulations(&windows, &boundaries[..2], &KeyDetectionConfig::default()),
            Err(TheoryError::WindowBoundaryMismatch {
                windows: 4,
                boundaries: 2
            })
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_modulation_events_serialize() {
        let c = c_major_histogram();
        let g = PitchHistogram::from_weights([7u8, 9, 11, 0, 2, 4, 6].map(|pc| {
            (PitchClass::wrapping(pc as i32), 1.0)
        }));
        let events = analyze_modulations(
            &[c, g],
            &[beats(0), beats(4)],
            &KeyDetectionConfig::default(),
        )
        .unwrap();
        let json = serde_json::to_string(&events).unwrap();
        let back: Vec<ModulationEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].to.key, events[0].to.key);
        assert_eq!(back[0].at, events[0].at);
        assert_eq!(back[0].relationship, KeyRelationship::CloselyRelated);
    }
}
