use crate::error::{Result, TheoryError};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A chromatic pitch class (0-11)
/// 0=C, 1=C#/Db, 2=D, 3=D#/Eb, 4=E, 5=F, 6=F#/Gb, 7=G, 8=G#/Ab, 9=A, 10=A#/Bb, 11=B
///
/// Spelling is not stored here: it is a presentation-time choice made from the
/// active key (see `Key::spelling`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchClass(u8);

/// Accidental preference used when rendering a black-key pitch class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Spelling {
    #[default]
    Sharp,
    Flat,
}

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

impl PitchClass {
    pub const C: PitchClass = PitchClass(0);
    pub const C_SHARP: PitchClass = PitchClass(1);
    pub const D: PitchClass = PitchClass(2);
    pub const E_FLAT: PitchClass = PitchClass(3);
    pub const E: PitchClass = PitchClass(4);
    pub const F: PitchClass = PitchClass(5);
    pub const F_SHARP: PitchClass = PitchClass(6);
    pub const G: PitchClass = PitchClass(7);
    pub const A_FLAT: PitchClass = PitchClass(8);
    pub const A: PitchClass = PitchClass(9);
    pub const B_FLAT: PitchClass = PitchClass(10);
    pub const B: PitchClass = PitchClass(11);

    /// Create a pitch class from its chromatic index (0-11)
    pub fn new(value: u8) -> Result<Self> {
        if value > 11 {
            return Err(TheoryError::InvalidPitchClass(value));
        }
        Ok(PitchClass(value))
    }

    /// Reduce any semitone count to its pitch class (negative values wrap)
    pub fn wrapping(semitones: i32) -> Self {
        PitchClass(semitones.rem_euclid(12) as u8)
    }

    /// All twelve pitch classes in chromatic order from C
    pub fn all() -> impl Iterator<Item = PitchClass> {
        (0..12).map(PitchClass)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn transpose(self, semitones: i32) -> Self {
        Self::wrapping(self.0 as i32 + semitones)
    }

    /// Ascending distance to `other` in semitones (0-11)
    pub fn interval_to(self, other: PitchClass) -> u8 {
        (other.0 as i32 - self.0 as i32).rem_euclid(12) as u8
    }

    /// Check if this pitch class is a white key
    pub fn is_natural(self) -> bool {
        matches!(self.0, 0 | 2 | 4 | 5 | 7 | 9 | 11)
    }

    /// Note name under the given accidental preference
    pub fn name(self, spelling: Spelling) -> &'static str {
        match spelling {
            Spelling::Sharp => SHARP_NAMES[self.0 as usize],
            Spelling::Flat => FLAT_NAMES[self.0 as usize],
        }
    }
}

impl FromStr for PitchClass {
    type Err = TheoryError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars
            .next()
            .ok_or_else(|| TheoryError::InvalidNoteName(s.to_string()))?;

        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(TheoryError::InvalidNoteName(s.to_string())),
        };

        let mut offset = 0;
        for c in chars {
            match c {
                '#' | '♯' => offset += 1,
                'b' | '♭' => offset -= 1,
                _ => return Err(TheoryError::InvalidNoteName(s.to_string())),
            }
        }

        Ok(Self::wrapping(base + offset))
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name(Spelling::Sharp))
    }
}

impl Add<i32> for PitchClass {
    type Output = PitchClass;

    fn add(self, semitones: i32) -> Self::Output {
        self.transpose(semitones)
    }
}

impl Sub<i32> for PitchClass {
    type Output = PitchClass;

    fn sub(self, semitones: i32) -> Self::Output {
        self.transpose(-semitones)
    }
}

/// An absolute pitch as a MIDI-style semitone number (60 = C4)
///
/// The engines do not clamp to 0-127; adapters at the MIDI boundary do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pitch(i32);

impl Pitch {
    pub const fn new(midi: i32) -> Self {
        Pitch(midi)
    }

    /// Build a pitch from a pitch class and scientific octave (C4 = 60)
    pub fn from_parts(pitch_class: PitchClass, octave: i32) -> Self {
        Pitch((octave + 1) * 12 + pitch_class.value() as i32)
    }

    pub fn midi(self) -> i32 {
        self.0
    }

    pub fn pitch_class(self) -> PitchClass {
        PitchClass::wrapping(self.0)
    }

    pub fn octave(self) -> i32 {
        self.0.div_euclid(12) - 1
    }

    pub fn transpose(self, semitones: i32) -> Self {
        Pitch(self.0 + semitones)
    }

    /// Signed distance in semitones from `self` up to `other`
    pub fn semitones_to(self, other: Pitch) -> i32 {
        other.0 - self.0
    }

    /// Nearest pitch of `pitch_class` at or above this pitch
    pub fn next_at_or_above(self, pitch_class: PitchClass) -> Pitch {
        Pitch(self.0 + self.pitch_class().interval_to(pitch_class) as i32)
    }

    /// Nearest pitch of `pitch_class` at or below this pitch
    pub fn next_at_or_below(self, pitch_class: PitchClass) -> Pitch {
        Pitch(self.0 - pitch_class.interval_to(self.pitch_class()) as i32)
    }

    /// Render with an explicit accidental preference, e.g. "Bb3"
    pub fn spelled(self, spelling: Spelling) -> String {
        format!("{}{}", self.pitch_class().name(spelling), self.octave())
    }
}

impl FromStr for Pitch {
    type Err = TheoryError;

    /// Parse scientific pitch notation: "C4", "Bb3", "G-1".
    /// A bare note name defaults to octave 4.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_ascii_digit() || *c == '-')
            .map(|(i, _)| i)
            .unwrap_or(s.len());

        let (note_part, octave_part) = s.split_at(split);
        let pitch_class: PitchClass = note_part.parse()?;

        let octave = if octave_part.is_empty() {
            4
        } else {
            octave_part
                .parse::<i32>()
                .map_err(|_| TheoryError::InvalidNoteName(s.to_string()))?
        };

        Ok(Pitch::from_parts(pitch_class, octave))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelled(Spelling::Sharp))
    }
}

impl Add<i32> for Pitch {
    type Output = Pitch;

    fn add(self, semitones: i32) -> Self::Output {
        self.transpose(semitones)
    }
}

impl Sub<i32> for Pitch {
    type Output = Pitch;

    fn sub(self, semitones: i32) -> Self::Output {
        self.transpose(-semitones)
    }
}

// Signed interval between two pitches
impl Sub<Pitch> for Pitch {
    type Output = i32;

    fn sub(self, other: Pitch) -> Self::Output {
        self.0 - other.0
    }
}

/// Simple (within-octave) interval classes keyed by semitone distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimpleInterval {
    Unison,
    MinorSecond,
    MajorSecond,
    MinorThird,
    MajorThird,
    PerfectFourth,
    Tritone,
    PerfectFifth,
    MinorSixth,
    MajorSixth,
    MinorSeventh,
    MajorSeventh,
    Octave,
}

const INTERVAL_TABLE: [SimpleInterval; 12] = [
    SimpleInterval::Unison,
    SimpleInterval::MinorSecond,
    SimpleInterval::MajorSecond,
    SimpleInterval::MinorThird,
    SimpleInterval::MajorThird,
    SimpleInterval::PerfectFourth,
    SimpleInterval::Tritone,
    SimpleInterval::PerfectFifth,
    SimpleInterval::MinorSixth,
    SimpleInterval::MajorSixth,
    SimpleInterval::MinorSeventh,
    SimpleInterval::MajorSeventh,
];

impl SimpleInterval {
    pub fn is_perfect(self) -> bool {
        matches!(
            self,
            SimpleInterval::Unison
                | SimpleInterval::PerfectFourth
                | SimpleInterval::PerfectFifth
                | SimpleInterval::Octave
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SimpleInterval::Unison => "unison",
            SimpleInterval::MinorSecond => "minor 2nd",
            SimpleInterval::MajorSecond => "major 2nd",
            SimpleInterval::MinorThird => "minor 3rd",
            SimpleInterval::MajorThird => "major 3rd",
            SimpleInterval::PerfectFourth => "perfect 4th",
            SimpleInterval::Tritone => "tritone",
            SimpleInterval::PerfectFifth => "perfect 5th",
            SimpleInterval::MinorSixth => "minor 6th",
            SimpleInterval::MajorSixth => "major 6th",
            SimpleInterval::MinorSeventh => "minor 7th",
            SimpleInterval::MajorSeventh => "major 7th",
            SimpleInterval::Octave => "octave",
        }
    }

    /// Diatonic number (unison = 1, octave = 8); `None` for the tritone
    fn number(self) -> Option<u32> {
        match self {
            SimpleInterval::Unison => Some(1),
            SimpleInterval::MinorSecond | SimpleInterval::MajorSecond => Some(2),
            SimpleInterval::MinorThird | SimpleInterval::MajorThird => Some(3),
            SimpleInterval::PerfectFourth => Some(4),
            SimpleInterval::Tritone => None,
            SimpleInterval::PerfectFifth => Some(5),
            SimpleInterval::MinorSixth | SimpleInterval::MajorSixth => Some(6),
            SimpleInterval::MinorSeventh | SimpleInterval::MajorSeventh => Some(7),
            SimpleInterval::Octave => Some(8),
        }
    }

    fn quality(self) -> &'static str {
        match self {
            SimpleInterval::MinorSecond
            | SimpleInterval::MinorThird
            | SimpleInterval::MinorSixth
            | SimpleInterval::MinorSeventh => "minor",
            SimpleInterval::MajorSecond
            | SimpleInterval::MajorThird
            | SimpleInterval::MajorSixth
            | SimpleInterval::MajorSeventh => "major",
            _ => "perfect",
        }
    }
}

impl fmt::Display for SimpleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A named interval: its simple class plus the whole octaves it spans
/// beyond that class. A major 10th is a major 3rd with one extra octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalName {
    simple: SimpleInterval,
    octaves: u32,
}

impl IntervalName {
    pub const fn new(simple: SimpleInterval, octaves: u32) -> Self {
        IntervalName { simple, octaves }
    }

    /// Classify a raw semitone distance. Direction is ignored. A non-zero
    /// multiple of 12 is an octave rather than a unison, so 24 semitones is
    /// an octave with one extra octave (a 15th).
    pub fn from_semitones(semitones: i32) -> Self {
        let distance = semitones.unsigned_abs();
        if distance != 0 && distance % 12 == 0 {
            IntervalName::new(SimpleInterval::Octave, distance / 12 - 1)
        } else {
            IntervalName::new(INTERVAL_TABLE[(distance % 12) as usize], distance / 12)
        }
    }

    pub fn simple(self) -> SimpleInterval {
        self.simple
    }

    /// Extra octaves beyond the simple interval
    pub fn compound(self) -> u32 {
        self.octaves
    }

    pub fn is_compound(self) -> bool {
        self.octaves > 0
    }

    pub fn is_perfect(self) -> bool {
        self.simple.is_perfect()
    }

    pub fn semitones(self) -> u32 {
        let base = INTERVAL_TABLE
            .iter()
            .position(|&i| i == self.simple)
            .unwrap_or(12) as u32;
        base + 12 * self.octaves
    }
}

impl From<SimpleInterval> for IntervalName {
    fn from(simple: SimpleInterval) -> Self {
        IntervalName::new(simple, 0)
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

impl fmt::Display for IntervalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.octaves == 0 {
            return write!(f, "{}", self.simple);
        }
        match self.simple.number() {
            Some(number) => write!(
                f,
                "{} {}",
                self.simple.quality(),
                ordinal(number + 7 * self.octaves)
            ),
            None if self.octaves == 1 => write!(f, "tritone + octave"),
            None => write!(f, "tritone + {} octaves", self.octaves),
        }
    }
}
