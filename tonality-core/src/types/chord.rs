use crate::error::{Result, TheoryError};
use crate::types::pitch::{Pitch, PitchClass, Spelling};
use crate::types::progression::Style;
#[cfg(feature = "colored")]
use colored::*;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use tracing::{debug, trace};

/// Chord qualities with their interval patterns (semitones above the root)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Major7,
    Minor7,
    Dominant7,
    Diminished7,
    HalfDiminished7,
    Augmented7,
    MinorMajor7,
    Major9,
    Minor9,
    Dominant9,
    Dominant7Flat9,
    Dominant7Sharp9,
    Major11,
    Minor11,
    Dominant11,
    Dominant7Sharp11,
    Major13,
    Minor13,
    Dominant13,
    Dominant7Flat13,
    Add9,
    MinorAdd9,
    Add11,
    Add13,
}

impl ChordQuality {
    pub const ALL: [ChordQuality; 30] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::Sus2,
        ChordQuality::Sus4,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::Dominant7,
        ChordQuality::Diminished7,
        ChordQuality::HalfDiminished7,
        ChordQuality::Augmented7,
        ChordQuality::MinorMajor7,
        ChordQuality::Major9,
        ChordQuality::Minor9,
        ChordQuality::Dominant9,
        ChordQuality::Dominant7Flat9,
        ChordQuality::Dominant7Sharp9,
        ChordQuality::Major11,
        ChordQuality::Minor11,
        ChordQuality::Dominant11,
        ChordQuality::Dominant7Sharp11,
        ChordQuality::Major13,
        ChordQuality::Minor13,
        ChordQuality::Dominant13,
        ChordQuality::Dominant7Flat13,
        ChordQuality::Add9,
        ChordQuality::MinorAdd9,
        ChordQuality::Add11,
        ChordQuality::Add13,
    ];

    /// Semitones above the root, ascending; extensions stay above the octave
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Diminished7 => &[0, 3, 6, 9],
            ChordQuality::HalfDiminished7 => &[0, 3, 6, 10],
            ChordQuality::Augmented7 => &[0, 4, 8, 10],
            ChordQuality::MinorMajor7 => &[0, 3, 7, 11],
            ChordQuality::Major9 => &[0, 4, 7, 11, 14],
            ChordQuality::Minor9 => &[0, 3, 7, 10, 14],
            ChordQuality::Dominant9 => &[0, 4, 7, 10, 14],
            ChordQuality::Dominant7Flat9 => &[0, 4, 7, 10, 13],
            ChordQuality::Dominant7Sharp9 => &[0, 4, 7, 10, 15],
            ChordQuality::Major11 => &[0, 4, 7, 11, 14, 17],
            ChordQuality::Minor11 => &[0, 3, 7, 10, 14, 17],
            ChordQuality::Dominant11 => &[0, 4, 7, 10, 14, 17],
            ChordQuality::Dominant7Sharp11 => &[0, 4, 7, 10, 18],
            ChordQuality::Major13 => &[0, 4, 7, 11, 14, 17, 21],
            ChordQuality::Minor13 => &[0, 3, 7, 10, 14, 17, 21],
            ChordQuality::Dominant13 => &[0, 4, 7, 10, 14, 17, 21],
            ChordQuality::Dominant7Flat13 => &[0, 4, 7, 10, 20],
            ChordQuality::Add9 => &[0, 4, 7, 14],
            ChordQuality::MinorAdd9 => &[0, 3, 7, 14],
            ChordQuality::Add11 => &[0, 4, 7, 17],
            ChordQuality::Add13 => &[0, 4, 7, 21],
        }
    }

    /// Canonical chord-symbol suffix ("" for a major triad)
    pub fn symbol(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Diminished7 => "dim7",
            ChordQuality::HalfDiminished7 => "m7b5",
            ChordQuality::Augmented7 => "aug7",
            ChordQuality::MinorMajor7 => "mMaj7",
            ChordQuality::Major9 => "maj9",
            ChordQuality::Minor9 => "m9",
            ChordQuality::Dominant9 => "9",
            ChordQuality::Dominant7Flat9 => "7b9",
            ChordQuality::Dominant7Sharp9 => "7#9",
            ChordQuality::Major11 => "maj11",
            ChordQuality::Minor11 => "m11",
            ChordQuality::Dominant11 => "11",
            ChordQuality::Dominant7Sharp11 => "7#11",
            ChordQuality::Major13 => "maj13",
            ChordQuality::Minor13 => "m13",
            ChordQuality::Dominant13 => "13",
            ChordQuality::Dominant7Flat13 => "7b13",
            ChordQuality::Add9 => "add9",
            ChordQuality::MinorAdd9 => "madd9",
            ChordQuality::Add11 => "add11",
            ChordQuality::Add13 => "add13",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChordQuality::Major => "major",
            ChordQuality::Minor => "minor",
            ChordQuality::Diminished => "diminished",
            ChordQuality::Augmented => "augmented",
            ChordQuality::Sus2 => "suspended 2nd",
            ChordQuality::Sus4 => "suspended 4th",
            ChordQuality::Major7 => "major 7th",
            ChordQuality::Minor7 => "minor 7th",
            ChordQuality::Dominant7 => "dominant 7th",
            ChordQuality::Diminished7 => "diminished 7th",
            ChordQuality::HalfDiminished7 => "half-diminished 7th",
            ChordQuality::Augmented7 => "augmented 7th",
            ChordQuality::MinorMajor7 => "minor-major 7th",
            ChordQuality::Major9 => "major 9th",
            ChordQuality::Minor9 => "minor 9th",
            ChordQuality::Dominant9 => "dominant 9th",
            ChordQuality::Dominant7Flat9 => "dominant 7th flat 9",
            ChordQuality::Dominant7Sharp9 => "dominant 7th sharp 9",
            ChordQuality::Major11 => "major 11th",
            ChordQuality::Minor11 => "minor 11th",
            ChordQuality::Dominant11 => "dominant 11th",
            ChordQuality::Dominant7Sharp11 => "dominant 7th sharp 11",
            ChordQuality::Major13 => "major 13th",
            ChordQuality::Minor13 => "minor 13th",
            ChordQuality::Dominant13 => "dominant 13th",
            ChordQuality::Dominant7Flat13 => "dominant 7th flat 13",
            ChordQuality::Add9 => "added 9th",
            ChordQuality::MinorAdd9 => "minor added 9th",
            ChordQuality::Add11 => "added 11th",
            ChordQuality::Add13 => "added 13th",
        }
    }

    /// Tones that may be absent when identifying a chord from pitches: the
    /// perfect fifth always, plus the inner extensions of 11th and 13th chords
    fn is_optional_tone(self, interval: u8) -> bool {
        match interval {
            7 => true,
            14 => matches!(
                self,
                ChordQuality::Major11
                    | ChordQuality::Minor11
                    | ChordQuality::Dominant11
                    | ChordQuality::Major13
                    | ChordQuality::Minor13
                    | ChordQuality::Dominant13
            ),
            17 => matches!(
                self,
                ChordQuality::Major13 | ChordQuality::Minor13 | ChordQuality::Dominant13
            ),
            _ => false,
        }
    }
}

impl FromStr for ChordQuality {
    type Err = TheoryError;

    /// Case-sensitive: "M7" is a major seventh, "m7" a minor seventh
    fn from_str(s: &str) -> Result<Self> {
        let quality = match s.trim() {
            "" | "maj" | "M" | "major" => ChordQuality::Major,
            "m" | "min" | "minor" | "-" => ChordQuality::Minor,
            "dim" | "°" | "o" | "diminished" => ChordQuality::Diminished,
            "aug" | "+" | "augmented" => ChordQuality::Augmented,
            "sus2" => ChordQuality::Sus2,
            "sus4" | "sus" => ChordQuality::Sus4,
            "maj7" | "M7" | "Δ" | "Δ7" | "major7" => ChordQuality::Major7,
            "m7" | "min7" | "-7" | "minor7" => ChordQuality::Minor7,
            "7" | "dom7" | "dominant7" => ChordQuality::Dominant7,
            "dim7" | "°7" | "o7" => ChordQuality::Diminished7,
            "m7b5" | "ø" | "ø7" | "half-dim" | "half_diminished" => {
                ChordQuality::HalfDiminished7
            }
            "aug7" | "+7" | "7#5" => ChordQuality::Augmented7,
            "mMaj7" | "mM7" | "minmaj7" => ChordQuality::MinorMajor7,
            "maj9" | "M9" => ChordQuality::Major9,
            "m9" | "min9" => ChordQuality::Minor9,
            "9" | "dom9" => ChordQuality::Dominant9,
            "7b9" => ChordQuality::Dominant7Flat9,
            "7#9" => ChordQuality::Dominant7Sharp9,
            "maj11" | "M11" => ChordQuality::Major11,
            "m11" | "min11" => ChordQuality::Minor11,
            "11" | "dom11" => ChordQuality::Dominant11,
            "7#11" => ChordQuality::Dominant7Sharp11,
            "maj13" | "M13" => ChordQuality::Major13,
            "m13" | "min13" => ChordQuality::Minor13,
            "13" | "dom13" => ChordQuality::Dominant13,
            "7b13" => ChordQuality::Dominant7Flat13,
            "add9" | "add2" => ChordQuality::Add9,
            "madd9" | "m(add9)" => ChordQuality::MinorAdd9,
            "add11" | "add4" => ChordQuality::Add11,
            "add13" => ChordQuality::Add13,
            other => return Err(TheoryError::InvalidChordQuality(other.to_string())),
        };
        Ok(quality)
    }
}

impl fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How chord tones are spread across octaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Voicing {
    #[default]
    Close,
    /// Every other tone raised an octave
    Open,
    /// Second tone from the top dropped an octave
    Drop2,
    /// Third tone from the top dropped an octave
    Drop3,
}

impl FromStr for Voicing {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "close" => Ok(Voicing::Close),
            "open" => Ok(Voicing::Open),
            "drop2" | "drop-2" | "drop_2" => Ok(Voicing::Drop2),
            "drop3" | "drop-3" | "drop_3" => Ok(Voicing::Drop3),
            other => Err(format!("Unknown voicing: {}", other)),
        }
    }
}

impl fmt::Display for Voicing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Voicing::Close => "close",
            Voicing::Open => "open",
            Voicing::Drop2 => "drop-2",
            Voicing::Drop3 => "drop-3",
        };
        write!(f, "{}", name)
    }
}

/// A chord: root, quality, inversion and voicing, realized as concrete pitches
///
/// The pitch-class set depends only on root and quality; inversion and
/// voicing change octave placement, never identity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chord {
    root: PitchClass,
    quality: ChordQuality,
    inversion: usize,
    voicing: Voicing,
    /// Root-position root pitch that the realization is built from
    base: Pitch,
    pitches: Vec<Pitch>,
}

impl Chord {
    /// Build a chord with its root-position root in octave 4
    pub fn build(
        root: PitchClass,
        quality: ChordQuality,
        inversion: usize,
        voicing: Voicing,
    ) -> Result<Self> {
        Self::build_in_octave(root, quality, inversion, voicing, 4)
    }

    pub fn build_in_octave(
        root: PitchClass,
        quality: ChordQuality,
        inversion: usize,
        voicing: Voicing,
        octave: i32,
    ) -> Result<Self> {
        Self::realize(Pitch::from_parts(root, octave), quality, inversion, voicing)
    }

    /// Root position, close voicing, octave 4
    pub fn root_position(root: PitchClass, quality: ChordQuality) -> Self {
        let base = Pitch::from_parts(root, 4);
        Chord {
            root,
            quality,
            inversion: 0,
            voicing: Voicing::Close,
            base,
            pitches: quality
                .intervals()
                .iter()
                .map(|&i| base + i as i32)
                .collect(),
        }
    }

    fn realize(
        base: Pitch,
        quality: ChordQuality,
        inversion: usize,
        voicing: Voicing,
    ) -> Result<Self> {
        let tones = distinct_count(quality);
        if inversion >= tones {
            return Err(TheoryError::InversionOutOfRange { inversion, tones });
        }

        let mut pitches: Vec<Pitch> = quality
            .intervals()
            .iter()
            .map(|&i| base + i as i32)
            .collect();

        // Rotate the lowest tone to the top, an octave at a time until it clears
        for _ in 0..inversion {
            let lowest = pitches.remove(0);
            let mut moved = lowest;
            if let Some(&top) = pitches.last() {
                while moved <= top {
                    moved = moved + 12;
                }
            }
            pitches.push(moved);
        }

        apply_voicing(&mut pitches, voicing);

        Ok(Chord {
            root: base.pitch_class(),
            quality,
            inversion,
            voicing,
            base,
            pitches,
        })
    }

    /// Parse a chord symbol such as "C", "F#m7", "Bbmaj7/D" or "Gsus4"
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        let symbol = symbol.trim();
        let invalid = || TheoryError::InvalidChordSymbol(symbol.to_string());

        let (body, bass) = match symbol.split_once('/') {
            Some((body, bass)) => (body, Some(bass)),
            None => (symbol, None),
        };

        let mut root_end = body.chars().next().ok_or_else(invalid)?.len_utf8();
        for c in body[root_end..].chars() {
            if matches!(c, '#' | 'b' | '♯' | '♭') {
                root_end += c.len_utf8();
            } else {
                break;
            }
        }
        let (root_str, quality_str) = body.split_at(root_end);
        let root: PitchClass = root_str.parse().map_err(|_| invalid())?;
        let quality: ChordQuality = quality_str.parse()?;

        let inversion = match bass {
            Some(bass) => {
                let bass: PitchClass = bass.parse().map_err(|_| invalid())?;
                let chord = Chord::root_position(root, quality);
                chord
                    .pitch_classes()
                    .iter()
                    .position(|&pc| pc == bass)
                    .ok_or_else(invalid)?
            }
            None => 0,
        };

        Chord::build(root, quality, inversion, Voicing::Close)
    }

    pub fn root(&self) -> PitchClass {
        self.root
    }

    pub fn quality(&self) -> ChordQuality {
        self.quality
    }

    pub fn inversion(&self) -> usize {
        self.inversion
    }

    pub fn voicing(&self) -> Voicing {
        self.voicing
    }

    /// Realized pitches, ascending
    pub fn pitches(&self) -> &[Pitch] {
        &self.pitches
    }

    /// Distinct pitch classes in chord-tone order (root, third, fifth, ...)
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        let mut classes = Vec::with_capacity(self.quality.intervals().len());
        for &interval in self.quality.intervals() {
            let pc = self.root + interval as i32;
            if !classes.contains(&pc) {
                classes.push(pc);
            }
        }
        classes
    }

    /// Pitch class of the lowest sounding tone
    pub fn bass(&self) -> PitchClass {
        self.pitches
            .first()
            .map(|p| p.pitch_class())
            .unwrap_or(self.root)
    }

    /// The perfect fifth above the root, when the quality has one
    pub fn fifth(&self) -> Option<PitchClass> {
        self.quality
            .intervals()
            .contains(&7)
            .then(|| self.root + 7)
    }

    pub fn contains(&self, pitch_class: PitchClass) -> bool {
        self.pitch_classes().contains(&pitch_class)
    }

    /// Pitch classes shared with another chord
    pub fn common_tones(&self, other: &Chord) -> Vec<PitchClass> {
        let theirs = other.pitch_classes();
        self.pitch_classes()
            .into_iter()
            .filter(|pc| theirs.contains(pc))
            .collect()
    }

    /// Next inversion; the last inversion wraps back to root position
    pub fn invert(&self) -> Self {
        let tones = distinct_count(self.quality);
        self.with_inversion((self.inversion + 1) % tones)
    }

    /// Previous inversion; root position wraps to the last inversion
    pub fn revert(&self) -> Self {
        let tones = distinct_count(self.quality);
        self.with_inversion((self.inversion + tones - 1) % tones)
    }

    fn with_inversion(&self, inversion: usize) -> Self {
        // The index is always below the tone count, so realize cannot fail
        Self::realize(self.base, self.quality, inversion, self.voicing)
            .unwrap_or_else(|_| self.clone())
    }

    pub fn with_voicing(&self, voicing: Voicing) -> Self {
        Self::realize(self.base, self.quality, self.inversion, voicing)
            .unwrap_or_else(|_| self.clone())
    }

    pub fn transpose(&self, semitones: i32) -> Self {
        Chord {
            root: self.root + semitones,
            quality: self.quality,
            inversion: self.inversion,
            voicing: self.voicing,
            base: self.base + semitones,
            pitches: self.pitches.iter().map(|&p| p + semitones).collect(),
        }
    }

    /// Chord symbol with slash bass for inversions, e.g. "Dbmaj7/F"
    pub fn symbol(&self, spelling: Spelling) -> String {
        let mut symbol = format!("{}{}", self.root.name(spelling), self.quality.symbol());
        if self.inversion > 0 {
            if let Some(bass) = self.pitch_classes().get(self.inversion) {
                symbol.push('/');
                symbol.push_str(bass.name(spelling));
            }
        }
        symbol
    }
}

fn distinct_count(quality: ChordQuality) -> usize {
    quality
        .intervals()
        .iter()
        .map(|i| i % 12)
        .collect::<BTreeSet<_>>()
        .len()
}

fn apply_voicing(pitches: &mut [Pitch], voicing: Voicing) {
    let len = pitches.len();
    match voicing {
        Voicing::Close => {}
        Voicing::Open => {
            for (i, pitch) in pitches.iter_mut().enumerate() {
                if i % 2 == 1 {
                    *pitch = *pitch + 12;
                }
            }
        }
        Voicing::Drop2 => {
            if len >= 2 {
                pitches[len - 2] = pitches[len - 2] - 12;
            }
        }
        Voicing::Drop3 => {
            if len >= 3 {
                pitches[len - 3] = pitches[len - 3] - 12;
            }
        }
    }
    pitches.sort();
}

#[cfg(feature = "colored")]
impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let notes: Vec<String> = self
            .pitches
            .iter()
            .map(|p| p.to_string().cyan().to_string())
            .collect();
        let symbol = self.symbol(Spelling::Sharp);
        let colored_symbol = match self.quality {
            ChordQuality::Major | ChordQuality::Major7 => symbol.blue().bold(),
            ChordQuality::Minor | ChordQuality::Minor7 => symbol.red().bold(),
            ChordQuality::Sus2 | ChordQuality::Sus4 => symbol.yellow().bold(),
            ChordQuality::Diminished | ChordQuality::Diminished7 => symbol.purple().bold(),
            ChordQuality::Augmented | ChordQuality::Augmented7 => symbol.bright_red().bold(),
            _ => symbol.green().bold(),
        };
        write!(f, "{}: [{}]", colored_symbol, notes.join(", "))
    }
}

// Plain Display impl for non-colored builds
#[cfg(not(feature = "colored"))]
impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let notes: Vec<String> = self.pitches.iter().map(|p| p.to_string()).collect();
        write!(f, "{}: [{}]", self.symbol(Spelling::Sharp), notes.join(", "))
    }
}

impl Add<i32> for Chord {
    type Output = Chord;

    fn add(self, semitones: i32) -> Self::Output {
        self.transpose(semitones)
    }
}

impl Sub<i32> for Chord {
    type Output = Chord;

    fn sub(self, semitones: i32) -> Self::Output {
        self.transpose(-semitones)
    }
}

/// Parse a quality string and build, the string-facing entry point
pub fn build_chord(
    root: PitchClass,
    quality: &str,
    inversion: usize,
    voicing: Voicing,
) -> Result<Chord> {
    let quality: ChordQuality = quality.parse()?;
    Chord::build(root, quality, inversion, voicing)
}

/// One reading of a pitch set as a chord
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChordCandidate {
    pub chord: Chord,
    /// Input pitch classes the chord does not explain
    pub extra: Vec<PitchClass>,
    /// Chord tones absent from the input (the root, for rootless readings)
    pub missing: Vec<PitchClass>,
    pub root_in_bass: bool,
}

impl ChordCandidate {
    fn rank(&self) -> (usize, usize, bool) {
        (self.extra.len(), self.missing.len(), !self.root_in_bass)
    }
}

/// Identify a pitch set as ranked chord candidates.
///
/// Every pitch class is tried as a root against every quality. A reading is
/// kept when all its essential tones are present, at least three chord tones
/// match, and it explains more tones than it leaves over. Rootless readings
/// are allowed for chords of four or more tones. Candidates are ordered by
/// fewest extra tones, then fewest missing tones, then root in the bass;
/// equal ranks are all returned.
pub fn analyze_chord(pitches: &[Pitch]) -> Vec<ChordCandidate> {
    let input: BTreeSet<PitchClass> = pitches.iter().map(|p| p.pitch_class()).collect();
    let Some(bass) = pitches.iter().min().map(|p| p.pitch_class()) else {
        return Vec::new();
    };
    if input.len() < 3 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for offset in 0..12 {
        let root = bass + offset;
        for quality in ChordQuality::ALL {
            if let Some(candidate) = match_quality(&input, bass, root, quality) {
                candidates.push(candidate);
            }
        }
    }
    trace!(matched = candidates.len(), "chord readings before ranking");

    candidates.sort_by_key(|c| c.rank());
    if let Some(top) = candidates.first() {
        debug!(
            chord = %top.chord.symbol(Spelling::Sharp),
            candidates = candidates.len(),
            "analyzed chord"
        );
    }
    candidates
}

fn match_quality(
    input: &BTreeSet<PitchClass>,
    bass: PitchClass,
    root: PitchClass,
    quality: ChordQuality,
) -> Option<ChordCandidate> {
    let intervals = quality.intervals();
    let root_present = input.contains(&root);
    if !root_present && intervals.len() < 4 {
        return None;
    }

    let essential_present = intervals
        .iter()
        .filter(|&&i| i != 0 && !quality.is_optional_tone(i))
        .all(|&i| input.contains(&(root + i as i32)));
    if !essential_present {
        return None;
    }

    let shape = Chord::root_position(root, quality);
    let tones = shape.pitch_classes();
    let matched = tones.iter().filter(|pc| input.contains(pc)).count();
    let extra: Vec<PitchClass> = input
        .iter()
        .filter(|pc| !tones.contains(pc))
        .copied()
        .collect();
    if matched < 3 || extra.len() >= matched {
        return None;
    }
    let missing: Vec<PitchClass> = tones
        .iter()
        .filter(|pc| !input.contains(pc))
        .copied()
        .collect();

    let inversion = tones.iter().position(|&pc| pc == bass).unwrap_or(0);
    let chord = Chord::build(root, quality, inversion, Voicing::Close).ok()?;

    Some(ChordCandidate {
        chord,
        extra,
        missing,
        root_in_bass: bass == root,
    })
}

/// Why a substitute can stand in for a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubstitutionKind {
    /// Dominant seventh a tritone away
    Tritone,
    /// Dominant preceded by its related minor seventh a fifth above
    RelatedTwo,
    /// ii7-V7 motion in place of a static major seventh
    TwoFive,
    /// Same root, softer color
    Color,
    /// Relative major or minor
    Relative,
    /// Chord a third away sharing two tones
    Mediant,
    /// Leading-tone triad in place of the dominant
    LeadingTone,
}

impl SubstitutionKind {
    pub fn name(self) -> &'static str {
        match self {
            SubstitutionKind::Tritone => "tritone substitution",
            SubstitutionKind::RelatedTwo => "related ii",
            SubstitutionKind::TwoFive => "ii-V substitution",
            SubstitutionKind::Color => "color substitution",
            SubstitutionKind::Relative => "relative substitution",
            SubstitutionKind::Mediant => "mediant substitution",
            SubstitutionKind::LeadingTone => "leading-tone substitution",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            SubstitutionKind::Tritone => "shares the third and seventh as guide tones",
            SubstitutionKind::RelatedTwo => "prepares the dominant with its own ii",
            SubstitutionKind::TwoFive => "adds forward motion to a static chord",
            SubstitutionKind::Color => "similar color with less tension",
            SubstitutionKind::Relative => "shares two tones and the tonic function",
            SubstitutionKind::Mediant => "shares two tones with the original",
            SubstitutionKind::LeadingTone => "keeps the dominant function without the root",
        }
    }
}

impl fmt::Display for SubstitutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A chord, or short chord sequence, that can replace another
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Substitution {
    pub kind: SubstitutionKind,
    pub chords: Vec<Chord>,
}

impl Substitution {
    fn new(kind: SubstitutionKind, chords: Vec<Chord>) -> Self {
        Substitution { kind, chords }
    }

    /// Chord symbols joined with dashes, e.g. "Dm7 - G7"
    pub fn symbols(&self, spelling: Spelling) -> String {
        let symbols: Vec<String> = self.chords.iter().map(|c| c.symbol(spelling)).collect();
        symbols.join(" - ")
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.symbols(Spelling::Sharp))
    }
}

/// Substitutes for `chord` in the idiom of `style`.
///
/// Jazz replaces dominants with tritone substitutes or their related ii, and
/// major sevenths with ii-V motion. Pop softens major sevenths to add9 and
/// swaps major triads for their relative minor. Common practice uses the
/// relative and mediant for triads and the leading-tone triad for a dominant
/// seventh. Qualities with no idiomatic substitute give an empty list.
pub fn suggest_substitutions(chord: &Chord, style: Style) -> Vec<Substitution> {
    use ChordQuality as Q;
    use SubstitutionKind as K;

    let root = chord.root();
    let intervals = chord.quality().intervals();
    let dominant = intervals.contains(&4) && intervals.contains(&10);
    let major_seventh = intervals.contains(&4) && intervals.contains(&11);
    let at = |offset: i32, quality: ChordQuality| Chord::root_position(root + offset, quality);

    let mut substitutions = Vec::new();
    match style {
        Style::Jazz => {
            if dominant {
                substitutions.push(Substitution::new(K::Tritone, vec![at(6, Q::Dominant7)]));
                substitutions.push(Substitution::new(
                    K::RelatedTwo,
                    vec![at(7, Q::Minor7), chord.clone()],
                ));
            }
            if major_seventh {
                substitutions.push(Substitution::new(
                    K::TwoFive,
                    vec![at(2, Q::Minor7), at(7, Q::Dominant7)],
                ));
            }
        }
        Style::Pop => match chord.quality() {
            Q::Major7 | Q::Major9 => {
                substitutions.push(Substitution::new(K::Color, vec![at(0, Q::Add9)]));
            }
            Q::Major => {
                substitutions.push(Substitution::new(K::Relative, vec![at(9, Q::Minor)]));
                substitutions.push(Substitution::new(K::Color, vec![at(0, Q::Add9)]));
            }
            _ => {}
        },
        Style::CommonPractice => match chord.quality() {
            Q::Major => {
                substitutions.push(Substitution::new(K::Relative, vec![at(9, Q::Minor)]));
                substitutions.push(Substitution::new(K::Mediant, vec![at(4, Q::Minor)]));
            }
            Q::Minor => {
                substitutions.push(Substitution::new(K::Relative, vec![at(3, Q::Major)]));
                substitutions.push(Substitution::new(K::Mediant, vec![at(8, Q::Major)]));
            }
            Q::Dominant7 => {
                substitutions.push(Substitution::new(
                    K::LeadingTone,
                    vec![at(11, Q::Diminished)],
                ));
            }
            _ => {}
        },
    }
    trace!(
        chord = %chord.symbol(Spelling::Sharp),
        style = %style,
        found = substitutions.len(),
        "chord substitutions"
    );
    substitutions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitches(midi: &[i32]) -> Vec<Pitch> {
        midi.iter().map(|&m| Pitch::new(m)).collect()
    }

    #[test]
    fn test_build_root_position() {
        let chord = Chord::build(PitchClass::C, ChordQuality::Major, 0, Voicing::Close).unwrap();
        assert_eq!(chord.pitches(), pitches(&[60, 64, 67]).as_slice());
        assert_eq!(chord.bass(), PitchClass::C);

        let g7 = build_chord(PitchClass::G, "7", 0, Voicing::Close).unwrap();
        assert_eq!(g7.pitches(), pitches(&[67, 71, 74, 77]).as_slice());
        assert_eq!(g7.fifth(), Some(PitchClass::D));
    }

    #[test]
    fn test_inversions() {
        let first = Chord::build(PitchClass::C, ChordQuality::Major, 1, Voicing::Close).unwrap();
        assert_eq!(first.pitches(), pitches(&[64, 67, 72]).as_slice());
        assert_eq!(first.bass(), PitchClass::E);

        let second = Chord::build(PitchClass::C, ChordQuality::Major, 2, Voicing::Close).unwrap();
        assert_eq!(second.pitches(), pitches(&[67, 72, 76]).as_slice());

        let err = Chord::build(PitchClass::C, ChordQuality::Major, 3, Voicing::Close);
        assert_eq!(
            err,
            Err(TheoryError::InversionOutOfRange {
                inversion: 3,
                tones: 3
            })
        );
        // Seventh chords have a third inversion
        assert!(Chord::build(PitchClass::C, ChordQuality::Dominant7, 3, Voicing::Close).is_ok());
    }

    #[test]
    fn test_invert_and_revert_round_trip() {
        for quality in ChordQuality::ALL {
            let original = Chord::build(PitchClass::D, quality, 0, Voicing::Close).unwrap();
            let mut chord = original.clone();
            for _ in 0..3 {
                chord = chord.invert();
            }
            for _ in 0..3 {
                chord = chord.revert();
            }
            assert_eq!(chord.pitches(), original.pitches(), "{}", quality);
        }
    }

    #[test]
    fn test_voicings_keep_pitch_classes() {
        for voicing in [Voicing::Close, Voicing::Open, Voicing::Drop2, Voicing::Drop3] {
            let chord = Chord::build(PitchClass::F, ChordQuality::Major7, 1, voicing).unwrap();
            let classes: BTreeSet<PitchClass> =
                chord.pitches().iter().map(|p| p.pitch_class()).collect();
            let expected: BTreeSet<PitchClass> = chord.pitch_classes().into_iter().collect();
            assert_eq!(classes, expected, "{}", voicing);
            assert!(chord.pitches().windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_drop2_voicing() {
        // Cmaj7 close C4 E4 G4 B4; drop-2 lowers G4 to G3
        let chord = Chord::build(PitchClass::C, ChordQuality::Major7, 0, Voicing::Drop2).unwrap();
        assert_eq!(chord.pitches(), pitches(&[55, 60, 64, 71]).as_slice());

        let open = Chord::build(PitchClass::C, ChordQuality::Major, 0, Voicing::Open).unwrap();
        assert_eq!(open.pitches(), pitches(&[60, 67, 76]).as_slice());
    }

    #[test]
    fn test_quality_parsing() {
        assert_eq!("M7".parse::<ChordQuality>().unwrap(), ChordQuality::Major7);
        assert_eq!("m7".parse::<ChordQuality>().unwrap(), ChordQuality::Minor7);
        assert_eq!("ø7".parse::<ChordQuality>().unwrap(), ChordQuality::HalfDiminished7);
        assert_eq!(
            "mystery".parse::<ChordQuality>(),
            Err(TheoryError::InvalidChordQuality("mystery".to_string()))
        );
    }

    #[test]
    fn test_symbols() {
        let chord = Chord::from_symbol("F#m7/A").unwrap();
        assert_eq!(chord.root(), PitchClass::F_SHARP);
        assert_eq!(chord.quality(), ChordQuality::Minor7);
        assert_eq!(chord.inversion(), 1);
        assert_eq!(chord.bass(), PitchClass::A);
        assert_eq!(chord.symbol(Spelling::Sharp), "F#m7/A");

        let bb = Chord::from_symbol("Bbmaj7").unwrap();
        assert_eq!(bb.root(), PitchClass::B_FLAT);
        assert_eq!(bb.symbol(Spelling::Flat), "Bbmaj7");

        assert!(Chord::from_symbol("C/F#").is_err());
        assert!(Chord::from_symbol("Xm").is_err());
        assert!(Chord::from_symbol("").is_err());
    }

    #[test]
    fn test_transpose() {
        let c = Chord::build(PitchClass::C, ChordQuality::Minor, 0, Voicing::Close).unwrap();
        let d = c.clone() + 2;
        assert_eq!(d.root(), PitchClass::D);
        assert_eq!(d.pitches(), pitches(&[62, 65, 69]).as_slice());
        assert_eq!(d - 2, c);
    }

    #[test]
    fn test_analyze_major_triad() {
        let candidates = analyze_chord(&pitches(&[60, 64, 67]));
        let top = &candidates[0];
        assert_eq!(top.chord.root(), PitchClass::C);
        assert_eq!(top.chord.quality(), ChordQuality::Major);
        assert!(top.extra.is_empty());
        assert!(top.missing.is_empty());
        assert!(top.root_in_bass);
    }

    #[test]
    fn test_analyze_inversion_reports_bass() {
        let candidates = analyze_chord(&pitches(&[64, 67, 72]));
        let top = &candidates[0];
        assert_eq!(top.chord.root(), PitchClass::C);
        assert_eq!(top.chord.inversion(), 1);
        assert!(!top.root_in_bass);
    }

    #[test]
    fn test_analyze_diminished_is_ambiguous() {
        // B D F is a diminished triad and also a rootless G7
        let candidates = analyze_chord(&pitches(&[59, 62, 65]));
        assert!(candidates.len() >= 2);
        assert_eq!(candidates[0].chord.quality(), ChordQuality::Diminished);
        assert!(candidates.iter().any(|c| c.chord.root() == PitchClass::G
            && c.chord.quality() == ChordQuality::Dominant7
            && c.missing == vec![PitchClass::G]));
    }

    #[test]
    fn test_analyze_seventh_without_fifth() {
        // C E Bb: dominant seventh with the fifth omitted
        let candidates = analyze_chord(&pitches(&[48, 64, 70]));
        let top = &candidates[0];
        assert_eq!(top.chord.root(), PitchClass::C);
        assert_eq!(top.chord.quality(), ChordQuality::Dominant7);
        assert_eq!(top.missing, vec![PitchClass::G]);
    }

    #[test]
    fn test_analyze_too_few_classes() {
        assert!(analyze_chord(&pitches(&[60, 72, 67])).is_empty());
        assert!(analyze_chord(&[]).is_empty());
    }

    #[test]
    fn test_jazz_substitutions() {
        let g7 = Chord::from_symbol("G7").unwrap();
        let subs = suggest_substitutions(&g7, Style::Jazz);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].kind, SubstitutionKind::Tritone);
        assert_eq!(subs[0].chords[0].root(), PitchClass::C_SHARP);
        assert_eq!(subs[0].symbols(Spelling::Flat), "Db7");
        assert_eq!(subs[1].symbols(Spelling::Sharp), "Dm7 - G7");

        let cmaj7 = Chord::from_symbol("Cmaj7").unwrap();
        let two_five = suggest_substitutions(&cmaj7, Style::Jazz);
        assert_eq!(two_five.len(), 1);
        assert_eq!(two_five[0].to_string(), "ii-V substitution: Dm7 - G7");

        // Extended dominants count as dominants
        let g13 = Chord::from_symbol("G13").unwrap();
        assert_eq!(suggest_substitutions(&g13, Style::Jazz)[0].kind, SubstitutionKind::Tritone);
    }

    #[test]
    fn test_pop_and_classical_substitutions() {
        let cmaj7 = Chord::from_symbol("Cmaj7").unwrap();
        let pop = suggest_substitutions(&cmaj7, Style::Pop);
        assert_eq!(pop.len(), 1);
        assert_eq!(pop[0].chords[0].quality(), ChordQuality::Add9);

        let c = Chord::from_symbol("C").unwrap();
        let classical: Vec<String> = suggest_substitutions(&c, Style::CommonPractice)
            .iter()
            .map(|s| s.symbols(Spelling::Sharp))
            .collect();
        assert_eq!(classical, vec!["Am", "Em"]);

        let am = Chord::from_symbol("Am").unwrap();
        let minor: Vec<String> = suggest_substitutions(&am, Style::CommonPractice)
            .iter()
            .map(|s| s.symbols(Spelling::Sharp))
            .collect();
        assert_eq!(minor, vec!["C", "F"]);

        let g7 = Chord::from_symbol("G7").unwrap();
        let leading = suggest_substitutions(&g7, Style::CommonPractice);
        assert_eq!(leading[0].symbols(Spelling::Sharp), "Bdim");

        let sus = Chord::from_symbol("Csus4").unwrap();
        assert!(suggest_substitutions(&sus, Style::Jazz).is_empty());
    }
}
