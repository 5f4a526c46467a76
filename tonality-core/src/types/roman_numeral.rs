// tonality-core/src/types/roman_numeral.rs
use crate::error::{Result, TheoryError};
use crate::types::chord::{Chord, ChordQuality, Voicing};
use crate::types::key::{Key, Mode};
use std::fmt;
use std::str::FromStr;

/// A Roman-numeral chord label such as "V7", "bVII", "viiø65" or "V/V"
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RomanNumeral {
    /// Scale degree 1-7
    pub degree: u8,
    pub accidental: Option<Accidental>,
    pub quality: NumeralQuality,
    pub extension: Option<Extension>,
    /// 0 = root position, from the figured-bass suffix
    pub inversion: usize,
    /// Tonicized target of an applied chord ("ii" in "V7/ii")
    pub applied_to: Option<Box<RomanNumeral>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Accidental {
    Flat,
    Sharp,
}

impl Accidental {
    fn semitones(self) -> i32 {
        match self {
            Accidental::Flat => -1,
            Accidental::Sharp => 1,
        }
    }
}

/// Triad quality carried by case and quality symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumeralQuality {
    Major,          // I, IV, V
    Minor,          // ii, iii, vi
    Diminished,     // vii°
    HalfDiminished, // viiø
    Augmented,      // III+
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Extension {
    Seventh,      // 7 (and the 65/43/42 figures)
    MajorSeventh, // maj7, M7
    Ninth,
    Eleventh,
    Thirteenth,
    Sus2,
    Sus4,
    Add9,
}

const NUMERALS: [&str; 7] = ["I", "II", "III", "IV", "V", "VI", "VII"];

impl RomanNumeral {
    /// A plain diatonic numeral with no extension
    pub fn new(degree: u8, quality: NumeralQuality) -> Self {
        RomanNumeral {
            degree,
            accidental: None,
            quality,
            extension: None,
            inversion: 0,
            applied_to: None,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.applied_to.is_some()
    }

    /// True when the numeral carries a seventh, explicitly or through a
    /// half-diminished sign
    pub fn has_seventh(&self) -> bool {
        matches!(
            self.extension,
            Some(Extension::Seventh) | Some(Extension::MajorSeventh)
        ) || self.quality == NumeralQuality::HalfDiminished
    }

    /// Resolve to a concrete chord in `key`.
    ///
    /// Applied chords are resolved in the key tonicized by their target: a
    /// major target implies a major key, a minor target a minor one. In minor
    /// keys a diminished chord on the seventh degree uses the raised leading
    /// tone.
    pub fn resolve(&self, key: Key) -> Result<Chord> {
        if let Some(target) = &self.applied_to {
            let target_chord = target.resolve(key)?;
            let mode = tonicized_mode(target_chord.quality())
                .ok_or_else(|| TheoryError::UnresolvableNumeral(self.to_string()))?;
            let local = RomanNumeral {
                applied_to: None,
                ..self.clone()
            };
            return local.resolve(Key::new(target_chord.root(), mode));
        }

        let classes = key.pitch_classes();
        let index = (self.degree as usize)
            .checked_sub(1)
            .filter(|&i| i < classes.len())
            .ok_or_else(|| TheoryError::UnresolvableNumeral(self.to_string()))?;
        let mut root = classes[index];

        let leading_tone = key.mode() == Mode::Minor
            && self.degree == 7
            && matches!(
                self.quality,
                NumeralQuality::Diminished | NumeralQuality::HalfDiminished
            );
        if leading_tone {
            root = root + 1;
        }
        if let Some(accidental) = self.accidental {
            root = root + accidental.semitones();
        }

        let quality = self.chord_quality()?;
        Chord::build(root, quality, self.inversion, Voicing::Close)
    }

    /// Chord quality implied by case, quality sign and extension
    pub fn chord_quality(&self) -> Result<ChordQuality> {
        use NumeralQuality as Q;

        let quality = match (self.extension, self.quality) {
            (None, Q::Major) => ChordQuality::Major,
            (None, Q::Minor) => ChordQuality::Minor,
            (None, Q::Diminished) => ChordQuality::Diminished,
            (None, Q::Augmented) => ChordQuality::Augmented,
            (_, Q::HalfDiminished) => ChordQuality::HalfDiminished7,
            (Some(Extension::Seventh), Q::Major) => ChordQuality::Dominant7,
            (Some(Extension::Seventh), Q::Minor) => ChordQuality::Minor7,
            (Some(Extension::Seventh), Q::Diminished) => ChordQuality::Diminished7,
            (Some(Extension::Seventh), Q::Augmented) => ChordQuality::Augmented7,
            (Some(Extension::MajorSeventh), Q::Major) => ChordQuality::Major7,
            (Some(Extension::MajorSeventh), Q::Minor) => ChordQuality::MinorMajor7,
            (Some(Extension::Ninth), Q::Major) => ChordQuality::Dominant9,
            (Some(Extension::Ninth), Q::Minor) => ChordQuality::Minor9,
            (Some(Extension::Eleventh), Q::Major) => ChordQuality::Dominant11,
            (Some(Extension::Eleventh), Q::Minor) => ChordQuality::Minor11,
            (Some(Extension::Thirteenth), Q::Major) => ChordQuality::Dominant13,
            (Some(Extension::Thirteenth), Q::Minor) => ChordQuality::Minor13,
            (Some(Extension::Sus2), _) => ChordQuality::Sus2,
            (Some(Extension::Sus4), _) => ChordQuality::Sus4,
            (Some(Extension::Add9), Q::Major) => ChordQuality::Add9,
            (Some(Extension::Add9), Q::Minor) => ChordQuality::MinorAdd9,
            _ => return Err(TheoryError::UnresolvableNumeral(self.to_string())),
        };
        Ok(quality)
    }

    /// Label a concrete chord relative to a key
    pub fn analyze(chord: &Chord, key: Key) -> RomanNumeral {
        let (quality, extension) = numeral_shape(chord.quality());
        let offset = key.root().interval_to(chord.root());
        let located = key.degree_of(chord.root());

        // Raised sixth/seventh in minor: only a diminished leading-tone chord
        // gets the implicit raise, everything else is marked sharp
        let accidental = match (key.mode(), offset) {
            (Mode::Minor, 11)
                if matches!(
                    quality,
                    NumeralQuality::Diminished | NumeralQuality::HalfDiminished
                ) =>
            {
                None
            }
            (Mode::Minor, 9) | (Mode::Minor, 11) => Some(Accidental::Sharp),
            _ => match located.accidental {
                a if a < 0 => Some(Accidental::Flat),
                a if a > 0 => Some(Accidental::Sharp),
                _ => None,
            },
        };

        RomanNumeral {
            degree: located.degree,
            accidental,
            quality,
            extension,
            inversion: chord.inversion(),
            applied_to: None,
        }
    }

    fn figure(&self) -> &'static str {
        if self.has_seventh() && self.extension != Some(Extension::MajorSeventh) {
            return match self.inversion {
                1 => "65",
                2 => "43",
                3 => "42",
                _ => "7",
            };
        }
        match self.inversion {
            1 if self.extension.is_none() => "6",
            2 if self.extension.is_none() => "64",
            _ => "",
        }
    }
}

/// Mode of the key a chord of this quality tonicizes; diminished and
/// augmented chords cannot be tonicized
fn tonicized_mode(quality: ChordQuality) -> Option<Mode> {
    let intervals = quality.intervals();
    let altered_fifth = intervals.contains(&6) || intervals.contains(&8);
    if altered_fifth && !intervals.contains(&7) {
        return None;
    }
    if intervals.contains(&3) {
        Some(Mode::Minor)
    } else {
        Some(Mode::Major)
    }
}

fn numeral_shape(quality: ChordQuality) -> (NumeralQuality, Option<Extension>) {
    use ChordQuality as C;
    use NumeralQuality as Q;

    match quality {
        C::Major | C::Add11 | C::Add13 => (Q::Major, None),
        C::Minor => (Q::Minor, None),
        C::Diminished => (Q::Diminished, None),
        C::Augmented => (Q::Augmented, None),
        C::Sus2 => (Q::Major, Some(Extension::Sus2)),
        C::Sus4 => (Q::Major, Some(Extension::Sus4)),
        C::Major7 => (Q::Major, Some(Extension::MajorSeventh)),
        C::MinorMajor7 => (Q::Minor, Some(Extension::MajorSeventh)),
        C::Minor7 => (Q::Minor, Some(Extension::Seventh)),
        C::Dominant7
        | C::Dominant7Flat9
        | C::Dominant7Sharp9
        | C::Dominant7Sharp11
        | C::Dominant7Flat13 => (Q::Major, Some(Extension::Seventh)),
        C::Diminished7 => (Q::Diminished, Some(Extension::Seventh)),
        C::HalfDiminished7 => (Q::HalfDiminished, None),
        C::Augmented7 => (Q::Augmented, Some(Extension::Seventh)),
        C::Major9 | C::Dominant9 => (Q::Major, Some(Extension::Ninth)),
        C::Minor9 => (Q::Minor, Some(Extension::Ninth)),
        C::Major11 | C::Dominant11 => (Q::Major, Some(Extension::Eleventh)),
        C::Minor11 => (Q::Minor, Some(Extension::Eleventh)),
        C::Major13 | C::Dominant13 => (Q::Major, Some(Extension::Thirteenth)),
        C::Minor13 => (Q::Minor, Some(Extension::Thirteenth)),
        C::Add9 => (Q::Major, Some(Extension::Add9)),
        C::MinorAdd9 => (Q::Minor, Some(Extension::Add9)),
    }
}

impl FromStr for RomanNumeral {
    type Err = TheoryError;

    /// Parse "[accidental]numeral[quality][extension][figure][/target]"
    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        let invalid = || TheoryError::UnresolvableNumeral(input.to_string());

        let (head, target) = match input.split_once('/') {
            Some((head, target)) => (head, Some(Box::new(target.parse::<RomanNumeral>()?))),
            None => (input, None),
        };

        let mut rest = head;

        let accidental = if let Some(stripped) = strip_any(rest, &["b", "♭"]) {
            rest = stripped;
            Some(Accidental::Flat)
        } else if let Some(stripped) = strip_any(rest, &["#", "♯"]) {
            rest = stripped;
            Some(Accidental::Sharp)
        } else {
            None
        };

        let numeral_len = rest
            .find(|c: char| !matches!(c, 'I' | 'V' | 'i' | 'v'))
            .unwrap_or(rest.len());
        let (numeral, tail) = rest.split_at(numeral_len);
        let upper = numeral.chars().all(|c| c.is_ascii_uppercase());
        let lower = numeral.chars().all(|c| c.is_ascii_lowercase());
        if numeral.is_empty() || !(upper || lower) {
            return Err(invalid());
        }
        let degree = NUMERALS
            .iter()
            .position(|n| n.eq_ignore_ascii_case(numeral))
            .ok_or_else(invalid)? as u8
            + 1;
        rest = tail;

        let mut quality = if upper {
            NumeralQuality::Major
        } else {
            NumeralQuality::Minor
        };
        if let Some(stripped) = strip_any(rest, &["°", "o", "dim"]) {
            quality = NumeralQuality::Diminished;
            rest = stripped;
        } else if let Some(stripped) = strip_any(rest, &["ø"]) {
            quality = NumeralQuality::HalfDiminished;
            rest = stripped;
        } else if let Some(stripped) = strip_any(rest, &["+", "aug"]) {
            quality = NumeralQuality::Augmented;
            rest = stripped;
        }

        // A bare "7" is left for the figure match below
        let extensions: [(&str, Extension); 8] = [
            ("maj7", Extension::MajorSeventh),
            ("M7", Extension::MajorSeventh),
            ("sus2", Extension::Sus2),
            ("sus4", Extension::Sus4),
            ("add9", Extension::Add9),
            ("13", Extension::Thirteenth),
            ("11", Extension::Eleventh),
            ("9", Extension::Ninth),
        ];
        let mut extension = None;
        for (prefix, ext) in extensions {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                extension = Some(ext);
                rest = stripped;
                break;
            }
        }

        let (seventh, inversion) = match rest {
            "" => (false, 0),
            "6" => (false, 1),
            "64" => (false, 2),
            "7" => (true, 0),
            "65" => (true, 1),
            "43" => (true, 2),
            "42" | "2" => (true, 3),
            _ => return Err(invalid()),
        };
        if seventh && extension.is_none() && quality != NumeralQuality::HalfDiminished {
            extension = Some(Extension::Seventh);
        }

        let numeral = RomanNumeral {
            degree,
            accidental,
            quality,
            extension,
            inversion,
            applied_to: target,
        };

        let tones = numeral_tone_count(&numeral, seventh);
        if inversion >= tones {
            return Err(TheoryError::InversionOutOfRange { inversion, tones });
        }
        Ok(numeral)
    }
}

fn strip_any<'a>(s: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|p| s.strip_prefix(p))
}

fn numeral_tone_count(numeral: &RomanNumeral, seventh_figure: bool) -> usize {
    match numeral.chord_quality() {
        // Seventh figures on triad-shaped qualities (e.g. sus chords) still
        // name an inversion of the triad
        Ok(quality) => quality.intervals().len(),
        Err(_) if seventh_figure => 4,
        Err(_) => 3,
    }
}

/// Parse a whitespace-, comma- or dash-separated numeral sequence
pub fn parse_numerals(input: &str) -> Result<Vec<RomanNumeral>> {
    input
        .split(|c: char| c.is_whitespace() || c == ',' || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

impl fmt::Display for RomanNumeral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accidental {
            Some(Accidental::Flat) => write!(f, "b")?,
            Some(Accidental::Sharp) => write!(f, "#")?,
            None => {}
        }

        let numeral = NUMERALS
            .get((self.degree as usize).wrapping_sub(1))
            .copied()
            .unwrap_or("?");
        match self.quality {
            NumeralQuality::Major => write!(f, "{}", numeral)?,
            NumeralQuality::Minor => write!(f, "{}", numeral.to_lowercase())?,
            NumeralQuality::Diminished => write!(f, "{}°", numeral.to_lowercase())?,
            NumeralQuality::HalfDiminished => write!(f, "{}ø", numeral.to_lowercase())?,
            NumeralQuality::Augmented => write!(f, "{}+", numeral)?,
        }

        match self.extension {
            Some(Extension::MajorSeventh) => write!(f, "maj7")?,
            Some(Extension::Ninth) => write!(f, "9")?,
            Some(Extension::Eleventh) => write!(f, "11")?,
            Some(Extension::Thirteenth) => write!(f, "13")?,
            Some(Extension::Sus2) => write!(f, "sus2")?,
            Some(Extension::Sus4) => write!(f, "sus4")?,
            Some(Extension::Add9) => write!(f, "add9")?,
            Some(Extension::Seventh) | None => {}
        }
        write!(f, "{}", self.figure())?;

        if let Some(target) = &self.applied_to {
            write!(f, "/{}", target)?;
        }
        Ok(())
    }
}
