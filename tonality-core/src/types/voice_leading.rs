//! Voice leading: multi-voice realization of chord progressions
//!
//! A progression is voiced one transition at a time. For each new chord the
//! search enumerates a small neighborhood of placements per voice around the
//! previous voicing, keeps the assignments that sound every required pitch
//! class, and picks the cheapest by total motion plus penalties for rule
//! violations. The same rule checks grade externally supplied voicings.

use crate::config::VoiceLeadingConfig;
use crate::error::{Result, TheoryError};
use crate::types::chord::Chord;
use crate::types::pitch::{IntervalName, Pitch, PitchClass, Spelling};
use std::fmt;
use tracing::{debug, trace};

/// Inclusive pitch range for one voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchRange {
    pub low: Pitch,
    pub high: Pitch,
}

impl PitchRange {
    /// C2-C4
    pub const BASS: PitchRange = PitchRange::from_midi(36, 60);
    /// C3-G4
    pub const TENOR: PitchRange = PitchRange::from_midi(48, 67);
    /// G3-D5
    pub const ALTO: PitchRange = PitchRange::from_midi(55, 74);
    /// C4-A5
    pub const SOPRANO: PitchRange = PitchRange::from_midi(60, 81);
    /// The whole MIDI domain
    pub const UNBOUNDED: PitchRange = PitchRange::from_midi(0, 127);

    pub fn new(low: Pitch, high: Pitch) -> Self {
        PitchRange { low, high }
    }

    const fn from_midi(low: i32, high: i32) -> Self {
        PitchRange {
            low: Pitch::new(low),
            high: Pitch::new(high),
        }
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        pitch >= self.low && pitch <= self.high
    }

    pub fn center(&self) -> Pitch {
        Pitch::new((self.low.midi() + self.high.midi()) / 2)
    }

    /// Default ranges listed bass first. Four voices get SATB; two are bass
    /// and soprano; three drop the alto; extra voices are filled with altos.
    pub fn defaults(voice_count: usize) -> Vec<PitchRange> {
        match voice_count {
            0 => Vec::new(),
            1 => vec![PitchRange::from_midi(48, 79)],
            2 => vec![PitchRange::BASS, PitchRange::SOPRANO],
            3 => vec![PitchRange::BASS, PitchRange::TENOR, PitchRange::SOPRANO],
            n => {
                let mut ranges = vec![PitchRange::BASS, PitchRange::TENOR];
                ranges.extend(std::iter::repeat(PitchRange::ALTO).take(n - 3));
                ranges.push(PitchRange::SOPRANO);
                ranges
            }
        }
    }
}

/// A chord with one concrete pitch per voice, bass first
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoicedChord {
    chord: Chord,
    pitches: Vec<Pitch>,
}

impl VoicedChord {
    pub fn new(chord: Chord, pitches: Vec<Pitch>) -> Self {
        VoicedChord { chord, pitches }
    }

    pub fn chord(&self) -> &Chord {
        &self.chord
    }

    pub fn pitches(&self) -> &[Pitch] {
        &self.pitches
    }

    pub fn voice_count(&self) -> usize {
        self.pitches.len()
    }
}

impl fmt::Display for VoicedChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pitches: Vec<String> = self.pitches.iter().map(|p| p.to_string()).collect();
        write!(
            f,
            "{} [{}]",
            self.chord.symbol(Spelling::Sharp),
            pitches.join(", ")
        )
    }
}

/// A broken voice-leading rule; voices are indexed bass first
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Violation {
    ParallelFifths { lower: usize, upper: usize },
    ParallelOctaves { lower: usize, upper: usize },
    /// Outer voices moving in similar motion into a fifth, upper voice leaping
    HiddenFifths { lower: usize, upper: usize },
    HiddenOctaves { lower: usize, upper: usize },
    VoiceCrossing { lower: usize, upper: usize },
    Leap { voice: usize, semitones: i32 },
    OutOfRange { voice: usize, pitch: Pitch },
    NonChordTone { voice: usize, pitch: Pitch },
}

impl Violation {
    /// Hidden fifths and octaves are stylistic; everything else is a hard error
    pub fn is_hard(&self) -> bool {
        !matches!(
            self,
            Violation::HiddenFifths { .. } | Violation::HiddenOctaves { .. }
        )
    }

    pub fn is_parallel(&self) -> bool {
        matches!(
            self,
            Violation::ParallelFifths { .. } | Violation::ParallelOctaves { .. }
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ParallelFifths { lower, upper } => {
                write!(f, "parallel fifths (voices {} and {})", lower, upper)
            }
            Violation::ParallelOctaves { lower, upper } => {
                write!(f, "parallel octaves (voices {} and {})", lower, upper)
            }
            Violation::HiddenFifths { lower, upper } => {
                write!(f, "hidden fifths (voices {} and {})", lower, upper)
            }
            Violation::HiddenOctaves { lower, upper } => {
                write!(f, "hidden octaves (voices {} and {})", lower, upper)
            }
            Violation::VoiceCrossing { lower, upper } => {
                write!(f, "voice crossing (voices {} and {})", lower, upper)
            }
            Violation::Leap { voice, semitones } => {
                write!(f, "leap of {} semitones in voice {}", semitones, voice)
            }
            Violation::OutOfRange { voice, pitch } => {
                write!(f, "{} out of range in voice {}", pitch, voice)
            }
            Violation::NonChordTone { voice, pitch } => {
                write!(f, "{} is not a chord tone (voice {})", pitch, voice)
            }
        }
    }
}

/// Grading of one chord arrival: the motion into it and the rules it breaks.
/// Position 0 is the opening chord, which has no motion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoiceLeadingReport {
    pub position: usize,
    /// Total absolute semitone motion across voices
    pub cost: u32,
    pub violations: Vec<Violation>,
}

impl VoiceLeadingReport {
    pub fn hard_violations(&self) -> usize {
        self.violations.iter().filter(|v| v.is_hard()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for VoiceLeadingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} motion {}", self.position, self.cost)?;
        if !self.violations.is_empty() {
            let violations: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
            write!(f, ": {}", violations.join("; "))?;
        }
        Ok(())
    }
}

/// Voice-leading search and grading with a fixed configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceLeader {
    config: VoiceLeadingConfig,
}

impl VoiceLeader {
    pub fn new(config: VoiceLeadingConfig) -> Self {
        VoiceLeader { config }
    }

    pub fn config(&self) -> &VoiceLeadingConfig {
        &self.config
    }

    /// Voice a whole progression and grade the result.
    ///
    /// An empty `ranges` slice selects [`PitchRange::defaults`].
    pub fn voice_progression(
        &self,
        chords: &[Chord],
        voice_count: usize,
        ranges: &[PitchRange],
    ) -> Result<(Vec<VoicedChord>, Vec<VoiceLeadingReport>)> {
        let ranges = resolve_ranges(ranges, voice_count)?;
        let Some((first, rest)) = chords.split_first() else {
            return Ok((Vec::new(), Vec::new()));
        };

        let mut voiced = Vec::with_capacity(chords.len());
        let mut previous = self.seed(first, &ranges)?;
        for chord in rest {
            let (next, _) = self.best_transition(&previous, chord, &ranges)?;
            voiced.push(std::mem::replace(&mut previous, next));
        }
        voiced.push(previous);

        let reports = self.validate(&voiced, &ranges)?;
        debug!(
            chords = voiced.len(),
            voices = voice_count,
            motion = reports.iter().map(|r| r.cost).sum::<u32>(),
            "voiced progression"
        );
        Ok((voiced, reports))
    }

    /// Voice a single chord in close position: bass on the chord's bass
    /// pitch class, upper voices stacked on consecutive chord tones above
    /// it. When no close stack fits the ranges, the voicing nearest the
    /// middle of each range is used instead.
    pub fn seed(&self, chord: &Chord, ranges: &[PitchRange]) -> Result<VoicedChord> {
        let required = self.required_classes(chord, ranges.len())?;
        let pitches = match close_position(chord, ranges, &required) {
            Some(pitches) => pitches,
            None => {
                let centers: Vec<Pitch> = ranges.iter().map(|r| r.center()).collect();
                let (pitches, cost) = self.search(&centers, chord, ranges, false)?;
                trace!(cost, "no close stack fits, seeded from range centers");
                pitches
            }
        };
        trace!(pitches = ?pitches, "seeded opening chord");
        Ok(VoicedChord::new(chord.clone(), pitches))
    }

    /// Cheapest voicing of `chord` reachable from `previous`, with its
    /// penalized cost
    pub fn best_transition(
        &self,
        previous: &VoicedChord,
        chord: &Chord,
        ranges: &[PitchRange],
    ) -> Result<(VoicedChord, u32)> {
        let (pitches, cost) = self.search(previous.pitches(), chord, ranges, true)?;
        Ok((VoicedChord::new(chord.clone(), pitches), cost))
    }

    /// Grade a voiced progression without changing it. Leaps are excused
    /// when the same voice immediately steps back in the opposite direction.
    /// An empty `ranges` slice skips range checks.
    pub fn validate(
        &self,
        voiced: &[VoicedChord],
        ranges: &[PitchRange],
    ) -> Result<Vec<VoiceLeadingReport>> {
        check_voice_counts(voiced, ranges)?;

        let mut reports = Vec::with_capacity(voiced.len());
        for (position, current) in voiced.iter().enumerate() {
            let mut violations = static_violations(current.chord(), current.pitches(), ranges);
            let mut cost = 0;

            if position > 0 {
                let previous = voiced[position - 1].pitches();
                let next = voiced.get(position + 1).map(|v| v.pitches());
                cost = motion(previous, current.pitches());
                for violation in self.transition_violations(previous, current.pitches()) {
                    let excused = match violation {
                        Violation::Leap { voice, semitones } => {
                            resolves_by_step(voice, semitones, current.pitches(), next)
                        }
                        _ => false,
                    };
                    if !excused {
                        violations.push(violation);
                    }
                }
            }

            reports.push(VoiceLeadingReport {
                position,
                cost,
                violations,
            });
        }
        Ok(reports)
    }

    /// Re-run the search transition by transition, keeping the chord sequence
    /// and the opening voicing. An existing arrival is kept unless the search
    /// finds something strictly cheaper, so a second pass changes nothing.
    pub fn optimize(
        &self,
        voiced: &[VoicedChord],
        ranges: &[PitchRange],
    ) -> Result<Vec<VoicedChord>> {
        check_voice_counts(voiced, ranges)?;
        let Some((first, rest)) = voiced.split_first() else {
            return Ok(Vec::new());
        };

        let mut optimized = Vec::with_capacity(voiced.len());
        let mut previous = first.clone();
        for existing in rest {
            let (candidate, best_cost) = self.best_transition(&previous, existing.chord(), ranges)?;
            let existing_cost = self.score(previous.pitches(), existing, ranges);
            let next = if existing_cost.is_some_and(|cost| cost <= best_cost) {
                existing.clone()
            } else {
                candidate
            };
            optimized.push(std::mem::replace(&mut previous, next));
        }
        optimized.push(previous);
        Ok(optimized)
    }

    /// Penalized cost of an existing arrival, or None if it leaves out a
    /// required pitch class
    fn score(
        &self,
        previous: &[Pitch],
        arrival: &VoicedChord,
        ranges: &[PitchRange],
    ) -> Option<u32> {
        let required = self.required_classes(arrival.chord(), arrival.voice_count()).ok()?;
        if !covers(arrival.pitches(), &required) {
            return None;
        }
        Some(self.penalized_cost(previous, arrival.chord(), arrival.pitches(), ranges, true))
    }

    fn search(
        &self,
        previous: &[Pitch],
        chord: &Chord,
        ranges: &[PitchRange],
        transition: bool,
    ) -> Result<(Vec<Pitch>, u32)> {
        let voices = previous.len();
        let required = self.required_classes(chord, voices)?;
        let infeasible = || TheoryError::InfeasibleVoicing {
            chord: chord.symbol(Spelling::Sharp),
            pitch_classes: chord.pitch_classes().len(),
            voices,
        };

        let options: Vec<Vec<Pitch>> = previous
            .iter()
            .enumerate()
            .map(|(voice, &from)| {
                let range = ranges.get(voice).copied().unwrap_or(PitchRange::UNBOUNDED);
                let classes = if voice == 0 && self.config.keep_bass {
                    vec![chord.bass()]
                } else {
                    chord.pitch_classes()
                };
                self.voice_options(from, &classes, range)
            })
            .collect();
        if options.iter().any(|o| o.is_empty()) {
            return Err(infeasible());
        }

        let mut best: Option<(Vec<Pitch>, u32)> = None;
        let mut evaluated = 0usize;
        for_each_combination(&options, |candidate| {
            if !covers(candidate, &required) {
                return;
            }
            evaluated += 1;
            let cost = self.penalized_cost(previous, chord, candidate, ranges, transition);
            if best.as_ref().map_or(true, |(_, b)| cost < *b) {
                best = Some((candidate.to_vec(), cost));
            }
        });
        trace!(
            chord = %chord.symbol(Spelling::Sharp),
            evaluated,
            best = ?best.as_ref().map(|(_, c)| *c),
            "voicing search"
        );

        best.ok_or_else(infeasible)
    }

    /// Pitch classes every voicing must sound; the fifth may go when the
    /// configuration allows it and voices are short
    fn required_classes(&self, chord: &Chord, voices: usize) -> Result<Vec<PitchClass>> {
        let mut required = chord.pitch_classes();
        if required.len() > voices && self.config.omit_fifth {
            if let Some(fifth) = chord.fifth() {
                required.retain(|&pc| pc != fifth);
            }
        }
        if required.len() > voices || voices == 0 {
            return Err(TheoryError::InfeasibleVoicing {
                chord: chord.symbol(Spelling::Sharp),
                pitch_classes: chord.pitch_classes().len(),
                voices,
            });
        }
        Ok(required)
    }

    /// Nearest placements of each class above and below `from`, limited to the
    /// range and the motion neighborhood; falls back to any in-range placement
    fn voice_options(&self, from: Pitch, classes: &[PitchClass], range: PitchRange) -> Vec<Pitch> {
        let neighborhood = self.config.neighborhood as i32;
        let mut options: Vec<Pitch> = classes
            .iter()
            .flat_map(|&pc| [from.next_at_or_above(pc), from.next_at_or_below(pc)])
            .filter(|&p| range.contains(p) && (p - from).abs() <= neighborhood)
            .collect();

        if options.is_empty() {
            options = (range.low.midi()..=range.high.midi())
                .map(Pitch::new)
                .filter(|p| classes.contains(&p.pitch_class()))
                .collect();
        }

        options.sort_by_key(|&p| ((p - from).abs(), p));
        options.dedup();
        options.truncate(self.config.options_per_voice.max(1));
        options
    }

    fn penalized_cost(
        &self,
        previous: &[Pitch],
        chord: &Chord,
        candidate: &[Pitch],
        ranges: &[PitchRange],
        transition: bool,
    ) -> u32 {
        let mut violations = static_violations(chord, candidate, ranges);
        if transition {
            violations.extend(self.transition_violations(previous, candidate));
        }
        let hard = violations.iter().filter(|v| v.is_hard()).count() as u32;
        let soft = violations.len() as u32 - hard;
        motion(previous, candidate)
            + hard * self.config.hard_penalty
            + soft * self.config.soft_penalty
    }

    /// Rules that depend on motion between two voicings
    fn transition_violations(&self, from: &[Pitch], to: &[Pitch]) -> Vec<Violation> {
        let mut violations = Vec::new();
        let voices = from.len().min(to.len());

        for lower in 0..voices {
            for upper in lower + 1..voices {
                let lower_motion = to[lower] - from[lower];
                let upper_motion = to[upper] - from[upper];
                if !similar_motion(lower_motion, upper_motion) {
                    continue;
                }
                let before = (from[upper] - from[lower]).rem_euclid(12);
                let after = (to[upper] - to[lower]).rem_euclid(12);
                match (before, after) {
                    (7, 7) => violations.push(Violation::ParallelFifths { lower, upper }),
                    (0, 0) => violations.push(Violation::ParallelOctaves { lower, upper }),
                    _ => {}
                }
            }
        }

        // Hidden perfect intervals are only checked between the outer voices
        if voices >= 2 {
            let (lower, upper) = (0, voices - 1);
            let lower_motion = to[lower] - from[lower];
            let upper_motion = to[upper] - from[upper];
            let before = (from[upper] - from[lower]).rem_euclid(12);
            let after = (to[upper] - to[lower]).rem_euclid(12);
            if similar_motion(lower_motion, upper_motion)
                && before != after
                && upper_motion.abs() > 2
            {
                match after {
                    7 => violations.push(Violation::HiddenFifths { lower, upper }),
                    0 => violations.push(Violation::HiddenOctaves { lower, upper }),
                    _ => {}
                }
            }
        }

        let max_leap = self.config.max_leap as i32;
        for voice in 0..voices {
            let semitones = to[voice] - from[voice];
            if semitones.abs() > max_leap {
                violations.push(Violation::Leap { voice, semitones });
            }
        }

        violations
    }
}

/// Relative motion of two voices across one chord change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Motion {
    /// Same direction, same distance
    Parallel,
    Similar,
    Contrary,
    /// At least one voice holds
    Oblique,
}

impl fmt::Display for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Motion::Parallel => "parallel",
            Motion::Similar => "similar",
            Motion::Contrary => "contrary",
            Motion::Oblique => "oblique",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoicePairMotion {
    pub lower: usize,
    pub upper: usize,
    pub motion: Motion,
    pub before: IntervalName,
    pub after: IntervalName,
}

/// Motion of every voice pair between two voicings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionAnalysis {
    pub pairs: Vec<VoicePairMotion>,
    /// Summed absolute semitone motion across voices
    pub total_motion: u32,
    pub largest_leap: u32,
}

impl MotionAnalysis {
    pub fn count(&self, motion: Motion) -> usize {
        self.pairs.iter().filter(|p| p.motion == motion).count()
    }
}

/// Classify the motion of each voice pair from `from` to `to`, voices
/// indexed bass first. Extra voices on the longer side are ignored.
pub fn analyze_voice_motion(from: &[Pitch], to: &[Pitch]) -> MotionAnalysis {
    let voices = from.len().min(to.len());
    let (from, to) = (&from[..voices], &to[..voices]);

    let mut pairs = Vec::new();
    for lower in 0..voices {
        for upper in lower + 1..voices {
            let a = to[lower] - from[lower];
            let b = to[upper] - from[upper];
            let motion = if a == 0 || b == 0 {
                Motion::Oblique
            } else if !similar_motion(a, b) {
                Motion::Contrary
            } else if a == b {
                Motion::Parallel
            } else {
                Motion::Similar
            };
            pairs.push(VoicePairMotion {
                lower,
                upper,
                motion,
                before: IntervalName::from_semitones(from[upper] - from[lower]),
                after: IntervalName::from_semitones(to[upper] - to[lower]),
            });
        }
    }

    MotionAnalysis {
        pairs,
        total_motion: motion(from, to),
        largest_leap: from
            .iter()
            .zip(to)
            .map(|(&a, &b)| (b - a).unsigned_abs())
            .max()
            .unwrap_or(0),
    }
}

fn resolve_ranges(ranges: &[PitchRange], voice_count: usize) -> Result<Vec<PitchRange>> {
    if ranges.is_empty() {
        return Ok(PitchRange::defaults(voice_count));
    }
    if ranges.len() != voice_count {
        return Err(TheoryError::VoiceCountMismatch {
            position: 0,
            expected: voice_count,
            found: ranges.len(),
        });
    }
    Ok(ranges.to_vec())
}

fn check_voice_counts(voiced: &[VoicedChord], ranges: &[PitchRange]) -> Result<()> {
    let Some(expected) = voiced.first().map(|v| v.voice_count()) else {
        return Ok(());
    };
    for (position, chord) in voiced.iter().enumerate() {
        if chord.voice_count() != expected {
            return Err(TheoryError::VoiceCountMismatch {
                position,
                expected,
                found: chord.voice_count(),
            });
        }
    }
    if !ranges.is_empty() && ranges.len() != expected {
        return Err(TheoryError::VoiceCountMismatch {
            position: 0,
            expected,
            found: ranges.len(),
        });
    }
    Ok(())
}

/// Rules that apply to a single voicing
fn static_violations(chord: &Chord, pitches: &[Pitch], ranges: &[PitchRange]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let classes = chord.pitch_classes();

    for (voice, &pitch) in pitches.iter().enumerate() {
        if !classes.contains(&pitch.pitch_class()) {
            violations.push(Violation::NonChordTone { voice, pitch });
        }
        if let Some(range) = ranges.get(voice) {
            if !range.contains(pitch) {
                violations.push(Violation::OutOfRange { voice, pitch });
            }
        }
    }

    for (lower, pair) in pitches.windows(2).enumerate() {
        if pair[0] > pair[1] {
            violations.push(Violation::VoiceCrossing {
                lower,
                upper: lower + 1,
            });
        }
    }

    violations
}

/// Close-position stacks over `ranges`, one per required tone the first
/// upper voice can start on. Of those covering `required`, the one nearest
/// the range centers wins.
fn close_position(
    chord: &Chord,
    ranges: &[PitchRange],
    required: &[PitchClass],
) -> Option<Vec<Pitch>> {
    let (bass_range, upper) = ranges.split_first()?;
    let center = bass_range.center();
    let bass = [
        center.next_at_or_below(chord.bass()),
        center.next_at_or_above(chord.bass()),
    ]
    .into_iter()
    .filter(|&p| bass_range.contains(p))
    .min_by_key(|&p| ((p - center).abs(), p))?;

    required
        .iter()
        .filter_map(|&start| {
            let mut pitches = vec![bass];
            for (voice, range) in upper.iter().enumerate() {
                let floor = (*pitches.last()? + 1).max(range.low);
                let next = if voice == 0 {
                    floor.next_at_or_above(start)
                } else {
                    required.iter().map(|&pc| floor.next_at_or_above(pc)).min()?
                };
                if !range.contains(next) {
                    return None;
                }
                pitches.push(next);
            }
            covers(&pitches, required).then_some(pitches)
        })
        .min_by_key(|pitches| {
            pitches
                .iter()
                .zip(ranges)
                .skip(1)
                .map(|(&p, range)| (p - range.center()).unsigned_abs())
                .sum::<u32>()
        })
}

fn similar_motion(a: i32, b: i32) -> bool {
    a != 0 && b != 0 && a.signum() == b.signum()
}

fn motion(from: &[Pitch], to: &[Pitch]) -> u32 {
    from.iter()
        .zip(to)
        .map(|(&a, &b)| (b - a).unsigned_abs())
        .sum()
}

fn covers(pitches: &[Pitch], required: &[PitchClass]) -> bool {
    required
        .iter()
        .all(|pc| pitches.iter().any(|p| p.pitch_class() == *pc))
}

/// A leap is recovered when the voice's next move is a step back
fn resolves_by_step(voice: usize, leap: i32, current: &[Pitch], next: Option<&[Pitch]>) -> bool {
    let Some(next) = next else {
        return false;
    };
    match (current.get(voice), next.get(voice)) {
        (Some(&here), Some(&there)) => {
            let step = there - here;
            (1..=2).contains(&step.abs()) && step.signum() == -leap.signum()
        }
        _ => false,
    }
}

/// Visit every assignment that picks one option per voice, in lexicographic
/// order of option indices
fn for_each_combination(options: &[Vec<Pitch>], mut visit: impl FnMut(&[Pitch])) {
    if options.is_empty() || options.iter().any(|o| o.is_empty()) {
        return;
    }
    let mut indices = vec![0usize; options.len()];
    let mut candidate: Vec<Pitch> = options.iter().map(|o| o[0]).collect();

    loop {
        visit(&candidate);

        let mut voice = options.len();
        loop {
            if voice == 0 {
                return;
            }
            voice -= 1;
            indices[voice] += 1;
            if indices[voice] < options[voice].len() {
                candidate[voice] = options[voice][indices[voice]];
                break;
            }
            indices[voice] = 0;
            candidate[voice] = options[voice][0];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chord::{ChordQuality, Voicing};

    fn chord(symbol: &str) -> Chord {
        Chord::from_symbol(symbol).unwrap()
    }

    fn voiced(symbol: &str, midi: &[i32]) -> VoicedChord {
        VoicedChord::new(chord(symbol), midi.iter().map(|&m| Pitch::new(m)).collect())
    }

    fn progression(symbols: &[&str]) -> Vec<Chord> {
        symbols.iter().map(|s| chord(s)).collect()
    }

    #[test]
    fn test_default_ranges() {
        assert_eq!(PitchRange::defaults(4).len(), 4);
        assert_eq!(PitchRange::defaults(4)[0], PitchRange::BASS);
        assert_eq!(PitchRange::defaults(4)[3], PitchRange::SOPRANO);
        assert_eq!(
            PitchRange::defaults(2),
            vec![PitchRange::BASS, PitchRange::SOPRANO]
        );
        let six = PitchRange::defaults(6);
        assert_eq!(six.len(), 6);
        assert_eq!(six[2], PitchRange::ALTO);
        assert_eq!(six[4], PitchRange::ALTO);
    }

    #[test]
    fn test_seed_is_close_position() {
        let leader = VoiceLeader::default();
        let ranges = PitchRange::defaults(4);
        let c = leader.seed(&chord("C"), &ranges).unwrap();
        assert_eq!(c.pitches(), &[48, 60, 64, 67].map(Pitch::new));
        for symbol in ["G", "Am", "G7", "Dm", "Bb", "F#m"] {
            let seeded = leader.seed(&chord(symbol), &ranges).unwrap();
            let p = seeded.pitches();
            assert!(p[3] - p[1] <= 12, "{} seeded as {}", symbol, seeded);
            assert!(p.windows(2).all(|w| w[0] < w[1]), "{}", seeded);
            let reports = leader.validate(&[seeded.clone()], &ranges).unwrap();
            assert!(reports[0].is_clean(), "{}", reports[0]);
        }
    }

    #[test]
    fn test_seed_falls_back_when_ranges_are_tight() {
        let leader = VoiceLeader::default();
        // No chord tone above the tenor's E fits the alto
        let ranges = [
            PitchRange::BASS,
            PitchRange::new(Pitch::new(52), Pitch::new(53)),
            PitchRange::new(Pitch::new(48), Pitch::new(54)),
            PitchRange::SOPRANO,
        ];
        let seeded = leader.seed(&chord("C"), &ranges).unwrap();
        assert!(covers(
            seeded.pitches(),
            &[PitchClass::C, PitchClass::E, PitchClass::G]
        ));
    }

    #[test]
    fn test_seed_covers_chord() {
        let leader = VoiceLeader::default();
        let seeded = leader
            .seed(&chord("C"), &PitchRange::defaults(4))
            .unwrap();
        let pitches = seeded.pitches();
        assert_eq!(pitches.len(), 4);
        assert_eq!(pitches[0].pitch_class(), PitchClass::C);
        assert!(covers(pitches, &[PitchClass::C, PitchClass::E, PitchClass::G]));
        assert!(pitches.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_detects_parallel_fifths() {
        let leader = VoiceLeader::default();
        // C-G in bass and soprano moving up to D-A
        let voicing = vec![voiced("C", &[48, 55, 64, 67]), voiced("Dm", &[50, 57, 65, 69])];
        let reports = leader.validate(&voicing, &[]).unwrap();
        assert!(reports[1]
            .violations
            .contains(&Violation::ParallelFifths { lower: 0, upper: 3 }));
        assert!(reports[1]
            .violations
            .contains(&Violation::ParallelFifths { lower: 0, upper: 1 }));
        assert_eq!(reports[0].cost, 0);
        assert_eq!(reports[1].cost, 7);
    }

    #[test]
    fn test_detects_crossing_and_range() {
        let leader = VoiceLeader::default();
        let voicing = vec![voiced("C", &[48, 67, 64, 84])];
        let reports = leader.validate(&voicing, &PitchRange::defaults(4)).unwrap();
        assert!(reports[0]
            .violations
            .contains(&Violation::VoiceCrossing { lower: 1, upper: 2 }));
        assert!(reports[0].violations.contains(&Violation::OutOfRange {
            voice: 3,
            pitch: Pitch::new(84)
        }));
        // No ranges, no range checks
        let unranged = leader.validate(&voicing, &[]).unwrap();
        assert_eq!(unranged[0].violations.len(), 1);
    }

    #[test]
    fn test_non_chord_tone() {
        let leader = VoiceLeader::default();
        let voicing = vec![voiced("C", &[48, 55, 62, 64])];
        let reports = leader.validate(&voicing, &[]).unwrap();
        assert_eq!(
            reports[0].violations,
            vec![Violation::NonChordTone {
                voice: 2,
                pitch: Pitch::new(62)
            }]
        );
    }

    #[test]
    fn test_leap_excused_by_step_back() {
        let leader = VoiceLeader::default();
        // Soprano leaps E4 -> C5 (8 is allowed) then E4 -> D5 (10) and steps back to C5
        let recovered = vec![
            voiced("C", &[48, 55, 60, 64]),
            voiced("G", &[43, 55, 62, 74]),
            voiced("C", &[48, 55, 64, 72]),
        ];
        let reports = leader.validate(&recovered, &[]).unwrap();
        assert!(!reports[1]
            .violations
            .iter()
            .any(|v| matches!(v, Violation::Leap { voice: 3, .. })));

        let unrecovered = vec![
            voiced("C", &[48, 55, 60, 64]),
            voiced("G", &[43, 55, 62, 74]),
            voiced("G", &[43, 55, 62, 79]),
        ];
        let reports = leader.validate(&unrecovered, &[]).unwrap();
        assert!(reports[1]
            .violations
            .contains(&Violation::Leap { voice: 3, semitones: 10 }));
    }

    #[test]
    fn test_hidden_octaves_are_soft() {
        let leader = VoiceLeader::default();
        // Bass and soprano rise together into an octave, soprano leaping
        let voicing = vec![voiced("C", &[48, 55, 64, 76]), voiced("G", &[55, 59, 62, 79])];
        let reports = leader.validate(&voicing, &[]).unwrap();
        let hidden = Violation::HiddenOctaves { lower: 0, upper: 3 };
        assert!(reports[1].violations.contains(&hidden));
        assert!(!hidden.is_hard());
    }

    #[test]
    fn test_voice_progression_avoids_parallels() {
        let leader = VoiceLeader::default();
        let chords = progression(&["C", "F", "G", "C", "Am", "Dm", "G7", "C"]);
        let (voiced, reports) = leader.voice_progression(&chords, 4, &[]).unwrap();
        assert_eq!(voiced.len(), chords.len());
        assert_eq!(reports.len(), chords.len());
        for report in &reports {
            assert!(
                !report.violations.iter().any(|v| v.is_parallel()),
                "{}",
                report
            );
        }
        for (v, c) in voiced.iter().zip(&chords) {
            assert_eq!(v.pitches()[0].pitch_class(), c.bass());
        }
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let leader = VoiceLeader::default();
        let clumsy = vec![
            voiced("C", &[48, 55, 64, 72]),
            voiced("F", &[41, 60, 69, 77]),
            voiced("G", &[43, 59, 62, 67]),
            voiced("C", &[48, 55, 64, 72]),
        ];
        let once = leader.optimize(&clumsy, &[]).unwrap();
        let twice = leader.optimize(&once, &[]).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once[0], clumsy[0]);
        assert_ne!(once[1], clumsy[1]);
    }

    #[test]
    fn test_infeasible_voicing() {
        let leader = VoiceLeader::default();
        let ninth =
            Chord::build(PitchClass::G, ChordQuality::Dominant9, 0, Voicing::Close).unwrap();
        let err = leader.voice_progression(&[ninth.clone()], 4, &[]);
        assert!(matches!(
            err,
            Err(TheoryError::InfeasibleVoicing {
                pitch_classes: 5,
                voices: 4,
                ..
            })
        ));

        let omitting = VoiceLeader::new(VoiceLeadingConfig::default().with_omit_fifth(true));
        let (voiced, _) = omitting.voice_progression(&[ninth], 4, &[]).unwrap();
        assert!(!voiced[0]
            .pitches()
            .iter()
            .any(|p| p.pitch_class() == PitchClass::D));
    }

    #[test]
    fn test_mismatched_voice_counts() {
        let leader = VoiceLeader::default();
        let voicing = vec![voiced("C", &[48, 55, 64, 72]), voiced("G", &[43, 62, 71])];
        assert_eq!(
            leader.validate(&voicing, &[]),
            Err(TheoryError::VoiceCountMismatch {
                position: 1,
                expected: 4,
                found: 3
            })
        );
        assert!(leader
            .voice_progression(&progression(&["C"]), 4, &PitchRange::defaults(3))
            .is_err());
    }

    #[test]
    fn test_empty_progression() {
        let leader = VoiceLeader::default();
        let (voiced, reports) = leader.voice_progression(&[], 4, &[]).unwrap();
        assert!(voiced.is_empty());
        assert!(reports.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_reports_serialize() {
        let leader = VoiceLeader::default();
        let voicing = vec![voiced("C", &[48, 55, 64, 67]), voiced("Dm", &[50, 57, 65, 69])];
        let reports = leader.validate(&voicing, &[]).unwrap();
        let json = serde_json::to_string(&(&voicing, &reports)).unwrap();
        let (voiced_back, reports_back): (Vec<VoicedChord>, Vec<VoiceLeadingReport>) =
            serde_json::from_str(&json).unwrap();
        assert_eq!(voiced_back, voicing);
        assert_eq!(reports_back, reports);
    }

    #[test]
    fn test_voice_motion_classes() {
        let from = [48, 55, 64, 72].map(Pitch::new);
        let to = [50, 57, 65, 69].map(Pitch::new);
        let analysis = analyze_voice_motion(&from, &to);
        assert_eq!(analysis.pairs.len(), 6);
        assert_eq!(analysis.pairs[0].motion, Motion::Parallel);
        assert_eq!(analysis.count(Motion::Parallel), 1);
        assert_eq!(analysis.count(Motion::Similar), 2);
        assert_eq!(analysis.count(Motion::Contrary), 3);
        assert_eq!(analysis.count(Motion::Oblique), 0);
        assert_eq!(analysis.total_motion, 8);
        assert_eq!(analysis.largest_leap, 3);
        // Bass to soprano closes from two octaves to a 12th
        assert_eq!(analysis.pairs[2].before.to_string(), "perfect 15th");
        assert_eq!(analysis.pairs[2].after.to_string(), "perfect 12th");
    }

    #[test]
    fn test_voice_motion_oblique_and_uneven() {
        let held = analyze_voice_motion(&[48, 64].map(Pitch::new), &[48, 65].map(Pitch::new));
        assert_eq!(held.pairs[0].motion, Motion::Oblique);

        let uneven =
            analyze_voice_motion(&[48, 55, 64].map(Pitch::new), &[47, 55].map(Pitch::new));
        assert_eq!(uneven.pairs.len(), 1);
        assert_eq!(uneven.total_motion, 1);
        assert!(analyze_voice_motion(&[], &[]).pairs.is_empty());
    }
}
