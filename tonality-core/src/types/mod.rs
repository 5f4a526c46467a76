// tonality-core/src/types/mod.rs

pub mod chord;
pub mod event;
pub mod key;
pub mod pitch;
pub mod progression;
pub mod roman_numeral;
pub mod scale;
pub mod time;
pub mod voice_leading;

pub use chord::{
    analyze_chord, build_chord, suggest_substitutions, Chord, ChordCandidate, ChordQuality,
    Substitution, SubstitutionKind, Voicing,
};
pub use event::NoteEvent;
pub use key::{
    analyze_modulations, closely_related_keys, detect_key, leading_ties, pivot_chords, Key,
    KeyCandidate, KeyRelationship, KeySignature, Mode, ModulationEvent, PitchHistogram,
    ScaleDegree,
};
pub use pitch::{IntervalName, Pitch, PitchClass, SimpleInterval, Spelling};
pub use progression::{
    classify_function, common_progressions, identify_cadence, resolve_progression,
    suggest_next_chord, transpose_progression, validate_progression, CadenceType,
    CommonProgression, HarmonicFunction, IssueKind, ProgressionIssue, ProgressionValidation,
    Severity, Style, Suggestion,
};
pub use roman_numeral::*;
pub use scale::{
    build_scale, compare_scales, identify_scale, intervals_between, transpose, DegreeName, Scale,
    ScaleComparison, ScaleMatch, ScaleType,
};
pub use time::{Span, Time};
pub use voice_leading::{
    analyze_voice_motion, Motion, MotionAnalysis, PitchRange, VoiceLeader, VoiceLeadingReport,
    VoicePairMotion, VoicedChord, Violation,
};
