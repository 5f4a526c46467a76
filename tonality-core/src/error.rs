//! Error types for the theory engines
//!
//! Every variant is a deterministic input-validation failure and carries the
//! offending input back to the caller. Ambiguous analysis results (chord
//! identification, key detection) are never errors: they come back as ranked
//! or empty candidate lists instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TheoryError {
    #[error("Unknown scale type: {0}")]
    InvalidScaleType(String),

    #[error("Unknown chord quality: {0}")]
    InvalidChordQuality(String),

    #[error("Inversion {inversion} out of range for a chord with {tones} tones")]
    InversionOutOfRange { inversion: usize, tones: usize },

    #[error("Cannot resolve Roman numeral: {0}")]
    UnresolvableNumeral(String),

    #[error("Pitch histogram has no weight")]
    EmptyPitchInput,

    #[error("Cannot voice {chord} ({pitch_classes} pitch classes) with {voices} voices")]
    InfeasibleVoicing {
        chord: String,
        pitch_classes: usize,
        voices: usize,
    },

    #[error("Invalid note name: {0}")]
    InvalidNoteName(String),

    #[error("Pitch class must be 0-11, got {0}")]
    InvalidPitchClass(u8),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid chord symbol: {0}")]
    InvalidChordSymbol(String),

    #[error("Chord {position} has {found} voices, expected {expected}")]
    VoiceCountMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("{windows} windows but {boundaries} window boundaries")]
    WindowBoundaryMismatch { windows: usize, boundaries: usize },
}

pub type Result<T> = std::result::Result<T, TheoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_echo_input() {
        let err = TheoryError::InvalidScaleType("bebop".to_string());
        assert_eq!(err.to_string(), "Unknown scale type: bebop");

        let err = TheoryError::InversionOutOfRange {
            inversion: 3,
            tones: 3,
        };
        assert!(err.to_string().contains("Inversion 3"));

        let err = TheoryError::InfeasibleVoicing {
            chord: "G9".to_string(),
            pitch_classes: 5,
            voices: 4,
        };
        assert!(err.to_string().contains("G9"));
    }
}
