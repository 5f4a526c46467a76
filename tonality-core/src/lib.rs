//! # Tonality Core
//!
//! Deterministic tonal music theory engines with no I/O: scales, chords,
//! Krumhansl-Schmuckler key finding, functional progressions and
//! voice leading.
//!
//! ## Features
//!
//! - **serde**: Enable serialization of configs and value types
//! - **colored**: Enable colored terminal output for chords
//!
//! ## Example
//!
//! ```
//! use tonality_core::types::{parse_numerals, resolve_progression, Key, PitchClass};
//!
//! let key = Key::major(PitchClass::C);
//! let numerals = parse_numerals("ii V7 I").unwrap();
//! let chords = resolve_progression(key, &numerals).unwrap();
//! assert_eq!(chords[1].root(), PitchClass::G);
//! ```

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    EngineConfig, KeyDetectionConfig, KeyProfile, SuggestionConfig, VoiceLeadingConfig,
};
pub use error::{Result, TheoryError};
pub use types::{Chord, ChordQuality, Key, Mode, Pitch, PitchClass, RomanNumeral, Scale, ScaleType};
