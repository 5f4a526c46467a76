//! Tunable parameters for the analysis and voicing engines
//!
//! Every struct is plain data with sensible defaults; callers override
//! individual fields with the `with_*` builders.

/// Which pair of key-profile weight vectors the key finder correlates against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyProfile {
    /// Krumhansl & Kessler listener ratings of each scale degree
    #[default]
    KrumhanslKessler,
    /// Temperley's revised weights
    Temperley,
}

impl KeyProfile {
    pub fn major(self) -> &'static [f64; 12] {
        match self {
            KeyProfile::KrumhanslKessler => &KRUMHANSL_MAJOR,
            KeyProfile::Temperley => &TEMPERLEY_MAJOR,
        }
    }

    pub fn minor(self) -> &'static [f64; 12] {
        match self {
            KeyProfile::KrumhanslKessler => &KRUMHANSL_MINOR,
            KeyProfile::Temperley => &TEMPERLEY_MINOR,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyProfile::KrumhanslKessler => "krumhansl",
            KeyProfile::Temperley => "temperley",
        }
    }
}

impl std::str::FromStr for KeyProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "krumhansl" | "krumhansl_kessler" | "ks" | "kk" => Ok(KeyProfile::KrumhanslKessler),
            "temperley" => Ok(KeyProfile::Temperley),
            other => Err(format!("Unknown key profile: {}", other)),
        }
    }
}

const KRUMHANSL_MAJOR: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const KRUMHANSL_MINOR: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];
const TEMPERLEY_MAJOR: [f64; 12] = [
    5.0, 2.0, 3.5, 2.0, 4.5, 4.0, 2.0, 4.5, 2.0, 3.5, 1.5, 4.0,
];
const TEMPERLEY_MINOR: [f64; 12] = [
    5.0, 2.0, 3.5, 4.5, 2.0, 4.0, 2.0, 4.5, 3.5, 2.0, 1.5, 4.0,
];

/// Key detection and modulation tracking
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyDetectionConfig {
    pub profile: KeyProfile,
    /// Candidates whose confidence differs by no more than this are ties
    pub tie_epsilon: f64,
    /// Minimum confidence for a new top key to count as a modulation
    pub modulation_threshold: f64,
}

impl Default for KeyDetectionConfig {
    fn default() -> Self {
        Self {
            profile: KeyProfile::KrumhanslKessler,
            tie_epsilon: 0.01,
            modulation_threshold: 0.7,
        }
    }
}

impl KeyDetectionConfig {
    pub fn with_profile(mut self, profile: KeyProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_tie_epsilon(mut self, tie_epsilon: f64) -> Self {
        self.tie_epsilon = tie_epsilon;
        self
    }

    pub fn with_modulation_threshold(mut self, threshold: f64) -> Self {
        self.modulation_threshold = threshold;
        self
    }
}

/// Voice-leading search and constraint parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoiceLeadingConfig {
    /// Largest melodic interval (semitones) allowed without a violation
    pub max_leap: u8,
    /// How far (semitones) a voice may move when generating candidates
    pub neighborhood: u8,
    /// Placements kept per voice, nearest first
    pub options_per_voice: usize,
    /// Cost added for each hard violation
    pub hard_penalty: u32,
    /// Cost added for each soft violation (hidden fifths/octaves)
    pub soft_penalty: u32,
    /// Pin the lowest voice to the chord's bass pitch class
    pub keep_bass: bool,
    /// Allow dropping the perfect fifth when voices run short
    pub omit_fifth: bool,
}

impl Default for VoiceLeadingConfig {
    fn default() -> Self {
        Self {
            max_leap: 9,
            neighborhood: 12,
            options_per_voice: 6,
            hard_penalty: 1000,
            soft_penalty: 8,
            keep_bass: true,
            omit_fifth: false,
        }
    }
}

impl VoiceLeadingConfig {
    pub fn with_max_leap(mut self, max_leap: u8) -> Self {
        self.max_leap = max_leap;
        self
    }

    pub fn with_neighborhood(mut self, neighborhood: u8) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    pub fn with_options_per_voice(mut self, options: usize) -> Self {
        self.options_per_voice = options.max(1);
        self
    }

    pub fn with_penalties(mut self, hard: u32, soft: u32) -> Self {
        self.hard_penalty = hard;
        self.soft_penalty = soft;
        self
    }

    pub fn with_keep_bass(mut self, keep_bass: bool) -> Self {
        self.keep_bass = keep_bass;
        self
    }

    pub fn with_omit_fifth(mut self, omit_fifth: bool) -> Self {
        self.omit_fifth = omit_fifth;
        self
    }
}

/// Weights for next-chord suggestions
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuggestionConfig {
    pub functional_weight: f64,
    pub voice_leading_weight: f64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            functional_weight: 0.7,
            voice_leading_weight: 0.3,
        }
    }
}

impl SuggestionConfig {
    pub fn with_weights(mut self, functional: f64, voice_leading: f64) -> Self {
        self.functional_weight = functional;
        self.voice_leading_weight = voice_leading;
        self
    }
}

/// All engine settings in one place
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    pub key_detection: KeyDetectionConfig,
    pub voice_leading: VoiceLeadingConfig,
    pub suggestion: SuggestionConfig,
}

impl EngineConfig {
    pub fn with_key_detection(mut self, config: KeyDetectionConfig) -> Self {
        self.key_detection = config;
        self
    }

    pub fn with_voice_leading(mut self, config: VoiceLeadingConfig) -> Self {
        self.voice_leading = config;
        self
    }

    pub fn with_suggestion(mut self, config: SuggestionConfig) -> Self {
        self.suggestion = config;
        self
    }
}
