//! Factory profiles bundled with the library.
//!
//! Built-in profiles are always available without external files and serve
//! as starting points for custom ones.

use crate::{AnalysisProfile, ConfigError};

/// Array of factory profile names for external access.
pub static FACTORY_PROFILE_NAMES: &[&str] = &["default", "tuned-chroma", "fine-pianoroll"];

/// TOML content for factory profiles, embedded at compile time.
static FACTORY_PROFILES_TOML: &[(&str, &str)] = &[
    ("default", DEFAULT_PROFILE),
    ("tuned-chroma", TUNED_CHROMA_PROFILE),
    ("fine-pianoroll", FINE_PIANOROLL_PROFILE),
];

/// Default settings throughout.
const DEFAULT_PROFILE: &str = r#"
name = "default"
description = "4096-sample Hann frames, untuned 12-class chroma, one step per click"
sample_rate = 44100

[spectrogram]
window_size = 4096
hop_size = 1024
window = "hann"
complex = false

[chroma]
base_frequency = 261.6255653005986
pitch_classes = 12
tuned = false
tuning_subdivisions = 5

[pianoroll]
oversampling = 1
metronome_policy = "strict"
clear_transient_notes = false
"#;

/// Chroma for recordings not tuned to A440.
const TUNED_CHROMA_PROFILE: &str = r#"
name = "tuned-chroma"
description = "Downsampled long frames with automatic tuning correction"
sample_rate = 11025

[spectrogram]
window_size = 8192
hop_size = 2048
window = "hann"

[chroma]
tuned = true
tuning_subdivisions = 5
"#;

/// Oversampled pianoroll for files with sloppy timing.
const FINE_PIANOROLL_PROFILE: &str = r#"
name = "fine-pianoroll"
description = "Four sub-steps per click, lenient metronome, transient notes cleared"

[pianoroll]
oversampling = 4
metronome_policy = "assume-quarter"
clear_transient_notes = true
"#;

/// Get all factory profiles, skipping any that fail to parse.
pub fn factory_profiles() -> Vec<AnalysisProfile> {
    FACTORY_PROFILES_TOML
        .iter()
        .filter_map(|(_, toml)| AnalysisProfile::from_toml(toml).ok())
        .collect()
}

/// Get a factory profile by name (case-insensitive).
pub fn get_factory_profile(name: &str) -> Result<AnalysisProfile, ConfigError> {
    let name = name.to_ascii_lowercase();
    let (_, toml) = FACTORY_PROFILES_TOML
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| ConfigError::ProfileNotFound(name.clone()))?;
    AnalysisProfile::from_toml(toml)
}

/// Check if a name refers to a factory profile.
pub fn is_factory_profile(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    FACTORY_PROFILE_NAMES.contains(&name.as_str())
}
