//! Analysis profiles for Harmonia.
//!
//! An [`AnalysisProfile`] gathers the spectral, chroma and pianoroll settings
//! in one TOML document that can be loaded, validated, saved, and turned into
//! the option structs of `harmonia-analysis` and `harmonia-midi`.
//!
//! # Features
//!
//! - **Profiles**: Load and save analysis settings from TOML files
//! - **Validation**: Report every out-of-range setting at once
//! - **Factory Profiles**: Built-in profiles for common use cases
//!
//! # Example
//!
//! ```rust,no_run
//! use harmonia_config::{AnalysisProfile, get_factory_profile};
//!
//! let mut profile = get_factory_profile("tuned-chroma").unwrap();
//! profile.spectrogram.hop_size = 1024;
//! profile.validate().unwrap();
//! profile.save("profiles/my_profile.toml").unwrap();
//!
//! let loaded = AnalysisProfile::load("profiles/my_profile.toml").unwrap();
//! let analyzer = loaded.stft_analyzer().unwrap();
//! ```

mod error;
mod profile;

/// Profile validation.
pub mod validation;

/// Factory profiles bundled with the library.
pub mod factory_profiles;

pub use error::ConfigError;
pub use factory_profiles::{
    FACTORY_PROFILE_NAMES, factory_profiles, get_factory_profile, is_factory_profile,
};
pub use profile::{
    AnalysisProfile, ChromaSettings, MetronomeSetting, PianorollSettings, SpectrogramSettings,
    WindowName,
};
pub use validation::{ValidationError, ValidationResult, validate_profile};
