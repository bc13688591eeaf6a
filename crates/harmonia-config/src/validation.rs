//! Profile validation.
//!
//! Checks every numeric setting of an [`AnalysisProfile`] and reports all
//! violations together, so a hand-edited file can be fixed in one pass.
//!
//! # Example
//!
//! ```rust
//! use harmonia_config::{AnalysisProfile, ValidationError};
//!
//! let mut profile = AnalysisProfile::default();
//! profile.spectrogram.hop_size = 0;
//! profile.chroma.pitch_classes = 0;
//!
//! match profile.validate() {
//!     Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use thiserror::Error;

use crate::profile::AnalysisProfile;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A setting is outside its allowed range.
    #[error("setting '{setting}' = {value}: {reason}")]
    OutOfRange {
        /// Dotted setting path, e.g. `spectrogram.hop_size`.
        setting: &'static str,
        /// The rejected value.
        value: f64,
        /// What the value must satisfy.
        reason: &'static str,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check(
    errors: &mut Vec<ValidationError>,
    setting: &'static str,
    value: f64,
    valid: bool,
    reason: &'static str,
) {
    if !valid {
        errors.push(ValidationError::OutOfRange {
            setting,
            value,
            reason,
        });
    }
}

/// Validate every setting of a profile.
///
/// A single violation is returned as [`ValidationError::OutOfRange`];
/// several are wrapped in [`ValidationError::Multiple`].
pub fn validate_profile(profile: &AnalysisProfile) -> ValidationResult<()> {
    let mut errors = Vec::new();

    check(
        &mut errors,
        "sample_rate",
        f64::from(profile.sample_rate),
        profile.sample_rate > 0,
        "must be greater than zero",
    );

    let spectrogram = &profile.spectrogram;
    check(
        &mut errors,
        "spectrogram.window_size",
        spectrogram.window_size as f64,
        spectrogram.window_size > 0,
        "must be greater than zero",
    );
    check(
        &mut errors,
        "spectrogram.hop_size",
        spectrogram.hop_size as f64,
        spectrogram.hop_size > 0,
        "must be greater than zero",
    );

    let chroma = &profile.chroma;
    check(
        &mut errors,
        "chroma.base_frequency",
        chroma.base_frequency,
        chroma.base_frequency.is_finite() && chroma.base_frequency > 0.0,
        "must be a positive frequency",
    );
    check(
        &mut errors,
        "chroma.pitch_classes",
        chroma.pitch_classes as f64,
        chroma.pitch_classes > 0,
        "must be greater than zero",
    );
    check(
        &mut errors,
        "chroma.tuning_subdivisions",
        chroma.tuning_subdivisions as f64,
        chroma.tuning_subdivisions > 0,
        "must be greater than zero",
    );

    check(
        &mut errors,
        "pianoroll.oversampling",
        profile.pianoroll.oversampling as f64,
        profile.pianoroll.oversampling > 0,
        "must be greater than zero",
    );

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
