//! Analysis profile file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use harmonia_analysis::{ChromaOptions, SpectrumMode, StftAnalyzer, Window};
use harmonia_midi::{ExtractOptions, MetronomePolicy};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_profile};

/// Analysis window shape as written in profile files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WindowName {
    /// No windowing
    Rectangular,
    /// Hann window
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
}

impl From<WindowName> for Window {
    fn from(name: WindowName) -> Self {
        match name {
            WindowName::Rectangular => Window::Rectangular,
            WindowName::Hann => Window::Hann,
            WindowName::Hamming => Window::Hamming,
            WindowName::Blackman => Window::Blackman,
        }
    }
}

/// Metronome handling as written in profile files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MetronomeSetting {
    /// Conflicting metronome values are an error
    #[default]
    Strict,
    /// Always assume one click per quarter note
    AssumeQuarter,
}

impl From<MetronomeSetting> for MetronomePolicy {
    fn from(setting: MetronomeSetting) -> Self {
        match setting {
            MetronomeSetting::Strict => MetronomePolicy::Strict,
            MetronomeSetting::AssumeQuarter => MetronomePolicy::AssumeQuarter,
        }
    }
}

/// `[spectrogram]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectrogramSettings {
    /// Samples per analysis frame.
    pub window_size: usize,
    /// Samples between frame starts.
    pub hop_size: usize,
    /// Analysis window.
    pub window: WindowName,
    /// Keep phase (full complex spectra) instead of magnitudes.
    pub complex: bool,
}

impl Default for SpectrogramSettings {
    fn default() -> Self {
        Self {
            window_size: 4096,
            hop_size: 1024,
            window: WindowName::Hann,
            complex: false,
        }
    }
}

/// `[chroma]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChromaSettings {
    /// Frequency in Hz of pitch class 0.
    pub base_frequency: f64,
    /// Number of output pitch classes.
    pub pitch_classes: usize,
    /// Estimate and correct tuning.
    pub tuned: bool,
    /// Fine bins per pitch class during tuning estimation.
    pub tuning_subdivisions: usize,
}

impl Default for ChromaSettings {
    fn default() -> Self {
        let options = ChromaOptions::default();
        Self {
            base_frequency: options.base_frequency,
            pitch_classes: options.pitch_classes,
            tuned: options.tuned,
            tuning_subdivisions: options.tuning_subdivisions,
        }
    }
}

/// `[pianoroll]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PianorollSettings {
    /// Internal time steps per output step.
    pub oversampling: usize,
    /// Metronome conflict handling.
    pub metronome_policy: MetronomeSetting,
    /// Drop transient-instrument notes at each new step.
    pub clear_transient_notes: bool,
}

impl Default for PianorollSettings {
    fn default() -> Self {
        Self {
            oversampling: 1,
            metronome_policy: MetronomeSetting::Strict,
            clear_transient_notes: false,
        }
    }
}

/// Analysis profile: every tunable setting of the spectral, chroma and
/// pianoroll stages in one TOML document.
///
/// # TOML Format
///
/// ```toml
/// name = "default"
/// sample_rate = 44100
///
/// [spectrogram]
/// window_size = 4096
/// hop_size = 1024
/// window = "hann"
///
/// [chroma]
/// tuned = true
///
/// [pianoroll]
/// oversampling = 4
/// metronome_policy = "assume-quarter"
/// ```
///
/// Missing sections and keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisProfile {
    /// Name of the profile.
    pub name: String,

    /// Optional description of the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Sample rate audio is brought down to before analysis.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Spectral transform settings.
    #[serde(default)]
    pub spectrogram: SpectrogramSettings,

    /// Chroma projection settings.
    #[serde(default)]
    pub chroma: ChromaSettings,

    /// Pianoroll extraction settings.
    #[serde(default)]
    pub pianoroll: PianorollSettings,
}

fn default_sample_rate() -> u32 {
    44100
}

impl AnalysisProfile {
    /// Create a profile with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            sample_rate: default_sample_rate(),
            spectrogram: SpectrogramSettings::default(),
            chroma: ChromaSettings::default(),
            pianoroll: PianorollSettings::default(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the target sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Load a profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let profile: AnalysisProfile = toml::from_str(&content)?;
        Ok(profile)
    }

    /// Load a profile from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the profile to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the profile to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every setting, reporting all violations at once.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_profile(self)
    }

    /// Build the STFT analyzer described by `[spectrogram]`.
    pub fn stft_analyzer(&self) -> Result<StftAnalyzer, ConfigError> {
        let settings = &self.spectrogram;
        Ok(StftAnalyzer::new(
            settings.window_size,
            settings.hop_size,
            settings.window.into(),
        )?)
    }

    /// Spectrum mode described by `[spectrogram]`.
    pub fn spectrum_mode(&self) -> SpectrumMode {
        if self.spectrogram.complex {
            SpectrumMode::Complex
        } else {
            SpectrumMode::Magnitude
        }
    }

    /// Chroma options described by `[chroma]`.
    pub fn chroma_options(&self) -> ChromaOptions {
        ChromaOptions {
            base_frequency: self.chroma.base_frequency,
            pitch_classes: self.chroma.pitch_classes,
            tuned: self.chroma.tuned,
            tuning_subdivisions: self.chroma.tuning_subdivisions,
        }
    }

    /// Pianoroll options described by `[pianoroll]`.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            oversampling: self.pianoroll.oversampling,
            metronome_policy: self.pianoroll.metronome_policy.into(),
            clear_transient_notes: self.pianoroll.clear_transient_notes,
        }
    }

    /// Integer factor that brings `source_rate` down to at most the
    /// profile's sample rate (1 when no reduction is needed).
    pub fn downsample_factor(&self, source_rate: u32) -> usize {
        if self.sample_rate == 0 {
            return 1;
        }
        source_rate.div_ceil(self.sample_rate).max(1) as usize
    }
}

impl Default for AnalysisProfile {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults() {
        let profile = AnalysisProfile::default();
        assert_eq!(profile.name, "default");
        assert!(profile.description.is_none());
        assert_eq!(profile.sample_rate, 44100);
        assert_eq!(profile.spectrogram.window_size, 4096);
        assert_eq!(profile.spectrogram.hop_size, 1024);
        assert_eq!(profile.spectrogram.window, WindowName::Hann);
        assert_eq!(profile.chroma.pitch_classes, 12);
        assert!((profile.chroma.base_frequency - 261.625_565).abs() < 1e-5);
        assert_eq!(profile.pianoroll.oversampling, 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
name = "short"

[spectrogram]
window_size = 1024
window = "blackman"

[pianoroll]
metronome_policy = "assume-quarter"
"#;
        let profile = AnalysisProfile::from_toml(toml_str).unwrap();
        assert_eq!(profile.spectrogram.window_size, 1024);
        assert_eq!(profile.spectrogram.hop_size, 1024);
        assert_eq!(profile.spectrogram.window, WindowName::Blackman);
        assert_eq!(profile.chroma, ChromaSettings::default());
        assert_eq!(
            profile.extract_options().metronome_policy,
            MetronomePolicy::AssumeQuarter
        );
    }

    #[test]
    fn test_unknown_window_rejected() {
        let toml_str = r#"
name = "bad"
[spectrogram]
window = "kaiser"
"#;
        assert!(matches!(
            AnalysisProfile::from_toml(toml_str),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut profile = AnalysisProfile::new("Round Trip").with_description("all sections");
        profile.chroma.tuned = true;
        profile.pianoroll.oversampling = 3;
        profile.spectrogram.complex = true;

        let toml_str = profile.to_toml().unwrap();
        assert!(toml_str.contains("[chroma]"));
        let loaded = AnalysisProfile::from_toml(&toml_str).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_conversions() {
        let mut profile = AnalysisProfile::default();
        profile.spectrogram.window = WindowName::Hamming;
        profile.spectrogram.hop_size = 512;
        profile.chroma.tuned = true;
        profile.pianoroll.clear_transient_notes = true;

        let analyzer = profile.stft_analyzer().unwrap();
        assert_eq!(analyzer.window_size(), 4096);
        assert_eq!(analyzer.hop_size(), 512);
        assert_eq!(profile.spectrum_mode(), SpectrumMode::Magnitude);

        let chroma = profile.chroma_options();
        assert!(chroma.tuned);
        assert_eq!(chroma.tuning_subdivisions, 5);

        let extract = profile.extract_options();
        assert!(extract.clear_transient_notes);
        assert_eq!(extract.oversampling, 1);
    }

    #[test]
    fn test_zero_hop_rejected_by_analyzer() {
        let mut profile = AnalysisProfile::default();
        profile.spectrogram.hop_size = 0;
        assert!(matches!(
            profile.stft_analyzer(),
            Err(ConfigError::Analysis(_))
        ));
    }

    #[test]
    fn test_downsample_factor() {
        let profile = AnalysisProfile::default().with_sample_rate(11025);
        assert_eq!(profile.downsample_factor(44100), 4);
        assert_eq!(profile.downsample_factor(48000), 5);
        assert_eq!(profile.downsample_factor(8000), 1);
        assert_eq!(profile.downsample_factor(11025), 1);
    }
}
