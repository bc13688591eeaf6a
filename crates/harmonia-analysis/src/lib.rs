//! Harmonia Analysis - short-time spectra and chroma features
//!
//! This crate turns mono [`SignalBuffer`](harmonia_core::SignalBuffer)s into
//! time-frequency and time-pitch-class representations:
//!
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`spectrogram`] - STFT analysis, overlap-add resynthesis, peak picking
//!   and harmonic/percussive masking
//! - [`chroma`] - Chroma projection with automatic tuning correction
//!
//! ## Example Workflow
//!
//! ```rust
//! use harmonia_analysis::{ChromaOptions, StftAnalyzer, Window, chroma};
//! use harmonia_core::SignalBuffer;
//!
//! let sample_rate = 11025;
//! let samples: Vec<f32> = (0..sample_rate)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
//!     .collect();
//! let buffer = SignalBuffer::mono(samples, sample_rate as u32);
//!
//! let spectrogram = StftAnalyzer::new(2048, 512, Window::Hann)?.analyze(&buffer)?;
//! let chromagram = chroma::project(&spectrogram, &ChromaOptions::default())?;
//!
//! // A440 folds onto pitch class A
//! assert_eq!(chromagram.dominant_pitch_class(0), Some(9));
//! # Ok::<(), harmonia_core::Error>(())
//! ```

pub mod chroma;
pub mod fft;
pub mod spectrogram;

// Re-export main types
pub use chroma::{ChromaOptions, Chromagram, project, tune};
pub use fft::{Fft, Window};
pub use spectrogram::{
    ComplexSpectrogram, Spectrogram, SpectrumMode, Stft, StftAnalyzer, filter_peaks, forward,
    inverse, median_filter, median_filter_signal, variable_spectra, with_phase,
};
