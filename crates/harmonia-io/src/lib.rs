//! Audio file I/O for Harmonia.
//!
//! Decodes WAV files into [`SignalBuffer`](harmonia_core::SignalBuffer)s
//! (one channel per file channel, samples in [-1, 1]) and encodes buffers
//! back to WAV.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use harmonia_io::{read, write_wav};
//!
//! let buffer = read("input.wav")?;
//! let left = buffer.channel(0)?;
//! write_wav("left.wav", &left, 16)?;
//! ```

mod wav;

pub use wav::{WavFormat, WavInfo, read, read_wav, read_wav_info, write_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Decoded samples fall outside [-1, 1].
    #[error("samples out of range: min {min}, max {max}")]
    OutOfRange {
        /// Smallest decoded sample
        min: f32,
        /// Largest decoded sample
        max: f32,
    },

    /// Unsupported file type or invalid buffer.
    #[error(transparent)]
    Core(#[from] harmonia_core::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
