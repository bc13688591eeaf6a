//! Harmonia MIDI - symbolic events and pianoroll conversion
//!
//! - [`event`] - Minimal event model with absolute ticks
//! - [`pianoroll`] - Time-quantized pitch activity extraction and
//!   synthesis back to events
//! - [`smf`] - Standard MIDI File reading and writing via `midly`
//!
//! ## Example
//!
//! ```rust
//! use harmonia_midi::{ExtractOptions, SynthesisOptions, pianoroll};
//!
//! // One pitch held for two steps
//! let mut roll = vec![vec![0.0f32; pianoroll::PITCH_RANGE]; 2];
//! roll[0][12] = 1.0;
//! roll[1][12] = 1.0;
//!
//! let file = pianoroll::synthesize(&roll, &SynthesisOptions::default())?;
//! let extracted = pianoroll::extract(&file, &ExtractOptions::default())?;
//! assert_eq!(extracted.data[0][12], 1.0);
//! # Ok::<(), harmonia_midi::Error>(())
//! ```

pub mod event;
pub mod pianoroll;
pub mod smf;

pub use event::{EventKind, MidiFile, TimedEvent, Track};
pub use pianoroll::{
    ExtractOptions, MetronomePolicy, Pianoroll, SynthesisOptions, TempoChange, extract,
    lower_resolution, synthesize,
};

/// Errors from symbolic music processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Time signatures in the file declare different metronome values.
    #[error("multiple metronome values: {first} then {found}")]
    MultipleMetronomes {
        /// First metronome value seen
        first: u8,
        /// Conflicting value
        found: u8,
    },

    /// A pitch fell outside 0..=127.
    #[error("pitch {0} is outside the MIDI range 0-127")]
    InvalidPitch(i32),

    /// The file uses SMPTE timecode instead of ticks per quarter note.
    #[error("unsupported timing: only ticks-per-quarter files are supported")]
    UnsupportedTiming,

    /// Malformed Standard MIDI File.
    #[error("MIDI parse error: {0}")]
    Parse(#[from] midly::Error),

    /// IO error reading or writing a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter or other core error.
    #[error(transparent)]
    Core(#[from] harmonia_core::Error),
}

/// Result type for MIDI operations.
pub type Result<T> = std::result::Result<T, Error>;
