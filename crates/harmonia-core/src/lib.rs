//! Harmonia Core - shared building blocks for music analysis
//!
//! This crate holds the pieces every other harmonia crate leans on:
//!
//! - [`pitch`] - Equal-tempered pitch table with enharmonic spellings
//! - [`signal`] - Planar [`SignalBuffer`] with basic slicing operations
//! - [`error`] - The [`Error`] taxonomy shared by the transforms
//!
//! # Example
//!
//! ```rust
//! use harmonia_core::{PitchTable, SignalBuffer, note_number};
//!
//! let c4 = PitchTable::standard().note("C4")?;
//! assert_eq!(c4.midi_pitch(), 60);
//! assert_eq!(note_number("Eb")?, 3);
//!
//! let buffer = SignalBuffer::mono(vec![0.0; 1024], 44100);
//! assert_eq!(buffer.mono_samples()?.len(), 1024);
//! # Ok::<(), harmonia_core::Error>(())
//! ```

pub mod error;
pub mod pitch;
pub mod signal;

pub use error::{Error, Result};
pub use pitch::{
    A4_FREQUENCY, MAX_OCTAVE, MIN_OCTAVE, NOTE_NAMES, Note, PitchTable, frequency_to_pitch,
    note_name, note_number,
};
pub use signal::SignalBuffer;
