//! Equal-tempered pitch table.
//!
//! Maps note names (with octave) to fundamental frequency and MIDI pitch
//! number. The table covers octaves 0 through 6 and registers every note
//! under both its canonical spelling and its enharmonic alias, so `"C#4"`
//! and `"Db4"` resolve to two distinct [`Note`]s sharing frequency and pitch.
//!
//! ```rust
//! use harmonia_core::pitch::PitchTable;
//!
//! let table = PitchTable::standard();
//! let a4 = table.note("A4").unwrap();
//! assert_eq!(a4.midi_pitch(), 69);
//! assert!((a4.frequency() - 440.0).abs() < 1e-9);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Canonical pitch-class spellings, index = pitch class.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Enharmonic spellings, listed in both directions.
const ENHARMONIC_EQUIVALENTS: [(&str, &str); 18] = [
    ("C#", "Db"),
    ("Db", "C#"),
    ("D#", "Eb"),
    ("Eb", "D#"),
    ("E", "Fb"),
    ("Fb", "E"),
    ("E#", "F"),
    ("F", "E#"),
    ("F#", "Gb"),
    ("Gb", "F#"),
    ("G#", "Ab"),
    ("Ab", "G#"),
    ("A#", "Bb"),
    ("Bb", "A#"),
    ("B", "Cb"),
    ("Cb", "B"),
    ("B#", "C"),
    ("C", "B#"),
];

/// Lowest octave in the table.
pub const MIN_OCTAVE: i32 = 0;
/// Highest octave in the table.
pub const MAX_OCTAVE: i32 = 6;

/// Concert pitch of A4 in Hz.
pub const A4_FREQUENCY: f64 = 440.0;

/// Octave holding the 440 Hz reference A.
const REFERENCE_OCTAVE: i32 = 4;

fn enharmonic(name: &str) -> Option<&'static str> {
    ENHARMONIC_EQUIVALENTS
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
}

/// A named note with its fundamental frequency and MIDI pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    name: String,
    frequency: f64,
    midi_pitch: u8,
}

impl Note {
    /// Note name including octave, e.g. `"Gb3"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fundamental frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// MIDI pitch number (middle C = 60).
    pub fn midi_pitch(&self) -> u8 {
        self.midi_pitch
    }

    /// Pitch class 0-11, C = 0.
    pub fn pitch_class(&self) -> u8 {
        self.midi_pitch % 12
    }
}

/// Immutable lookup from note name to [`Note`].
///
/// Build one with [`PitchTable::new`] or share the process-wide instance
/// from [`PitchTable::standard`].
#[derive(Debug, Clone)]
pub struct PitchTable {
    notes: HashMap<String, Note>,
    frequencies: BTreeMap<u8, f64>,
}

impl PitchTable {
    /// Build the table for octaves [`MIN_OCTAVE`]..=[`MAX_OCTAVE`].
    pub fn new() -> Self {
        let mut notes = HashMap::new();
        let mut frequencies = BTreeMap::new();

        for octave in MIN_OCTAVE..=MAX_OCTAVE {
            for (class, &canonical) in NOTE_NAMES.iter().enumerate() {
                let class = class as i32;
                let distance_from_a4 = (octave - REFERENCE_OCTAVE) * 12 + class - 9;
                let frequency = A4_FREQUENCY * 2f64.powf(f64::from(distance_from_a4) / 12.0);
                let midi_pitch = ((octave + 1) * 12 + class) as u8;

                frequencies.insert(midi_pitch, frequency);

                let spellings = std::iter::once(canonical).chain(enharmonic(canonical));
                for spelling in spellings {
                    let name = format!("{spelling}{octave}");
                    notes.insert(
                        name.clone(),
                        Note {
                            name,
                            frequency,
                            midi_pitch,
                        },
                    );
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(notes = notes.len(), "pitch table built");

        Self { notes, frequencies }
    }

    /// Shared table, built on first use.
    pub fn standard() -> &'static PitchTable {
        static TABLE: OnceLock<PitchTable> = OnceLock::new();
        TABLE.get_or_init(PitchTable::new)
    }

    /// Resolve a note by its full name, e.g. `"A4"` or `"Db2"`.
    pub fn note(&self, name: &str) -> Result<&Note> {
        self.notes
            .get(name)
            .ok_or_else(|| Error::UnknownNote(name.to_string()))
    }

    /// Resolve a note from a pitch-class spelling and an octave.
    pub fn lookup(&self, class_name: &str, octave: i32) -> Result<&Note> {
        self.note(&format!("{class_name}{octave}"))
    }

    /// Frequency of a tabulated MIDI pitch.
    pub fn pitch_to_frequency(&self, midi_pitch: i32) -> Result<f64> {
        u8::try_from(midi_pitch)
            .ok()
            .and_then(|p| self.frequencies.get(&p).copied())
            .ok_or_else(|| Error::UnknownNote(midi_pitch.to_string()))
    }

    /// Number of named notes, aliases included.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// `true` if the table holds no notes.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// All notes ordered by MIDI pitch, then name.
    pub fn notes(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.values().collect();
        notes.sort_by(|a, b| {
            a.midi_pitch
                .cmp(&b.midi_pitch)
                .then_with(|| a.name.cmp(&b.name))
        });
        notes
    }
}

impl Default for PitchTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Pitch class (0-11) of a spelling such as `"F#"` or `"Cb"`.
pub fn note_number(class_name: &str) -> Result<u8> {
    let canonical = if NOTE_NAMES.contains(&class_name) {
        class_name
    } else {
        enharmonic(class_name).ok_or_else(|| Error::UnknownNote(class_name.to_string()))?
    };

    NOTE_NAMES
        .iter()
        .position(|&n| n == canonical)
        .map(|i| i as u8)
        .ok_or_else(|| Error::UnknownNote(class_name.to_string()))
}

/// Canonical name of a MIDI pitch, e.g. 61 -> `"C#4"`.
///
/// Octave numbering matches the table, so pitches below 12 land in
/// octave -1.
pub fn note_name(midi_pitch: i32) -> Result<String> {
    if midi_pitch < 0 {
        return Err(Error::UnknownNote(midi_pitch.to_string()));
    }
    let name = NOTE_NAMES[(midi_pitch % 12) as usize];
    let octave = midi_pitch / 12 - 1;
    Ok(format!("{name}{octave}"))
}

/// Fractional MIDI pitch of a frequency (A4 = 69.0).
#[inline]
pub fn frequency_to_pitch(frequency: f64) -> f64 {
    69.0 + 12.0 * (frequency / A4_FREQUENCY).log2()
}
