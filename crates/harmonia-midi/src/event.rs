//! Symbolic event model.
//!
//! A [`MidiFile`] is a tick resolution plus a list of tracks; each track is a
//! list of [`TimedEvent`]s stamped with absolute ticks. Only the event kinds
//! the pianoroll cares about are modelled; everything else is
//! [`EventKind::Other`].

/// Microseconds per minute, for tempo conversion.
const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// Convert a tempo in microseconds per quarter note to beats per minute.
pub fn micros_to_bpm(micros_per_quarter: u32) -> f64 {
    if micros_per_quarter == 0 {
        return 0.0;
    }
    MICROS_PER_MINUTE / f64::from(micros_per_quarter)
}

/// Convert beats per minute to microseconds per quarter note.
pub fn bpm_to_micros(bpm: f64) -> u32 {
    (MICROS_PER_MINUTE / bpm).round() as u32
}

/// A single event in a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// Key pressed; velocity 0 is a note-off by convention.
    NoteOn {
        /// Channel 0-15
        channel: u8,
        /// MIDI pitch 0-127
        pitch: u8,
        /// Velocity 0-127
        velocity: u8,
    },
    /// Key released.
    NoteOff {
        /// Channel 0-15
        channel: u8,
        /// MIDI pitch 0-127
        pitch: u8,
    },
    /// Instrument change on a channel.
    ProgramChange {
        /// Channel 0-15
        channel: u8,
        /// General MIDI program 0-127
        program: u8,
    },
    /// Tempo change.
    SetTempo {
        /// Microseconds per quarter note
        micros_per_quarter: u32,
    },
    /// Time signature.
    TimeSignature {
        /// Beats per bar
        numerator: u8,
        /// Beat unit (4 = quarter note)
        denominator: u8,
        /// MIDI clocks per metronome click (24 = one click per quarter)
        metronome: u8,
        /// Notated 32nd notes per quarter
        thirty_seconds: u8,
    },
    /// End-of-track marker.
    EndOfTrack,
    /// Anything not modelled above.
    Other,
}

impl EventKind {
    /// Tempo in BPM for [`EventKind::SetTempo`], `None` otherwise.
    pub fn bpm(&self) -> Option<f64> {
        match *self {
            EventKind::SetTempo { micros_per_quarter } => Some(micros_to_bpm(micros_per_quarter)),
            _ => None,
        }
    }
}

/// An event at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    /// Absolute tick from the start of the track
    pub tick: u64,
    /// The event itself
    pub kind: EventKind,
}

impl TimedEvent {
    /// Create an event at `tick`.
    pub fn new(tick: u64, kind: EventKind) -> Self {
        Self { tick, kind }
    }
}

/// Events of one track, in absolute-tick order.
pub type Track = Vec<TimedEvent>;

/// A parsed symbolic music file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MidiFile {
    /// Ticks per quarter note
    pub resolution: u16,
    /// Tracks, in file order
    pub tracks: Vec<Track>,
}

impl MidiFile {
    /// Create an empty file with the given ticks per quarter note.
    pub fn new(resolution: u16) -> Self {
        Self {
            resolution,
            tracks: Vec::new(),
        }
    }

    /// Append a track.
    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    /// Largest tick of any event in any track.
    pub fn max_tick(&self) -> u64 {
        self.tracks
            .iter()
            .flatten()
            .map(|e| e.tick)
            .max()
            .unwrap_or(0)
    }

    /// Total number of events over all tracks.
    pub fn num_events(&self) -> usize {
        self.tracks.iter().map(Vec::len).sum()
    }
}
