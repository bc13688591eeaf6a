//! Pianoroll extraction and synthesis.
//!
//! A pianoroll is a dense `[step][pitch]` matrix covering MIDI pitches
//! [`MIN_PITCH`]..[`MAX_PITCH`]. A cell is 1 when the pitch sounds on any
//! non-percussion channel during that step. The step length is one metronome
//! click: the file's ticks per quarter scaled by `metronome / 24`.
//!
//! Extraction walks every track in tick order, threading the per-channel
//! state through a fold. After each event the pitches sounding on any
//! channel are marked in that event's step, so a note that starts and stops
//! within one step still shows up. Pitches that are sounding when the walk
//! moves to a later step are carried through the steps in between, so a
//! held note is a contiguous run of ones from its note-on step up to (not
//! including) the step of its note-off.
//!
//! # Example
//!
//! ```rust
//! use harmonia_midi::{EventKind, ExtractOptions, MidiFile, TimedEvent, pianoroll};
//!
//! let track = vec![
//!     TimedEvent::new(0, EventKind::NoteOn { channel: 0, pitch: 60, velocity: 90 }),
//!     TimedEvent::new(192, EventKind::NoteOff { channel: 0, pitch: 60 }),
//! ];
//! let file = MidiFile::new(96).with_track(track);
//! let roll = pianoroll::extract(&file, &ExtractOptions::default())?;
//!
//! assert_eq!(roll.num_steps(), 3);
//! assert_eq!(roll.active_pitches(1), vec![60]);
//! assert!(roll.active_pitches(2).is_empty());
//! # Ok::<(), harmonia_midi::Error>(())
//! ```

use std::collections::{BTreeSet, HashMap};

use harmonia_core::Error as CoreError;

use crate::event::{EventKind, MidiFile, TimedEvent, bpm_to_micros, micros_to_bpm};
use crate::{Error, Result};

/// Lowest pitch in the roll (C1).
pub const MIN_PITCH: u8 = 24;

/// One past the highest pitch in the roll (C6).
pub const MAX_PITCH: u8 = 84;

/// Number of pitch columns.
pub const PITCH_RANGE: usize = (MAX_PITCH - MIN_PITCH) as usize;

/// General MIDI percussion channel (channel 10, zero-based).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Programs at or above this value are treated as percussion/effects.
pub const PERCUSSION_PROGRAM: u8 = 112;

/// Metronome value for one click per quarter note.
pub const QUARTER_METRONOME: u8 = 24;

/// Plucked and struck instruments whose note-offs are often missing.
///
/// A channel with no program change also counts as transient (piano).
pub const TRANSIENT_PROGRAMS: [u8; 32] = [
    0, 1, 2, 4, 5, 6, 7, 8, 9, 13, 14, 15, // pianos, chromatic percussion
    24, 25, 26, 27, 28, 29, 30, // guitars
    32, 33, 34, 35, 36, 37, 38, // basses
    45, 46, 47, // pizzicato, harp, timpani
    98, 101, 104, // crystal, goblins, sitar
];

/// Ticks per quarter note of synthesized files.
pub const SYNTH_RESOLUTION: u16 = 96;

/// Ticks per roll step in synthesized files.
pub const SYNTH_STEP_TICKS: u64 = 96;

/// How conflicting time-signature metronome values are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetronomePolicy {
    /// Use the file's metronome; disagreeing values are an error.
    #[default]
    Strict,
    /// Always use one click per quarter, logging a warning when the file
    /// says otherwise.
    AssumeQuarter,
}

/// Options for [`extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Internal time steps per output step (1 = no oversampling)
    pub oversampling: usize,
    /// Metronome conflict handling
    pub metronome_policy: MetronomePolicy,
    /// Drop the notes of transient instruments whenever the walk enters a
    /// new step. Channels without a program change count as piano.
    pub clear_transient_notes: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            oversampling: 1,
            metronome_policy: MetronomePolicy::Strict,
            clear_transient_notes: false,
        }
    }
}

/// Options for [`synthesize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisOptions {
    /// Semitones added to every pitch
    pub transpose: i32,
    /// Tempo in BPM
    pub tempo: f64,
    /// General MIDI program for the single channel
    pub instrument: u8,
    /// Note-on velocity
    pub velocity: u8,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            transpose: 0,
            tempo: 120.0,
            instrument: 41,
            velocity: 100,
        }
    }
}

/// A tempo change found during extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoChange {
    /// Absolute tick of the tempo event
    pub tick: u64,
    /// Beats per minute
    pub bpm: f64,
}

/// Length information from a first pass over a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollLength {
    /// Largest event tick in the file
    pub max_tick: u64,
    /// Metronome value in effect
    pub metronome: u8,
    /// Ticks per step before oversampling
    pub base_resolution: f64,
    /// Number of steps before oversampling
    pub steps: usize,
}

/// Extracted pitch activity plus the tempo map.
#[derive(Debug, Clone, PartialEq)]
pub struct Pianoroll {
    /// Activity matrix `[step][pitch - MIN_PITCH]`
    pub data: Vec<Vec<f32>>,
    /// Tempo changes in event order
    pub tempos: Vec<TempoChange>,
    /// Ticks per output step
    pub resolution: f64,
}

impl Pianoroll {
    /// Number of time steps.
    pub fn num_steps(&self) -> usize {
        self.data.len()
    }

    /// MIDI pitches with non-zero activity at `step`, ascending.
    pub fn active_pitches(&self, step: usize) -> Vec<u8> {
        self.data
            .get(step)
            .map(|row| {
                row.iter()
                    .zip(MIN_PITCH..MAX_PITCH)
                    .filter(|&(&cell, _)| cell > 0.0)
                    .map(|(_, pitch)| pitch)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Each step as an integer with the lowest pitch in the most significant
    /// of [`PITCH_RANGE`] bits.
    pub fn to_bit_patterns(&self) -> Vec<u64> {
        self.data
            .iter()
            .map(|row| {
                row.iter()
                    .fold(0u64, |acc, &cell| (acc << 1) | u64::from(cell > 0.0))
            })
            .collect()
    }
}

/// Scan a file for its length and metronome.
///
/// The metronome comes from the time-signature events (24 when there are
/// none). Under [`MetronomePolicy::Strict`] two different values fail with
/// [`Error::MultipleMetronomes`].
pub fn scan_length(file: &MidiFile, options: &ExtractOptions) -> Result<RollLength> {
    if file.resolution == 0 {
        return Err(CoreError::invalid("resolution", "ticks per quarter must be > 0").into());
    }

    let mut metronomes: Vec<u8> = Vec::new();
    for event in file.tracks.iter().flatten() {
        if let EventKind::TimeSignature { metronome, .. } = event.kind
            && !metronomes.contains(&metronome)
        {
            metronomes.push(metronome);
        }
    }

    let metronome = match (options.metronome_policy, metronomes.as_slice()) {
        (_, []) => QUARTER_METRONOME,
        (MetronomePolicy::Strict, [only]) => *only,
        (MetronomePolicy::Strict, [first, found, ..]) => {
            return Err(Error::MultipleMetronomes {
                first: *first,
                found: *found,
            });
        }
        (MetronomePolicy::AssumeQuarter, values) => {
            if values != [QUARTER_METRONOME] {
                tracing::warn!(?values, "overriding metronome with one click per quarter");
            }
            QUARTER_METRONOME
        }
    };
    if metronome == 0 {
        return Err(CoreError::invalid("metronome", "time signature metronome must be > 0").into());
    }

    let max_tick = file.max_tick();
    let base_resolution =
        f64::from(file.resolution) * f64::from(metronome) / f64::from(QUARTER_METRONOME);
    let steps = (max_tick as f64 / base_resolution).floor() as usize + 1;

    Ok(RollLength {
        max_tick,
        metronome,
        base_resolution,
        steps,
    })
}

/// Per-track state threaded through the event fold.
#[derive(Debug, Default)]
struct TrackState {
    active: HashMap<u8, BTreeSet<u8>>,
    programs: HashMap<u8, u8>,
    step: usize,
}

impl TrackState {
    fn is_percussion(&self, channel: u8) -> bool {
        channel == PERCUSSION_CHANNEL
            || self.programs.get(&channel).copied().unwrap_or(0) >= PERCUSSION_PROGRAM
    }

    /// Apply one event, returning the tempo change it carries.
    fn apply(mut self, event: &TimedEvent) -> (Self, Option<TempoChange>) {
        match event.kind {
            EventKind::NoteOn {
                channel,
                pitch,
                velocity: 0,
            }
            | EventKind::NoteOff { channel, pitch } => {
                if let Some(pitches) = self.active.get_mut(&channel) {
                    pitches.remove(&pitch);
                }
            }
            EventKind::NoteOn { channel, pitch, .. } => {
                if !self.is_percussion(channel) {
                    self.active.entry(channel).or_default().insert(pitch);
                }
            }
            EventKind::ProgramChange { channel, program } => {
                self.programs.insert(channel, program);
            }
            EventKind::SetTempo { micros_per_quarter } => {
                let tempo = TempoChange {
                    tick: event.tick,
                    bpm: micros_to_bpm(micros_per_quarter),
                };
                return (self, Some(tempo));
            }
            EventKind::TimeSignature { .. } | EventKind::EndOfTrack | EventKind::Other => {}
        }
        (self, None)
    }

    /// Union of the active pitches over all channels.
    fn sounding(&self) -> BTreeSet<u8> {
        self.active.values().flatten().copied().collect()
    }

    fn clear_transient(mut self) -> Self {
        let programs = &self.programs;
        for (channel, pitches) in &mut self.active {
            if programs
                .get(channel)
                .is_none_or(|program| TRANSIENT_PROGRAMS.contains(program))
            {
                pitches.clear();
            }
        }
        self
    }
}

/// Add one to each sounding pitch's cell, saturating at 1.
fn mark(row: &mut [f32], pitches: &BTreeSet<u8>) {
    for &pitch in pitches.range(MIN_PITCH..MAX_PITCH) {
        let cell = &mut row[usize::from(pitch - MIN_PITCH)];
        *cell = (*cell + 1.0).min(1.0);
    }
}

/// Extract a pianoroll and tempo list from a file.
///
/// # Errors
///
/// [`Error::MultipleMetronomes`] under the strict policy, and
/// [`Error::Core`] for a zero resolution, metronome or oversampling factor.
pub fn extract(file: &MidiFile, options: &ExtractOptions) -> Result<Pianoroll> {
    let oversampling = options.oversampling;
    if oversampling == 0 {
        return Err(CoreError::invalid("oversampling", "must be >= 1").into());
    }

    let length = scan_length(file, options)?;
    let rows = length.steps * oversampling;
    let resolution = length.base_resolution / oversampling as f64;

    let mut roll = vec![vec![0.0f32; PITCH_RANGE]; rows];
    let mut tempos = Vec::new();

    for track in &file.tracks {
        let mut events: Vec<&TimedEvent> = track.iter().collect();
        events.sort_by_key(|event| event.tick);

        events.into_iter().fold(TrackState::default(), |state, event| {
            let row = ((event.tick as f64 / resolution).floor() as usize).min(rows - 1);

            // Carry held pitches through steps without events
            if row > state.step + 1 {
                let held = state.sounding();
                for cells in &mut roll[state.step + 1..row] {
                    mark(cells, &held);
                }
            }

            let (state, tempo) = state.apply(event);
            tempos.extend(tempo);
            mark(&mut roll[row], &state.sounding());

            let mut state = if options.clear_transient_notes && row != state.step {
                state.clear_transient()
            } else {
                state
            };
            state.step = row;
            state
        });
    }

    let data = if oversampling > 1 {
        lower_resolution(&roll, oversampling)?
    } else {
        roll
    };

    tracing::debug!(
        steps = data.len(),
        oversampling,
        metronome = length.metronome,
        tempos = tempos.len(),
        "extracted pianoroll"
    );

    Ok(Pianoroll {
        data,
        tempos,
        resolution: length.base_resolution,
    })
}

/// Sum consecutive groups of `factor` rows; a trailing partial group is
/// summed as well.
pub fn lower_resolution(roll: &[Vec<f32>], factor: usize) -> Result<Vec<Vec<f32>>> {
    if factor == 0 {
        return Err(CoreError::invalid("factor", "must be >= 1").into());
    }

    Ok(roll
        .chunks(factor)
        .map(|group| {
            let width = group.iter().map(Vec::len).max().unwrap_or(0);
            group.iter().fold(vec![0.0f32; width], |mut sum, row| {
                for (total, &cell) in sum.iter_mut().zip(row) {
                    *total += cell;
                }
                sum
            })
        })
        .collect())
}

fn column_pitch(column: usize, transpose: i32) -> Result<u8> {
    let pitch = i32::from(MIN_PITCH) + transpose + column as i32;
    u8::try_from(pitch)
        .ok()
        .filter(|&p| p <= 127)
        .ok_or(Error::InvalidPitch(pitch))
}

/// Build a single-track file that plays a pianoroll.
///
/// Each step lasts [`SYNTH_STEP_TICKS`] at [`SYNTH_RESOLUTION`] ticks per
/// quarter. The track opens with a program change and a tempo event, emits
/// note-ons then note-offs for each step's transitions (the first step is
/// compared against silence), and ends one step after the last row. Pitches
/// still sounding at the end get no note-off.
///
/// # Errors
///
/// [`Error::InvalidPitch`] when a transposed pitch leaves 0..=127, and
/// [`Error::Core`] for a non-positive tempo or ragged rows.
pub fn synthesize(roll: &[Vec<f32>], options: &SynthesisOptions) -> Result<MidiFile> {
    if !options.tempo.is_finite() || options.tempo <= 0.0 {
        return Err(CoreError::invalid("tempo", format!("{} BPM", options.tempo)).into());
    }
    let width = roll.first().map_or(0, Vec::len);
    if roll.iter().any(|row| row.len() != width) {
        return Err(CoreError::invalid("pianoroll", "rows differ in length").into());
    }

    let channel = 0;
    let mut track = vec![
        TimedEvent::new(
            0,
            EventKind::ProgramChange {
                channel,
                program: options.instrument,
            },
        ),
        TimedEvent::new(
            0,
            EventKind::SetTempo {
                micros_per_quarter: bpm_to_micros(options.tempo),
            },
        ),
    ];

    let mut previous = vec![false; width];
    for (step, row) in roll.iter().enumerate() {
        let tick = step as u64 * SYNTH_STEP_TICKS;
        let current: Vec<bool> = row.iter().map(|&cell| cell > 0.0).collect();

        for (column, (&now, &before)) in current.iter().zip(&previous).enumerate() {
            if now && !before {
                let pitch = column_pitch(column, options.transpose)?;
                track.push(TimedEvent::new(
                    tick,
                    EventKind::NoteOn {
                        channel,
                        pitch,
                        velocity: options.velocity,
                    },
                ));
            }
        }
        for (column, (&now, &before)) in current.iter().zip(&previous).enumerate() {
            if before && !now {
                let pitch = column_pitch(column, options.transpose)?;
                track.push(TimedEvent::new(tick, EventKind::NoteOff { channel, pitch }));
            }
        }

        previous = current;
    }

    let end = (roll.len() as u64 + 1) * SYNTH_STEP_TICKS;
    track.push(TimedEvent::new(end, EventKind::EndOfTrack));

    Ok(MidiFile::new(SYNTH_RESOLUTION).with_track(track))
}
