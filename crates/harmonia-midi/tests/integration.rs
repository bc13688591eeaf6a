//! Integration tests for harmonia-midi.
//!
//! Builds event streams by hand, extracts pianorolls from them, and checks
//! synthesis back to events, both in memory and through Standard MIDI Files
//! on disk.

use harmonia_midi::pianoroll::{self, MIN_PITCH, PITCH_RANGE};
use harmonia_midi::{
    Error, EventKind, ExtractOptions, MetronomePolicy, MidiFile, SynthesisOptions, TimedEvent,
    smf,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const RESOLUTION: u16 = 96;
const STEP: u64 = 96;

fn note_on(tick: u64, channel: u8, pitch: u8) -> TimedEvent {
    TimedEvent::new(
        tick,
        EventKind::NoteOn {
            channel,
            pitch,
            velocity: 100,
        },
    )
}

fn note_off(tick: u64, channel: u8, pitch: u8) -> TimedEvent {
    TimedEvent::new(tick, EventKind::NoteOff { channel, pitch })
}

fn tempo(tick: u64, micros_per_quarter: u32) -> TimedEvent {
    TimedEvent::new(tick, EventKind::SetTempo { micros_per_quarter })
}

fn time_signature(tick: u64, metronome: u8) -> TimedEvent {
    TimedEvent::new(
        tick,
        EventKind::TimeSignature {
            numerator: 4,
            denominator: 4,
            metronome,
            thirty_seconds: 8,
        },
    )
}

fn column_of(roll: &pianoroll::Pianoroll, pitch: u8) -> Vec<f32> {
    let index = usize::from(pitch - MIN_PITCH);
    roll.data.iter().map(|row| row[index]).collect()
}

fn empty_roll(steps: usize) -> Vec<Vec<f32>> {
    vec![vec![0.0f32; PITCH_RANGE]; steps]
}

// ===========================================================================
// 1. Extraction
// ===========================================================================

#[test]
fn note_produces_contiguous_run() {
    let track = vec![
        note_on(2 * STEP, 0, 60),
        // Unrelated activity on another channel mid-note
        note_on(3 * STEP, 1, 40),
        note_off(3 * STEP + 10, 1, 40),
        note_off(5 * STEP, 0, 60),
        note_on(7 * STEP, 0, 62),
        note_off(8 * STEP, 0, 62),
    ];
    let file = MidiFile::new(RESOLUTION).with_track(track);
    let roll = pianoroll::extract(&file, &ExtractOptions::default()).unwrap();

    assert_eq!(roll.num_steps(), 9);
    assert_eq!(
        column_of(&roll, 60),
        vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]
    );
    assert_eq!(
        column_of(&roll, 62),
        vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]
    );
    assert_eq!(roll.active_pitches(3), vec![40, 60]);
}

#[test]
fn percussion_never_sets_cells() {
    let track = vec![
        note_on(0, 9, 36),
        note_on(0, 9, 42),
        TimedEvent::new(
            0,
            EventKind::ProgramChange {
                channel: 4,
                program: 118,
            },
        ),
        note_on(STEP, 4, 60),
        note_off(3 * STEP, 9, 36),
        note_off(3 * STEP, 9, 42),
        note_off(3 * STEP, 4, 60),
    ];
    let file = MidiFile::new(RESOLUTION).with_track(track);
    let roll = pianoroll::extract(&file, &ExtractOptions::default()).unwrap();

    assert_eq!(roll.num_steps(), 4);
    assert!(roll.data.iter().flatten().all(|&cell| cell == 0.0));
}

#[test]
fn shared_pitch_saturates_at_one() {
    let first = vec![note_on(0, 0, 55), note_off(2 * STEP, 0, 55)];
    let second = vec![note_on(0, 1, 55), note_on(0, 2, 55), note_off(2 * STEP, 1, 55)];
    let file = MidiFile::new(RESOLUTION).with_track(first).with_track(second);
    let roll = pianoroll::extract(&file, &ExtractOptions::default()).unwrap();

    assert_eq!(column_of(&roll, 55), vec![1.0, 1.0, 1.0]);
    assert!(roll.data.iter().flatten().all(|&cell| cell <= 1.0));
}

#[test]
fn tempo_changes_in_event_order() {
    let file = MidiFile::new(RESOLUTION)
        .with_track(vec![tempo(0, 500_000), tempo(4 * STEP, 400_000)])
        .with_track(vec![tempo(2 * STEP, 600_000)]);
    let roll = pianoroll::extract(&file, &ExtractOptions::default()).unwrap();

    let tempos: Vec<(u64, f64)> = roll.tempos.iter().map(|t| (t.tick, t.bpm)).collect();
    assert_eq!(tempos.len(), 3);
    assert_eq!(tempos[0].0, 0);
    assert!((tempos[0].1 - 120.0).abs() < 1e-9);
    assert_eq!(tempos[1].0, 4 * STEP);
    assert!((tempos[1].1 - 150.0).abs() < 1e-9);
    assert_eq!(tempos[2].0, 2 * STEP);
    assert!((tempos[2].1 - 100.0).abs() < 1e-9);
}

#[test]
fn metronome_sets_step_length() {
    // One click per half note at 96 ticks per quarter: 192 ticks per step
    let file = MidiFile::new(RESOLUTION).with_track(vec![
        time_signature(0, 48),
        note_on(0, 0, 60),
        note_off(384, 0, 60),
    ]);
    let roll = pianoroll::extract(&file, &ExtractOptions::default()).unwrap();
    assert!((roll.resolution - 192.0).abs() < 1e-9);
    assert_eq!(column_of(&roll, 60), vec![1.0, 1.0, 0.0]);
}

#[test]
fn multiple_metronomes_fail_strictly() {
    let file = MidiFile::new(RESOLUTION)
        .with_track(vec![
            time_signature(0, 24),
            note_on(0, 0, 60),
            note_off(2 * STEP, 0, 60),
        ])
        .with_track(vec![time_signature(STEP, 12)]);

    let err = pianoroll::extract(&file, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::MultipleMetronomes {
            first: 24,
            found: 12
        }
    ));
    assert!(err.to_string().contains("24"));

    let options = ExtractOptions {
        metronome_policy: MetronomePolicy::AssumeQuarter,
        ..ExtractOptions::default()
    };
    let roll = pianoroll::extract(&file, &options).unwrap();
    assert_eq!(column_of(&roll, 60), vec![1.0, 1.0, 0.0]);
}

#[test]
fn oversampling_sums_substeps() {
    // A note lasting half a step covers two of four oversampled rows
    let file = MidiFile::new(RESOLUTION).with_track(vec![
        note_on(0, 0, 70),
        note_off(STEP / 2, 0, 70),
        note_on(STEP, 0, 72),
        note_off(2 * STEP, 0, 72),
    ]);
    let options = ExtractOptions {
        oversampling: 4,
        ..ExtractOptions::default()
    };
    let roll = pianoroll::extract(&file, &options).unwrap();

    assert_eq!(roll.num_steps(), 3);
    assert_eq!(column_of(&roll, 70), vec![2.0, 0.0, 0.0]);
    assert_eq!(column_of(&roll, 72), vec![0.0, 4.0, 0.0]);
}

#[test]
fn empty_file_has_one_step() {
    let roll = pianoroll::extract(&MidiFile::new(RESOLUTION), &ExtractOptions::default()).unwrap();
    assert_eq!(roll.num_steps(), 1);
    assert!(roll.tempos.is_empty());
    assert_eq!(roll.to_bit_patterns(), vec![0]);
}

// ===========================================================================
// 2. Synthesis
// ===========================================================================

/// A dyad released one note at a time, a held note and a short low note,
/// separated by silence. No step both starts and stops a note, and no step
/// releases more than one, so extraction gives the roll back unchanged.
fn melody() -> Vec<Vec<f32>> {
    let mut roll = empty_roll(11);
    for row in &mut roll[0..2] {
        row[36] = 1.0;
    }
    for row in &mut roll[0..3] {
        row[40] = 1.0;
    }
    for row in &mut roll[5..8] {
        row[43] = 1.0;
    }
    roll[9][0] = 1.0;
    roll
}

#[test]
fn synthesized_roll_extracts_back() {
    let roll = melody();
    let file = pianoroll::synthesize(&roll, &SynthesisOptions::default()).unwrap();
    let extracted = pianoroll::extract(&file, &ExtractOptions::default()).unwrap();

    // End-of-track sits one step after the last row
    assert_eq!(extracted.num_steps(), roll.len() + 2);
    assert_eq!(&extracted.data[..roll.len()], roll.as_slice());
    assert!(extracted.data[roll.len()..].iter().flatten().all(|&c| c == 0.0));

    assert_eq!(extracted.tempos.len(), 1);
    assert!((extracted.tempos[0].bpm - 120.0).abs() < 1e-6);
}

#[test]
fn chord_release_marks_later_released_pitches() {
    // Both notes stop at step 2; the second note-off comes after the first
    let mut roll = empty_roll(2);
    for row in &mut roll {
        row[36] = 1.0;
        row[40] = 1.0;
    }
    let file = pianoroll::synthesize(&roll, &SynthesisOptions::default()).unwrap();
    let extracted = pianoroll::extract(&file, &ExtractOptions::default()).unwrap();

    assert_eq!(column_of(&extracted, 60), vec![1.0, 1.0, 0.0, 0.0]);
    assert_eq!(column_of(&extracted, 64), vec![1.0, 1.0, 1.0, 0.0]);
}

#[test]
fn synthesis_options_applied() {
    let roll = melody();
    let options = SynthesisOptions {
        transpose: 12,
        tempo: 90.0,
        instrument: 0,
        velocity: 64,
    };
    let file = pianoroll::synthesize(&roll, &options).unwrap();
    let track = &file.tracks[0];

    assert_eq!(
        track[0].kind,
        EventKind::ProgramChange {
            channel: 0,
            program: 0
        }
    );
    assert!((track[1].kind.bpm().unwrap() - 90.0).abs() < 1e-3);
    assert!(track.iter().all(|event| match event.kind {
        EventKind::NoteOn { velocity, .. } => velocity == 64,
        _ => true,
    }));

    let extracted = pianoroll::extract(&file, &ExtractOptions::default()).unwrap();
    assert_eq!(extracted.active_pitches(0), vec![72, 76]);
    assert_eq!(extracted.active_pitches(2), vec![76]);
    assert_eq!(extracted.active_pitches(9), vec![36]);
}

#[test]
fn transposed_out_of_range_fails() {
    let mut roll = empty_roll(1);
    roll[0][PITCH_RANGE - 1] = 1.0;
    let options = SynthesisOptions {
        transpose: 60,
        ..SynthesisOptions::default()
    };
    let err = pianoroll::synthesize(&roll, &options).unwrap_err();
    assert!(matches!(err, Error::InvalidPitch(143)));
}

// ===========================================================================
// 3. Standard MIDI Files
// ===========================================================================

#[test]
fn file_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("melody.mid");

    let file = pianoroll::synthesize(&melody(), &SynthesisOptions::default()).unwrap();
    smf::write(&path, &file).unwrap();
    let loaded = smf::read(&path).unwrap();

    assert_eq!(loaded, file);

    let roll = pianoroll::extract(&loaded, &ExtractOptions::default()).unwrap();
    assert_eq!(roll.active_pitches(5), vec![67]);
}

#[test]
fn multi_track_file_round_trip() {
    let file = MidiFile::new(480)
        .with_track(vec![
            time_signature(0, 24),
            tempo(0, 500_000),
            TimedEvent::new(0, EventKind::EndOfTrack),
        ])
        .with_track(vec![
            note_on(0, 2, 60),
            note_off(480, 2, 60),
            TimedEvent::new(960, EventKind::EndOfTrack),
        ]);

    let bytes = smf::to_bytes(&file).unwrap();
    let parsed = smf::parse(&bytes).unwrap();
    assert_eq!(parsed, file);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = smf::read(dir.path().join("absent.mid"));
    assert!(matches!(result, Err(Error::Io(_))));
}
