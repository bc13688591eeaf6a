//! Standard MIDI File reading and writing.
//!
//! Converts between `midly`'s delta-timed tracks and the absolute-tick
//! [`MidiFile`] model. Only metrical timing (ticks per quarter note) is
//! supported.

use std::path::Path;

use harmonia_core::Error as CoreError;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::event::{EventKind, MidiFile, TimedEvent, Track};
use crate::{Error, Result};

/// Largest delta time a track event can carry.
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// Largest tempo value (24 bits).
const MAX_TEMPO: u32 = 0x00FF_FFFF;

/// Largest ticks-per-quarter value (15 bits).
const MAX_RESOLUTION: u16 = 0x7FFF;

/// Parse a Standard MIDI File from memory.
pub fn parse(bytes: &[u8]) -> Result<MidiFile> {
    let smf = Smf::parse(bytes)?;

    let resolution = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(..) => return Err(Error::UnsupportedTiming),
    };

    let tracks: Vec<Track> = smf
        .tracks
        .iter()
        .map(|track| {
            let mut tick = 0u64;
            track
                .iter()
                .map(|event| {
                    tick += u64::from(event.delta.as_int());
                    TimedEvent::new(tick, decode(&event.kind))
                })
                .collect()
        })
        .collect();

    Ok(MidiFile { resolution, tracks })
}

/// Read a Standard MIDI File from disk.
pub fn read<P: AsRef<Path>>(path: P) -> Result<MidiFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file = parse(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        resolution = file.resolution,
        tracks = file.tracks.len(),
        events = file.num_events(),
        "read MIDI file"
    );
    Ok(file)
}

/// Serialize a file to Standard MIDI File bytes.
///
/// Events are written in tick order. [`EventKind::Other`] events are
/// dropped, and each track gets an end-of-track marker if it lacks one.
pub fn to_bytes(file: &MidiFile) -> Result<Vec<u8>> {
    if file.resolution == 0 || file.resolution > MAX_RESOLUTION {
        return Err(CoreError::invalid(
            "resolution",
            format!("{} ticks per quarter (must be 1-{MAX_RESOLUTION})", file.resolution),
        )
        .into());
    }

    let format = if file.tracks.len() == 1 {
        Format::SingleTrack
    } else {
        Format::Parallel
    };
    let header = Header {
        format,
        timing: Timing::Metrical(u15::from(file.resolution)),
    };

    let tracks = file
        .tracks
        .iter()
        .map(Vec::as_slice)
        .map(encode_track)
        .collect::<Result<Vec<_>>>()?;

    let smf = Smf { header, tracks };
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;
    Ok(bytes)
}

/// Write a file to disk as a Standard MIDI File.
pub fn write<P: AsRef<Path>>(path: P, file: &MidiFile) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_bytes(file)?;
    std::fs::write(path, bytes)?;
    tracing::debug!(path = %path.display(), tracks = file.tracks.len(), "wrote MIDI file");
    Ok(())
}

fn decode(kind: &TrackEventKind<'_>) -> EventKind {
    match *kind {
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } => EventKind::NoteOn {
                    channel,
                    pitch: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::NoteOff { key, .. } => EventKind::NoteOff {
                    channel,
                    pitch: key.as_int(),
                },
                MidiMessage::ProgramChange { program } => EventKind::ProgramChange {
                    channel,
                    program: program.as_int(),
                },
                _ => EventKind::Other,
            }
        }
        TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => EventKind::SetTempo {
            micros_per_quarter: tempo.as_int(),
        },
        TrackEventKind::Meta(MetaMessage::TimeSignature(
            numerator,
            denominator_pow2,
            metronome,
            thirty_seconds,
        )) => EventKind::TimeSignature {
            numerator,
            denominator: 1u8
                .checked_shl(u32::from(denominator_pow2))
                .unwrap_or(u8::MAX),
            metronome,
            thirty_seconds,
        },
        TrackEventKind::Meta(MetaMessage::EndOfTrack) => EventKind::EndOfTrack,
        _ => EventKind::Other,
    }
}

fn check_channel(channel: u8) -> Result<u4> {
    if channel > 15 {
        return Err(CoreError::invalid("channel", format!("{channel} (must be 0-15)")).into());
    }
    Ok(u4::from(channel))
}

fn check_data(name: &'static str, value: u8) -> Result<u7> {
    if value > 127 {
        return Err(CoreError::invalid(name, format!("{value} (must be 0-127)")).into());
    }
    Ok(u7::from(value))
}

fn encode(kind: &EventKind) -> Result<Option<TrackEventKind<'static>>> {
    let encoded = match *kind {
        EventKind::NoteOn {
            channel,
            pitch,
            velocity,
        } => TrackEventKind::Midi {
            channel: check_channel(channel)?,
            message: MidiMessage::NoteOn {
                key: check_data("pitch", pitch)?,
                vel: check_data("velocity", velocity)?,
            },
        },
        EventKind::NoteOff { channel, pitch } => TrackEventKind::Midi {
            channel: check_channel(channel)?,
            message: MidiMessage::NoteOff {
                key: check_data("pitch", pitch)?,
                vel: u7::from(0),
            },
        },
        EventKind::ProgramChange { channel, program } => TrackEventKind::Midi {
            channel: check_channel(channel)?,
            message: MidiMessage::ProgramChange {
                program: check_data("program", program)?,
            },
        },
        EventKind::SetTempo { micros_per_quarter } => {
            if micros_per_quarter > MAX_TEMPO {
                return Err(CoreError::invalid(
                    "tempo",
                    format!("{micros_per_quarter} microseconds per quarter"),
                )
                .into());
            }
            TrackEventKind::Meta(MetaMessage::Tempo(u24::from(micros_per_quarter)))
        }
        EventKind::TimeSignature {
            numerator,
            denominator,
            metronome,
            thirty_seconds,
        } => {
            if !denominator.is_power_of_two() {
                return Err(CoreError::invalid(
                    "denominator",
                    format!("{denominator} is not a power of two"),
                )
                .into());
            }
            TrackEventKind::Meta(MetaMessage::TimeSignature(
                numerator,
                denominator.trailing_zeros() as u8,
                metronome,
                thirty_seconds,
            ))
        }
        EventKind::EndOfTrack => TrackEventKind::Meta(MetaMessage::EndOfTrack),
        EventKind::Other => return Ok(None),
    };
    Ok(Some(encoded))
}

fn encode_track(track: &[TimedEvent]) -> Result<Vec<TrackEvent<'static>>> {
    let mut events: Vec<&TimedEvent> = track.iter().collect();
    events.sort_by_key(|event| event.tick);

    let mut encoded = Vec::with_capacity(events.len() + 1);
    let mut last_tick = 0u64;
    for event in events {
        let Some(kind) = encode(&event.kind)? else {
            continue;
        };
        let delta = event.tick - last_tick;
        if delta > MAX_DELTA {
            return Err(CoreError::invalid("tick", format!("delta {delta} exceeds 28 bits")).into());
        }
        encoded.push(TrackEvent {
            delta: u28::from(delta as u32),
            kind,
        });
        last_tick = event.tick;
    }

    let terminated = matches!(
        encoded.last(),
        Some(TrackEvent {
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            ..
        })
    );
    if !terminated {
        encoded.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
    }

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> MidiFile {
        MidiFile::new(480).with_track(vec![
            TimedEvent::new(
                0,
                EventKind::TimeSignature {
                    numerator: 3,
                    denominator: 4,
                    metronome: 24,
                    thirty_seconds: 8,
                },
            ),
            TimedEvent::new(
                0,
                EventKind::SetTempo {
                    micros_per_quarter: 500_000,
                },
            ),
            TimedEvent::new(
                120,
                EventKind::NoteOn {
                    channel: 3,
                    pitch: 67,
                    velocity: 90,
                },
            ),
            TimedEvent::new(600, EventKind::NoteOff { channel: 3, pitch: 67 }),
            TimedEvent::new(600, EventKind::EndOfTrack),
        ])
    }

    #[test]
    fn bytes_round_trip() {
        let file = sample_file();
        let bytes = to_bytes(&file).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
        assert_eq!(parse(&bytes).unwrap(), file);
    }

    #[test]
    fn end_of_track_appended() {
        let file = MidiFile::new(96).with_track(vec![
            TimedEvent::new(
                10,
                EventKind::NoteOn {
                    channel: 0,
                    pitch: 60,
                    velocity: 1,
                },
            ),
            TimedEvent::new(50, EventKind::Other),
        ]);
        let parsed = parse(&to_bytes(&file).unwrap()).unwrap();
        let track = &parsed.tracks[0];
        assert_eq!(track.len(), 2);
        assert_eq!(track[1], TimedEvent::new(10, EventKind::EndOfTrack));
    }

    #[test]
    fn unsorted_events_written_in_order() {
        let file = MidiFile::new(96).with_track(vec![
            TimedEvent::new(96, EventKind::NoteOff { channel: 0, pitch: 60 }),
            TimedEvent::new(
                0,
                EventKind::NoteOn {
                    channel: 0,
                    pitch: 60,
                    velocity: 64,
                },
            ),
        ]);
        let parsed = parse(&to_bytes(&file).unwrap()).unwrap();
        let ticks: Vec<u64> = parsed.tracks[0].iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 96, 96]);
    }

    #[test]
    fn invalid_values_rejected() {
        let bad_channel = MidiFile::new(96).with_track(vec![TimedEvent::new(
            0,
            EventKind::NoteOff {
                channel: 16,
                pitch: 60,
            },
        )]);
        assert!(matches!(to_bytes(&bad_channel), Err(Error::Core(_))));

        assert!(to_bytes(&MidiFile::new(0)).is_err());
        assert!(to_bytes(&MidiFile::new(0x8000)).is_err());
    }

    #[test]
    fn smpte_timing_unsupported() {
        // Header chunk with a negative (SMPTE) division: -25 fps, 40 ticks per frame
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&[0xE7, 40]);
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

        assert!(matches!(parse(&bytes), Err(Error::UnsupportedTiming)));
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(parse(b"not a midi file"), Err(Error::Parse(_))));
    }
}
