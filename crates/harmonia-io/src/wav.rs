//! WAV file reading and writing.

use crate::{Error, Result};
use harmonia_core::SignalBuffer;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = u64::from(reader.len()); // total across all channels
    let num_frames = total_samples / u64::from(spec.channels.max(1));
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Read an audio file, choosing the decoder from its extension.
///
/// Only `.wav` is supported; anything else is
/// [`harmonia_core::Error::UnsupportedFormat`].
pub fn read<P: AsRef<Path>>(path: P) -> Result<SignalBuffer> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("wav") => read_wav(path),
        _ => Err(harmonia_core::Error::UnsupportedFormat(format!(
            "unknown file extension: {}",
            path.display()
        ))
        .into()),
    }
}

/// Read a WAV file into a buffer with one channel per file channel.
///
/// Integer PCM is scaled by `2^(bits - 1)`. Float files whose samples leave
/// [-1, 1] are rejected with [`Error::OutOfRange`].
///
/// # Example
/// ```ignore
/// let buffer = read_wav("input.wav")?;
/// println!("{} channels at {} Hz", buffer.num_channels(), buffer.sample_rate());
/// ```
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<SignalBuffer> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let buffer =
        SignalBuffer::from_interleaved(&samples, usize::from(spec.channels), spec.sample_rate)?;

    if let Some((min, max)) = buffer.range()
        && (min < -1.0 || max > 1.0)
    {
        return Err(Error::OutOfRange { min, max });
    }

    tracing::debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = buffer.num_samples(),
        "read WAV file"
    );

    Ok(buffer)
}

/// Write a buffer to a WAV file.
///
/// 32 bits writes IEEE float; 8, 16 and 24 bits write integer PCM with
/// samples clamped to the representable range.
///
/// # Example
/// ```ignore
/// let buffer = SignalBuffer::mono(vec![0.0; 44100], 44100);
/// write_wav("silence.wav", &buffer, 16)?;
/// ```
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    buffer: &SignalBuffer,
    bits_per_sample: u16,
) -> Result<()> {
    let sample_format = match bits_per_sample {
        32 => SampleFormat::Float,
        8 | 16 | 24 => SampleFormat::Int,
        other => {
            return Err(harmonia_core::Error::invalid(
                "bits_per_sample",
                format!("{other} (expected 8, 16, 24 or 32)"),
            )
            .into());
        }
    };
    let channels = u16::try_from(buffer.num_channels()).map_err(|_| {
        harmonia_core::Error::invalid("channels", format!("{}", buffer.num_channels()))
    })?;

    let hound_spec = hound::WavSpec {
        channels,
        sample_rate: buffer.sample_rate(),
        bits_per_sample,
        sample_format,
    };
    let mut writer = WavWriter::create(path, hound_spec)?;

    let interleaved = buffer.to_interleaved();
    if sample_format == SampleFormat::Float {
        for &sample in &interleaved {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (bits_per_sample - 1)) as f32;
        for &sample in &interleaved {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}
