//! Multi-channel sample buffers.
//!
//! A [`SignalBuffer`] holds `num_samples x num_channels` samples (stored one
//! `Vec` per channel) together with the sample rate. Operations return new
//! buffers and leave the source untouched.

use crate::error::{Error, Result};

/// Planar audio buffer with its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SignalBuffer {
    /// Create a single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            channels: vec![samples],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel sample vectors.
    ///
    /// All channels must have the same length and at least one channel
    /// must be present.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(Error::invalid("channels", "at least one channel required"));
        };
        let len = first.len();
        if let Some(bad) = channels.iter().position(|c| c.len() != len) {
            return Err(Error::invalid(
                "channels",
                format!(
                    "channel {bad} has {} samples, expected {len}",
                    channels[bad].len()
                ),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a buffer from interleaved samples (`[l0, r0, l1, r1, ...]`).
    ///
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn from_interleaved(samples: &[f32], num_channels: usize, sample_rate: u32) -> Result<Self> {
        if num_channels == 0 {
            return Err(Error::invalid("num_channels", "must be greater than zero"));
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (channel, &s) in channels.iter_mut().zip(frame) {
                channel.push(s);
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Interleave channels into a single vector.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.num_samples() * self.num_channels());
        for i in 0..self.num_samples() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel.
    pub fn num_samples(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_samples() as f64 / f64::from(self.sample_rate)
    }

    /// Samples of one channel.
    pub fn channel_samples(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Samples of a single-channel buffer.
    ///
    /// Fails with [`Error::UnsupportedFormat`] for multi-channel buffers.
    pub fn mono_samples(&self) -> Result<&[f32]> {
        if self.channels.len() != 1 {
            return Err(Error::UnsupportedFormat(format!(
                "only single-channel audio is supported, got {} channels",
                self.channels.len()
            )));
        }
        Ok(&self.channels[0])
    }

    /// New single-channel buffer holding channel `index`.
    pub fn channel(&self, index: usize) -> Result<Self> {
        let samples = self.channels.get(index).ok_or_else(|| {
            Error::invalid(
                "channel",
                format!("index {index} out of range for {} channels", self.channels.len()),
            )
        })?;
        Ok(Self::mono(samples.clone(), self.sample_rate))
    }

    /// New buffer holding samples `[start, end)`; bounds are clamped.
    pub fn crop(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.num_samples());
        let start = start.min(end);
        Self {
            channels: self.channels.iter().map(|c| c[start..end].to_vec()).collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Keep every `factor`-th sample and divide the sample rate accordingly.
    ///
    /// No anti-alias filtering is applied.
    pub fn downsample(&self, factor: usize) -> Result<Self> {
        if factor == 0 {
            return Err(Error::invalid("factor", "must be greater than zero"));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(factor, sample_rate = self.sample_rate, "downsampling");

        Ok(Self {
            channels: self
                .channels
                .iter()
                .map(|c| c.iter().step_by(factor).copied().collect())
                .collect(),
            sample_rate: self.sample_rate / factor as u32,
        })
    }

    /// Smallest and largest sample across all channels.
    ///
    /// Returns `None` for an empty buffer.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.channels.iter().flatten().fold(None, |acc, &s| match acc {
            None => Some((s, s)),
            Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
        })
    }
}
