//! Chroma projection with tuning estimation
//!
//! Every spectrogram bin is assigned to the pitch class nearest its centre
//! frequency; a chroma frame is the sum of the bins assigned to each class.
//! With tuning enabled each semitone is first split into
//! `tuning_subdivisions` fine bins, the fine phase holding the most energy
//! is taken as the tuning offset, and the fine bins are regrouped around it.

use harmonia_core::{Error, NOTE_NAMES, PitchTable, Result};

use crate::spectrogram::Spectrogram;

/// Parameters for [`project`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaOptions {
    /// Frequency (Hz) that maps to pitch class 0.
    pub base_frequency: f64,
    /// Number of output pitch classes.
    pub pitch_classes: usize,
    /// Estimate and correct tuning before folding.
    pub tuned: bool,
    /// Fine bins per pitch class while estimating tuning.
    pub tuning_subdivisions: usize,
}

impl ChromaOptions {
    /// Frequency of C4 from the standard pitch table.
    pub fn default_base_frequency() -> f64 {
        PitchTable::standard()
            .note("C4")
            .map_or(261.625_565_300_598_6, |n| n.frequency())
    }
}

impl Default for ChromaOptions {
    fn default() -> Self {
        Self {
            base_frequency: Self::default_base_frequency(),
            pitch_classes: 12,
            tuned: false,
            tuning_subdivisions: 5,
        }
    }
}

/// Chromagram (pitch class profile)
#[derive(Debug, Clone, PartialEq)]
pub struct Chromagram {
    /// Chroma vectors `[time_frame][pitch_class]`
    pub data: Vec<Vec<f32>>,
    /// Number of pitch classes per frame
    pub num_classes: usize,
    /// Hop size of the source spectrogram
    pub hop_size: usize,
    /// Sample rate of the source spectrogram
    pub sample_rate: f32,
    /// Detected tuning offset in fine bins, if tuning was applied
    pub tuning_offset: Option<usize>,
}

impl Chromagram {
    /// Wrap precomputed chroma frames; each frame must hold `num_classes` values.
    pub fn new(
        data: Vec<Vec<f32>>,
        num_classes: usize,
        hop_size: usize,
        sample_rate: f32,
    ) -> Result<Self> {
        if let Some(bad) = data.iter().position(|f| f.len() != num_classes) {
            return Err(Error::invalid(
                "data",
                format!(
                    "frame {bad} has {} classes, expected {num_classes}",
                    data[bad].len()
                ),
            ));
        }
        Ok(Self {
            data,
            num_classes,
            hop_size,
            sample_rate,
            tuning_offset: None,
        })
    }

    /// Number of time frames
    pub fn num_frames(&self) -> usize {
        self.data.len()
    }

    /// Get pitch class names
    pub fn pitch_class_names() -> [&'static str; 12] {
        NOTE_NAMES
    }

    /// Get the dominant pitch class for a frame
    pub fn dominant_pitch_class(&self, frame: usize) -> Option<usize> {
        self.data.get(frame).and_then(|chroma| {
            chroma
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(i, _)| i)
        })
    }

    /// Scale every frame so its largest class is 1.0.
    ///
    /// Frames with no energy are left at zero.
    pub fn normalized(&self) -> Chromagram {
        let data = self
            .data
            .iter()
            .map(|chroma| {
                let max = chroma.iter().fold(0.0f32, |a, &b| a.max(b));
                if max > 1e-10 {
                    chroma.iter().map(|c| c / max).collect()
                } else {
                    vec![0.0; chroma.len()]
                }
            })
            .collect();

        Chromagram {
            data,
            num_classes: self.num_classes,
            hop_size: self.hop_size,
            sample_rate: self.sample_rate,
            tuning_offset: self.tuning_offset,
        }
    }

    /// Get frame time in seconds
    pub fn frame_to_time(&self, frame: usize) -> f32 {
        frame as f32 * self.hop_size as f32 / self.sample_rate
    }
}

/// Weighted histogram of `indices` with `len` buckets.
fn bincount(indices: &[usize], weights: &[f32], len: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; len];
    for (&i, &w) in indices.iter().zip(weights) {
        out[i] += w;
    }
    out
}

/// Pitch-class index of every bin of a spectrogram with `num_bins` bins.
///
/// Bin `b > 0` sits at `(sample_rate / 2) * b / num_bins` Hz and maps to
/// `round(classes * log2(freq / base)) mod classes`. Bin 0 (DC) maps to 0.
pub fn bin_classes(num_bins: usize, sample_rate: f64, base_frequency: f64, classes: usize) -> Vec<usize> {
    let nyquist = sample_rate / 2.0;
    let classes_f = classes as f64;

    std::iter::once(0)
        .chain((1..num_bins).map(|b| {
            let freq = nyquist * b as f64 / num_bins as f64;
            let class = (classes_f * (freq / base_frequency).log2()).round_ties_even() as i64;
            class.rem_euclid(classes as i64) as usize
        }))
        .collect()
}

/// Fold a magnitude spectrogram into pitch classes.
pub fn project(spectrogram: &Spectrogram, options: &ChromaOptions) -> Result<Chromagram> {
    if options.pitch_classes == 0 {
        return Err(Error::invalid("pitch_classes", "must be greater than zero"));
    }
    if options.tuned && options.tuning_subdivisions == 0 {
        return Err(Error::invalid(
            "tuning_subdivisions",
            "must be greater than zero",
        ));
    }
    if options.base_frequency.is_nan() || options.base_frequency <= 0.0 {
        return Err(Error::invalid("base_frequency", "must be positive"));
    }

    let classes = if options.tuned {
        options.pitch_classes * options.tuning_subdivisions
    } else {
        options.pitch_classes
    };

    let indices = bin_classes(
        spectrogram.num_bins,
        f64::from(spectrogram.sample_rate),
        options.base_frequency,
        classes,
    );

    let data: Vec<Vec<f32>> = spectrogram
        .data
        .iter()
        .map(|frame| bincount(&indices, frame, classes))
        .collect();

    tracing::debug!(
        frames = data.len(),
        classes,
        tuned = options.tuned,
        "chroma projection"
    );

    let chromagram = Chromagram {
        data,
        num_classes: classes,
        hop_size: spectrogram.hop_size,
        sample_rate: spectrogram.sample_rate,
        tuning_offset: None,
    };

    if options.tuned {
        let (tuned, _) = tune(&chromagram, options.tuning_subdivisions)?;
        Ok(tuned)
    } else {
        Ok(chromagram)
    }
}

fn check_subdivisions(num_classes: usize, subdivisions: usize) -> Result<()> {
    if subdivisions == 0 || num_classes % subdivisions != 0 {
        return Err(Error::invalid(
            "tuning_subdivisions",
            format!("{num_classes} classes are not divisible into groups of {subdivisions}"),
        ));
    }
    Ok(())
}

/// Fine-bin phase (0..subdivisions) holding the most energy.
///
/// Ties resolve to the lowest phase.
pub fn tuning_offset(chromagram: &Chromagram, subdivisions: usize) -> Result<usize> {
    check_subdivisions(chromagram.num_classes, subdivisions)?;

    let mut phase_sums = vec![0.0f64; subdivisions];
    for frame in &chromagram.data {
        for (class, &value) in frame.iter().enumerate() {
            phase_sums[class % subdivisions] += f64::from(value);
        }
    }

    let mut best = 0;
    for (phase, &sum) in phase_sums.iter().enumerate() {
        if sum > phase_sums[best] {
            best = phase;
        }
    }
    Ok(best)
}

/// Map from each fine bin to its coarse pitch class.
///
/// Each coarse index is repeated `subdivisions` times and the sequence is
/// rotated left by `(subdivisions / 2 - offset) mod subdivisions`, so the
/// group of fine bins centred on `offset` lands on one coarse class.
pub fn tuning_indices(coarse_classes: usize, subdivisions: usize, offset: usize) -> Vec<usize> {
    let n = coarse_classes * subdivisions;
    if n == 0 {
        return Vec::new();
    }
    let shift = (subdivisions / 2) as i64 - offset as i64;
    let rotation = shift.rem_euclid(subdivisions as i64) as usize;

    (0..n).map(|i| ((i + rotation) % n) / subdivisions).collect()
}

/// Collapse a fine chromagram onto its coarse classes around the dominant
/// tuning phase. Returns the coarse chromagram and the detected offset.
pub fn tune(chromagram: &Chromagram, subdivisions: usize) -> Result<(Chromagram, usize)> {
    let offset = tuning_offset(chromagram, subdivisions)?;
    let coarse = chromagram.num_classes / subdivisions;
    let indices = tuning_indices(coarse, subdivisions, offset);

    let data = chromagram
        .data
        .iter()
        .map(|frame| bincount(&indices, frame, coarse))
        .collect();

    tracing::debug!(offset, coarse, subdivisions, "tuned chromagram");

    Ok((
        Chromagram {
            data,
            num_classes: coarse,
            hop_size: chromagram.hop_size,
            sample_rate: chromagram.sample_rate,
            tuning_offset: Some(offset),
        },
        offset,
    ))
}
