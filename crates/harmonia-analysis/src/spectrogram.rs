//! STFT-based spectrogram generation and overlap-add resynthesis
//!
//! Frame `i` covers samples `[i * hop, i * hop + window)`; the frame count is
//! `(len - window) / hop + 1` (zero when the signal is shorter than one
//! window). Magnitude spectrograms keep bins `[0, window / 2)`, complex ones
//! keep all `window` bins so the signal can be rebuilt with [`inverse`].

use harmonia_core::{Error, Result, SignalBuffer};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use crate::fft::{Fft, Window};

/// Which representation [`forward`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpectrumMode {
    /// Magnitudes of the lower half of the spectrum
    #[default]
    Magnitude,
    /// Full complex spectrum (phase preserved)
    Complex,
}

/// Magnitude spectrogram
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// 2D magnitude data `[time_frame][frequency_bin]`
    pub data: Vec<Vec<f32>>,
    /// Analysis window length in samples
    pub window_size: usize,
    /// Hop size between frames
    pub hop_size: usize,
    /// Sample rate
    pub sample_rate: f32,
    /// Number of time frames
    pub num_frames: usize,
    /// Number of frequency bins (window_size / 2)
    pub num_bins: usize,
}

impl Spectrogram {
    /// Wrap precomputed magnitude frames.
    ///
    /// Every frame must hold `window_size / 2` bins.
    pub fn new(
        data: Vec<Vec<f32>>,
        window_size: usize,
        hop_size: usize,
        sample_rate: f32,
    ) -> Result<Self> {
        let num_bins = window_size / 2;
        if let Some(bad) = data.iter().position(|f| f.len() != num_bins) {
            return Err(Error::invalid(
                "data",
                format!(
                    "frame {bad} has {} bins, expected {num_bins}",
                    data[bad].len()
                ),
            ));
        }
        Ok(Self {
            num_frames: data.len(),
            data,
            window_size,
            hop_size,
            sample_rate,
            num_bins,
        })
    }

    /// Get frequency in Hz for a given bin index
    pub fn bin_to_freq(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate / self.window_size as f32
    }

    /// Get time in seconds for a given frame index
    pub fn frame_to_time(&self, frame: usize) -> f32 {
        frame as f32 * self.hop_size as f32 / self.sample_rate
    }

    /// Get magnitude at specific time and frequency
    ///
    /// Returns None if out of bounds
    pub fn get(&self, frame: usize, bin: usize) -> Option<f32> {
        self.data.get(frame).and_then(|f| f.get(bin)).copied()
    }

    /// Get the spectrum for a specific time frame
    pub fn get_frame(&self, frame: usize) -> Option<&[f32]> {
        self.data.get(frame).map(Vec::as_slice)
    }

    /// Bin with the largest magnitude in a frame
    pub fn peak_bin(&self, frame: usize) -> Option<usize> {
        let spectrum = self.get_frame(frame)?;
        spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
    }

    /// Find peak frequency at a given time frame
    pub fn peak_frequency(&self, frame: usize) -> Option<f32> {
        self.peak_bin(frame).map(|bin| self.bin_to_freq(bin))
    }

    /// Zero-phase complex spectrogram, upper half filled with zeros
    pub fn to_complex(&self) -> ComplexSpectrogram {
        let data = self
            .data
            .iter()
            .map(|frame| {
                let mut bins: Vec<Complex<f32>> =
                    frame.iter().map(|&m| Complex::new(m, 0.0)).collect();
                bins.resize(self.window_size, Complex::new(0.0, 0.0));
                bins
            })
            .collect();

        ComplexSpectrogram {
            data,
            window_size: self.window_size,
            hop_size: self.hop_size,
            sample_rate: self.sample_rate,
            num_frames: self.num_frames,
        }
    }

    /// Approximate resynthesis; phase was discarded so the result is lossy.
    pub fn to_signal(&self) -> Result<SignalBuffer> {
        self.to_complex().to_signal()
    }
}

/// Complex (phase-preserving) spectrogram
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSpectrogram {
    /// 2D complex data `[time_frame][frequency_bin]`, `window_size` bins per frame
    pub data: Vec<Vec<Complex<f32>>>,
    /// Analysis window length in samples
    pub window_size: usize,
    /// Hop size between frames
    pub hop_size: usize,
    /// Sample rate
    pub sample_rate: f32,
    /// Number of time frames
    pub num_frames: usize,
}

impl ComplexSpectrogram {
    /// Magnitudes of bins `[0, window_size / 2)`
    pub fn magnitudes(&self) -> Spectrogram {
        let num_bins = self.window_size / 2;
        let data = self
            .data
            .iter()
            .map(|frame| frame.iter().take(num_bins).map(|c| c.norm()).collect())
            .collect();

        Spectrogram {
            data,
            window_size: self.window_size,
            hop_size: self.hop_size,
            sample_rate: self.sample_rate,
            num_frames: self.num_frames,
            num_bins,
        }
    }

    /// Overlap-add resynthesis, see [`inverse`]
    pub fn to_signal(&self) -> Result<SignalBuffer> {
        inverse(
            &self.data,
            self.sample_rate.round() as u32,
            self.window_size,
            self.hop_size,
        )
    }
}

/// Output of [`forward`]
#[derive(Debug, Clone, PartialEq)]
pub enum Stft {
    /// Magnitude spectrogram
    Magnitude(Spectrogram),
    /// Complex spectrogram
    Complex(ComplexSpectrogram),
}

impl Stft {
    /// Number of time frames
    pub fn num_frames(&self) -> usize {
        match self {
            Stft::Magnitude(s) => s.num_frames,
            Stft::Complex(s) => s.num_frames,
        }
    }
}

/// STFT (Short-Time Fourier Transform) analyzer
pub struct StftAnalyzer {
    window_size: usize,
    hop_size: usize,
    window: Window,
    fft: Fft,
    window_coeffs: Vec<f32>,
}

impl StftAnalyzer {
    /// Create a new STFT analyzer
    ///
    /// # Arguments
    /// * `window_size` - Samples per frame (also the FFT size)
    /// * `hop_size` - Hop size between frames
    /// * `window` - Window function to use
    pub fn new(window_size: usize, hop_size: usize, window: Window) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::invalid("window_size", "must be greater than zero"));
        }
        if hop_size == 0 {
            return Err(Error::invalid("hop_size", "must be greater than zero"));
        }

        Ok(Self {
            window_size,
            hop_size,
            window,
            fft: Fft::new(window_size),
            window_coeffs: window.coefficients(window_size),
        })
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        if len >= self.window_size {
            (len - self.window_size) / self.hop_size + 1
        } else {
            0
        }
    }

    fn frame_spectra<'a>(
        &'a self,
        signal: &'a [f32],
    ) -> impl Iterator<Item = Vec<Complex<f32>>> + 'a {
        if signal.len() < self.window_size {
            tracing::warn!(
                samples = signal.len(),
                window = self.window_size,
                "signal shorter than one window, no frames"
            );
        }
        (0..self.num_frames(signal.len())).map(move |frame_idx| {
            let start = frame_idx * self.hop_size;
            let end = (start + self.window_size).min(signal.len());

            let mut frame: Vec<f32> = signal[start..end].to_vec();
            frame.resize(self.window_size, 0.0);

            for (sample, &coeff) in frame.iter_mut().zip(self.window_coeffs.iter()) {
                *sample *= coeff;
            }

            self.fft.forward(&frame)
        })
    }

    /// Compute the magnitude spectrogram of a mono buffer
    pub fn analyze(&self, buffer: &SignalBuffer) -> Result<Spectrogram> {
        let signal = buffer.mono_samples()?;
        let num_bins = self.window_size / 2;

        let data: Vec<Vec<f32>> = self
            .frame_spectra(signal)
            .map(|spectrum| spectrum[..num_bins].iter().map(|c| c.norm()).collect())
            .collect();

        tracing::debug!(
            frames = data.len(),
            bins = num_bins,
            window = self.window.name(),
            "magnitude spectrogram"
        );

        Ok(Spectrogram {
            num_frames: data.len(),
            data,
            window_size: self.window_size,
            hop_size: self.hop_size,
            sample_rate: buffer.sample_rate() as f32,
            num_bins,
        })
    }

    /// Compute the complex spectrogram of a mono buffer
    pub fn analyze_complex(&self, buffer: &SignalBuffer) -> Result<ComplexSpectrogram> {
        let signal = buffer.mono_samples()?;
        let data: Vec<Vec<Complex<f32>>> = self.frame_spectra(signal).collect();

        tracing::debug!(
            frames = data.len(),
            bins = self.window_size,
            window = self.window.name(),
            "complex spectrogram"
        );

        Ok(ComplexSpectrogram {
            num_frames: data.len(),
            data,
            window_size: self.window_size,
            hop_size: self.hop_size,
            sample_rate: buffer.sample_rate() as f32,
        })
    }

    /// Get window size
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Get hop size
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Get the window function used
    pub fn window(&self) -> Window {
        self.window
    }
}

/// Short-time Fourier transform of a mono buffer.
///
/// Fails with [`Error::UnsupportedFormat`] for multi-channel input.
pub fn forward(
    buffer: &SignalBuffer,
    window_size: usize,
    hop_size: usize,
    window: Window,
    mode: SpectrumMode,
) -> Result<Stft> {
    let analyzer = StftAnalyzer::new(window_size, hop_size, window)?;
    match mode {
        SpectrumMode::Magnitude => analyzer.analyze(buffer).map(Stft::Magnitude),
        SpectrumMode::Complex => analyzer.analyze_complex(buffer).map(Stft::Complex),
    }
}

/// Overlap-add resynthesis.
///
/// Output length is `frames * hop + (window - hop)`. Each frame's inverse
/// FFT (real part) is added at offset `i * hop`; no synthesis window is
/// applied. Frames shorter than `window_size` are zero-padded.
pub fn inverse(
    frames: &[Vec<Complex<f32>>],
    sample_rate: u32,
    window_size: usize,
    hop_size: usize,
) -> Result<SignalBuffer> {
    if window_size == 0 {
        return Err(Error::invalid("window_size", "must be greater than zero"));
    }
    if hop_size == 0 {
        return Err(Error::invalid("hop_size", "must be greater than zero"));
    }

    let len = frames.len() * hop_size + window_size.saturating_sub(hop_size);
    let mut signal = vec![0.0f32; len];
    let fft = Fft::new(window_size);

    for (i, spectrum) in frames.iter().enumerate() {
        let start = i * hop_size;
        for (out, s) in signal[start..].iter_mut().zip(fft.inverse(spectrum)) {
            *out += s;
        }
    }

    tracing::debug!(frames = frames.len(), samples = len, "overlap-add resynthesis");

    Ok(SignalBuffer::mono(signal, sample_rate))
}

/// One full complex spectrum per segment.
///
/// Segments run between consecutive `split_points`; the last one ends at the
/// end of the buffer. Points must be non-decreasing and within the buffer.
pub fn variable_spectra(
    buffer: &SignalBuffer,
    split_points: &[usize],
) -> Result<Vec<Vec<Complex<f32>>>> {
    let signal = buffer.mono_samples()?;

    if split_points.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::invalid("split_points", "must be non-decreasing"));
    }
    if split_points.last().is_some_and(|&p| p > signal.len()) {
        return Err(Error::invalid("split_points", "point beyond end of signal"));
    }

    let mut planner = FftPlanner::new();
    let bounds: Vec<usize> = split_points
        .iter()
        .copied()
        .chain(std::iter::once(signal.len()))
        .collect();

    Ok(bounds
        .windows(2)
        .map(|w| {
            let segment = &signal[w[0]..w[1]];
            if segment.is_empty() {
                return Vec::new();
            }
            Fft::with_planner(&mut planner, segment.len()).forward(segment)
        })
        .collect())
}

/// Keep strict local maxima along the frequency axis, zero everything else.
///
/// A bin is a peak when it is larger than every bin within `order` positions
/// on either side. Neighbours past the edges are clamped to the edge bin, so
/// the first and last bins never qualify.
pub fn filter_peaks(spectrogram: &Spectrogram, order: usize) -> Spectrogram {
    let data = spectrogram
        .data
        .iter()
        .map(|frame| {
            let n = frame.len();
            (0..n)
                .map(|k| {
                    let is_peak = order > 0
                        && (1..=order).all(|j| {
                            let left = k.saturating_sub(j);
                            let right = (k + j).min(n - 1);
                            frame[k] > frame[left] && frame[k] > frame[right]
                        });
                    if is_peak { frame[k] } else { 0.0 }
                })
                .collect()
        })
        .collect();

    Spectrogram {
        data,
        window_size: spectrogram.window_size,
        hop_size: spectrogram.hop_size,
        sample_rate: spectrogram.sample_rate,
        num_frames: spectrogram.num_frames,
        num_bins: spectrogram.num_bins,
    }
}

/// Median of a zero-padded window of `size` values centred on `center`.
fn padded_median(values: &[f32], center: usize, size: usize, scratch: &mut Vec<f32>) -> f32 {
    let half = size / 2;
    scratch.clear();
    for offset in 0..size {
        let idx = (center + offset).checked_sub(half);
        scratch.push(idx.and_then(|i| values.get(i)).copied().unwrap_or(0.0));
    }
    scratch.sort_by(f32::total_cmp);
    scratch[half]
}

/// Harmonic/percussive soft masking by median filtering.
///
/// The harmonic estimate is a median over `|order|` frames in time, the
/// percussive one a median over `|order|` bins in frequency (both
/// zero-padded). A positive `order` keeps the harmonic part
/// (`H^p / (H^p + P^p)`), a negative one the percussive part. Cells where
/// both estimates vanish are zeroed.
pub fn median_filter(
    spectrogram: &ComplexSpectrogram,
    order: i32,
    power: f32,
) -> Result<ComplexSpectrogram> {
    let size = order.unsigned_abs() as usize;
    if size % 2 == 0 {
        return Err(Error::invalid("order", "kernel size must be odd"));
    }

    let magnitudes: Vec<Vec<f32>> = spectrogram
        .data
        .iter()
        .map(|frame| frame.iter().map(|c| c.norm()).collect())
        .collect();
    let num_frames = magnitudes.len();
    let num_bins = magnitudes.first().map_or(0, Vec::len);

    let mut scratch = Vec::with_capacity(size);
    let mut column = vec![0.0f32; num_frames];
    let mut harmonic = vec![vec![0.0f32; num_bins]; num_frames];
    for bin in 0..num_bins {
        for (t, frame) in magnitudes.iter().enumerate() {
            column[t] = frame[bin];
        }
        for t in 0..num_frames {
            harmonic[t][bin] = padded_median(&column, t, size, &mut scratch);
        }
    }

    let data = spectrogram
        .data
        .iter()
        .zip(&magnitudes)
        .zip(&harmonic)
        .map(|((frame, mags), harm)| {
            frame
                .iter()
                .enumerate()
                .map(|(bin, &value)| {
                    let h = harm[bin].powf(power);
                    let p = padded_median(mags, bin, size, &mut scratch).powf(power);
                    let keep = if order > 0 { h } else { p };
                    let mask = keep / (h + p);
                    if mask.is_finite() {
                        value * mask
                    } else {
                        Complex::new(0.0, 0.0)
                    }
                })
                .collect()
        })
        .collect();

    Ok(ComplexSpectrogram {
        data,
        window_size: spectrogram.window_size,
        hop_size: spectrogram.hop_size,
        sample_rate: spectrogram.sample_rate,
        num_frames: spectrogram.num_frames,
    })
}

/// Harmonic/percussive separation of a mono buffer.
///
/// Analyses with a Hann window of `sample_rate / 10` samples and a hop of
/// `sample_rate / 20`, masks with [`median_filter`] and resynthesises.
pub fn median_filter_signal(buffer: &SignalBuffer, order: i32, power: f32) -> Result<SignalBuffer> {
    let window_size = (buffer.sample_rate() / 10) as usize;
    let hop_size = (buffer.sample_rate() / 20) as usize;
    let spectrogram = StftAnalyzer::new(window_size, hop_size, Window::Hann)?.analyze_complex(buffer)?;
    median_filter(&spectrogram, order, power)?.to_signal()
}

/// Attach the phase of `reference` to a magnitude spectrogram.
///
/// The magnitudes are mirrored to full length (`[m0 .. m(n-1), m(n-1) .. m0]`)
/// and multiplied by `exp(i * arg(reference))` bin by bin.
pub fn with_phase(
    magnitudes: &Spectrogram,
    reference: &ComplexSpectrogram,
) -> Result<ComplexSpectrogram> {
    if magnitudes.num_frames != reference.num_frames
        || magnitudes.num_bins * 2 != reference.window_size
    {
        return Err(Error::invalid(
            "reference",
            format!(
                "shape {}x{} does not match magnitudes {}x{}",
                reference.num_frames,
                reference.window_size,
                magnitudes.num_frames,
                magnitudes.num_bins * 2
            ),
        ));
    }

    let data = magnitudes
        .data
        .iter()
        .zip(&reference.data)
        .map(|(mags, phases)| {
            mags.iter()
                .chain(mags.iter().rev())
                .zip(phases)
                .map(|(&m, p)| Complex::from_polar(m, p.arg()))
                .collect()
        })
        .collect();

    Ok(ComplexSpectrogram {
        data,
        window_size: reference.window_size,
        hop_size: reference.hop_size,
        sample_rate: reference.sample_rate,
        num_frames: reference.num_frames,
    })
}
