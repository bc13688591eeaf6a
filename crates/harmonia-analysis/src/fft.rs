//! FFT wrapper with windowing functions

use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Window function types
///
/// Windows are symmetric (the first and last coefficient are equal), the
/// convention used by `numpy.hanning` and friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Window {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
}

impl Window {
    /// Apply window to a buffer
    pub fn apply(&self, buffer: &mut [f32]) {
        let n = buffer.len();
        if n < 2 {
            return;
        }
        let denom = (n - 1) as f32;
        match self {
            Window::Rectangular => {}
            Window::Hann => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos();
                    *sample *= w;
                }
            }
            Window::Hamming => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.54 - 0.46 * (2.0 * PI * i as f32 / denom).cos();
                    *sample *= w;
                }
            }
            Window::Blackman => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / denom;
                    let w = 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos();
                    *sample *= w;
                }
            }
        }
    }

    /// Get window coefficients
    pub fn coefficients(&self, size: usize) -> Vec<f32> {
        let mut coeffs = vec![1.0; size];
        self.apply(&mut coeffs);
        coeffs
    }

    /// Lower-case name, as used in analysis profiles.
    pub fn name(&self) -> &'static str {
        match self {
            Window::Rectangular => "rectangular",
            Window::Hann => "hann",
            Window::Hamming => "hamming",
            Window::Blackman => "blackman",
        }
    }
}

/// Forward/inverse FFT pair of a fixed size
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    ifft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self::with_planner(&mut planner, size)
    }

    /// Create a processor reusing an existing planner's cache
    pub fn with_planner(planner: &mut FftPlanner<f32>, size: usize) -> Self {
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        Self { fft, ifft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward FFT of a real signal
    ///
    /// The input is zero-padded or truncated to the FFT size. All `size`
    /// bins are returned; for real input the upper half mirrors the lower.
    pub fn forward(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer: Vec<Complex<f32>> = input
            .iter()
            .take(self.size)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);
        buffer
    }

    /// Inverse FFT, returning the real part scaled by `1/size`
    ///
    /// The spectrum is zero-padded or truncated to the FFT size.
    pub fn inverse(&self, spectrum: &[Complex<f32>]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = spectrum.iter().take(self.size).copied().collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.ifft.process(&mut buffer);

        let scale = 1.0 / self.size as f32;
        buffer.iter().map(|c| c.re * scale).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_roundtrip() {
        let fft = Fft::new(256);

        let input: Vec<f32> = (0..256)
            .map(|i| (2.0 * PI * 10.0 * i as f32 / 256.0).sin())
            .collect();

        let spectrum = fft.forward(&input);
        let reconstructed = fft.inverse(&spectrum);

        for (a, b) in input.iter().zip(reconstructed.iter()) {
            assert!((a - b).abs() < 1e-4, "Mismatch: {} vs {}", a, b);
        }
    }

    #[test]
    fn test_window_hann_symmetric() {
        let coeffs = Window::Hann.coefficients(101);

        // Zero at both edges, 1 at center
        assert!(coeffs[0].abs() < 1e-6);
        assert!(coeffs[100].abs() < 1e-6);
        assert!((coeffs[50] - 1.0).abs() < 1e-6);
        for i in 0..50 {
            assert!((coeffs[i] - coeffs[100 - i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_window_hamming_edges() {
        let coeffs = Window::Hamming.coefficients(64);
        assert!((coeffs[0] - 0.08).abs() < 1e-5);
        assert!((coeffs[63] - 0.08).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_window_sizes() {
        assert!(Window::Hann.coefficients(0).is_empty());
        assert_eq!(Window::Blackman.coefficients(1), vec![1.0]);
    }

    #[test]
    fn test_dc_detection() {
        let fft = Fft::new(256);

        let input = vec![1.0; 256];
        let spectrum = fft.forward(&input);

        let dc_mag = spectrum[0].norm();
        let other_mag: f32 = spectrum[1..].iter().map(|c| c.norm()).sum();

        assert!(dc_mag > other_mag * 10.0);
    }

    #[test]
    fn test_forward_is_hermitian_for_real_input() {
        let fft = Fft::new(64);
        let input: Vec<f32> = (0..64).map(|i| ((i * 7) % 13) as f32 / 13.0).collect();
        let spectrum = fft.forward(&input);
        for k in 1..32 {
            let diff = spectrum[k] - spectrum[64 - k].conj();
            assert!(diff.norm() < 1e-3);
        }
    }
}
