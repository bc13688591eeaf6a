//! Property-based tests for harmonia-analysis.
//!
//! Checks the frame-count formula and energy conservation of chroma folding
//! and tuning on randomized inputs.

use harmonia_analysis::chroma::{self, ChromaOptions, Chromagram};
use harmonia_analysis::fft::Window;
use harmonia_analysis::spectrogram::{Spectrogram, StftAnalyzer};
use harmonia_core::SignalBuffer;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// num_frames = (len - window) / hop + 1, or 0 for short signals.
    #[test]
    fn frame_count_formula(
        len in 0usize..3000,
        window in 1usize..512,
        hop in 1usize..512,
    ) {
        let buffer = SignalBuffer::mono(vec![0.0; len], 8000);
        let spec = StftAnalyzer::new(window, hop, Window::Hann)
            .unwrap()
            .analyze(&buffer)
            .unwrap();
        let expected = if len >= window { (len - window) / hop + 1 } else { 0 };
        prop_assert_eq!(spec.num_frames, expected);
    }

    /// Folding bins into classes neither creates nor loses energy.
    #[test]
    fn projection_conserves_energy(
        frame in prop::collection::vec(0.0f32..1.0f32, 64),
        tuned in any::<bool>(),
    ) {
        let spec = Spectrogram::new(vec![frame.clone()], 128, 64, 22050.0).unwrap();
        let options = ChromaOptions { tuned, ..ChromaOptions::default() };
        let chromagram = chroma::project(&spec, &options).unwrap();

        let before: f32 = frame.iter().sum();
        let after: f32 = chromagram.data[0].iter().sum();
        prop_assert!((before - after).abs() < 1e-3, "{} vs {}", before, after);
        prop_assert_eq!(chromagram.num_classes, 12);
    }

    /// Tuning returns an offset within range and conserves per-frame energy.
    #[test]
    fn tuning_conserves_energy(
        frames in prop::collection::vec(prop::collection::vec(0.0f32..1.0f32, 36), 1..5),
    ) {
        let chromagram = Chromagram::new(frames.clone(), 36, 256, 22050.0).unwrap();
        let (tuned, offset) = chroma::tune(&chromagram, 3).unwrap();
        prop_assert!(offset < 3);
        for (before, after) in frames.iter().zip(&tuned.data) {
            let a: f32 = before.iter().sum();
            let b: f32 = after.iter().sum();
            prop_assert!((a - b).abs() < 1e-3);
        }
    }
}
