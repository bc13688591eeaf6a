//! Property-based tests for harmonia-core buffers and pitch helpers.

use harmonia_core::{PitchTable, SignalBuffer, note_name};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Downsampling keeps ceil(n / factor) samples per channel.
    #[test]
    fn downsample_length(
        samples in prop::collection::vec(-1.0f32..=1.0f32, 0..500),
        factor in 1usize..16,
    ) {
        let buffer = SignalBuffer::mono(samples.clone(), 48000);
        let down = buffer.downsample(factor).unwrap();
        prop_assert_eq!(down.num_samples(), samples.len().div_ceil(factor));
        prop_assert_eq!(down.sample_rate(), 48000 / factor as u32);
    }

    /// Cropping never produces more samples than requested or available.
    #[test]
    fn crop_length(
        len in 0usize..300,
        start in 0usize..400,
        end in 0usize..400,
    ) {
        let buffer = SignalBuffer::mono(vec![0.25; len], 8000);
        let cropped = buffer.crop(start, end);
        let expected = end.min(len).saturating_sub(start.min(end.min(len)));
        prop_assert_eq!(cropped.num_samples(), expected);
    }

    /// Interleaving and de-interleaving is lossless.
    #[test]
    fn interleave_is_lossless(
        left in prop::collection::vec(-1.0f32..=1.0f32, 1..64),
        channels in 1usize..5,
    ) {
        let planar: Vec<Vec<f32>> = (0..channels)
            .map(|c| left.iter().map(|s| s * (c as f32 + 1.0) / 5.0).collect())
            .collect();
        let buffer = SignalBuffer::from_channels(planar, 22050).unwrap();
        let back = SignalBuffer::from_interleaved(&buffer.to_interleaved(), channels, 22050).unwrap();
        prop_assert_eq!(back, buffer);
    }

    /// Every tabulated pitch has a name that resolves back to it.
    #[test]
    fn pitch_names_resolve(pitch in 12i32..96) {
        let name = note_name(pitch).unwrap();
        let note = PitchTable::standard().note(&name).unwrap();
        prop_assert_eq!(i32::from(note.midi_pitch()), pitch);
    }
}
