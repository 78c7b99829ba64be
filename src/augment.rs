//! Training-set augmentation.
//!
//! Mirrors the capture pipeline's historic behavior: the three variants are
//! synthesized from the *flattened feature grid*, not from the original
//! waveform. The pitch / stretch transforms only act on buffers of full
//! clip length ([`CLIP_SAMPLES`]); a flattened grid (40·13 values) never is,
//! so those two variants degrade to pass-through copies and only the noise
//! variant actually perturbs the data. See DESIGN.md before changing this.

use rand::{rngs::StdRng, Rng};
use rand_distr::StandardNormal;

use crate::constants::{
    AUGMENT_NOISE_STD, CLIP_SAMPLES, MFCC_COEFFS, MFCC_FRAMES, PITCH_SHIFT_SEMITONES,
    TIME_STRETCH_RATE,
};
use crate::dataset::Sample;

/// Augment the training split. Every sample whose grid is exactly
/// (MFCC_FRAMES, MFCC_COEFFS) contributes its three variants with the same
/// label (4 entries total); mis-shaped samples pass through alone.
pub fn augment_set(train: Vec<Sample>, rng: &mut StdRng) -> Vec<Sample> {
    let mut out = Vec::with_capacity(train.len() * 4);
    for sample in train {
        let well_formed = sample.grid.len() == MFCC_FRAMES
            && sample.grid.iter().all(|f| f.len() == MFCC_COEFFS);
        if !well_formed {
            out.push(sample);
            continue;
        }

        let flat: Vec<f32> = sample.grid.iter().flatten().copied().collect();
        let label = sample.label;
        out.push(sample);
        for variant in variants(&flat, rng) {
            out.push(Sample {
                grid: grid_from_flat(&variant),
                label,
            });
        }
    }
    out
}

/// The three variants of one flattened grid: additive Gaussian noise, pitch
/// shift, time stretch.
pub fn variants(flat: &[f32], rng: &mut StdRng) -> [Vec<f32>; 3] {
    [
        with_noise(flat, rng),
        pitch_shift(flat, PITCH_SHIFT_SEMITONES),
        time_stretch(flat, TIME_STRETCH_RATE),
    ]
}

/// Additive Gaussian noise, σ = [`AUGMENT_NOISE_STD`].
pub fn with_noise(samples: &[f32], rng: &mut StdRng) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| {
            let z: f32 = rng.sample(StandardNormal);
            s + z * AUGMENT_NOISE_STD
        })
        .collect()
}

/// Shift pitch by `semitones` while keeping the duration. Only acts on
/// full-length waveforms; anything else is returned unchanged.
pub fn pitch_shift(samples: &[f32], semitones: f32) -> Vec<f32> {
    if samples.len() != CLIP_SAMPLES {
        return samples.to_vec();
    }
    let rate = 2f32.powf(semitones / 12.0);
    let stretched = overlap_add_stretch(samples, 1.0 / rate);
    let mut shifted = resample_linear(&stretched, rate);
    shifted.resize(samples.len(), 0.0);
    shifted
}

/// Speed playback up by `rate` (> 1 shortens). Only acts on full-length
/// waveforms; anything else is returned unchanged.
pub fn time_stretch(samples: &[f32], rate: f32) -> Vec<f32> {
    if samples.len() != CLIP_SAMPLES {
        return samples.to_vec();
    }
    overlap_add_stretch(samples, rate)
}

/// Reshape a flat buffer of MFCC_FRAMES·MFCC_COEFFS values back to a grid.
pub fn grid_from_flat(flat: &[f32]) -> Vec<Vec<f32>> {
    flat.chunks(MFCC_COEFFS).map(|c| c.to_vec()).collect()
}

/* ---------- waveform helpers ----------------------------------------- */

// Hann-windowed overlap-add: analysis hop = synthesis hop * rate, output
// length ≈ input / rate.
fn overlap_add_stretch(samples: &[f32], rate: f32) -> Vec<f32> {
    const FRAME: usize = 1024;
    const SYNTH_HOP: usize = FRAME / 4;
    let analysis_hop = ((SYNTH_HOP as f32) * rate).round().max(1.0) as usize;

    let window: Vec<f32> = (0..FRAME)
        .map(|n| {
            let x = (2.0 * std::f32::consts::PI * n as f32) / (FRAME - 1) as f32;
            0.5 * (1.0 - x.cos())
        })
        .collect();

    let out_len = (samples.len() as f32 / rate).round() as usize;
    let mut out = vec![0.0f32; out_len + FRAME];
    let mut norm = vec![0.0f32; out_len + FRAME];

    let mut in_pos = 0;
    let mut out_pos = 0;
    while in_pos + FRAME <= samples.len() && out_pos + FRAME <= out.len() {
        for n in 0..FRAME {
            out[out_pos + n] += samples[in_pos + n] * window[n];
            norm[out_pos + n] += window[n] * window[n];
        }
        in_pos += analysis_hop;
        out_pos += SYNTH_HOP;
    }

    out.truncate(out_len);
    for (o, &w) in out.iter_mut().zip(&norm) {
        if w > 1e-6 {
            *o /= w;
        }
    }
    out
}

// Linear-interpolation playback-rate change: rate > 1 raises pitch and
// shortens the buffer.
fn resample_linear(samples: &[f32], rate: f32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let out_len = ((samples.len() as f32) / rate).floor() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f32 * rate;
            let lo = pos.floor() as usize;
            let frac = pos - lo as f32;
            let a = samples[lo.min(samples.len() - 1)];
            let b = samples[(lo + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

/* --------------------------------------------------------------------- */
/*  Unit-tests                                                           */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;
    use rand::SeedableRng;

    fn flat_grid() -> Vec<f32> {
        (0..MFCC_FRAMES * MFCC_COEFFS).map(|i| i as f32 * 0.01).collect()
    }

    #[test]
    fn well_formed_sample_becomes_four_entries() {
        let sample = Sample {
            grid: grid_from_flat(&flat_grid()),
            label: Label::Atras,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let out = augment_set(vec![sample], &mut rng);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|s| s.label == Label::Atras));
        assert!(out
            .iter()
            .all(|s| s.grid.len() == MFCC_FRAMES && s.grid[0].len() == MFCC_COEFFS));
    }

    #[test]
    fn mis_shaped_sample_passes_through_alone() {
        let sample = Sample {
            grid: vec![vec![0.0; MFCC_COEFFS]; MFCC_FRAMES - 1],
            label: Label::Ruido,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let out = augment_set(vec![sample], &mut rng);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].grid.len(), MFCC_FRAMES - 1);
    }

    #[test]
    fn pitch_and_stretch_pass_flattened_grids_through_unchanged() {
        let flat = flat_grid();
        assert_eq!(pitch_shift(&flat, PITCH_SHIFT_SEMITONES), flat);
        assert_eq!(time_stretch(&flat, TIME_STRETCH_RATE), flat);
    }

    #[test]
    fn noise_variant_differs_but_stays_close() {
        let flat = flat_grid();
        let mut rng = StdRng::seed_from_u64(11);
        let noisy = with_noise(&flat, &mut rng);
        assert_eq!(noisy.len(), flat.len());
        assert_ne!(noisy, flat);
        for (a, b) in flat.iter().zip(&noisy) {
            assert!((a - b).abs() < AUGMENT_NOISE_STD * 6.0);
        }
    }

    #[test]
    fn full_length_waveforms_are_actually_transformed() {
        let wave: Vec<f32> = (0..CLIP_SAMPLES)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16_000.0).sin())
            .collect();
        let shifted = pitch_shift(&wave, PITCH_SHIFT_SEMITONES);
        assert_eq!(shifted.len(), wave.len());
        assert_ne!(shifted, wave);

        let stretched = time_stretch(&wave, TIME_STRETCH_RATE);
        assert!(stretched.len() < wave.len());
    }
}
