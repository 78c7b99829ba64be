//! **MFCC front-end**
//!
//! Short-time cepstral analysis with a fixed geometry: 512-sample Hamming
//! window, 400-sample hop, 40 triangular mel filters, DCT-II keeping the
//! first 13 coefficients. Every clip maps to a grid of exactly
//! [`MFCC_FRAMES`] × [`MFCC_COEFFS`] values.
//!
//! All scratch buffers are allocated once in [`MfccExtractor::new`] and
//! re-used between clips.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};

use crate::constants::{FFT_SIZE, HOP_SIZE, MEL_BANDS, MFCC_COEFFS, MFCC_FRAMES, SAMPLE_RATE};

/// Streaming mel-frequency cepstral coefficient extractor.
pub struct MfccExtractor {
    fft: Arc<dyn Fft<f32>>,
    fft_buf: Vec<Complex32>,
    hamming: Vec<f32>,
    filter_bank: Vec<Vec<f32>>, // [mel_bin][mag_bin]
    mag_spectrum: Vec<f32>,
    mel_energies: Vec<f32>,
}

impl MfccExtractor {
    pub fn new() -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let hamming = (0..FFT_SIZE)
            .map(|n| 0.54 - 0.46 * ((2.0 * PI * n as f32) / (FFT_SIZE - 1) as f32).cos())
            .collect::<Vec<_>>();
        let mag_bins = FFT_SIZE / 2 + 1;
        let filter_bank = mel_filter_bank(SAMPLE_RATE, mag_bins, MEL_BANDS);
        Self {
            fft,
            fft_buf: vec![Complex32::ZERO; FFT_SIZE],
            hamming,
            filter_bank,
            mag_spectrum: vec![0.0; mag_bins],
            mel_energies: vec![0.0; MEL_BANDS],
        }
    }

    /// Compute the fixed-shape feature grid of a clip.
    ///
    /// The clip is zero-padded by half a window on each side (so the first
    /// frame is centred on sample 0) and the frame list is padded/truncated
    /// to exactly [`MFCC_FRAMES`] entries, so the output shape holds for any
    /// input length.
    pub fn grid(&mut self, clip: &[f32]) -> Vec<Vec<f32>> {
        let half = FFT_SIZE / 2;
        let mut padded = vec![0.0f32; clip.len() + FFT_SIZE];
        padded[half..half + clip.len()].copy_from_slice(clip);

        let mut frames = Vec::with_capacity(MFCC_FRAMES);
        let mut start = 0;
        while start + FFT_SIZE <= padded.len() && frames.len() < MFCC_FRAMES {
            let mut coeffs = vec![0.0f32; MFCC_COEFFS];
            self.frame_coeffs(&padded[start..start + FFT_SIZE], &mut coeffs);
            frames.push(coeffs);
            start += HOP_SIZE;
        }
        while frames.len() < MFCC_FRAMES {
            frames.push(vec![0.0; MFCC_COEFFS]);
        }
        frames
    }

    /// One analysis frame: window + FFT → magnitudes → mel log-energies →
    /// DCT-II, keeping coefficients `0..MFCC_COEFFS`.
    fn frame_coeffs(&mut self, frame: &[f32], out: &mut [f32]) {
        // 1) window + FFT
        for (dst, (&x, &w)) in self.fft_buf.iter_mut().zip(frame.iter().zip(&self.hamming)) {
            dst.re = x * w;
            dst.im = 0.0;
        }
        self.fft.process(&mut self.fft_buf);

        // 2) |FFT| -> magnitude spectrum
        for (i, m) in self.mag_spectrum.iter_mut().enumerate() {
            let c = self.fft_buf[i];
            *m = (c.re * c.re + c.im * c.im).sqrt();
        }

        // 3) mel filter bank -> log energies
        for (mel_bin, filt) in self.filter_bank.iter().enumerate() {
            let e = filt
                .iter()
                .zip(self.mag_spectrum.iter())
                .map(|(f, &m)| f * m)
                .sum::<f32>()
                + f32::MIN_POSITIVE;
            self.mel_energies[mel_bin] = e.ln();
        }

        // 4) DCT-II over the band energies
        let n = MEL_BANDS as f32;
        for (k, o) in out.iter_mut().enumerate() {
            let mut s = 0.0;
            for (m, &e) in self.mel_energies.iter().enumerate() {
                s += e * ((PI / n) * (m as f32 + 0.5) * k as f32).cos();
            }
            *o = 2.0 * s;
        }
    }
}

impl Default for MfccExtractor {
    fn default() -> Self {
        Self::new()
    }
}

// ---------- helpers --------------------------------------------------------

fn mel_filter_bank(sr: usize, mag_bins: usize, mel_bins: usize) -> Vec<Vec<f32>> {
    let f_max = sr as f32 / 2.0;
    let mel_max = freq_to_mel(f_max);
    let mel_step = mel_max / (mel_bins + 1) as f32;
    let mut bank = vec![vec![0f32; mag_bins]; mel_bins];

    // mel triangular windows
    let center_freqs: Vec<f32> = (0..=mel_bins + 1)
        .map(|i| mel_to_freq(i as f32 * mel_step))
        .collect();

    for (i, filt) in bank.iter_mut().enumerate() {
        let f_left = center_freqs[i];
        let f_center = center_freqs[i + 1];
        let f_right = center_freqs[i + 2];

        for (bin, amp) in filt.iter_mut().enumerate() {
            let freq = bin as f32 * f_max / (mag_bins - 1) as f32;
            *amp = if freq < f_left || freq > f_right {
                0.0
            } else if freq <= f_center {
                (freq - f_left) / (f_center - f_left)
            } else {
                (f_right - freq) / (f_right - f_center)
            };
        }
    }
    bank
}

#[inline]
fn freq_to_mel(f: f32) -> f32 {
    1127.0 * (1.0 + f / 700.0).ln()
}
#[inline]
fn mel_to_freq(m: f32) -> f32 {
    700.0 * ((m / 1127.0).exp() - 1.0)
}

/* --------------------------------------------------------------------- */
/*  Unit-tests                                                           */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::normalize_length;
    use crate::constants::CLIP_SAMPLES;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn grid_shape_is_fixed_for_any_clip_length() {
        let mut mfcc = MfccExtractor::new();
        for len in [100, 8_000, CLIP_SAMPLES, 32_000] {
            let grid = mfcc.grid(&sine(440.0, len));
            assert_eq!(grid.len(), MFCC_FRAMES);
            assert!(grid.iter().all(|f| f.len() == MFCC_COEFFS));
        }
    }

    #[test]
    fn grid_is_deterministic() {
        let clip = normalize_length(sine(300.0, 12_000));
        let a = MfccExtractor::new().grid(&clip);
        let b = MfccExtractor::new().grid(&clip);
        assert_eq!(a, b);
    }

    #[test]
    fn different_tones_produce_different_grids() {
        let mut mfcc = MfccExtractor::new();
        let low = mfcc.grid(&sine(220.0, CLIP_SAMPLES));
        let high = mfcc.grid(&sine(2_000.0, CLIP_SAMPLES));
        assert_ne!(low, high);
    }
}
