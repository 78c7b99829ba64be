//! **Clip I/O**
//!
//! 1. Decode WAV (any integer/float layout `hound` knows) → mono `f32`.
//! 2. Resample to 16 kHz with `rubato` when the file rate differs.
//! 3. Zero-pad / truncate to exactly one second.
//!
//! The recorder's write path lives here too so both ends agree on the
//! 16-bit PCM layout.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rubato::{FftFixedIn, Resampler};
use thiserror::Error;

use crate::constants::{CLIP_SAMPLES, SAMPLE_RATE};

/* ─────────────────────── error handling ─────────────────────── */

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    #[error("wav has no audio channels")]
    NoChannels,
    #[error("unsupported wav format ({bits}-bit {format:?})")]
    Unsupported {
        bits: u16,
        format: hound::SampleFormat,
    },
    #[error("resampler construction: {0}")]
    ResamplerBuild(#[from] rubato::ResamplerConstructionError),
    #[error("resample: {0}")]
    Resample(#[from] rubato::ResampleError),
}

/* ─────────────────────── read path ──────────────────────────── */

/// Decode `path` into a mono 16 kHz waveform of exactly [`CLIP_SAMPLES`]
/// samples.
pub fn load_clip(path: &Path) -> Result<Vec<f32>, AudioError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let interleaved = decode_to_f32(reader, spec)?;
    let mono = downmix(&interleaved, spec.channels as usize)?;

    let at_rate = if spec.sample_rate as usize == SAMPLE_RATE {
        mono
    } else {
        resample(&mono, spec.sample_rate as usize, SAMPLE_RATE)?
    };

    Ok(normalize_length(at_rate))
}

fn decode_to_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    spec: WavSpec,
) -> Result<Vec<f32>, AudioError> {
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map_err(AudioError::from))
            .collect(),
        (SampleFormat::Int, bits) if bits <= 16 => {
            let scale = 1.0 / (1i32 << (bits - 1)) as f32;
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 * scale).map_err(AudioError::from))
                .collect()
        }
        (SampleFormat::Int, bits) if bits <= 32 => {
            let scale = 1.0 / (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale).map_err(AudioError::from))
                .collect()
        }
        (format, bits) => Err(AudioError::Unsupported { bits, format }),
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> Result<Vec<f32>, AudioError> {
    if channels == 0 {
        return Err(AudioError::NoChannels);
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect())
}

/// FFT resampler over fixed-size input chunks, tail handled via a partial
/// process call. Lengths need not match exactly; the caller pads afterwards.
pub fn resample(samples: &[f32], from_rate: usize, to_rate: usize) -> Result<Vec<f32>, AudioError> {
    const CHUNK: usize = 1024;
    let mut resampler = FftFixedIn::<f32>::new(from_rate, to_rate, CHUNK, 2, 1)?;
    let mut out = Vec::with_capacity(samples.len() * to_rate / from_rate + CHUNK);

    let mut pos = 0;
    while pos + resampler.input_frames_next() <= samples.len() {
        let n = resampler.input_frames_next();
        let mut chunks = resampler.process(&[&samples[pos..pos + n]], None)?;
        out.append(&mut chunks[0]);
        pos += n;
    }
    if pos < samples.len() {
        let mut chunks = resampler.process_partial(Some(&[&samples[pos..]]), None)?;
        out.append(&mut chunks[0]);
    }
    Ok(out)
}

/// Pad with silence (or truncate) to exactly [`CLIP_SAMPLES`].
pub fn normalize_length(mut samples: Vec<f32>) -> Vec<f32> {
    samples.resize(CLIP_SAMPLES, 0.0);
    samples
}

/* ─────────────────────── write path ─────────────────────────── */

/// Write a mono clip as 16-bit PCM at [`SAMPLE_RATE`].
pub fn write_clip(path: &Path, samples: &[f32]) -> Result<(), AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        let v = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(v)?;
    }
    writer.finalize()?;
    Ok(())
}

/* --------------------------------------------------------------------- */
/*  Unit-tests                                                           */
