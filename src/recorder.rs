//! Interactive capture of labeled training clips.
//!
//! For each word in the fixed vocabulary the operator is prompted, confirms
//! with ENTER (`q` ends the session), and one fixed-duration clip is
//! captured from the default input device and written to
//! `<output_dir>/<word>/<word>_<index>.wav`.
//!
//! There is no retry logic – a bad take is found by listening afterwards.
//! The confirmation prompt and the capture device are both behind small
//! traits so the session loop runs in tests without a terminal or
//! microphone.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use thiserror::Error;

use crate::audio::{self, AudioError};
use crate::config::RecorderConfig;

/* ─────────────────────── error handling ─────────────────────── */

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("wav write: {0}")]
    Audio(#[from] AudioError),
    #[error("no default input device available")]
    NoInputDevice,
    #[error("audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/* ─────────────────────── operator confirmation ──────────────── */

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Confirmation {
    Proceed,
    Quit,
}

/// Blocking confirmation prompt; one call per take.
pub trait ConfirmationSource {
    fn wait(&mut self, prompt: &str) -> Result<Confirmation, RecordError>;
}

/// Reads the real terminal: ENTER proceeds, `q` + ENTER quits.
pub struct StdinConfirmation;

impl ConfirmationSource for StdinConfirmation {
    fn wait(&mut self, prompt: &str) -> Result<Confirmation, RecordError> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        if line.trim().eq_ignore_ascii_case("q") {
            Ok(Confirmation::Quit)
        } else {
            Ok(Confirmation::Proceed)
        }
    }
}

/* ─────────────────────── capture device ─────────────────────── */

/// Produces one clip of exactly `samples` mono f32 samples per call.
pub trait SampleSource {
    fn capture(&mut self, samples: usize) -> Result<Vec<f32>, RecordError>;
}

/// Captures from the default `cpal` input device at the configured rate,
/// with a live level meter on stdout.
pub struct CpalSource {
    device: cpal::Device,
    config: StreamConfig,
    sample_rate: u32,
}

impl CpalSource {
    pub fn new(sample_rate: u32) -> Result<Self, RecordError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(RecordError::NoInputDevice)?;
        if let Ok(name) = device.name() {
            log::info!("recording from input device '{name}'");
        }
        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Default,
        };
        Ok(Self {
            device,
            config,
            sample_rate,
        })
    }
}

impl SampleSource for CpalSource {
    fn capture(&mut self, samples: usize) -> Result<Vec<f32>, RecordError> {
        let buffer = Arc::new(Mutex::new(Vec::<f32>::with_capacity(samples)));
        let recording = Arc::new(AtomicBool::new(true));
        let level = Arc::new(AtomicU32::new(0));

        let buffer_cb = Arc::clone(&buffer);
        let recording_cb = Arc::clone(&recording);
        let level_cb = Arc::clone(&level);

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !recording_cb.load(Ordering::Relaxed) {
                    return;
                }
                if let Ok(mut buf) = buffer_cb.lock() {
                    buf.extend_from_slice(data);
                }
                let rms =
                    (data.iter().map(|s| s * s).sum::<f32>() / data.len().max(1) as f32).sqrt();
                level_cb.store((rms * 1000.0) as u32, Ordering::Relaxed);
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        )?;
        stream.play()?;

        let duration = Duration::from_secs_f32(samples as f32 / self.sample_rate as f32);
        let start = std::time::Instant::now();
        while start.elapsed() < duration {
            let current = level.load(Ordering::Relaxed) as f32 / 1000.0;
            let bars = ((current * 50.0) as usize).min(50);
            print!("\r   [{}{}]", "█".repeat(bars), "░".repeat(50 - bars));
            let _ = std::io::stdout().flush();
            std::thread::sleep(Duration::from_millis(50));
        }
        recording.store(false, Ordering::Relaxed);
        drop(stream);
        println!();

        let mut clip = buffer.lock().map(|b| b.clone()).unwrap_or_default();
        clip.resize(samples, 0.0);
        Ok(clip)
    }
}

/* ─────────────────────── session loop ───────────────────────── */

/// Record every word of the vocabulary with the default terminal prompt and
/// the default input device.
pub fn run(cfg: &RecorderConfig) -> Result<(), RecordError> {
    let mut confirm = StdinConfirmation;
    let mut source = CpalSource::new(cfg.sample_rate)?;
    let written = run_session(cfg, &mut confirm, &mut source)?;
    println!("\n🎉 session complete – {written} clips written");
    Ok(())
}

/// The session itself, device- and terminal-agnostic. Returns the number of
/// clips written; a `Quit` confirmation ends the session early.
pub fn run_session(
    cfg: &RecorderConfig,
    confirm: &mut dyn ConfirmationSource,
    source: &mut dyn SampleSource,
) -> Result<usize, RecordError> {
    let clip_samples = (cfg.clip_seconds * cfg.sample_rate as f32) as usize;
    let mut written = 0usize;

    for word in &cfg.words {
        let word_dir = cfg.output_dir.join(word.as_str());
        std::fs::create_dir_all(&word_dir)?;
        println!("\n🎙️  GRABANDO: {}", word.as_str().to_uppercase());

        for index in 0..cfg.samples_per_word {
            let prompt = format!(
                "Press ENTER to record sample {index}/{} for '{word}' (q + ENTER quits): ",
                cfg.samples_per_word
            );
            if confirm.wait(&prompt)? == Confirmation::Quit {
                println!("session ended by operator");
                return Ok(written);
            }

            println!("🔴 Recording...");
            let clip = source.capture(clip_samples)?;

            let path = clip_path(&word_dir, word.as_str(), index);
            audio::write_clip(&path, &clip)?;
            written += 1;
            println!("✅ saved {}", path.display());
        }
    }
    Ok(written)
}

fn clip_path(dir: &std::path::Path, word: &str, index: usize) -> PathBuf {
    dir.join(format!("{word}_{index}.wav"))
}

/* --------------------------------------------------------------------- */
/*  Unit-tests                                                           */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;

    struct Scripted(Vec<Confirmation>);

    impl ConfirmationSource for Scripted {
        fn wait(&mut self, _prompt: &str) -> Result<Confirmation, RecordError> {
            Ok(self.0.remove(0))
        }
    }

    struct Tone;

    impl SampleSource for Tone {
        fn capture(&mut self, samples: usize) -> Result<Vec<f32>, RecordError> {
            Ok((0..samples)
                .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16_000.0).sin() * 0.3)
                .collect())
        }
    }

    fn two_by_two_config(output_dir: PathBuf) -> RecorderConfig {
        RecorderConfig {
            words: vec![Label::Adelante, Label::Atras],
            samples_per_word: 2,
            output_dir,
            ..RecorderConfig::default()
        }
    }

    #[test]
    fn session_writes_one_wav_per_word_and_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = two_by_two_config(dir.path().to_path_buf());

        let mut confirm = Scripted(vec![Confirmation::Proceed; 4]);
        let written = run_session(&cfg, &mut confirm, &mut Tone).expect("session");
        assert_eq!(written, 4);

        for word in ["adelante", "atras"] {
            for index in 0..2 {
                let path = dir.path().join(word).join(format!("{word}_{index}.wav"));
                assert!(path.exists(), "missing {}", path.display());
            }
        }
    }

    #[test]
    fn quit_ends_the_session_early() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = two_by_two_config(dir.path().to_path_buf());

        let mut confirm = Scripted(vec![
            Confirmation::Proceed,
            Confirmation::Quit,
            Confirmation::Proceed,
            Confirmation::Proceed,
        ]);
        let written = run_session(&cfg, &mut confirm, &mut Tone).expect("session");
        assert_eq!(written, 1);
        assert!(dir.path().join("adelante").join("adelante_0.wav").exists());
        assert!(!dir.path().join("adelante").join("adelante_1.wav").exists());
    }

    #[test]
    fn recorded_clips_reload_at_full_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = two_by_two_config(dir.path().to_path_buf());

        let mut confirm = Scripted(vec![Confirmation::Proceed; 4]);
        run_session(&cfg, &mut confirm, &mut Tone).expect("session");

        let clip = crate::audio::load_clip(
            &dir.path().join("adelante").join("adelante_0.wav"),
        )
        .expect("load");
        assert_eq!(clip.len(), crate::constants::CLIP_SAMPLES);
    }
}
