//! Stage configuration.
//!
//! Each pipeline stage takes an explicit config struct instead of reading
//! module-level constants, so tests can point them at synthetic directories.

use std::path::PathBuf;

use crate::constants::{
    CLIP_SECONDS, DEFAULT_EPOCHS, LEARNING_RATE, RECORD_OUTPUT_DIR, SAMPLES_PER_WORD, SAMPLE_RATE,
    SPLIT_SEED,
};
use crate::dataset::Label;

/// Recorder session settings. The defaults are the fixed constants of the
/// capture workflow: four command words, 20 takes each, one second at
/// 16 kHz, written under `dataset/`.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// Words to record, in prompting order.
    pub words: Vec<Label>,
    pub samples_per_word: usize,
    pub clip_seconds: f32,
    pub sample_rate: u32,
    pub output_dir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            // prompting order of the capture workflow; the "ruido" clips are
            // collected separately
            words: vec![
                Label::Adelante,
                Label::Atras,
                Label::Izquierda,
                Label::Derecha,
            ],
            samples_per_word: SAMPLES_PER_WORD,
            clip_seconds: CLIP_SECONDS,
            sample_rate: SAMPLE_RATE as u32,
            output_dir: PathBuf::from(RECORD_OUTPUT_DIR),
        }
    }
}

/// Trainer settings; `dataset_path` and `model_path` come from the CLI.
#[derive(Clone, Debug)]
pub struct TrainConfig {
    pub dataset_path: PathBuf,
    pub model_path: PathBuf,
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl TrainConfig {
    pub fn new(dataset_path: PathBuf, model_path: PathBuf) -> Self {
        Self {
            dataset_path,
            model_path,
            epochs: DEFAULT_EPOCHS,
            learning_rate: LEARNING_RATE,
            seed: SPLIT_SEED,
        }
    }
}
