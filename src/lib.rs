//! Rumbo – voice-command recognizer
//! ================================
//! A small keyword-spotting pipeline for direction words ("adelante",
//! "atras", "derecha", "izquierda" + a "ruido" catch-all):
//!
//! 1. [`recorder`] captures fixed-duration labeled clips into a
//!    `<dataset>/<label>/<label>_<index>.wav` tree.
//! 2. [`trainer`] turns every clip into a fixed (40 × 13) MFCC grid, fits a
//!    small convolutional classifier and exports a quantized CBOR artifact.
//! 3. [`evaluator`] reloads the artifact and prints one prediction line per
//!    labeled test clip.
//!
//! The three stages compose purely through the filesystem; nothing here is
//! concurrent or long-running.
#![deny(unsafe_code)]

/* ────────────────────────  sub-modules  ─────────────────────────────── */
pub mod audio;
pub mod augment;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod evaluator;
pub mod mfcc;
pub mod model;
pub mod recorder;
pub mod trainer;

/* ────────── public façade & re-exports ─────────────── */
pub use config::{RecorderConfig, TrainConfig};
pub use constants::*;
pub use dataset::{Label, Sample};
pub use evaluator::Prediction;
pub use mfcc::MfccExtractor;
pub use model::{CommandModel, CommandNet, ModelLoad, ModelSave};
