//! Evaluation stage: reload the exported artifact and predict every labeled
//! clip under a test tree.
//!
//! Purely observational – predictions are returned (and printed by the CLI)
//! per file; nothing is aggregated.

use std::fs;
use std::path::{Path, PathBuf};

use candle_core::Device;
use thiserror::Error;

use crate::audio::{self, AudioError};
use crate::dataset;
use crate::mfcc::MfccExtractor;
use crate::model::{
    artifact::ArtifactError,
    net::{grids_to_tensor, CommandNet, NetError},
    CommandModel, ModelLoad,
};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("artifact: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("net: {0}")]
    Net(#[from] NetError),
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}: {source}", .path.display())]
    Clip { path: PathBuf, source: AudioError },
    #[error("model predicted an empty batch")]
    NoPrediction,
}

/// One prediction line: file name, the label its directory claims, and the
/// class index the model picked.
#[derive(Clone, Debug)]
pub struct Prediction {
    pub file: String,
    pub true_label: String,
    pub predicted: u32,
}

/// Load the artifact at `model_path` and run it over every
/// `<test_dir>/<label>/*.wav`, in directory-name order.
pub fn evaluate_dir(model_path: &Path, test_dir: &Path) -> Result<Vec<Prediction>, EvalError> {
    let model = CommandModel::load_from_file(model_path)?;
    let dev = Device::Cpu;
    let net = CommandNet::from_artifact(&model, &dev)?;
    log::info!(
        "loaded model with labels {:?} from {}",
        model.labels,
        model_path.display()
    );

    let mut class_dirs: Vec<PathBuf> = fs::read_dir(test_dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    class_dirs.sort();

    let mut mfcc = MfccExtractor::new();
    let mut predictions = Vec::new();

    for dir in class_dirs {
        let true_label = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for path in dataset::wav_files(&dir)? {
            let clip = audio::load_clip(&path).map_err(|source| EvalError::Clip {
                path: path.clone(),
                source,
            })?;
            let grid = mfcc.grid(&clip);
            let input = grids_to_tensor(std::slice::from_ref(&grid), &dev)?;
            let predicted = *net
                .predict(&input)?
                .first()
                .ok_or(EvalError::NoPrediction)?;

            predictions.push(Prediction {
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                true_label: true_label.clone(),
                predicted,
            });
        }
    }

    Ok(predictions)
}
