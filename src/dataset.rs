//! Dataset loading and splitting.
//!
//! The vocabulary is a closed set: four direction words plus a background
//! catch-all. The loader walks `<root>/<label>/*.wav` for every label and
//! aborts if a label directory is missing; the splitter shuffles with a
//! fixed seed so runs are reproducible.

use std::fs;
use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

use crate::audio::{self, AudioError};
use crate::constants::{TRAIN_FRACTION, VAL_FRACTION};
use crate::mfcc::MfccExtractor;

/* --------------------------------------------------------------------- */
/*  Vocabulary                                                           */

/// Classifier vocabulary, in target-index order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Label {
    Adelante,
    Atras,
    Derecha,
    Izquierda,
    /// Background / non-command catch-all.
    Ruido,
}

impl Label {
    /// Index used as the classification target.
    pub fn index(self) -> u32 {
        Label::iter().position(|l| l == self).unwrap_or(0) as u32
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Number of classes.
    pub fn count() -> usize {
        Label::iter().count()
    }

    /// Label names in index order, for the model artifact.
    pub fn names() -> Vec<String> {
        Label::iter().map(|l| l.as_str().to_owned()).collect()
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/* --------------------------------------------------------------------- */
/*  Loading                                                              */

/// One training example: a fixed-shape feature grid and its class.
#[derive(Clone, Debug)]
pub struct Sample {
    pub grid: Vec<Vec<f32>>,
    pub label: Label,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("label directory missing or unreadable: {} ({source})", .path.display())]
    MissingLabel {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}: {source}", .path.display())]
    Clip { path: PathBuf, source: AudioError },
    #[error("no wav files found under {}", .0.display())]
    Empty(PathBuf),
}

/// Walk every label's subdirectory of `root` and collect one [`Sample`] per
/// wav file. Directory entries are visited in name order so the pooled
/// example order (and therefore the seeded split) is reproducible.
pub fn load(root: &Path) -> Result<Vec<Sample>, DatasetError> {
    let mut mfcc = MfccExtractor::new();
    let mut samples = Vec::new();

    for label in Label::iter() {
        let dir = root.join(label.as_str());
        for path in wav_files(&dir).map_err(|source| DatasetError::MissingLabel {
            path: dir.clone(),
            source,
        })? {
            let clip = audio::load_clip(&path)
                .map_err(|source| DatasetError::Clip { path, source })?;
            samples.push(Sample {
                grid: mfcc.grid(&clip),
                label,
            });
        }
        log::debug!("loaded label '{label}' from {}", dir.display());
    }

    if samples.is_empty() {
        return Err(DatasetError::Empty(root.to_path_buf()));
    }
    log::info!("{} clips loaded from {}", samples.len(), root.display());
    Ok(samples)
}

/// Sorted `*.wav` paths directly under `dir`.
pub fn wav_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "wav"))
        .collect();
    paths.sort();
    Ok(paths)
}

/* --------------------------------------------------------------------- */
/*  Splitting                                                            */

/// Shuffle `items` with the given seed, then cut train / validation / test
/// pieces of round(0.8·N) / round(0.1·N) / remainder. Not stratified; the
/// cut is purely positional after the shuffle.
pub fn split<T>(mut items: Vec<T>, seed: u64) -> (Vec<T>, Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let n = items.len();
    let n_train = ((n as f32) * TRAIN_FRACTION).round() as usize;
    let n_val = ((n as f32) * VAL_FRACTION).round() as usize;

    let rest = items.split_off(n_train.min(n));
    let mut val = rest;
    let test = val.split_off(n_val.min(val.len()));
    (items, val, test)
}

/* --------------------------------------------------------------------- */
/*  Unit-tests                                                           */
