//! Training stage: load → split → augment → fit → evaluate → export.
//!
//! Every stage failure aborts the whole run; there is no checkpointing and
//! no partial resume.

use candle_core::{DType, Device, Tensor};
use candle_nn::{
    loss,
    optim::{AdamW, ParamsAdamW},
    Optimizer, VarBuilder, VarMap,
};
use indexmap::IndexMap;
use rand::{rngs::StdRng, SeedableRng};
use thiserror::Error;

use crate::augment;
use crate::config::TrainConfig;
use crate::constants::BATCH_SIZE;
use crate::dataset::{self, DatasetError, Label, Sample};
use crate::model::{
    artifact::{ArtifactError, CommandModel, TensorData},
    net::{grids_to_tensor, CommandNet},
    ModelSave,
};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("dataset: {0}")]
    Dataset(#[from] DatasetError),
    #[error("{0} split is empty – not enough clips to train")]
    EmptySplit(&'static str),
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("artifact: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("mutex poison: {0}")]
    Poison(String),
}

/// What the run produced, for the caller to report.
pub struct TrainReport {
    pub train_examples: usize,
    pub val_examples: usize,
    pub test_examples: usize,
    pub test_accuracy: f32,
}

/// Run the whole training pipeline and export the quantized artifact to
/// `cfg.model_path`.
pub fn train(cfg: &TrainConfig) -> Result<TrainReport, TrainError> {
    /* ---------- 1. load + split ---------- */

    let samples = dataset::load(&cfg.dataset_path)?;
    let (train_raw, val, test) = dataset::split(samples, cfg.seed);
    for (name, split) in [("train", &train_raw), ("validation", &val), ("test", &test)] {
        if split.is_empty() {
            return Err(TrainError::EmptySplit(name));
        }
    }

    /* ---------- 2. augment (train split only) ---------- */

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let train = augment::augment_set(train_raw, &mut rng);
    println!(
        "dataset: {} train (augmented) / {} validation / {} test",
        train.len(),
        val.len(),
        test.len()
    );

    /* ---------- 3. tensors ---------- */

    let dev = Device::Cpu;
    let (tr_x, tr_y) = batchify(&train, &dev)?;
    let (val_x, val_y) = batchify(&val, &dev)?;
    let (test_x, test_y) = batchify(&test, &dev)?;

    /* ---------- 4. build network ---------- */

    let var_map = VarMap::new();
    let vb = VarBuilder::from_varmap(&var_map, DType::F32, &dev);
    let net = CommandNet::new(vb, Label::count())?;
    let mut opt = AdamW::new(
        var_map.all_vars(),
        ParamsAdamW {
            lr: cfg.learning_rate,
            ..Default::default()
        },
    )?;

    /* ---------- 5. fit ---------- */

    let batches = train.len().div_ceil(BATCH_SIZE);
    for epoch in 1..=cfg.epochs {
        let mut epoch_loss = 0f32;
        for b in 0..batches {
            let lo = b * BATCH_SIZE;
            let len = BATCH_SIZE.min(train.len() - lo);

            let x = tr_x.narrow(0, lo, len)?;
            let y = tr_y.narrow(0, lo, len)?;

            let logits = net.forward(&x)?;
            let batch_loss = loss::cross_entropy(&logits, &y)?;
            opt.backward_step(&batch_loss)?;
            epoch_loss += batch_loss.to_scalar::<f32>()?;
        }

        let val_logits = net.forward(&val_x)?;
        let val_loss = loss::cross_entropy(&val_logits, &val_y)?.to_scalar::<f32>()?;
        let val_acc = accuracy(&net, &val_x, &val_y)?;
        println!(
            "epoch {epoch}/{}  loss {:.4}  val_loss {val_loss:.4}  val_acc {val_acc:.2}",
            cfg.epochs,
            epoch_loss / batches as f32,
        );
    }

    /* ---------- 6. evaluate ---------- */

    let test_accuracy = accuracy(&net, &test_x, &test_y)?;
    println!("test accuracy: {test_accuracy:.2}");

    /* ---------- 7. export ---------- */

    let weights = quantize_weights(&var_map)?;
    let artifact = CommandModel::new(Label::names(), weights);
    artifact.save_to_file(&cfg.model_path)?;
    println!("model saved to: {}", cfg.model_path.display());

    Ok(TrainReport {
        train_examples: train.len(),
        val_examples: val.len(),
        test_examples: test.len(),
        test_accuracy,
    })
}

/* ---------- helpers --------------------------------------------------- */

fn batchify(samples: &[Sample], dev: &Device) -> Result<(Tensor, Tensor), TrainError> {
    let grids: Vec<_> = samples.iter().map(|s| s.grid.clone()).collect();
    let labels: Vec<u32> = samples.iter().map(|s| s.label.index()).collect();
    let x = grids_to_tensor(&grids, dev)?;
    let y = Tensor::from_vec(labels, (samples.len(),), dev)?;
    Ok((x, y))
}

fn accuracy(net: &CommandNet, x: &Tensor, y: &Tensor) -> Result<f32, TrainError> {
    let predicted = net.predict(x)?;
    let truth = y.to_vec1::<u32>()?;
    let hits = predicted
        .iter()
        .zip(&truth)
        .filter(|(p, t)| p == t)
        .count();
    Ok(hits as f32 / truth.len().max(1) as f32)
}

/// Snapshot every trained tensor as quantized [`TensorData`], in
/// deterministic name order.
fn quantize_weights(var_map: &VarMap) -> Result<IndexMap<String, TensorData>, TrainError> {
    let guard = var_map
        .data()
        .lock()
        .map_err(|e| TrainError::Poison(e.to_string()))?;

    let mut names: Vec<&String> = guard.keys().collect();
    names.sort();

    let mut weights = IndexMap::new();
    for name in names {
        let var = &guard[name];
        weights.insert(name.clone(), TensorData::quantize(var.as_tensor())?);
    }
    Ok(weights)
}
