//! The classifier network.
//!
//! conv2d(1→8, 3×3, pad 1) + max-pool 2 →
//! conv2d(8→16, 3×3, pad 1) + max-pool 2 →
//! flatten → linear 32 + ReLU → linear → class count.
//!
//! Input layout is `(batch, 1, MFCC_FRAMES, MFCC_COEFFS)`.

use candle_core::{DType, Device, Result as CandleResult, Tensor, D};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, Module, VarBuilder, VarMap};
use thiserror::Error;

use crate::constants::{MFCC_COEFFS, MFCC_FRAMES};
use crate::model::artifact::{ArtifactError, CommandModel};

/// Flattened size after the two conv + pool blocks.
pub const FLATTENED: usize = 16 * ((MFCC_FRAMES / 2) / 2) * ((MFCC_COEFFS / 2) / 2);

#[derive(Debug, Error)]
pub enum NetError {
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("artifact: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("model weight '{0}' missing in artifact")]
    MissingWeight(String),
    #[error("mutex poison: {0}")]
    Poison(String),
}

pub struct CommandNet {
    conv1: Conv2d,
    conv2: Conv2d,
    fc1: Linear,
    fc2: Linear,
}

impl CommandNet {
    /// Build the network under `vb`; weights are freshly initialized unless
    /// the caller's [`VarMap`] already holds values.
    pub fn new(vb: VarBuilder, num_labels: usize) -> CandleResult<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        Ok(Self {
            conv1: conv2d(1, 8, 3, cfg, vb.pp("conv1"))?,
            conv2: conv2d(8, 16, 3, cfg, vb.pp("conv2"))?,
            fc1: linear(FLATTENED, 32, vb.pp("fc1"))?,
            fc2: linear(32, num_labels, vb.pp("fc2"))?,
        })
    }

    /// Rebuild the network from an exported artifact's dequantized weights.
    pub fn from_artifact(model: &CommandModel, dev: &Device) -> Result<Self, NetError> {
        let var_map = VarMap::new();
        let vb = VarBuilder::from_varmap(&var_map, DType::F32, dev);
        let net = Self::new(vb, model.labels.len())?;

        let mut guard = var_map
            .data()
            .lock()
            .map_err(|e| NetError::Poison(e.to_string()))?;
        for (name, var) in guard.iter_mut() {
            let td = model
                .weights
                .get(name)
                .ok_or_else(|| NetError::MissingWeight(name.clone()))?;
            var.set(&td.to_tensor(name, dev)?)?;
        }
        drop(guard);
        Ok(net)
    }

    pub fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        let xs = self.conv1.forward(xs)?.relu()?.max_pool2d(2)?;
        let xs = self.conv2.forward(&xs)?.relu()?.max_pool2d(2)?;
        let xs = xs.flatten_from(1)?;
        let xs = self.fc1.forward(&xs)?.relu()?;
        self.fc2.forward(&xs)
    }

    /// Predicted class index per batch row.
    pub fn predict(&self, xs: &Tensor) -> CandleResult<Vec<u32>> {
        self.forward(xs)?.argmax(D::Minus1)?.to_vec1::<u32>()
    }
}

/// Pack feature grids into an input tensor of shape `(N, 1, frames, coeffs)`.
pub fn grids_to_tensor(grids: &[Vec<Vec<f32>>], dev: &Device) -> CandleResult<Tensor> {
    let mut flat = Vec::with_capacity(grids.len() * MFCC_FRAMES * MFCC_COEFFS);
    for grid in grids {
        for frame in grid {
            flat.extend_from_slice(frame);
        }
    }
    Tensor::from_vec(flat, (grids.len(), 1, MFCC_FRAMES, MFCC_COEFFS), dev)
}

/* --------------------------------------------------------------------- */
/*  Unit-tests                                                           */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;
    use crate::model::artifact::TensorData;
    use indexmap::IndexMap;

    fn fresh_net(dev: &Device) -> CandleResult<(VarMap, CommandNet)> {
        let var_map = VarMap::new();
        let vb = VarBuilder::from_varmap(&var_map, DType::F32, dev);
        let net = CommandNet::new(vb, Label::count())?;
        Ok((var_map, net))
    }

    fn toy_batch(n: usize, dev: &Device) -> CandleResult<Tensor> {
        let grids: Vec<Vec<Vec<f32>>> = (0..n)
            .map(|i| {
                (0..MFCC_FRAMES)
                    .map(|f| (0..MFCC_COEFFS).map(|c| ((i + f + c) as f32).sin()).collect())
                    .collect()
            })
            .collect();
        grids_to_tensor(&grids, dev)
    }

    #[test]
    fn forward_yields_one_logit_row_per_example() -> CandleResult<()> {
        let dev = Device::Cpu;
        let (_vm, net) = fresh_net(&dev)?;
        let logits = net.forward(&toy_batch(3, &dev)?)?;
        assert_eq!(logits.dims(), &[3, Label::count()]);
        Ok(())
    }

    #[test]
    fn prediction_survives_quantized_export_and_reload() -> Result<(), NetError> {
        let dev = Device::Cpu;
        let (var_map, net) = fresh_net(&dev)?;

        // bias the last layer hard toward one class so the argmax has a
        // margin far beyond f16 rounding
        {
            let mut guard = var_map
                .data()
                .lock()
                .map_err(|e| NetError::Poison(e.to_string()))?;
            let bias = guard
                .get_mut("fc2.bias")
                .ok_or_else(|| NetError::MissingWeight("fc2.bias".into()))?;
            bias.set(&Tensor::from_vec(
                vec![0.0f32, 0.0, 50.0, 0.0, 0.0],
                (Label::count(),),
                &dev,
            )?)?;
        }

        let batch = toy_batch(2, &dev)?;
        let before = net.predict(&batch)?;
        assert_eq!(before, vec![2, 2]);

        let mut weights = IndexMap::new();
        {
            let guard = var_map
                .data()
                .lock()
                .map_err(|e| NetError::Poison(e.to_string()))?;
            for (name, var) in guard.iter() {
                weights.insert(name.clone(), TensorData::quantize(var.as_tensor())?);
            }
        }
        let artifact = CommandModel::new(Label::names(), weights);
        let reloaded = CommandNet::from_artifact(&artifact, &dev)?;

        assert_eq!(reloaded.predict(&batch)?, before);
        Ok(())
    }
}
