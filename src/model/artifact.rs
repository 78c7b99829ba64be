//! On-disk model artifact.
//!
//! CBOR container with a version byte, the label list, the expected grid
//! shape, and an ordered map of named tensors. Tensors are stored
//! quantized: raw little-endian **f16** bytes plus dims. Loading
//! dequantizes back to f32, so the artifact is half the size of the
//! training-time weights and the evaluator never sees the difference beyond
//! rounding.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use candle_core::{DType, Device, Tensor};
use ciborium::{de, ser};
use half::f16;
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{ARTIFACT_VERSION, MFCC_COEFFS, MFCC_FRAMES};

/* --------------------------------------------------------------------- */
/*  Error type                                                           */

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cbor: {0}")]
    Cbor(String),
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("unsupported tensor dtype {0:?}")]
    UnsupportedDtype(String),
    #[error("tensor '{name}' has {got} bytes, dims {dims:?} need {need}")]
    BadLength {
        name: String,
        got: usize,
        need: usize,
        dims: Vec<usize>,
    },
}

fn write_cbor<W: Write, T: Serialize + ?Sized>(w: W, val: &T) -> Result<(), ArtifactError> {
    ser::into_writer(val, w).map_err(|e| ArtifactError::Cbor(e.to_string()))
}
fn read_cbor<R: Read, T: DeserializeOwned>(r: R) -> Result<T, ArtifactError> {
    de::from_reader(r).map_err(|e| ArtifactError::Cbor(e.to_string()))
}

/* --------------------------------------------------------------------- */
/*  Save / load traits                                                   */

/// CBOR serialization with an atomic file write
/// (“`<file>.tmp` → rename” on the same filesystem).
pub trait ModelSave: Serialize {
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");

        {
            let f = File::create(&tmp)?;
            let mut bw = BufWriter::new(f);
            write_cbor(&mut bw, self)?;
            bw.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn save_to_buffer(&self) -> Result<Vec<u8>, ArtifactError> {
        let mut buf = Vec::new();
        write_cbor(&mut buf, self)?;
        Ok(buf)
    }
}

/// Counterpart of [`ModelSave`].
pub trait ModelLoad: DeserializeOwned + Sized {
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let f = File::open(path)?;
        read_cbor(BufReader::new(f))
    }

    fn load_from_buffer(buf: &[u8]) -> Result<Self, ArtifactError> {
        read_cbor(BufReader::new(buf))
    }
}

/* --------------------------------------------------------------------- */
/*  Tensor container                                                     */

/// One serialized tensor: raw little-endian bytes + shape + dtype string
/// ("f16" for quantized weights, "f32" accepted for compatibility).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorData {
    pub bytes: Vec<u8>,
    pub dims: Vec<usize>,
    pub d_type: String,
}

impl TensorData {
    /// Quantize a training-time tensor to f16 storage.
    pub fn quantize(tensor: &Tensor) -> Result<Self, ArtifactError> {
        let dims = tensor.shape().dims().to_vec();
        let flat = tensor
            .flatten_all()?
            .to_dtype(DType::F16)?
            .to_vec1::<f16>()?;
        let mut bytes = Vec::with_capacity(flat.len() * 2);
        for v in flat {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Ok(Self {
            bytes,
            dims,
            d_type: "f16".to_owned(),
        })
    }

    /// Dequantize back into an f32 tensor on `dev`.
    pub fn to_tensor(&self, name: &str, dev: &Device) -> Result<Tensor, ArtifactError> {
        let need = self.dims.iter().product::<usize>();
        let values = match self.d_type.as_str() {
            "f16" => {
                self.check_len(name, need, 2)?;
                self.bytes
                    .chunks_exact(2)
                    .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
                    .collect::<Vec<f32>>()
            }
            "f32" => {
                self.check_len(name, need, 4)?;
                self.bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect::<Vec<f32>>()
            }
            other => return Err(ArtifactError::UnsupportedDtype(other.to_owned())),
        };
        Ok(Tensor::from_vec(values, self.dims.as_slice(), dev)?)
    }

    fn check_len(&self, name: &str, need: usize, width: usize) -> Result<(), ArtifactError> {
        if self.bytes.len() != need * width {
            return Err(ArtifactError::BadLength {
                name: name.to_owned(),
                got: self.bytes.len(),
                need: need * width,
                dims: self.dims.clone(),
            });
        }
        Ok(())
    }
}

/* --------------------------------------------------------------------- */
/*  The artifact                                                         */

/// Exported classifier: labels, expected grid shape and quantized weights.
/// Written once at the end of training, immutable afterwards.
#[derive(Serialize, Deserialize)]
pub struct CommandModel {
    version: u8,

    /// Class names in target-index order.
    pub labels: Vec<String>,

    /// Fixed grid shape expected by the network (frames, coefficients).
    pub grid_size: (u16, u16),

    /// Named weight tensors in deterministic order.
    pub weights: IndexMap<String, TensorData>,
}

impl CommandModel {
    pub fn new(labels: Vec<String>, weights: IndexMap<String, TensorData>) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            labels,
            grid_size: (MFCC_FRAMES as u16, MFCC_COEFFS as u16),
            weights,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }
}

impl ModelSave for CommandModel {}
impl ModelLoad for CommandModel {}

/* --------------------------------------------------------------------- */
/*  Unit-tests                                                           */

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model() -> Result<CommandModel, ArtifactError> {
        let dev = Device::Cpu;
        let t = Tensor::from_vec(vec![0.5f32, -1.25, 2.0, 0.0], (2, 2), &dev)?;
        let mut weights = IndexMap::new();
        weights.insert("fc.weight".to_owned(), TensorData::quantize(&t)?);
        Ok(CommandModel::new(
            vec!["adelante".into(), "ruido".into()],
            weights,
        ))
    }

    #[test]
    fn quantize_round_trips_within_f16_precision() -> Result<(), ArtifactError> {
        let dev = Device::Cpu;
        let values = vec![0.123f32, -0.75, 3.5, -0.001];
        let t = Tensor::from_vec(values.clone(), (4,), &dev)?;
        let td = TensorData::quantize(&t)?;
        assert_eq!(td.d_type, "f16");
        assert_eq!(td.bytes.len(), values.len() * 2);

        let back = td.to_tensor("t", &dev)?.to_vec1::<f32>()?;
        for (a, b) in values.iter().zip(&back) {
            assert!((a - b).abs() < 3e-3, "{a} vs {b}");
        }
        Ok(())
    }

    #[test]
    fn save_load_preserves_metadata_and_leaves_no_tmp() -> Result<(), ArtifactError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("m.kwm");

        let model = toy_model()?;
        model.save_to_file(&path)?;
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let loaded = CommandModel::load_from_file(&path)?;
        assert_eq!(loaded.version(), ARTIFACT_VERSION);
        assert_eq!(loaded.labels, model.labels);
        assert_eq!(loaded.grid_size, (MFCC_FRAMES as u16, MFCC_COEFFS as u16));
        assert_eq!(loaded.weights["fc.weight"].dims, vec![2, 2]);
        assert_eq!(loaded.weights["fc.weight"].d_type, "f16");
        Ok(())
    }

    #[test]
    fn mismatched_byte_length_is_rejected() {
        let td = TensorData {
            bytes: vec![0; 6],
            dims: vec![2, 2],
            d_type: "f16".to_owned(),
        };
        let err = td.to_tensor("bad", &Device::Cpu).expect_err("must fail");
        assert!(matches!(err, ArtifactError::BadLength { .. }));
    }
}
