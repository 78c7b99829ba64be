//! The classifier and its on-disk artifact.

pub mod artifact;
pub mod net;

pub use artifact::{ArtifactError, CommandModel, ModelLoad, ModelSave, TensorData};
pub use net::{CommandNet, NetError};
