//! Sequence model contract
//!
//! The pipeline only needs two things from a reconstruction model: fit it
//! on nominal windows, and reconstruct windows of the same shape. Any
//! learner that implements [`ModelTrainer`] and [`SequenceModel`] can be
//! swapped in; [`DenseAutoencoder`] is the one shipped.

mod autoencoder;

pub use autoencoder::{Activation, AutoencoderTrainer, Dense, DenseAutoencoder};

use crate::error::Result;
use crate::window::WindowSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A trained reconstruction model.
///
/// Serializable so the artifact store can persist it next to the scaler.
pub trait SequenceModel: Serialize + DeserializeOwned {
    /// Reconstruct every window. The output has the input's shape.
    fn predict(&self, windows: &WindowSet) -> Result<WindowSet>;

    /// (n_past, num_features) the model was trained on.
    fn input_shape(&self) -> (usize, usize);
}

/// Fits a [`SequenceModel`] on nominal windows.
pub trait ModelTrainer {
    type Model: SequenceModel;

    /// Self-supervised fit: the target of every window is the window.
    fn fit(&self, windows: &WindowSet) -> Result<(Self::Model, TrainingHistory)>;
}

/// Per-epoch losses of one fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    /// Empty when no windows were held out.
    pub val_loss: Vec<f64>,
    pub train_windows: usize,
    pub val_windows: usize,
}

impl TrainingHistory {
    pub fn epochs(&self) -> usize {
        self.train_loss.len()
    }

    pub fn final_train_loss(&self) -> Option<f64> {
        self.train_loss.last().copied()
    }

    pub fn final_val_loss(&self) -> Option<f64> {
        self.val_loss.last().copied()
    }
}
