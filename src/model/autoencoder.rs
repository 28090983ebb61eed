// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Dense autoencoder.
//!
//! Each window is flattened into one column of `n_past * num_features`
//! values and pushed through
//!
//! ```text
//! input -> hidden (tanh) -> latent (linear) -> hidden (tanh) -> output (linear)
//! ```
//!
//! Trained on the mean absolute reconstruction error with Adam. Weight
//! init and batch order come from a seeded `StdRng`, so a fit is
//! reproducible for a given config.

use super::{ModelTrainer, SequenceModel, TrainingHistory};
use crate::config::TrainingConfig;
use crate::error::{ClogError, ComputationError, Result};
use crate::window::WindowSet;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// Windows per forward pass at prediction time.
const PREDICT_CHUNK: usize = 512;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Tanh,
    Linear,
}

/// Fully connected layer, `outputs x inputs` weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    activation: Activation,
}

impl Dense {
    /// Xavier-uniform weights, zero bias.
    fn new(rng: &mut StdRng, inputs: usize, outputs: usize, activation: Activation) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        let dist = Uniform::new(-limit, limit);
        Self {
            weights: DMatrix::from_fn(outputs, inputs, |_, _| dist.sample(&mut *rng)),
            bias: DVector::zeros(outputs),
            activation,
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// One column per sample.
    fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let mut z = &self.weights * x;
        for mut col in z.column_iter_mut() {
            col += &self.bias;
        }
        if self.activation == Activation::Tanh {
            z.iter_mut().for_each(|v| *v = v.tanh());
        }
        z
    }
}

/// Trained autoencoder over flattened windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseAutoencoder {
    n_past: usize,
    num_features: usize,
    layers: Vec<Dense>,
}

impl DenseAutoencoder {
    fn new(n_past: usize, num_features: usize, config: &TrainingConfig, rng: &mut StdRng) -> Self {
        let d = n_past * num_features;
        let layers = vec![
            Dense::new(rng, d, config.hidden_units, Activation::Tanh),
            Dense::new(rng, config.hidden_units, config.latent_units, Activation::Linear),
            Dense::new(rng, config.latent_units, config.hidden_units, Activation::Tanh),
            Dense::new(rng, config.hidden_units, d, Activation::Linear),
        ];
        Self {
            n_past,
            num_features,
            layers,
        }
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    fn input_len(&self) -> usize {
        self.n_past * self.num_features
    }

    /// Layer sizes must chain from the input width back to it. A model
    /// read from disk is checked before use.
    fn check_layers(&self) -> Result<()> {
        let mut width = self.input_len();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.inputs() != width || layer.bias.len() != layer.outputs() {
                return Err(ComputationError::ShapeMismatch {
                    expected: format!("layer {} with {} inputs", i, width),
                    actual: format!("{}x{}", layer.outputs(), layer.inputs()),
                }
                .into());
            }
            width = layer.outputs();
        }
        if self.layers.is_empty() || width != self.input_len() {
            return Err(ComputationError::ShapeMismatch {
                expected: format!("{} outputs", self.input_len()),
                actual: format!("{} outputs", width),
            }
            .into());
        }
        Ok(())
    }

    fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let mut a = x.clone();
        for layer in &self.layers {
            a = layer.forward(&a);
        }
        a
    }

    /// Forward pass keeping every layer output, input first.
    fn forward_trace(&self, x: DMatrix<f64>) -> Vec<DMatrix<f64>> {
        let mut trace = Vec::with_capacity(self.layers.len() + 1);
        trace.push(x);
        for layer in &self.layers {
            let next = layer.forward(&trace[trace.len() - 1]);
            trace.push(next);
        }
        trace
    }
}

impl SequenceModel for DenseAutoencoder {
    fn predict(&self, windows: &WindowSet) -> Result<WindowSet> {
        if (windows.n_past(), windows.num_features()) != self.input_shape() {
            return Err(ComputationError::ShapeMismatch {
                expected: format!("windows of {}x{}", self.n_past, self.num_features),
                actual: format!("windows of {}x{}", windows.n_past(), windows.num_features()),
            }
            .into());
        }
        self.check_layers()?;

        let d = self.input_len();
        let mut out = Vec::with_capacity(windows.as_slice().len());
        for chunk in windows.as_slice().chunks(PREDICT_CHUNK * d) {
            let x = DMatrix::from_column_slice(d, chunk.len() / d, chunk);
            let y = self.forward(&x);
            out.extend_from_slice(y.as_slice());
        }

        if out.iter().any(|v| !v.is_finite()) {
            return Err(ComputationError::NonFinite {
                stage: "reconstruction".to_string(),
            }
            .into());
        }
        WindowSet::from_flat(self.n_past, self.num_features, out)
    }

    fn input_shape(&self) -> (usize, usize) {
        (self.n_past, self.num_features)
    }
}

/// Adam moments for one layer.
struct LayerMoments {
    m_w: DMatrix<f64>,
    v_w: DMatrix<f64>,
    m_b: DVector<f64>,
    v_b: DVector<f64>,
}

struct Adam {
    learning_rate: f64,
    t: i32,
    moments: Vec<LayerMoments>,
}

impl Adam {
    fn new(learning_rate: f64, layers: &[Dense]) -> Self {
        let moments = layers
            .iter()
            .map(|l| LayerMoments {
                m_w: DMatrix::zeros(l.outputs(), l.inputs()),
                v_w: DMatrix::zeros(l.outputs(), l.inputs()),
                m_b: DVector::zeros(l.outputs()),
                v_b: DVector::zeros(l.outputs()),
            })
            .collect();
        Self {
            learning_rate,
            t: 0,
            moments,
        }
    }

    /// Start a new step; returns the bias-corrected step size.
    fn tick(&mut self) -> f64 {
        self.t += 1;
        let c1 = 1.0 - ADAM_BETA1.powi(self.t);
        let c2 = 1.0 - ADAM_BETA2.powi(self.t);
        self.learning_rate * c2.sqrt() / c1
    }

    fn apply(param: &mut [f64], grad: &[f64], m: &mut [f64], v: &mut [f64], step: f64) {
        for (((p, g), m), v) in param.iter_mut().zip(grad).zip(m.iter_mut()).zip(v.iter_mut()) {
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            *p -= step * *m / (v.sqrt() + ADAM_EPSILON);
        }
    }

    fn update(
        &mut self,
        k: usize,
        layer: &mut Dense,
        grad_w: &DMatrix<f64>,
        grad_b: &DVector<f64>,
        step: f64,
    ) {
        let mo = &mut self.moments[k];
        Self::apply(
            layer.weights.as_mut_slice(),
            grad_w.as_slice(),
            mo.m_w.as_mut_slice(),
            mo.v_w.as_mut_slice(),
            step,
        );
        Self::apply(
            layer.bias.as_mut_slice(),
            grad_b.as_slice(),
            mo.m_b.as_mut_slice(),
            mo.v_b.as_mut_slice(),
            step,
        );
    }
}

fn mean_abs_error(y: &DMatrix<f64>, x: &DMatrix<f64>) -> f64 {
    let n = x.len().max(1) as f64;
    y.iter().zip(x.iter()).map(|(a, b)| (a - b).abs()).sum::<f64>() / n
}

fn batch_matrix(windows: &WindowSet, indices: &[usize]) -> DMatrix<f64> {
    DMatrix::from_iterator(
        windows.window_len(),
        indices.len(),
        indices.iter().flat_map(|&i| windows.window(i).iter().copied()),
    )
}

/// Trains a [`DenseAutoencoder`].
#[derive(Debug, Clone, Default)]
pub struct AutoencoderTrainer {
    config: TrainingConfig,
}

impl AutoencoderTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// One gradient step on a batch. Returns the batch loss.
    fn train_batch(model: &mut DenseAutoencoder, adam: &mut Adam, x: DMatrix<f64>) -> Result<f64> {
        let trace = model.forward_trace(x);
        let input = &trace[0];
        let output = &trace[trace.len() - 1];

        let loss = mean_abs_error(output, input);
        if !loss.is_finite() {
            return Err(ComputationError::NonFinite {
                stage: "training loss".to_string(),
            }
            .into());
        }

        // d|y - x| / dy, averaged over every element of the batch
        let scale = 1.0 / input.len() as f64;
        let mut delta = output.zip_map(input, |y, x| {
            if y > x {
                scale
            } else if y < x {
                -scale
            } else {
                0.0
            }
        });

        let step = adam.tick();
        for k in (0..model.layers.len()).rev() {
            let layer_out = &trace[k + 1];
            if model.layers[k].activation == Activation::Tanh {
                delta.zip_apply(layer_out, |d, a| *d *= 1.0 - a * a);
            }
            let grad_w = &delta * trace[k].transpose();
            let grad_b = delta.column_sum();
            let next = if k > 0 {
                Some(model.layers[k].weights.transpose() * &delta)
            } else {
                None
            };
            adam.update(k, &mut model.layers[k], &grad_w, &grad_b, step);
            if let Some(next) = next {
                delta = next;
            }
        }
        Ok(loss)
    }
}

impl ModelTrainer for AutoencoderTrainer {
    type Model = DenseAutoencoder;

    fn fit(&self, windows: &WindowSet) -> Result<(DenseAutoencoder, TrainingHistory)> {
        let cfg = &self.config;
        cfg.validate()?;
        if windows.is_empty() {
            return Err(ClogError::InsufficientData {
                rows: 0,
                required: 1,
            });
        }
        if windows.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(ComputationError::NonFinite {
                stage: "training input".to_string(),
            }
            .into());
        }

        let total = windows.len();
        // the tail is held out before any shuffling
        let n_val = ((total as f64 * cfg.validation_split) as usize).min(total - 1);
        let n_train = total - n_val;
        let mut train_idx: Vec<usize> = (0..n_train).collect();
        let val_idx: Vec<usize> = (n_train..total).collect();
        let val_x = (n_val > 0).then(|| batch_matrix(windows, &val_idx));

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut model =
            DenseAutoencoder::new(windows.n_past(), windows.num_features(), cfg, &mut rng);
        let mut adam = Adam::new(cfg.learning_rate, &model.layers);
        let mut history = TrainingHistory {
            train_windows: n_train,
            val_windows: n_val,
            ..TrainingHistory::default()
        };

        log::info!(
            "Training autoencoder on {} windows ({} held out), {} epochs",
            n_train,
            n_val,
            cfg.epochs
        );

        for epoch in 0..cfg.epochs {
            train_idx.shuffle(&mut rng);
            let mut weighted = 0.0;
            for batch in train_idx.chunks(cfg.batch_size) {
                let loss = Self::train_batch(&mut model, &mut adam, batch_matrix(windows, batch))?;
                weighted += loss * batch.len() as f64;
            }
            let train_loss = weighted / n_train as f64;
            history.train_loss.push(train_loss);

            if let Some(val_x) = &val_x {
                let val_loss = mean_abs_error(&model.forward(val_x), val_x);
                if !val_loss.is_finite() {
                    return Err(ComputationError::NonFinite {
                        stage: "validation loss".to_string(),
                    }
                    .into());
                }
                history.val_loss.push(val_loss);
                log::debug!(
                    "epoch {}/{}: loss {:.5}, val_loss {:.5}",
                    epoch + 1,
                    cfg.epochs,
                    train_loss,
                    val_loss
                );
            } else {
                log::debug!("epoch {}/{}: loss {:.5}", epoch + 1, cfg.epochs, train_loss);
            }
        }

        if let Some(loss) = history.final_train_loss() {
            log::info!("Training finished, final loss {:.5}", loss);
        }
        Ok((model, history))
    }
}
