// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Training and inference entry points.
//!
//! ```text
//! train:  raw -> clean -> cap -> fit scaler -> scale -> windows -> fit model -> save both
//! infer:  raw -> clean -> load scaler -> scale -> windows -> load model -> predict
//!             -> score -> classify
//! ```

use crate::classifier::{AnomalyClassifier, AnomalyReport};
use crate::config::{ConfigKey, PipelineConfig};
use crate::error::{ClogError, Result};
use crate::model::{AutoencoderTrainer, ModelTrainer, SequenceModel, TrainingHistory};
use crate::preprocess::{self, CleaningReport};
use crate::scaler::MinMaxScaler;
use crate::scoring::{self, ErrorSeries};
use crate::series::{RawSeries, Series};
use crate::store::{ArtifactBackend, ArtifactStore};
use crate::window;
use serde::{Deserialize, Serialize};

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDiagnostics {
    pub key: ConfigKey,
    pub cleaning: CleaningReport,
    pub windows: usize,
    pub n_past: usize,
    pub num_features: usize,
    pub history: TrainingHistory,
}

/// Configured pipeline over an artifact backend and a model trainer.
pub struct Pipeline<B: ArtifactBackend, T: ModelTrainer> {
    config: PipelineConfig,
    store: ArtifactStore<B>,
    trainer: T,
    classifier: AnomalyClassifier,
}

impl<B: ArtifactBackend> Pipeline<B, AutoencoderTrainer> {
    /// Pipeline with the dense autoencoder configured from `config.training`.
    pub fn with_autoencoder(config: PipelineConfig, backend: B) -> Result<Self> {
        let trainer = AutoencoderTrainer::new(config.training.clone());
        Self::new(config, backend, trainer)
    }
}

impl<B: ArtifactBackend, T: ModelTrainer> Pipeline<B, T> {
    pub fn new(config: PipelineConfig, backend: B, trainer: T) -> Result<Self> {
        config.validate()?;
        let classifier = AnomalyClassifier::new(config.classifier.clone());
        Ok(Self {
            config,
            store: ArtifactStore::new(backend),
            trainer,
            classifier,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn key(&self) -> ConfigKey {
        self.config.key()
    }

    pub fn store(&self) -> &ArtifactStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ArtifactStore<B> {
        &mut self.store
    }

    /// Both artifacts for this configuration exist.
    pub fn is_trained(&self) -> bool {
        let key = self.key();
        self.store.has_scaler(&key) && self.store.has_model(&key)
    }

    fn ensure_rows(&self, series: &Series) -> Result<()> {
        let required = self.config.n_past + 1;
        if series.len() < required {
            return Err(ClogError::InsufficientData {
                rows: series.len(),
                required,
            });
        }
        Ok(())
    }

    /// Fit scaler and model on nominal data and persist both under the
    /// configuration key.
    ///
    /// Artifacts are written only after the model fit succeeds, so a failed
    /// run leaves the previous pair in place.
    pub fn train(&mut self, raw: &RawSeries) -> Result<TrainingDiagnostics> {
        let key = self.key();
        let (cleaned, mut report) = preprocess::clean(raw, &self.config.schema)?;
        let (capped, values_capped) =
            preprocess::cap_outliers(&cleaned, &self.config.effective_caps())?;
        report.values_capped = values_capped;
        self.ensure_rows(&capped)?;

        let scaler = MinMaxScaler::fit(&capped)?;
        let scaled = scaler.transform(&capped)?;
        let windows = window::make_windows(&scaled, self.config.n_past)?;
        let (model, history) = self.trainer.fit(&windows)?;

        self.store.save_scaler(&scaler, &key)?;
        self.store.save_model(&model, &key)?;
        log::info!(
            "Trained configuration '{}' on {} windows ({} readings capped)",
            key,
            windows.len(),
            values_capped
        );

        Ok(TrainingDiagnostics {
            key,
            cleaning: report,
            windows: windows.len(),
            n_past: self.config.n_past,
            num_features: scaled.num_features(),
            history,
        })
    }

    /// Per-timestamp reconstruction error of `raw` under the persisted
    /// scaler and model.
    pub fn score(&self, raw: &RawSeries) -> Result<ErrorSeries> {
        let key = self.key();
        let (cleaned, _) = preprocess::clean(raw, &self.config.schema)?;
        self.ensure_rows(&cleaned)?;

        let scaler = self.store.load_scaler(&key)?;
        let scaled = scaler.transform(&cleaned)?;
        let windows = window::make_windows(&scaled, self.config.n_past)?;

        let model: T::Model = self.store.load_model(&key)?;
        let reconstructions = model.predict(&windows)?;
        scoring::score_series(
            &windows,
            &reconstructions,
            &window::covered_timestamps(&scaled),
        )
    }

    /// Anomalous timestamps of `raw`.
    pub fn infer(&self, raw: &RawSeries) -> Result<AnomalyReport> {
        let errors = self.score(raw)?;
        self.classifier.classify(&errors)
    }
}
