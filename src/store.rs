// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Artifact persistence
//!
//! Fitted scalers and trained models are stored per [`ConfigKey`]. Every
//! artifact is wrapped in a JSON envelope:
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "kind": "scaler",
//!   "key": "0_3",
//!   "created_at": "2024-02-05T10:00:00Z",
//!   "checksum": <CRC-32 of payload>,
//!   "payload": "<artifact JSON>"
//! }
//! ```
//!
//! Loading never falls back to another key: a missing artifact is
//! [`StoreError::NotFound`], a damaged one [`StoreError::Corrupt`].

use crate::config::ConfigKey;
use crate::error::{Result, StoreError};
use crate::scaler::MinMaxScaler;
use chrono::{DateTime, Utc};
use crc::{Crc, CRC_32_ISO_HDLC};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Current envelope format version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Artifact kind of fitted scalers
pub const SCALER_KIND: &str = "scaler";

/// Artifact kind of trained models
pub const MODEL_KIND: &str = "model";

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Blob storage under flat names.
pub trait ArtifactBackend {
    /// Store `blob` under `name`, replacing any previous value.
    fn save(&mut self, name: &str, blob: &[u8]) -> std::result::Result<(), StoreError>;

    /// Fetch the blob stored under `name`.
    fn load(&self, name: &str) -> std::result::Result<Vec<u8>, StoreError>;

    fn exists(&self, name: &str) -> bool;
}

/// One file per artifact in a directory.
///
/// Writes go to a temporary file in the same directory and are renamed
/// into place, so a concurrent reader sees the old or the new artifact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

impl ArtifactBackend for FileBackend {
    fn save(&mut self, name: &str, blob: &[u8]) -> std::result::Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|e| io_error(&self.root, e))?;
        let target = self.path_of(name);
        let tmp = self.path_of(&format!(".{}.tmp", name));
        std::fs::write(&tmp, blob).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &target).map_err(|e| io_error(&target, e))?;
        Ok(())
    }

    fn load(&self, name: &str) -> std::result::Result<Vec<u8>, StoreError> {
        let path = self.path_of(name);
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound {
                kind: "artifact".to_string(),
                key: name.to_string(),
            },
            _ => io_error(&path, e),
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }
}

/// In-process backend, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Overwrite a stored blob in place.
    #[cfg(test)]
    pub(crate) fn tamper(&mut self, name: &str, f: impl FnOnce(&mut Vec<u8>)) {
        if let Some(blob) = self.blobs.get_mut(name) {
            f(blob);
        }
    }
}

impl ArtifactBackend for MemoryBackend {
    fn save(&mut self, name: &str, blob: &[u8]) -> std::result::Result<(), StoreError> {
        self.blobs.insert(name.to_string(), blob.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> std::result::Result<Vec<u8>, StoreError> {
        self.blobs
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "artifact".to_string(),
                key: name.to_string(),
            })
    }

    fn exists(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    kind: String,
    key: String,
    created_at: DateTime<Utc>,
    checksum: u32,
    payload: String,
}

/// Typed access to scalers and models over a backend.
#[derive(Debug, Clone)]
pub struct ArtifactStore<B: ArtifactBackend> {
    backend: B,
}

impl<B: ArtifactBackend> ArtifactStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Name an artifact is stored under, e.g. `scaler_0_3.json`.
    pub fn artifact_name(kind: &str, key: &ConfigKey) -> String {
        format!("{}_{}.json", kind, key)
    }

    pub fn save_scaler(&mut self, scaler: &MinMaxScaler, key: &ConfigKey) -> Result<()> {
        self.save_artifact(SCALER_KIND, key, scaler)
    }

    pub fn load_scaler(&self, key: &ConfigKey) -> Result<MinMaxScaler> {
        self.load_artifact(SCALER_KIND, key)
    }

    pub fn has_scaler(&self, key: &ConfigKey) -> bool {
        self.backend.exists(&Self::artifact_name(SCALER_KIND, key))
    }

    pub fn save_model<M: Serialize>(&mut self, model: &M, key: &ConfigKey) -> Result<()> {
        self.save_artifact(MODEL_KIND, key, model)
    }

    pub fn load_model<M: DeserializeOwned>(&self, key: &ConfigKey) -> Result<M> {
        self.load_artifact(MODEL_KIND, key)
    }

    pub fn has_model(&self, key: &ConfigKey) -> bool {
        self.backend.exists(&Self::artifact_name(MODEL_KIND, key))
    }

    fn save_artifact<T: Serialize>(
        &mut self,
        kind: &str,
        key: &ConfigKey,
        value: &T,
    ) -> Result<()> {
        let name = Self::artifact_name(kind, key);
        let corrupt = |reason: String| StoreError::Corrupt {
            name: name.clone(),
            reason,
        };

        let payload = serde_json::to_string(value).map_err(|e| corrupt(e.to_string()))?;
        let envelope = Envelope {
            format_version: ARTIFACT_FORMAT_VERSION,
            kind: kind.to_string(),
            key: key.to_string(),
            created_at: Utc::now(),
            checksum: CRC32.checksum(payload.as_bytes()),
            payload,
        };
        let blob = serde_json::to_vec_pretty(&envelope).map_err(|e| corrupt(e.to_string()))?;

        self.backend.save(&name, &blob)?;
        log::info!("Saved {} artifact '{}' ({} bytes)", kind, name, blob.len());
        Ok(())
    }

    fn load_artifact<T: DeserializeOwned>(&self, kind: &str, key: &ConfigKey) -> Result<T> {
        let name = Self::artifact_name(kind, key);
        let blob = self.backend.load(&name).map_err(|e| match e {
            StoreError::NotFound { .. } => StoreError::NotFound {
                kind: kind.to_string(),
                key: key.to_string(),
            },
            other => other,
        })?;

        let corrupt = |reason: String| StoreError::Corrupt {
            name: name.clone(),
            reason,
        };
        let envelope: Envelope =
            serde_json::from_slice(&blob).map_err(|e| corrupt(format!("envelope: {}", e)))?;

        if envelope.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(corrupt(format!(
                "format version {} (expected {})",
                envelope.format_version, ARTIFACT_FORMAT_VERSION
            ))
            .into());
        }
        if envelope.kind != kind || envelope.key != key.as_str() {
            return Err(corrupt(format!(
                "holds {} for key '{}'",
                envelope.kind, envelope.key
            ))
            .into());
        }
        let actual = CRC32.checksum(envelope.payload.as_bytes());
        if actual != envelope.checksum {
            return Err(corrupt(format!(
                "checksum {:08x}, stored {:08x}",
                actual, envelope.checksum
            ))
            .into());
        }

        let value = serde_json::from_str(&envelope.payload)
            .map_err(|e| corrupt(format!("payload: {}", e)))?;
        log::debug!("Loaded {} artifact '{}' created {}", kind, name, envelope.created_at);
        Ok(value)
    }
}
