// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file-based session storage
//!
//! Each identity owns exactly one file, `session_<identity>.json`, so workers
//! never contend on storage.

use accrue_core::{Earnings, Identity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("identity cannot be used as a file name: {0}")]
    InvalidIdentity(String),
}

/// Persisted snapshot of a worker's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Loop start, milliseconds since the Unix epoch
    pub start_time: u64,
    pub earnings: Earnings,
    pub referral_bonus: f64,
}

/// Directory of session files
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_path: PathBuf,
}

impl SessionStore {
    /// Open a store at the given directory, creating it if needed
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|source| StorageError::Io {
            path: base_path.clone(),
            source,
        })?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Overwrite the session for `identity`
    pub fn save(&self, identity: &Identity, record: &SessionRecord) -> Result<(), StorageError> {
        let path = self.path_for(identity)?;
        let json = serde_json::to_string_pretty(record).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StorageError::Io { path, source })
    }

    /// Load the session for `identity`; `Ok(None)` if there is none
    pub fn load(&self, identity: &Identity) -> Result<Option<SessionRecord>, StorageError> {
        let path = self.path_for(identity)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        let record =
            serde_json::from_str(&json).map_err(|source| StorageError::Json { path, source })?;
        Ok(Some(record))
    }

    /// Check if a session exists
    pub fn exists(&self, identity: &Identity) -> bool {
        self.path_for(identity).map(|p| p.exists()).unwrap_or(false)
    }

    fn path_for(&self, identity: &Identity) -> Result<PathBuf, StorageError> {
        let id = identity.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(StorageError::InvalidIdentity(id.to_string()));
        }
        Ok(self.base_path.join(format!("session_{}.json", id)))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
