// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wallet identities and where they come from

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Prefix every accepted identity line must start with
pub const IDENTITY_PREFIX: &str = "0x";

/// Number of trailing characters left visible by [`Identity::masked`]
const VISIBLE_SUFFIX: usize = 3;

/// Opaque wallet token identifying one accrual stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mask every character except the last three with `*`.
    ///
    /// Identities of three characters or fewer are returned as-is.
    pub fn masked(&self) -> String {
        let len = self.0.chars().count();
        let hidden = len.saturating_sub(VISIBLE_SUFFIX);
        self.0
            .chars()
            .enumerate()
            .map(|(i, c)| if i < hidden { '*' } else { c })
            .collect()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from loading identities
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read identities from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse a newline-delimited identity list.
///
/// Lines are trimmed; only lines starting with `0x` are kept.
pub fn parse_identities(text: &str) -> Vec<Identity> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with(IDENTITY_PREFIX))
        .map(Identity::new)
        .collect()
}

/// Something that can produce the list of identities to run
pub trait IdentitySource {
    fn load(&self) -> Result<Vec<Identity>, IdentityError>;
}

/// Identities read from a newline-delimited file
#[derive(Debug, Clone)]
pub struct FileIdentitySource {
    path: PathBuf,
}

impl FileIdentitySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IdentitySource for FileIdentitySource {
    fn load(&self) -> Result<Vec<Identity>, IdentityError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| IdentityError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(parse_identities(&text))
    }
}

impl IdentitySource for Vec<Identity> {
    fn load(&self) -> Result<Vec<Identity>, IdentityError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
