// Copyright (c) 2026 flowforge contributors
// SPDX-License-Identifier: MIT

//! Trigger parameter source.
//!
//! A [`ParameterSet`] maps variable names to sample values. It is loaded
//! once before the pipeline starts and never mutated afterwards; its
//! declared order is observable, since it drives the binding order of the
//! synthesized `SetVariables` state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered mapping of variable name -> sample value.
///
/// Keys must be usable inside a `{{flow.data.<key>}}` reference expression:
/// ASCII identifiers that do not start with a digit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(IndexMap<String, serde_json::Value>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a parameter set from a JSON object file.
    pub fn from_file(path: &Path) -> Result<Self, ParameterError> {
        let raw = fs::read_to_string(path).map_err(|source| ParameterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse a parameter set from a JSON object string, preserving the
    /// document's key order.
    pub fn from_json(raw: &str) -> Result<Self, ParameterError> {
        let map: IndexMap<String, serde_json::Value> = serde_json::from_str(raw)?;
        for key in map.keys() {
            validate_key(key)?;
        }
        Ok(Self(map))
    }

    /// Insert a parameter, validating the key. Later insertions keep their
    /// position in declared order.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), ParameterError> {
        let key = key.into();
        validate_key(&key)?;
        self.0.insert(key, value);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn validate_key(key: &str) -> Result<(), ParameterError> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ParameterError::InvalidKey(key.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("failed to read parameter file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parameter file is not a JSON object: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("parameter key '{0}' is not usable in a variable reference")]
    InvalidKey(String),
}
