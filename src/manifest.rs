// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Decoding of the caller-supplied manifest.
//!
//! The manifest is read as a generic YAML document first and then handed to the
//! decoder registered for its `kind`. Only [`GlobalRole`] is registered.

use crate::error::{BindError, Result};
use crate::types::GlobalRole;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

/// A decoded manifest of one of the supported kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    GlobalRole(GlobalRole),
}

type DecodeFn = fn(Value) -> Result<Manifest>;

/// Maps a manifest `kind` to its decode-and-validate function.
pub struct ManifestRegistry {
    decoders: BTreeMap<&'static str, DecodeFn>,
}

impl Default for ManifestRegistry {
    fn default() -> Self {
        let mut registry = ManifestRegistry {
            decoders: BTreeMap::new(),
        };
        registry.register("GlobalRole", decode_global_role);
        registry
    }
}

impl ManifestRegistry {
    pub fn register(&mut self, kind: &'static str, decode: DecodeFn) {
        self.decoders.insert(kind, decode);
    }

    pub fn kinds(&self) -> impl Iterator<Item = &&'static str> {
        self.decoders.keys()
    }

    /// Decode a single YAML document.
    pub fn decode_str(&self, input: &str) -> Result<Manifest> {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(input) {
            let value = Value::deserialize(document)
                .map_err(|e| BindError::ManifestError(format!("invalid YAML: {}", e)))?;
            if !value.is_null() {
                documents.push(value);
            }
        }

        let value = match documents.len() {
            0 => return Err(BindError::ManifestError("manifest is empty".to_string())),
            1 => documents.remove(0),
            n => {
                return Err(BindError::ManifestError(format!(
                    "expected a single document, found {}",
                    n
                )))
            }
        };

        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| BindError::ManifestError("missing 'kind'".to_string()))?
            .to_string();

        let decode = self
            .decoders
            .get(kind.as_str())
            .ok_or_else(|| BindError::UnsupportedKind(kind.clone()))?;

        debug!("Decoding manifest of kind {}", kind);
        decode(value)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn decode_file(&self, path: &Path) -> Result<Manifest> {
        let input = std::fs::read_to_string(path).map_err(|e| {
            BindError::ManifestError(format!("cannot read {}: {}", path.display(), e))
        })?;
        self.decode_str(&input)
    }
}

fn decode_global_role(value: Value) -> Result<Manifest> {
    let role: GlobalRole = serde_yaml::from_value(value)
        .map_err(|e| BindError::ManifestError(format!("cannot convert object to GlobalRole: {}", e)))?;

    if role.metadata.name.as_deref().unwrap_or_default().is_empty() {
        return Err(BindError::ManifestError(
            "GlobalRole has no metadata.name".to_string(),
        ));
    }
    Ok(Manifest::GlobalRole(role))
}
