// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BindError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} '{name}' still present {timeout:?} after deletion")]
    DeletionTimeout {
        kind: String,
        name: String,
        timeout: Duration,
    },

    #[error("Request to {endpoint} failed: {source}")]
    TransportError {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} responded with HTTP {status}: {body}")]
    HttpStatusError {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    DecodeError(String),

    #[error("{0}")]
    KubeconfigError(String),

    #[error("Invalid manifest: {0}")]
    ManifestError(String),

    #[error("Unsupported manifest kind: {0}")]
    UnsupportedKind(String),

    #[error("Credential generation failed: {0}")]
    CredentialError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Cleanup failed: {}", .0.join("; "))]
    CleanupError(Vec<String>),

    #[error("Operation cancelled")]
    Cancelled,
}

impl BindError {
    /// Whether the error is a 404 from the API server or a typed not-found.
    pub fn is_not_found(&self) -> bool {
        match self {
            BindError::NotFound { .. } => true,
            BindError::KubeError(kube::Error::Api(err)) => err.code == 404,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BindError>;
