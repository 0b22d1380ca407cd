//! Error types for the template lifecycle engine

use std::path::PathBuf;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model gateway failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Malformed model output ({reason}), LLM output: {raw}")]
    MalformedOutput { reason: String, raw: String },

    #[error("Template store error: {0}")]
    Store(#[from] StoreError),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Selected template '{0}' has no storage slot")]
    NotPersisted(String),
}

impl EngineError {
    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Raw model text carried by a formatting failure
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            EngineError::MalformedOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Errors from reading or writing the template directory
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode template: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Refusing to persist template with empty {0}")]
    EmptyField(&'static str),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a stored record could not be decoded; such records are skipped
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("not a title/content object: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("record is a JSON {0}, not an object")]
    NotAnObject(&'static str),

    #[error("empty {0}")]
    EmptyField(&'static str),
}
