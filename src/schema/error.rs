// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema registry errors.
//!
//! A failing registry call is either rejected by a reachable registry
//! ([`RegistryError::Rest`], [`RegistryError::Status`]) or never got a usable
//! answer ([`RegistryError::Transport`]). Callers that retry should only retry
//! the latter.

use thiserror::Error;

use crate::core::CodecError;

use super::types::{
    CODE_SCHEMA_NOT_FOUND, CODE_SUBJECT_NOT_FOUND, CODE_VERSION_NOT_FOUND,
};

/// Errors returned by the schema registry client.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry answered with its structured error body.
    #[error("schema registry request failed: {error_code} - {message}")]
    Rest {
        /// HTTP status code
        status: u16,
        /// Registry error code (e.g. 40401)
        error_code: i32,
        /// Registry error message
        message: String,
    },

    /// The registry answered with an error status but no parseable error body.
    #[error("{operation} request failed: Status code {status}")]
    Status {
        /// Operation that failed
        operation: &'static str,
        /// HTTP status code
        status: u16,
    },

    /// The request could not be sent or timed out.
    #[error("{operation} request failed: {source}")]
    Transport {
        /// Operation that failed
        operation: &'static str,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The registry answered with a success status but an unexpected body.
    #[error("failed to parse {operation} response: {source}")]
    Decode {
        /// Operation that failed
        operation: &'static str,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// At least one per-subject fetch of a bulk enumeration failed.
    #[error("failed to fetch at least one schema: {0}")]
    Partial(Box<RegistryError>),

    /// A per-subject task of a bulk enumeration panicked or was aborted.
    #[error("schema fetch task failed: {0}")]
    Join(String),

    /// Client construction failed (URL, TLS material, ...).
    #[error("invalid schema registry configuration: {0}")]
    Config(String),
}

impl RegistryError {
    /// HTTP status code, when the registry answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Rest { status, .. } | RegistryError::Status { status, .. } => {
                Some(*status)
            }
            RegistryError::Partial(inner) => inner.status(),
            _ => None,
        }
    }

    /// Registry error code, when the registry answered with its error body.
    pub fn error_code(&self) -> Option<i32> {
        match self {
            RegistryError::Rest { error_code, .. } => Some(*error_code),
            RegistryError::Partial(inner) => inner.error_code(),
            _ => None,
        }
    }

    /// Whether the registry reported the requested resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.error_code(),
            Some(CODE_SUBJECT_NOT_FOUND | CODE_VERSION_NOT_FOUND | CODE_SCHEMA_NOT_FOUND)
        ) || self.status() == Some(404)
    }

    /// Whether the registry could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            RegistryError::Transport { .. } => true,
            RegistryError::Partial(inner) => inner.is_unreachable(),
            _ => false,
        }
    }
}

impl From<RegistryError> for CodecError {
    fn from(err: RegistryError) -> Self {
        CodecError::resolution(None, err.to_string())
    }
}
