// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for topiccodec.
//!
//! Provides error types for codec operations:
//! - Payload and schema parsing
//! - Wire frame validation
//! - Schema resolution
//! - Encoding operations

use std::fmt;

/// Errors that can occur while decoding or encoding a payload.
#[derive(Debug, Clone)]
pub enum CodecError {
    /// Parse error in schema or data
    ParseError {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// Invalid schema format
    InvalidSchema {
        /// Schema name or identifier
        schema_name: String,
        /// Validation error message
        reason: String,
    },

    /// Message type not found in a descriptor pool or schema
    TypeNotFound {
        /// Type name that was not found
        type_name: String,
    },

    /// Buffer too short for requested read
    BufferTooShort {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Cursor position when error occurred
        cursor_pos: u64,
    },

    /// Payload does not carry the schema registry wire frame
    MalformedFrame {
        /// Why the frame was rejected
        reason: String,
    },

    /// Schema id could not be resolved through the registry
    Resolution {
        /// Schema id that was looked up, if any
        schema_id: Option<u32>,
        /// Error message reported by the resolver
        message: String,
    },

    /// Required collaborator or option is not configured
    NotConfigured {
        /// What is missing
        what: String,
    },

    /// Unsupported type or feature
    Unsupported {
        /// What is not supported
        feature: String,
    },

    /// Encoding error
    EncodeError {
        /// Codec context (e.g., "avro", "protobuf", "json")
        codec: String,
        /// Error message
        message: String,
    },

    /// No codec is registered under the requested name
    InvalidEncoding {
        /// "key" or "value"
        payload_type: String,
        /// Requested encoding name
        encoding: String,
    },

    /// Other error
    Other(String),
}

impl CodecError {
    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an invalid schema error.
    pub fn invalid_schema(schema_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::InvalidSchema {
            schema_name: schema_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a "type not found" error.
    pub fn type_not_found(type_name: impl Into<String>) -> Self {
        CodecError::TypeNotFound {
            type_name: type_name.into(),
        }
    }

    /// Create a buffer too short error.
    pub fn buffer_too_short(requested: usize, available: usize, cursor_pos: u64) -> Self {
        CodecError::BufferTooShort {
            requested,
            available,
            cursor_pos,
        }
    }

    /// Create a malformed frame error.
    pub fn malformed_frame(reason: impl Into<String>) -> Self {
        CodecError::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Create a schema resolution error.
    pub fn resolution(schema_id: Option<u32>, message: impl Into<String>) -> Self {
        CodecError::Resolution {
            schema_id,
            message: message.into(),
        }
    }

    /// Create a "not configured" error.
    pub fn not_configured(what: impl Into<String>) -> Self {
        CodecError::NotConfigured { what: what.into() }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        CodecError::Unsupported {
            feature: feature.into(),
        }
    }

    /// Create an encode error.
    pub fn encode(codec: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::EncodeError {
            codec: codec.into(),
            message: message.into(),
        }
    }

    /// Create an "invalid encoding" error for the serialize path.
    pub fn invalid_encoding(payload_type: impl Into<String>, encoding: impl Into<String>) -> Self {
        CodecError::InvalidEncoding {
            payload_type: payload_type.into(),
            encoding: encoding.into(),
        }
    }

    /// Check whether this error means the payload simply is not framed.
    pub fn is_malformed_frame(&self) -> bool {
        matches!(self, CodecError::MalformedFrame { .. })
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            CodecError::ParseError { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            CodecError::InvalidSchema {
                schema_name,
                reason,
            } => vec![("schema", schema_name.clone()), ("reason", reason.clone())],
            CodecError::TypeNotFound { type_name } => vec![("type", type_name.clone())],
            CodecError::BufferTooShort {
                requested,
                available,
                cursor_pos,
            } => vec![
                ("requested", requested.to_string()),
                ("available", available.to_string()),
                ("cursor", cursor_pos.to_string()),
            ],
            CodecError::MalformedFrame { reason } => vec![("reason", reason.clone())],
            CodecError::Resolution { schema_id, message } => vec![
                (
                    "schema_id",
                    schema_id.map(|id| id.to_string()).unwrap_or_default(),
                ),
                ("message", message.clone()),
            ],
            CodecError::NotConfigured { what } => vec![("what", what.clone())],
            CodecError::Unsupported { feature } => vec![("feature", feature.clone())],
            CodecError::EncodeError { codec, message } => {
                vec![("codec", codec.clone()), ("message", message.clone())]
            }
            CodecError::InvalidEncoding {
                payload_type,
                encoding,
            } => vec![
                ("payload_type", payload_type.clone()),
                ("encoding", encoding.clone()),
            ],
            CodecError::Other(msg) => vec![("message", msg.clone())],
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::ParseError { context, message } => {
                write!(f, "Parse error in {context}: {message}")
            }
            CodecError::InvalidSchema {
                schema_name,
                reason,
            } => {
                write!(f, "Invalid schema '{schema_name}': {reason}")
            }
            CodecError::TypeNotFound { type_name } => {
                write!(f, "Type not found: '{type_name}'")
            }
            CodecError::BufferTooShort {
                requested,
                available,
                cursor_pos,
            } => write!(
                f,
                "Buffer too short: requested {requested} bytes at position {cursor_pos}, but only {available} bytes available"
            ),
            CodecError::MalformedFrame { reason } => write!(f, "{reason}"),
            CodecError::Resolution {
                schema_id: Some(id),
                message,
            } => write!(f, "getting schema {id} from registry: {message}"),
            CodecError::Resolution {
                schema_id: None,
                message,
            } => write!(f, "getting schema from registry: {message}"),
            CodecError::NotConfigured { what } => write!(f, "no {what} configured"),
            CodecError::Unsupported { feature } => {
                write!(f, "Unsupported feature: '{feature}'")
            }
            CodecError::EncodeError { codec, message } => {
                write!(f, "{codec} encode error: {message}")
            }
            CodecError::InvalidEncoding {
                payload_type,
                encoding,
            } => write!(f, "invalid encoding for {payload_type}: {encoding}"),
            CodecError::Other(msg) => write!(f, "Other error: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::ParseError {
            context: "io".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::parse("json", err.to_string())
    }
}

/// Result type for topiccodec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
