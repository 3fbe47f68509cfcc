// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout topiccodec.
//!
//! This module provides the foundational types for the library:
//! - [`CodecError`] - Codec-level error handling
//! - [`CodecValue`] - Unified value representation of decoded payloads
//! - [`Record`] / [`RecordPayload`] - Input records and per-payload decode results
//! - [`PayloadEncoding`] - Payload encoding identifier

pub mod error;
pub mod record;
pub mod value;

pub use error::{CodecError, Result};
pub use record::{
    PayloadType, Record, RecordHeader, RecordPayload, TroubleshootingReport,
};
pub use value::{CodecValue, ValueMap};

use serde::{Deserialize, Serialize};

/// Payload encoding identifier.
///
/// The string form returned by [`PayloadEncoding::as_str`] is the codec name used
/// in troubleshooting reports and for exact-match selection when serializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadEncoding {
    /// Empty payload
    #[serde(rename = "none")]
    None,
    /// Plain JSON text
    #[serde(rename = "json")]
    Json,
    /// JSON framed with a schema registry id
    #[serde(rename = "jsonSchema")]
    JsonSchema,
    /// XML text
    #[serde(rename = "xml")]
    Xml,
    /// Avro framed with a schema registry id
    #[serde(rename = "avro")]
    Avro,
    /// Protobuf decoded with a topic-mapped local descriptor set
    #[serde(rename = "protobuf")]
    Protobuf,
    /// Protobuf framed with a schema registry id
    #[serde(rename = "protobufSchema")]
    ProtobufSchema,
    /// MessagePack
    #[serde(rename = "msgpack")]
    MsgPack,
    /// Jackson Smile binary JSON
    #[serde(rename = "smile")]
    Smile,
    /// UTF-8 text that contains control characters
    #[serde(rename = "utf8WithControlChars")]
    Utf8WithControlChars,
    /// Printable UTF-8 text
    #[serde(rename = "text")]
    Text,
    /// Big-endian unsigned integer
    #[serde(rename = "uint")]
    Uint,
    /// Internal consumer group offsets format
    #[serde(rename = "consumerOffsets")]
    ConsumerOffsets,
    /// Anything no codec recognized
    #[serde(rename = "binary")]
    Binary,
}

/// Error returned when parsing a `PayloadEncoding` from string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEncodingError {
    name: String,
}

impl std::fmt::Display for ParseEncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid payload encoding name: '{}'", self.name)
    }
}

impl std::error::Error for ParseEncodingError {}

impl PayloadEncoding {
    /// All encodings, in declaration order.
    pub const ALL: [PayloadEncoding; 14] = [
        PayloadEncoding::None,
        PayloadEncoding::Json,
        PayloadEncoding::JsonSchema,
        PayloadEncoding::Xml,
        PayloadEncoding::Avro,
        PayloadEncoding::Protobuf,
        PayloadEncoding::ProtobufSchema,
        PayloadEncoding::MsgPack,
        PayloadEncoding::Smile,
        PayloadEncoding::Utf8WithControlChars,
        PayloadEncoding::Text,
        PayloadEncoding::Uint,
        PayloadEncoding::ConsumerOffsets,
        PayloadEncoding::Binary,
    ];

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadEncoding::None => "none",
            PayloadEncoding::Json => "json",
            PayloadEncoding::JsonSchema => "jsonSchema",
            PayloadEncoding::Xml => "xml",
            PayloadEncoding::Avro => "avro",
            PayloadEncoding::Protobuf => "protobuf",
            PayloadEncoding::ProtobufSchema => "protobufSchema",
            PayloadEncoding::MsgPack => "msgpack",
            PayloadEncoding::Smile => "smile",
            PayloadEncoding::Utf8WithControlChars => "utf8WithControlChars",
            PayloadEncoding::Text => "text",
            PayloadEncoding::Uint => "uint",
            PayloadEncoding::ConsumerOffsets => "consumerOffsets",
            PayloadEncoding::Binary => "binary",
        }
    }

    /// Check if this encoding carries the schema registry wire frame.
    pub fn is_framed(&self) -> bool {
        matches!(
            self,
            PayloadEncoding::Avro | PayloadEncoding::ProtobufSchema | PayloadEncoding::JsonSchema
        )
    }
}

impl std::str::FromStr for PayloadEncoding {
    type Err = ParseEncodingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PayloadEncoding::ALL
            .iter()
            .find(|e| e.as_str() == s)
            .copied()
            .ok_or_else(|| ParseEncodingError {
                name: s.to_string(),
            })
    }
}

impl std::fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
