// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Input records and per-payload decode results.

use serde::{Deserialize, Serialize};

use super::{CodecValue, PayloadEncoding};

/// A single record header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Header name
    pub key: String,
    /// Raw header value
    pub value: Vec<u8>,
}

/// A raw record read from a topic.
///
/// `None` for key or value means the payload is absent (null), which is
/// distinct from a present but zero-length payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Topic the record was read from
    pub topic: String,
    /// Key bytes
    pub key: Option<Vec<u8>>,
    /// Value bytes
    pub value: Option<Vec<u8>>,
    /// Headers in wire order
    pub headers: Vec<RecordHeader>,
}

impl Record {
    /// Create a record for a topic with no key, value or headers.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Set the key bytes.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the value bytes.
    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Append a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(RecordHeader {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Select the key or value payload.
    pub fn payload(&self, payload_type: PayloadType) -> Option<&[u8]> {
        match payload_type {
            PayloadType::Key => self.key.as_deref(),
            PayloadType::Value => self.value.as_deref(),
        }
    }
}

/// Which side of a record a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadType {
    /// Record key
    Key,
    /// Record value
    Value,
}

impl PayloadType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadType::Key => "key",
            PayloadType::Value => "value",
        }
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single codec rejected a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TroubleshootingReport {
    /// Name of the codec that was attempted
    pub serde_name: String,
    /// Failure message
    pub message: String,
}

impl TroubleshootingReport {
    /// Create a report entry.
    pub fn new(serde_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            serde_name: serde_name.into(),
            message: message.into(),
        }
    }
}

/// Decode result for a record key or value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    /// Raw input bytes, only present when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_payload: Option<Vec<u8>>,
    /// Payload rendered for display (JSON, or the text itself); dropped when too large
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_payload: Option<Vec<u8>>,
    /// Structured decoded value; dropped when too large
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_payload: Option<CodecValue>,
    /// Detected encoding; `None` only before the engine normalizes the result
    pub encoding: Option<PayloadEncoding>,
    /// Schema registry id, for framed encodings
    #[serde(rename = "schemaID", skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<u32>,
    /// Whether the payload was absent
    pub is_payload_null: bool,
    /// Whether the payload exceeded the configured maximum size
    pub is_payload_too_large: bool,
    /// Length of the raw bytes
    pub payload_size_bytes: usize,
    /// Per-codec failure reports, in attempt order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub troubleshooting: Option<Vec<TroubleshootingReport>>,
}

impl RecordPayload {
    /// Build a result for a structured value; the normalized payload is its JSON rendering.
    pub fn structured(value: CodecValue, encoding: PayloadEncoding) -> Self {
        Self {
            normalized_payload: Some(value.to_json_vec()),
            parsed_payload: Some(value),
            encoding: Some(encoding),
            ..Default::default()
        }
    }

    /// Build a result for decoded text; the normalized payload is the text itself.
    pub fn text(text: String, encoding: PayloadEncoding) -> Self {
        Self {
            normalized_payload: Some(text.as_bytes().to_vec()),
            parsed_payload: Some(CodecValue::String(text)),
            encoding: Some(encoding),
            ..Default::default()
        }
    }

    /// Flag the payload as over the size limit and drop its decoded forms.
    pub fn mark_too_large(&mut self) {
        self.is_payload_too_large = true;
        self.normalized_payload = None;
        self.parsed_payload = None;
    }

    /// Attach the schema id that was used to decode this payload.
    pub fn with_schema_id(mut self, schema_id: u32) -> Self {
        self.schema_id = Some(schema_id);
        self
    }
}
