// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Unified codec interface for encoding-agnostic payload processing.
//!
//! Every payload format implements [`Serde`]. The dispatch engine holds an
//! ordered list of `Box<dyn Serde>` and tries them in turn; a codec either
//! claims the payload or reports why it does not apply.
//!
//! ## Example
//!
//! ```no_run
//! use topiccodec::core::{PayloadType, Record};
//! use topiccodec::encoding::{JsonSerde, Serde};
//!
//! # async fn run() -> topiccodec::Result<()> {
//! let record = Record::new("orders").with_value(br#"{"id":1}"#.to_vec());
//! let payload = JsonSerde.deserialize_payload(&record, PayloadType::Value).await?;
//! assert_eq!(payload.encoding.map(|e| e.as_str()), Some("json"));
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;

use async_trait::async_trait;

use crate::core::{CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result};

// =============================================================================
// Serde Trait
// =============================================================================

/// A single payload decoding/encoding strategy.
#[async_trait]
pub trait Serde: Send + Sync {
    /// Stable codec name, unique within one dispatch engine.
    fn name(&self) -> PayloadEncoding;

    /// Try to interpret the key or value of a record.
    ///
    /// Returns an error describing why the payload is not in this codec's
    /// format; the error text ends up in the troubleshooting report.
    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload>;

    /// Encode a structured value into this codec's format.
    async fn serialize_object(
        &self,
        value: &CodecValue,
        payload_type: PayloadType,
        options: &[SerializeOption],
    ) -> Result<Vec<u8>>;
}

/// Select the key or value bytes of a record; an absent payload reads as empty.
pub fn payload_from_record(record: &Record, payload_type: PayloadType) -> &[u8] {
    record.payload(payload_type).unwrap_or_default()
}

/// Interpret serializer input for schema-driven codecs.
///
/// Callers often hand over a JSON document as text; a string holding a JSON
/// object or array is parsed, anything else is used as is.
pub fn structured_input(value: &CodecValue) -> Cow<'_, CodecValue> {
    if let Some(text) = value.as_str() {
        let trimmed = text.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
                return Cow::Owned(CodecValue::from(json));
            }
        }
    }
    Cow::Borrowed(value)
}

// =============================================================================
// Serialize Options
// =============================================================================

/// Byte width used when encoding unsigned integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UintSize {
    /// 1 byte
    U8,
    /// 2 bytes, big endian
    U16,
    /// 4 bytes, big endian
    U32,
    /// 8 bytes, big endian
    #[default]
    U64,
}

impl UintSize {
    /// Width in bytes.
    pub fn byte_len(self) -> usize {
        match self {
            UintSize::U8 => 1,
            UintSize::U16 => 2,
            UintSize::U32 => 4,
            UintSize::U64 => 8,
        }
    }

    /// Largest value representable at this width.
    pub fn max_value(self) -> u64 {
        match self {
            UintSize::U8 => u8::MAX as u64,
            UintSize::U16 => u16::MAX as u64,
            UintSize::U32 => u32::MAX as u64,
            UintSize::U64 => u64::MAX,
        }
    }

    /// Width for a byte length, if it is one of 1, 2, 4 or 8.
    pub fn from_byte_len(len: usize) -> Option<Self> {
        match len {
            1 => Some(UintSize::U8),
            2 => Some(UintSize::U16),
            4 => Some(UintSize::U32),
            8 => Some(UintSize::U64),
            _ => None,
        }
    }
}

/// A per-codec serialization option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializeOption {
    /// Topic the record will be produced to
    Topic(String),
    /// Schema registry id to frame the payload with
    SchemaId(u32),
    /// Protobuf message indexes selecting a (nested) message within the schema file
    Index(Vec<usize>),
    /// Byte width for unsigned integers
    UintSize(UintSize),
}

/// Serialization options folded into one value; later options win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeConfig {
    /// Target topic
    pub topic: Option<String>,
    /// Schema registry id
    pub schema_id: Option<u32>,
    /// Protobuf message indexes
    pub index: Option<Vec<usize>>,
    /// Unsigned integer width
    pub uint_size: UintSize,
}

impl SerializeConfig {
    /// Fold a list of options.
    pub fn from_options(options: &[SerializeOption]) -> Self {
        let mut config = Self::default();
        for option in options {
            match option {
                SerializeOption::Topic(topic) => config.topic = Some(topic.clone()),
                SerializeOption::SchemaId(id) => config.schema_id = Some(*id),
                SerializeOption::Index(index) => config.index = Some(index.clone()),
                SerializeOption::UintSize(size) => config.uint_size = *size,
            }
        }
        config
    }

    /// Schema id, or an error naming the codec that needs it.
    pub fn require_schema_id(&self, codec: &str) -> Result<u32> {
        self.schema_id
            .ok_or_else(|| CodecError::encode(codec, "no schema id specified"))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_options_override_earlier() {
        let config = SerializeConfig::from_options(&[
            SerializeOption::Topic("a".to_string()),
            SerializeOption::SchemaId(1),
            SerializeOption::Topic("b".to_string()),
            SerializeOption::SchemaId(2),
        ]);
        assert_eq!(config.topic.as_deref(), Some("b"));
        assert_eq!(config.schema_id, Some(2));
        assert_eq!(config.uint_size, UintSize::U64);
    }

    #[test]
    fn test_require_schema_id() {
        let config = SerializeConfig::default();
        let err = config.require_schema_id("avro").unwrap_err();
        assert_eq!(err.to_string(), "avro encode error: no schema id specified");
    }

    #[test]
    fn test_uint_size() {
        assert_eq!(UintSize::from_byte_len(4), Some(UintSize::U32));
        assert_eq!(UintSize::from_byte_len(3), None);
        assert_eq!(UintSize::U16.max_value(), 65535);
        assert_eq!(UintSize::U8.byte_len(), 1);
    }

    #[test]
    fn test_structured_input_parses_json_text() {
        let text = CodecValue::from(r#"{"a": 1}"#);
        assert_eq!(structured_input(&text).get("a"), Some(&CodecValue::Int64(1)));

        let plain = CodecValue::from("hello");
        assert_eq!(structured_input(&plain).as_ref(), &plain);
    }

    #[test]
    fn test_payload_from_record_absent_is_empty() {
        let record = Record::new("t").with_key(b"k".to_vec());
        assert_eq!(payload_from_record(&record, PayloadType::Key), b"k");
        assert!(payload_from_record(&record, PayloadType::Value).is_empty());
    }
}
