// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Empty and text payloads.

use async_trait::async_trait;

use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result,
};
use crate::encoding::codec::{payload_from_record, Serde, SerializeOption};

/// Check for control characters other than tab, line feed and carriage return.
pub fn contains_control_chars(text: &str) -> bool {
    text.chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
}

fn decode_utf8(payload: &[u8], codec: &str) -> Result<String> {
    if payload.is_empty() {
        return Err(CodecError::parse(codec, "payload is empty"));
    }
    String::from_utf8(payload.to_vec())
        .map_err(|e| CodecError::parse(codec, format!("payload is not valid UTF-8: {e}")))
}

fn encode_text(value: &CodecValue, codec: &str) -> Result<Vec<u8>> {
    match value {
        CodecValue::String(s) => Ok(s.as_bytes().to_vec()),
        CodecValue::Bytes(b) => {
            std::str::from_utf8(b)
                .map_err(|e| CodecError::encode(codec, format!("input is not valid UTF-8: {e}")))?;
            Ok(b.clone())
        }
        other => Err(CodecError::encode(
            codec,
            format!("unsupported type {} for text", other.type_name()),
        )),
    }
}

// =============================================================================
// none
// =============================================================================

/// Accepts only empty payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneSerde;

#[async_trait]
impl Serde for NoneSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::None
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        let payload = payload_from_record(record, payload_type);
        if !payload.is_empty() {
            return Err(CodecError::parse(
                "none",
                "payload is not empty as expected for none encoding",
            ));
        }
        Ok(RecordPayload {
            encoding: Some(PayloadEncoding::None),
            ..Default::default()
        })
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        _options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        let is_empty = match value {
            CodecValue::Null => true,
            CodecValue::String(s) => s.is_empty(),
            CodecValue::Bytes(b) => b.is_empty(),
            _ => false,
        };
        if !is_empty {
            return Err(CodecError::encode("none", "input is not empty"));
        }
        Ok(Vec::new())
    }
}

// =============================================================================
// utf8WithControlChars
// =============================================================================

/// UTF-8 text that contains control characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Serde;

#[async_trait]
impl Serde for Utf8Serde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::Utf8WithControlChars
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        let payload = payload_from_record(record, payload_type);
        let text = decode_utf8(payload, "utf8WithControlChars")?;
        if !contains_control_chars(&text) {
            return Err(CodecError::parse(
                "utf8WithControlChars",
                "payload does not contain UTF-8 control characters",
            ));
        }
        Ok(RecordPayload::text(text, PayloadEncoding::Utf8WithControlChars))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        _options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        encode_text(value, "utf8WithControlChars")
    }
}

// =============================================================================
// text
// =============================================================================

/// Printable UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSerde;

#[async_trait]
impl Serde for TextSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::Text
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        let payload = payload_from_record(record, payload_type);
        let text = decode_utf8(payload, "text")?;
        if contains_control_chars(&text) {
            return Err(CodecError::parse("text", "payload contains control characters"));
        }
        Ok(RecordPayload::text(text, PayloadEncoding::Text))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        _options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        encode_text(value, "text")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_none_accepts_only_empty() {
        let empty = Record::new("t").with_value(Vec::new());
        let payload = NoneSerde
            .deserialize_payload(&empty, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.encoding, Some(PayloadEncoding::None));

        let full = Record::new("t").with_value(b"x".to_vec());
        assert!(NoneSerde
            .deserialize_payload(&full, PayloadType::Value)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_text_and_control_chars_partition_utf8() {
        let plain = Record::new("t").with_value(b"hello\tworld\n".to_vec());
        let control = Record::new("t").with_value(b"hello\x01world".to_vec());

        let payload = TextSerde
            .deserialize_payload(&plain, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.parsed_payload, Some(CodecValue::from("hello\tworld\n")));
        assert!(Utf8Serde
            .deserialize_payload(&plain, PayloadType::Value)
            .await
            .is_err());

        let payload = Utf8Serde
            .deserialize_payload(&control, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.encoding, Some(PayloadEncoding::Utf8WithControlChars));
        assert_eq!(payload.normalized_payload.as_deref(), Some(&b"hello\x01world"[..]));
        assert!(TextSerde
            .deserialize_payload(&control, PayloadType::Value)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let record = Record::new("t").with_value(vec![0xC3, 0x28]);
        assert!(TextSerde
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_serialize_text() {
        let bytes = TextSerde
            .serialize_object(&CodecValue::from("héllo"), PayloadType::Key, &[])
            .await
            .unwrap();
        assert_eq!(bytes, "héllo".as_bytes());
        assert!(TextSerde
            .serialize_object(&CodecValue::Int64(1), PayloadType::Key, &[])
            .await
            .is_err());
        assert!(NoneSerde
            .serialize_object(&CodecValue::from("x"), PayloadType::Key, &[])
            .await
            .is_err());
    }
}
