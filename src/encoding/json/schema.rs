// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! JSON payloads framed with a schema registry id.
//!
//! The schema is resolved to confirm it is a JSON schema; the document itself
//! is only parsed, not validated against it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result,
};
use crate::encoding::codec::{payload_from_record, Serde, SerializeConfig, SerializeOption};
use crate::encoding::frame::{parse_frame, write_frame};
use crate::schema::{SchemaResolver, SchemaType};

use super::decoder::JsonDecoder;

/// JSON codec backed by the schema registry.
pub struct JsonSchemaSerde {
    resolver: Option<Arc<dyn SchemaResolver>>,
}

impl JsonSchemaSerde {
    /// Create a codec; without a resolver every payload is rejected.
    pub fn new(resolver: Option<Arc<dyn SchemaResolver>>) -> Self {
        Self { resolver }
    }

    async fn check_schema(&self, schema_id: u32) -> Result<()> {
        let resolver = self
            .resolver
            .as_deref()
            .ok_or_else(|| CodecError::not_configured("schema registry"))?;
        let schema = resolver
            .schema_by_id(schema_id)
            .await
            .map_err(|e| CodecError::resolution(Some(schema_id), e.to_string()))?;
        if schema.schema_type != SchemaType::Json {
            return Err(CodecError::invalid_schema(
                schema_id.to_string(),
                format!("expected a JSON schema, got {}", schema.schema_type),
            ));
        }
        Ok(())
    }
}

impl Default for JsonSchemaSerde {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Serde for JsonSchemaSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::JsonSchema
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        if self.resolver.is_none() {
            return Err(CodecError::not_configured("schema registry"));
        }
        let payload = payload_from_record(record, payload_type);
        let (schema_id, body) = parse_frame(payload)?;
        self.check_schema(schema_id).await?;

        let value = JsonDecoder::new().decode_bytes(body)?;
        Ok(RecordPayload::structured(value, PayloadEncoding::JsonSchema).with_schema_id(schema_id))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        let config = SerializeConfig::from_options(options);
        let schema_id = config.require_schema_id("jsonSchema")?;
        self.check_schema(schema_id).await?;

        let body = JsonDecoder::new().encode(value, false)?;
        Ok(write_frame(schema_id, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RegistryError, SchemaResponse, SchemaVersion, SchemaVersionedResponse};
    use serde_json::json;

    struct JsonRegistry;

    #[async_trait]
    impl SchemaResolver for JsonRegistry {
        async fn schema_by_id(&self, id: u32) -> std::result::Result<SchemaResponse, RegistryError> {
            let schema_type = if id == 1 { SchemaType::Json } else { SchemaType::Avro };
            Ok(SchemaResponse {
                schema: r#"{"type":"object"}"#.to_string(),
                schema_type,
                references: vec![],
            })
        }

        async fn schema_by_subject(
            &self,
            _subject: &str,
            _version: SchemaVersion,
        ) -> std::result::Result<SchemaVersionedResponse, RegistryError> {
            Err(RegistryError::Config("unused".to_string()))
        }
    }

    fn serde() -> JsonSchemaSerde {
        JsonSchemaSerde::new(Some(Arc::new(JsonRegistry)))
    }

    #[tokio::test]
    async fn test_round_trip() {
        let value = CodecValue::from(json!({"a": [1, 2]}));
        let bytes = serde()
            .serialize_object(&value, PayloadType::Value, &[SerializeOption::SchemaId(1)])
            .await
            .unwrap();
        assert_eq!(&bytes[..5], &[0, 0, 0, 0, 1]);

        let record = Record::new("t").with_value(bytes);
        let payload = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.schema_id, Some(1));
        assert_eq!(payload.parsed_payload, Some(value));
    }

    #[tokio::test]
    async fn test_plain_json_is_not_framed() {
        let record = Record::new("t").with_value(br#"{"a": 1}"#.to_vec());
        let err = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "incorrect magic byte");
    }

    #[tokio::test]
    async fn test_wrong_schema_type() {
        let record = Record::new("t").with_value(write_frame(2, b"{}"));
        let err = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidSchema { .. }));
    }

    #[tokio::test]
    async fn test_serialize_requires_schema_id() {
        let err = serde()
            .serialize_object(&CodecValue::from(json!({})), PayloadType::Value, &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no schema id specified"));
    }
}
