// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Avro payloads framed with a schema registry id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use apache_avro::types::Value as AvroValue;
use apache_avro::Schema;
use async_trait::async_trait;

use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result, ValueMap,
};
use crate::encoding::codec::{
    payload_from_record, structured_input, Serde, SerializeConfig, SerializeOption,
};
use crate::encoding::frame::{parse_frame, write_frame};
use crate::schema::{resolve_references, SchemaResolver, SchemaType};

/// A parsed writer schema plus the named schemas it references.
struct CompiledAvro {
    schema: Schema,
    references: Vec<Schema>,
}

impl CompiledAvro {
    fn schemata(&self) -> Vec<&Schema> {
        self.references.iter().collect()
    }
}

/// Avro codec backed by the schema registry.
pub struct AvroSerde {
    resolver: Option<Arc<dyn SchemaResolver>>,
    /// Parsed schemas indexed by schema id
    schemas: RwLock<HashMap<u32, Arc<CompiledAvro>>>,
}

impl AvroSerde {
    /// Create a codec; without a resolver every payload is rejected.
    pub fn new(resolver: Option<Arc<dyn SchemaResolver>>) -> Self {
        Self {
            resolver,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    async fn compiled_schema(&self, schema_id: u32) -> Result<Arc<CompiledAvro>> {
        {
            let schemas = self
                .schemas
                .read()
                .map_err(|e| CodecError::Other(format!("Schema cache read lock poisoned: {e}")))?;
            if let Some(compiled) = schemas.get(&schema_id) {
                return Ok(Arc::clone(compiled));
            }
        }

        let resolver = self
            .resolver
            .as_deref()
            .ok_or_else(|| CodecError::not_configured("schema registry"))?;
        let response = resolver
            .schema_by_id(schema_id)
            .await
            .map_err(|e| CodecError::resolution(Some(schema_id), e.to_string()))?;
        if response.schema_type != SchemaType::Avro {
            return Err(CodecError::invalid_schema(
                schema_id.to_string(),
                format!("expected an AVRO schema, got {}", response.schema_type),
            ));
        }

        let compiled = if response.references.is_empty() {
            let schema = Schema::parse_str(&response.schema)
                .map_err(|e| CodecError::invalid_schema(schema_id.to_string(), e.to_string()))?;
            CompiledAvro {
                schema,
                references: Vec::new(),
            }
        } else {
            let references = resolve_references(resolver, &response.references)
                .await
                .map_err(|e| CodecError::resolution(Some(schema_id), e.to_string()))?;
            let mut inputs: Vec<&str> = references
                .iter()
                .map(|r| r.schema.schema.as_str())
                .collect();
            inputs.push(&response.schema);
            let mut parsed = Schema::parse_list(&inputs)
                .map_err(|e| CodecError::invalid_schema(schema_id.to_string(), e.to_string()))?;
            let schema = parsed
                .pop()
                .ok_or_else(|| CodecError::invalid_schema(schema_id.to_string(), "empty schema list"))?;
            CompiledAvro {
                schema,
                references: parsed,
            }
        };

        let compiled = Arc::new(compiled);
        self.schemas
            .write()
            .map_err(|e| CodecError::Other(format!("Schema cache write lock poisoned: {e}")))?
            .insert(schema_id, Arc::clone(&compiled));
        Ok(compiled)
    }
}

impl Default for AvroSerde {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Serde for AvroSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::Avro
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
        let compiled = self.compiled_schema(schema_id).await?;

        let mut reader = body;
        let decoded = if compiled.references.is_empty() {
            apache_avro::from_avro_datum(&compiled.schema, &mut reader, None)
        } else {
            apache_avro::from_avro_datum_schemata(
                &compiled.schema,
                compiled.schemata(),
                &mut reader,
                None,
            )
        }
        .map_err(|e| CodecError::parse("avro", format!("decoding avro: {e}")))?;
        if !reader.is_empty() {
            return Err(CodecError::parse(
                "avro",
                format!("decoding avro: {} trailing bytes", reader.len()),
            ));
        }

        Ok(RecordPayload::structured(avro_to_value(decoded), PayloadEncoding::Avro)
            .with_schema_id(schema_id))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        let config = SerializeConfig::from_options(options);
        let schema_id = config.require_schema_id("avro")?;
        let compiled = self.compiled_schema(schema_id).await?;

        let input = value_to_avro(&structured_input(value));
        let body = if compiled.references.is_empty() {
            let resolved = input
                .resolve(&compiled.schema)
                .map_err(|e| CodecError::encode("avro", e.to_string()))?;
            apache_avro::to_avro_datum(&compiled.schema, resolved)
        } else {
            let resolved = input
                .resolve_schemata(&compiled.schema, compiled.schemata())
                .map_err(|e| CodecError::encode("avro", e.to_string()))?;
            apache_avro::to_avro_datum_schemata(&compiled.schema, compiled.schemata(), resolved)
        }
        .map_err(|e| CodecError::encode("avro", e.to_string()))?;

        Ok(write_frame(schema_id, &body))
    }
}

// =============================================================================
// Value conversion
// =============================================================================

/// Convert a decoded Avro value; unions are unwrapped to their branch value.
pub fn avro_to_value(value: AvroValue) -> CodecValue {
    match value {
        AvroValue::Null => CodecValue::Null,
        AvroValue::Boolean(b) => CodecValue::Bool(b),
        AvroValue::Int(v) | AvroValue::Date(v) | AvroValue::TimeMillis(v) => {
            CodecValue::Int64(i64::from(v))
        }
        AvroValue::Long(v)
        | AvroValue::TimeMicros(v)
        | AvroValue::TimestampMillis(v)
        | AvroValue::TimestampMicros(v)
        | AvroValue::TimestampNanos(v)
        | AvroValue::LocalTimestampMillis(v)
        | AvroValue::LocalTimestampMicros(v)
        | AvroValue::LocalTimestampNanos(v) => CodecValue::Int64(v),
        AvroValue::Float(v) => CodecValue::Float64(f64::from(v)),
        AvroValue::Double(v) => CodecValue::Float64(v),
        AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => CodecValue::Bytes(b),
        AvroValue::String(s) | AvroValue::Enum(_, s) => CodecValue::String(s),
        AvroValue::Uuid(u) => CodecValue::String(u.to_string()),
        AvroValue::Union(_, inner) => avro_to_value(*inner),
        AvroValue::Array(items) => CodecValue::Array(items.into_iter().map(avro_to_value).collect()),
        AvroValue::Map(entries) => CodecValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, avro_to_value(v)))
                .collect(),
        ),
        AvroValue::Record(fields) => CodecValue::Map(
            fields
                .into_iter()
                .map(|(k, v)| (k, avro_to_value(v)))
                .collect::<ValueMap>(),
        ),
        other => CodecValue::String(format!("{other:?}")),
    }
}

/// Convert a value tree into an unresolved Avro value; schema resolution
/// turns maps into records, strings into enums and so on.
pub fn value_to_avro(value: &CodecValue) -> AvroValue {
    match value {
        CodecValue::Null => AvroValue::Null,
        CodecValue::Bool(b) => AvroValue::Boolean(*b),
        CodecValue::Int64(v) => AvroValue::Long(*v),
        CodecValue::UInt64(v) => match i64::try_from(*v) {
            Ok(v) => AvroValue::Long(v),
            Err(_) => AvroValue::Double(*v as f64),
        },
        CodecValue::Float64(v) => AvroValue::Double(*v),
        CodecValue::String(s) => AvroValue::String(s.clone()),
        CodecValue::Bytes(b) => AvroValue::Bytes(b.clone()),
        CodecValue::Array(items) => AvroValue::Array(items.iter().map(value_to_avro).collect()),
        CodecValue::Map(entries) => AvroValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_to_avro(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        RegistryError, SchemaReference, SchemaResponse, SchemaVersion, SchemaVersionedResponse,
    };
    use serde_json::json;

    const USER_SCHEMA: &str = r#"{
        "type": "record",
        "name": "User",
        "namespace": "example",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "age", "type": "int"},
            {"name": "email", "type": ["null", "string"], "default": null}
        ]
    }"#;

    const ORDER_SCHEMA: &str = r#"{
        "type": "record",
        "name": "Order",
        "namespace": "example",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "buyer", "type": "example.User"}
        ]
    }"#;

    struct AvroRegistry;

    #[async_trait]
    impl SchemaResolver for AvroRegistry {
        async fn schema_by_id(&self, id: u32) -> std::result::Result<SchemaResponse, RegistryError> {
            match id {
                7 => Ok(SchemaResponse {
                    schema: USER_SCHEMA.to_string(),
                    schema_type: SchemaType::Avro,
                    references: vec![],
                }),
                8 => Ok(SchemaResponse {
                    schema: ORDER_SCHEMA.to_string(),
                    schema_type: SchemaType::Avro,
                    references: vec![SchemaReference {
                        name: "example.User".to_string(),
                        subject: "user-value".to_string(),
                        version: 1,
                    }],
                }),
                _ => Err(RegistryError::Rest {
                    status: 404,
                    error_code: 40403,
                    message: "Schema not found".to_string(),
                }),
            }
        }

        async fn schema_by_subject(
            &self,
            subject: &str,
            _version: SchemaVersion,
        ) -> std::result::Result<SchemaVersionedResponse, RegistryError> {
            Ok(SchemaVersionedResponse {
                subject: subject.to_string(),
                schema_id: 7,
                version: 1,
                schema: USER_SCHEMA.to_string(),
                schema_type: SchemaType::Avro,
                references: vec![],
            })
        }
    }

    fn serde() -> AvroSerde {
        AvroSerde::new(Some(Arc::new(AvroRegistry)))
    }

    fn user_datum() -> Vec<u8> {
        let schema = Schema::parse_str(USER_SCHEMA).unwrap();
        let value = AvroValue::Record(vec![
            ("name".to_string(), AvroValue::String("John".to_string())),
            ("age".to_string(), AvroValue::Int(30)),
            ("email".to_string(), AvroValue::Union(0, Box::new(AvroValue::Null))),
        ]);
        apache_avro::to_avro_datum(&schema, value).unwrap()
    }

    #[tokio::test]
    async fn test_decode_framed_payload() {
        let record = Record::new("users").with_value(write_frame(7, &user_datum()));
        let payload = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.encoding, Some(PayloadEncoding::Avro));
        assert_eq!(payload.schema_id, Some(7));
        assert_eq!(
            payload.parsed_payload,
            Some(CodecValue::from(json!({"name": "John", "age": 30, "email": null})))
        );
    }

    #[tokio::test]
    async fn test_serialize_from_json_text() {
        let value = CodecValue::from(r#"{"name": "Jane", "age": 41, "email": "j@x.io"}"#);
        let bytes = serde()
            .serialize_object(&value, PayloadType::Value, &[SerializeOption::SchemaId(7)])
            .await
            .unwrap();
        let record = Record::new("users").with_value(bytes);
        let payload = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(
            payload.parsed_payload,
            Some(CodecValue::from(json!({"name": "Jane", "age": 41, "email": "j@x.io"})))
        );
    }

    #[tokio::test]
    async fn test_references_round_trip() {
        let value = CodecValue::from(json!({"id": 1, "buyer": {"name": "Ada", "age": 36, "email": null}}));
        let bytes = serde()
            .serialize_object(&value, PayloadType::Value, &[SerializeOption::SchemaId(8)])
            .await
            .unwrap();
        let record = Record::new("orders").with_value(bytes);
        let payload = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.schema_id, Some(8));
        assert_eq!(payload.parsed_payload, Some(value));
    }

    #[tokio::test]
    async fn test_short_payload_never_reaches_registry() {
        let record = Record::new("users").with_value(vec![0, 0, 0, 0, 7]);
        let err = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "payload length is < 5");
    }

    #[tokio::test]
    async fn test_unknown_schema_id() {
        let record = Record::new("users").with_value(write_frame(100, &user_datum()));
        let err = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("getting schema 100 from registry"));
    }

    #[tokio::test]
    async fn test_trailing_bytes_rejected() {
        let mut datum = user_datum();
        datum.extend_from_slice(&[1, 2, 3]);
        let record = Record::new("users").with_value(write_frame(7, &datum));
        assert!(serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_without_registry() {
        let record = Record::new("users").with_value(write_frame(7, &user_datum()));
        let err = AvroSerde::default()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no schema registry configured");
    }

    #[test]
    fn test_avro_to_value_unwraps_unions() {
        let value = AvroValue::Union(1, Box::new(AvroValue::String("x".to_string())));
        assert_eq!(avro_to_value(value), CodecValue::from("x"));
    }
}
