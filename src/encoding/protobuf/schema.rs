// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf payloads framed with a schema registry id.
//!
//! Schemas are stored in the registry as `.proto` source text. They are
//! compiled on first use (imports served from the schema's references and the
//! well-known Google types) and cached per schema id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use prost_reflect::{FileDescriptor, MessageDescriptor};
use protox::file::{ChainFileResolver, File, FileResolver, GoogleFileResolver};
use protox::Compiler;

use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result,
};
use crate::encoding::codec::{
    payload_from_record, structured_input, Serde, SerializeConfig, SerializeOption,
};
use crate::encoding::frame::{parse_frame, read_message_indexes, write_header, write_message_indexes};
use crate::schema::{resolve_references, SchemaResolver, SchemaType};

use super::codec::{decode_message, encode_message};

/// File name the root schema is compiled under.
const ROOT_FILE_NAME: &str = "registry_schema.proto";

/// Protobuf codec backed by the schema registry.
pub struct ProtobufSchemaSerde {
    resolver: Option<Arc<dyn SchemaResolver>>,
    /// Compiled root files indexed by schema id
    files: RwLock<HashMap<u32, FileDescriptor>>,
}

impl ProtobufSchemaSerde {
    /// Create a codec; without a resolver every payload is rejected.
    pub fn new(resolver: Option<Arc<dyn SchemaResolver>>) -> Self {
        Self {
            resolver,
            files: RwLock::new(HashMap::new()),
        }
    }

    fn resolver(&self) -> Result<&dyn SchemaResolver> {
        self.resolver
            .as_deref()
            .ok_or_else(|| CodecError::not_configured("schema registry"))
    }

    async fn compiled_file(&self, schema_id: u32) -> Result<FileDescriptor> {
        {
            let files = self
                .files
                .read()
                .map_err(|e| CodecError::Other(format!("Schema cache read lock poisoned: {e}")))?;
            if let Some(file) = files.get(&schema_id) {
                return Ok(file.clone());
            }
        }

        let resolver = self.resolver()?;
        let schema = resolver
            .schema_by_id(schema_id)
            .await
            .map_err(|e| CodecError::resolution(Some(schema_id), e.to_string()))?;
        if schema.schema_type != SchemaType::Protobuf {
            return Err(CodecError::invalid_schema(
                schema_id.to_string(),
                format!("expected a PROTOBUF schema, got {}", schema.schema_type),
            ));
        }

        let references = resolve_references(resolver, &schema.references)
            .await
            .map_err(|e| CodecError::resolution(Some(schema_id), e.to_string()))?;
        let mut sources: HashMap<String, String> = references
            .into_iter()
            .map(|r| (r.name, r.schema.schema))
            .collect();
        sources.insert(ROOT_FILE_NAME.to_string(), schema.schema);

        let file = compile(sources, schema_id)?;
        self.files
            .write()
            .map_err(|e| CodecError::Other(format!("Schema cache write lock poisoned: {e}")))?
            .insert(schema_id, file.clone());
        Ok(file)
    }
}

impl Default for ProtobufSchemaSerde {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Serde for ProtobufSchemaSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::ProtobufSchema
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        self.resolver()?;
        let payload = payload_from_record(record, payload_type);
        let (schema_id, body) = parse_frame(payload)?;
        let (indexes, message_bytes) = read_message_indexes(body)?;

        let file = self.compiled_file(schema_id).await?;
        let descriptor = message_for_indexes(&file, &indexes)?;
        let value = decode_message(&descriptor, message_bytes)?;

        Ok(RecordPayload::structured(value, PayloadEncoding::ProtobufSchema).with_schema_id(schema_id))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        let config = SerializeConfig::from_options(options);
        let schema_id = config.require_schema_id("protobufSchema")?;
        let indexes = config.index.unwrap_or_else(|| vec![0]);

        let file = self.compiled_file(schema_id).await?;
        let descriptor = message_for_indexes(&file, &indexes)?;
        let body = encode_message(&descriptor, &structured_input(value))?;

        let mut out = Vec::with_capacity(body.len() + 8);
        write_header(schema_id, &mut out);
        write_message_indexes(&indexes, &mut out);
        out.extend_from_slice(&body);
        Ok(out)
    }
}

/// Select a message by its index path: the first index picks a top-level
/// message of the file, each further index a nested message of the previous one.
pub fn message_for_indexes(file: &FileDescriptor, indexes: &[usize]) -> Result<MessageDescriptor> {
    let not_found = || {
        CodecError::type_not_found(format!(
            "message index {indexes:?} in {}",
            file.name()
        ))
    };

    let (first, rest) = indexes.split_first().ok_or_else(not_found)?;
    let mut descriptor = file.messages().nth(*first).ok_or_else(not_found)?;
    for &index in rest {
        let next = descriptor.child_messages().nth(index).ok_or_else(not_found)?;
        descriptor = next;
    }
    Ok(descriptor)
}

// =============================================================================
// Compilation
// =============================================================================

/// Serves registry schema sources to the proto compiler by import path.
struct RegistryFileResolver {
    sources: HashMap<String, String>,
}

impl FileResolver for RegistryFileResolver {
    fn open_file(&self, name: &str) -> std::result::Result<File, protox::Error> {
        match self.sources.get(name) {
            Some(source) => File::from_source(name, source),
            None => Err(protox::Error::file_not_found(name)),
        }
    }
}

fn compile(sources: HashMap<String, String>, schema_id: u32) -> Result<FileDescriptor> {
    let mut resolver = ChainFileResolver::new();
    resolver.add(RegistryFileResolver { sources });
    resolver.add(GoogleFileResolver::new());

    let mut compiler = Compiler::with_file_resolver(resolver);
    compiler.include_imports(true);
    compiler
        .open_file(ROOT_FILE_NAME)
        .map_err(|e| CodecError::invalid_schema(schema_id.to_string(), e.to_string()))?;

    compiler
        .descriptor_pool()
        .get_file_by_name(ROOT_FILE_NAME)
        .ok_or_else(|| CodecError::type_not_found(ROOT_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::frame::write_frame;
    use crate::schema::{
        RegistryError, SchemaReference, SchemaResponse, SchemaVersion, SchemaVersionedResponse,
    };
    use serde_json::json;

    const ORDER_PROTO: &str = r#"
        syntax = "proto3";
        package shop;

        import "money.proto";

        message Order {
            int64 id = 1;
            Money total = 2;
            message Line {
                string sku = 1;
                int32 quantity = 2;
            }
            repeated Line lines = 3;
        }

        message Refund {
            int64 order_id = 1;
        }
    "#;

    const MONEY_PROTO: &str = r#"
        syntax = "proto3";
        package shop;

        message Money {
            string currency = 1;
            int64 units = 2;
        }
    "#;

    struct ProtoRegistry;

    #[async_trait]
    impl SchemaResolver for ProtoRegistry {
        async fn schema_by_id(&self, id: u32) -> std::result::Result<SchemaResponse, RegistryError> {
            match id {
                3 => Ok(SchemaResponse {
                    schema: ORDER_PROTO.to_string(),
                    schema_type: SchemaType::Protobuf,
                    references: vec![SchemaReference {
                        name: "money.proto".to_string(),
                        subject: "money".to_string(),
                        version: 1,
                    }],
                }),
                4 => Ok(SchemaResponse {
                    schema: "\"string\"".to_string(),
                    schema_type: SchemaType::Avro,
                    references: vec![],
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
                schema_id: 2,
                version: 1,
                schema: MONEY_PROTO.to_string(),
                schema_type: SchemaType::Protobuf,
                references: vec![],
            })
        }
    }

    fn serde() -> ProtobufSchemaSerde {
        ProtobufSchemaSerde::new(Some(Arc::new(ProtoRegistry)))
    }

    #[tokio::test]
    async fn test_round_trip_first_message() {
        let serde = serde();
        let value = CodecValue::from(json!({
            "id": 9,
            "total": {"currency": "EUR", "units": 12},
            "lines": [{"sku": "a-1", "quantity": 2}]
        }));
        let bytes = serde
            .serialize_object(&value, PayloadType::Value, &[SerializeOption::SchemaId(3)])
            .await
            .unwrap();
        // header + single zero index byte
        assert_eq!(&bytes[..6], &[0, 0, 0, 0, 3, 0]);

        let record = Record::new("orders").with_value(bytes);
        let payload = serde
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.encoding, Some(PayloadEncoding::ProtobufSchema));
        assert_eq!(payload.schema_id, Some(3));
        assert_eq!(payload.parsed_payload, Some(value));
    }

    #[tokio::test]
    async fn test_message_index_selects_second_message() {
        let serde = serde();
        let value = CodecValue::from(json!({"order_id": 5}));
        let bytes = serde
            .serialize_object(
                &value,
                PayloadType::Value,
                &[SerializeOption::SchemaId(3), SerializeOption::Index(vec![1])],
            )
            .await
            .unwrap();

        let record = Record::new("refunds").with_value(bytes);
        let payload = serde
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.parsed_payload, Some(value));
    }

    #[tokio::test]
    async fn test_nested_message_index() {
        let file = serde().compiled_file(3).await.unwrap();
        let line = message_for_indexes(&file, &[0, 0]).unwrap();
        assert_eq!(line.full_name(), "shop.Order.Line");
        assert!(message_for_indexes(&file, &[2]).is_err());
    }

    #[tokio::test]
    async fn test_frame_with_unknown_id_fails_resolution() {
        let record = Record::new("t").with_value(write_frame(99, &[0, 0x08, 0x01]));
        let err = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::Resolution { schema_id: Some(99), .. }));
    }

    #[tokio::test]
    async fn test_non_protobuf_schema_rejected() {
        let record = Record::new("t").with_value(write_frame(4, &[0, 0x08, 0x01]));
        let err = serde()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidSchema { .. }));
    }

    #[tokio::test]
    async fn test_without_registry() {
        let record = Record::new("t").with_value(write_frame(3, &[0, 0x08, 0x01]));
        let err = ProtobufSchemaSerde::default()
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no schema registry configured");
    }
}
