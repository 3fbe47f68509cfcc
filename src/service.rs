// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Codec dispatch engine.
//!
//! [`SerdeService`] holds the ordered codec chain. Decoding tries every codec
//! in order until one claims the payload and keeps a report of every failed
//! attempt; encoding picks exactly one codec by name.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordHeader, RecordPayload,
    Result, TroubleshootingReport,
};
use crate::encoding::consumer_offsets::{self, CONSUMER_OFFSETS_TOPIC};
use crate::encoding::{
    AvroSerde, JsonSchemaSerde, JsonSerde, MsgPackSerde, NoneSerde, ProtobufSchemaSerde,
    ProtobufSerde, Serde, SerializeOption, SmileSerde, TextSerde, UintSerde, Utf8Serde, XmlSerde,
};
use crate::schema::{CachedSchemaResolver, SchemaRegistryClient, SchemaResolver};

/// Payloads above this many bytes are flagged as too large.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1_000_000;

/// Options influencing how a record is decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeserializationOptions {
    /// Only try this codec for the key
    pub key_encoding: Option<PayloadEncoding>,
    /// Only try this codec for the value
    pub value_encoding: Option<PayloadEncoding>,
    /// Maximum payload size; zero means [`DEFAULT_MAX_PAYLOAD_SIZE`]
    pub max_payload_size: usize,
    /// Keep failure reports even when a codec succeeded
    pub troubleshoot: bool,
    /// Include the raw bytes in the result
    pub include_raw_data: bool,
}

impl DeserializationOptions {
    fn effective_max_payload_size(&self) -> usize {
        if self.max_payload_size == 0 {
            DEFAULT_MAX_PAYLOAD_SIZE
        } else {
            self.max_payload_size
        }
    }

    fn forced_encoding(&self, payload_type: PayloadType) -> Option<PayloadEncoding> {
        match payload_type {
            PayloadType::Key => self.key_encoding,
            PayloadType::Value => self.value_encoding,
        }
    }
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeserializedRecord {
    pub key: RecordPayload,
    pub value: RecordPayload,
    /// Headers copied from the input, in order
    pub headers: Vec<RecordHeader>,
}

/// Encoder input for one side of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializePayloadInput {
    /// Name of the codec to use
    pub encoding: PayloadEncoding,
    /// Value to encode
    pub payload: CodecValue,
    /// Codec options
    pub options: Vec<SerializeOption>,
}

impl SerializePayloadInput {
    pub fn new(encoding: PayloadEncoding, payload: impl Into<CodecValue>) -> Self {
        Self {
            encoding,
            payload: payload.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: SerializeOption) -> Self {
        self.options.push(option);
        self
    }
}

/// Encoder input for a whole record.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializeInput {
    /// Target topic; passed to both codecs as the first option when non-empty
    pub topic: String,
    pub key: SerializePayloadInput,
    pub value: SerializePayloadInput,
}

/// Encoder result for one side of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayloadSerializeResult {
    /// Codec that produced the bytes, if any
    pub encoding: Option<PayloadEncoding>,
    /// Produced bytes
    pub payload: Vec<u8>,
    /// Failed attempts
    pub troubleshooting: Vec<TroubleshootingReport>,
}

/// Encoder result for a whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializeOutput {
    pub key: RecordPayloadSerializeResult,
    pub value: RecordPayloadSerializeResult,
}

/// Serialization failure; carries whatever was produced for the other side.
#[derive(Debug, Clone)]
pub struct SerializeRecordError {
    /// Partial output
    pub output: SerializeOutput,
    /// The value-side error if it failed, otherwise the key-side error
    pub error: CodecError,
}

impl fmt::Display for SerializeRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for SerializeRecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// =============================================================================
// Service
// =============================================================================

/// Ordered codec chain.
pub struct SerdeService {
    serdes: Vec<Box<dyn Serde>>,
}

impl SerdeService {
    /// Build the standard chain.
    ///
    /// Order: none, json, jsonSchema, xml, avro, protobuf, protobufSchema,
    /// msgpack, smile, utf8WithControlChars, text, uint.
    pub fn new(
        resolver: Option<Arc<dyn SchemaResolver>>,
        protobuf: ProtobufSerde,
        msgpack: MsgPackSerde,
    ) -> Self {
        Self::with_serdes(vec![
            Box::new(NoneSerde),
            Box::new(JsonSerde),
            Box::new(JsonSchemaSerde::new(resolver.clone())),
            Box::new(XmlSerde),
            Box::new(AvroSerde::new(resolver.clone())),
            Box::new(protobuf),
            Box::new(ProtobufSchemaSerde::new(resolver)),
            Box::new(msgpack),
            Box::new(SmileSerde),
            Box::new(Utf8Serde),
            Box::new(TextSerde),
            Box::new(UintSerde),
        ])
    }

    /// Build the standard chain from configuration.
    ///
    /// The registry client is wrapped in a [`CachedSchemaResolver`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver: Option<Arc<dyn SchemaResolver>> = if config.schema_registry.enabled {
            let client = SchemaRegistryClient::new(&config.schema_registry)?;
            Some(Arc::new(CachedSchemaResolver::new(client)))
        } else {
            None
        };
        let protobuf = ProtobufSerde::from_config(&config.protobuf)?;
        let msgpack = MsgPackSerde::from_config(&config.msgpack)?;
        Ok(Self::new(resolver, protobuf, msgpack))
    }

    /// Build a service over a custom chain.
    pub fn with_serdes(serdes: Vec<Box<dyn Serde>>) -> Self {
        Self { serdes }
    }

    /// Codec names in chain order.
    pub fn serde_names(&self) -> Vec<PayloadEncoding> {
        self.serdes.iter().map(|s| s.name()).collect()
    }

    /// Decode the key and value of a record.
    pub async fn deserialize_record(
        &self,
        record: &Record,
        opts: &DeserializationOptions,
    ) -> DeserializedRecord {
        if record.topic == CONSUMER_OFFSETS_TOPIC {
            match consumer_offsets::decode_record(record) {
                Ok((key, value)) => {
                    return DeserializedRecord {
                        key: self.finish_offsets_payload(key, record, PayloadType::Key, opts),
                        value: self.finish_offsets_payload(value, record, PayloadType::Value, opts),
                        headers: record.headers.clone(),
                    }
                }
                Err(e) => debug!(
                    context = "serde_service",
                    error = %e,
                    "Falling back to the codec chain for consumer offsets record"
                ),
            }
        }

        let key = self.deserialize_payload(record, PayloadType::Key, opts).await;
        let value = self.deserialize_payload(record, PayloadType::Value, opts).await;
        DeserializedRecord {
            key,
            value,
            headers: record.headers.clone(),
        }
    }

    fn finish_offsets_payload(
        &self,
        mut payload: RecordPayload,
        record: &Record,
        payload_type: PayloadType,
        opts: &DeserializationOptions,
    ) -> RecordPayload {
        if opts.include_raw_data {
            payload.original_payload = record.payload(payload_type).map(<[u8]>::to_vec);
        }
        if payload.payload_size_bytes > opts.effective_max_payload_size() {
            payload.mark_too_large();
        }
        payload
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
        opts: &DeserializationOptions,
    ) -> RecordPayload {
        let raw = record.payload(payload_type);
        let payload = raw.unwrap_or_default();
        let original_payload = opts.include_raw_data.then(|| payload.to_vec());

        if payload.is_empty() {
            return RecordPayload {
                original_payload,
                encoding: Some(PayloadEncoding::None),
                is_payload_null: raw.is_none(),
                payload_size_bytes: 0,
                ..Default::default()
            };
        }

        let forced = opts.forced_encoding(payload_type);
        let mut troubleshooting = Vec::new();
        let mut decoded = None;
        for serde in &self.serdes {
            if forced.is_some_and(|f| f != serde.name()) {
                continue;
            }
            match serde.deserialize_payload(record, payload_type).await {
                Ok(result) => {
                    decoded = Some(result);
                    break;
                }
                Err(e) => {
                    // Unframed payloads are the common case for framed codecs.
                    if !e.is_malformed_frame() {
                        debug!(
                            context = "serde_service",
                            codec = serde.name().as_str(),
                            payload_type = payload_type.as_str(),
                            fields = ?e.log_fields(),
                            "Codec did not match payload"
                        );
                    }
                    troubleshooting.push(TroubleshootingReport::new(
                        serde.name().as_str(),
                        e.to_string(),
                    ));
                }
            }
        }

        let mut add_troubleshooting = opts.troubleshoot;
        let mut result = match decoded {
            Some(result) if result.encoding.is_some() => result,
            _ => {
                add_troubleshooting = true;
                RecordPayload {
                    encoding: Some(PayloadEncoding::Binary),
                    parsed_payload: Some(CodecValue::Bytes(payload.to_vec())),
                    ..Default::default()
                }
            }
        };

        result.payload_size_bytes = payload.len();
        result.is_payload_null = raw.is_none();
        result.original_payload = original_payload;
        if payload.len() > opts.effective_max_payload_size() {
            result.mark_too_large();
        }
        if add_troubleshooting {
            result.troubleshooting = Some(troubleshooting);
        }
        result
    }

    /// Encode the key and value of a record with the named codecs.
    ///
    /// Both sides are always attempted. On failure the error carries the partial
    /// output; a value-side error takes precedence over a key-side one.
    pub async fn serialize_record(
        &self,
        input: &SerializeInput,
    ) -> std::result::Result<SerializeOutput, SerializeRecordError> {
        let (key, key_err) = self
            .serialize_payload(&input.topic, &input.key, PayloadType::Key)
            .await;
        let (value, value_err) = self
            .serialize_payload(&input.topic, &input.value, PayloadType::Value)
            .await;

        let output = SerializeOutput { key, value };
        match value_err.or(key_err) {
            Some(error) => Err(SerializeRecordError { output, error }),
            None => Ok(output),
        }
    }

    async fn serialize_payload(
        &self,
        topic: &str,
        input: &SerializePayloadInput,
        payload_type: PayloadType,
    ) -> (RecordPayloadSerializeResult, Option<CodecError>) {
        let mut result = RecordPayloadSerializeResult::default();

        let Some(serde) = self.serdes.iter().find(|s| s.name() == input.encoding) else {
            return (
                result,
                Some(CodecError::invalid_encoding(
                    payload_type.as_str(),
                    input.encoding.as_str(),
                )),
            );
        };

        let mut options = Vec::with_capacity(input.options.len() + 1);
        if !topic.is_empty() {
            options.push(SerializeOption::Topic(topic.to_string()));
        }
        options.extend(input.options.iter().cloned());

        match serde
            .serialize_object(&input.payload, payload_type, &options)
            .await
        {
            Ok(bytes) => {
                result.encoding = Some(serde.name());
                result.payload = bytes;
                (result, None)
            }
            Err(e) => {
                result
                    .troubleshooting
                    .push(TroubleshootingReport::new(serde.name().as_str(), e.to_string()));
                (result, Some(e))
            }
        }
    }
}

impl Default for SerdeService {
    fn default() -> Self {
        Self::new(None, ProtobufSerde::disabled(), MsgPackSerde::default())
    }
}
