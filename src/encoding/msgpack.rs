// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MessagePack payloads.
//!
//! Almost every byte sequence starts with a valid MessagePack token, so the
//! codec only runs for topics matching the configured patterns and rejects
//! payloads with trailing bytes.

use async_trait::async_trait;
use regex::Regex;
use rmpv::Value as MsgValue;

use crate::config::MsgPackConfig;
use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result, ValueMap,
};
use crate::encoding::codec::{payload_from_record, structured_input, Serde, SerializeOption};

/// MessagePack codec gated by topic name patterns.
#[derive(Debug, Clone, Default)]
pub struct MsgPackSerde {
    topic_patterns: Vec<Regex>,
}

impl MsgPackSerde {
    /// Create a codec that attempts topics matching any of `topic_patterns`.
    pub fn new(topic_patterns: Vec<Regex>) -> Self {
        Self { topic_patterns }
    }

    /// Build from configuration; a disabled section yields a codec that never matches.
    pub fn from_config(config: &MsgPackConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::default());
        }
        let topic_patterns = config
            .topic_names
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    CodecError::parse("msgpack topic pattern", format!("'{pattern}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(topic_patterns))
    }

    /// Check whether payloads of `topic` should be attempted.
    pub fn is_topic_allowed(&self, topic: &str) -> bool {
        self.topic_patterns.iter().any(|re| re.is_match(topic))
    }
}

#[async_trait]
impl Serde for MsgPackSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::MsgPack
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        if self.topic_patterns.is_empty() {
            return Err(CodecError::not_configured("message pack encoding"));
        }
        if !self.is_topic_allowed(&record.topic) {
            return Err(CodecError::not_configured(format!(
                "message pack encoding for topic '{}'",
                record.topic
            )));
        }

        let payload = payload_from_record(record, payload_type);
        let value = decode_msgpack(payload)?;
        Ok(RecordPayload::structured(value, PayloadEncoding::MsgPack))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        _options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        if let CodecValue::Bytes(bytes) = value {
            decode_msgpack(bytes).map_err(|e| CodecError::encode("msgpack", e.to_string()))?;
            return Ok(bytes.clone());
        }

        let mut out = Vec::new();
        rmpv::encode::write_value(&mut out, &value_to_msgpack(&structured_input(value)))
            .map_err(|e| CodecError::encode("msgpack", e.to_string()))?;
        Ok(out)
    }
}

/// Decode a complete MessagePack document.
pub fn decode_msgpack(payload: &[u8]) -> Result<CodecValue> {
    let mut reader = payload;
    let value = rmpv::decode::read_value(&mut reader)
        .map_err(|e| CodecError::parse("msgpack", format!("failed to decode MessagePack: {e}")))?;
    if !reader.is_empty() {
        return Err(CodecError::parse(
            "msgpack",
            format!("{} trailing bytes after MessagePack value", reader.len()),
        ));
    }
    Ok(msgpack_to_value(value))
}

fn msgpack_to_value(value: MsgValue) -> CodecValue {
    match value {
        MsgValue::Nil => CodecValue::Null,
        MsgValue::Boolean(b) => CodecValue::Bool(b),
        MsgValue::Integer(i) => match (i.as_i64(), i.as_u64()) {
            (Some(v), _) => CodecValue::Int64(v),
            (None, Some(v)) => CodecValue::UInt64(v),
            (None, None) => CodecValue::Null,
        },
        MsgValue::F32(v) => CodecValue::Float64(f64::from(v)),
        MsgValue::F64(v) => CodecValue::Float64(v),
        MsgValue::String(s) => match s.into_str() {
            Some(s) => CodecValue::String(s),
            None => CodecValue::Null,
        },
        MsgValue::Binary(b) => CodecValue::Bytes(b),
        MsgValue::Array(items) => {
            CodecValue::Array(items.into_iter().map(msgpack_to_value).collect())
        }
        MsgValue::Map(entries) => {
            let mut map = ValueMap::new();
            for (k, v) in entries {
                let key = match k.as_str() {
                    Some(s) => s.to_string(),
                    None => k.to_string(),
                };
                map.insert(key, msgpack_to_value(v));
            }
            CodecValue::Map(map)
        }
        MsgValue::Ext(_, data) => CodecValue::Bytes(data),
    }
}

fn value_to_msgpack(value: &CodecValue) -> MsgValue {
    match value {
        CodecValue::Null => MsgValue::Nil,
        CodecValue::Bool(b) => MsgValue::Boolean(*b),
        CodecValue::Int64(v) => MsgValue::from(*v),
        CodecValue::UInt64(v) => MsgValue::from(*v),
        CodecValue::Float64(v) => MsgValue::F64(*v),
        CodecValue::String(s) => MsgValue::from(s.as_str()),
        CodecValue::Bytes(b) => MsgValue::Binary(b.clone()),
        CodecValue::Array(items) => MsgValue::Array(items.iter().map(value_to_msgpack).collect()),
        CodecValue::Map(entries) => MsgValue::Map(
            entries
                .iter()
                .map(|(k, v)| (MsgValue::from(k.as_str()), value_to_msgpack(v)))
                .collect(),
        ),
    }
}
