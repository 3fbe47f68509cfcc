// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf payloads without registry framing.
//!
//! The message type is taken from a static topic mapping over a descriptor
//! set loaded at startup.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use prost_reflect::{DescriptorPool, MessageDescriptor};

use crate::config::{ProtobufConfig, ProtobufTopicMapping};
use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result,
};
use crate::encoding::codec::{
    payload_from_record, structured_input, Serde, SerializeConfig, SerializeOption,
};

use super::codec::{decode_message, encode_message, pool_from_file_descriptor_set};

/// Protobuf codec driven by a topic -> message type mapping.
pub struct ProtobufSerde {
    pool: DescriptorPool,
    mappings: HashMap<String, ProtobufTopicMapping>,
    /// Cached message descriptors indexed by type name
    descriptors: RwLock<HashMap<String, MessageDescriptor>>,
}

impl ProtobufSerde {
    /// Create a codec over a descriptor pool and topic mappings.
    pub fn new(pool: DescriptorPool, mappings: Vec<ProtobufTopicMapping>) -> Self {
        Self {
            pool,
            mappings: mappings
                .into_iter()
                .map(|m| (m.topic_name.clone(), m))
                .collect(),
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    /// Create a codec with no descriptors; every payload is rejected.
    pub fn disabled() -> Self {
        Self::new(DescriptorPool::new(), Vec::new())
    }

    /// Create a codec from configuration, reading the descriptor set file.
    pub fn from_config(config: &ProtobufConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let path = config
            .descriptor_set_filepath
            .as_ref()
            .ok_or_else(|| CodecError::not_configured("protobuf descriptor set file"))?;
        let bytes = std::fs::read(path)?;
        let pool = pool_from_file_descriptor_set(&bytes)?;
        Ok(Self::new(pool, config.mappings.clone()))
    }

    /// Message type configured for a topic and payload side.
    pub fn mapped_type(&self, topic: &str, payload_type: PayloadType) -> Option<&str> {
        let mapping = self.mappings.get(topic)?;
        match payload_type {
            PayloadType::Key => mapping.key_proto_type.as_deref(),
            PayloadType::Value => mapping.value_proto_type.as_deref(),
        }
    }

    fn descriptor_for(&self, topic: &str, payload_type: PayloadType) -> Result<MessageDescriptor> {
        let type_name = self.mapped_type(topic, payload_type).ok_or_else(|| {
            CodecError::not_configured(format!(
                "protobuf {payload_type} type for topic '{topic}'"
            ))
        })?;

        {
            let descriptors = self
                .descriptors
                .read()
                .map_err(|e| CodecError::Other(format!("Descriptor read lock poisoned: {e}")))?;
            if let Some(descriptor) = descriptors.get(type_name) {
                return Ok(descriptor.clone());
            }
        }

        let descriptor = self
            .pool
            .get_message_by_name(type_name)
            .ok_or_else(|| CodecError::type_not_found(type_name))?;

        self.descriptors
            .write()
            .map_err(|e| CodecError::Other(format!("Descriptor write lock poisoned: {e}")))?
            .insert(type_name.to_string(), descriptor.clone());

        Ok(descriptor)
    }
}

impl Default for ProtobufSerde {
    fn default() -> Self {
        Self::disabled()
    }
}

#[async_trait]
impl Serde for ProtobufSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::Protobuf
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        let descriptor = self.descriptor_for(&record.topic, payload_type)?;
        let payload = payload_from_record(record, payload_type);
        let value = decode_message(&descriptor, payload)?;
        Ok(RecordPayload::structured(value, PayloadEncoding::Protobuf))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        payload_type: PayloadType,
        options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        let config = SerializeConfig::from_options(options);
        let topic = config
            .topic
            .ok_or_else(|| CodecError::encode("protobuf", "no topic specified"))?;
        let descriptor = self.descriptor_for(&topic, payload_type)?;
        encode_message(&descriptor, &structured_input(value))
    }
}
