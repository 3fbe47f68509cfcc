// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! JSON codecs.
//!
//! Provides plain JSON ([`JsonSerde`]) and schema-framed JSON
//! ([`JsonSchemaSerde`]) support.

pub mod decoder;
pub mod schema;

use async_trait::async_trait;

use crate::core::{CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result};
use crate::encoding::codec::{payload_from_record, Serde, SerializeOption};

pub use decoder::JsonDecoder;
pub use schema::JsonSchemaSerde;

/// Plain JSON objects and arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerde;

#[async_trait]
impl Serde for JsonSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::Json
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        let payload = payload_from_record(record, payload_type);
        let value = JsonDecoder::new().decode_bytes(payload)?;
        Ok(RecordPayload::structured(value, PayloadEncoding::Json))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        _options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        JsonDecoder::new().encode(value, false)
    }
}
