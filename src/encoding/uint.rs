// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Big-endian unsigned integer payloads of 1, 2, 4 or 8 bytes.

use async_trait::async_trait;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result,
};
use crate::encoding::codec::{
    payload_from_record, Serde, SerializeConfig, SerializeOption, UintSize,
};

/// Unsigned integer codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct UintSerde;

#[async_trait]
impl Serde for UintSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::Uint
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        let payload = payload_from_record(record, payload_type);
        let value = match UintSize::from_byte_len(payload.len()) {
            Some(UintSize::U8) => u64::from(payload[0]),
            Some(UintSize::U16) => u64::from(BigEndian::read_u16(payload)),
            Some(UintSize::U32) => u64::from(BigEndian::read_u32(payload)),
            Some(UintSize::U64) => BigEndian::read_u64(payload),
            None => {
                return Err(CodecError::parse(
                    "uint",
                    format!("payload length {} is not 1, 2, 4 or 8 bytes", payload.len()),
                ))
            }
        };
        Ok(RecordPayload::structured(CodecValue::from(value), PayloadEncoding::Uint))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        let size = SerializeConfig::from_options(options).uint_size;
        let number = match value {
            CodecValue::String(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|e| CodecError::encode("uint", format!("'{s}': {e}")))?,
            other => other.as_u64().ok_or_else(|| {
                CodecError::encode(
                    "uint",
                    format!("expected an unsigned integer, got {}", other.type_name()),
                )
            })?,
        };
        if number > size.max_value() {
            return Err(CodecError::encode(
                "uint",
                format!("{number} does not fit into {} bytes", size.byte_len()),
            ));
        }

        let mut out = Vec::with_capacity(size.byte_len());
        let written = match size {
            UintSize::U8 => out.write_u8(number as u8),
            UintSize::U16 => out.write_u16::<BigEndian>(number as u16),
            UintSize::U32 => out.write_u32::<BigEndian>(number as u32),
            UintSize::U64 => out.write_u64::<BigEndian>(number),
        };
        written.map_err(|e| CodecError::encode("uint", e.to_string()))?;
        Ok(out)
    }
}
