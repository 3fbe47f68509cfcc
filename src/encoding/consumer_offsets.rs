// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Records of the internal `__consumer_offsets` topic.
//!
//! Keys select the record kind: versions 0 and 1 are offset commits
//! (group, topic, partition), version 2 is group metadata (group only).
//! Values are decoded according to the key kind; an empty value is a
//! tombstone.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use crate::core::{CodecError, CodecValue, PayloadEncoding, Record, RecordPayload, Result, ValueMap};

/// Name of the internal offsets topic.
pub const CONSUMER_OFFSETS_TOPIC: &str = "__consumer_offsets";

const CONTEXT: &str = "consumerOffsets";

/// Kind of record, derived from the key version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetsRecordKind {
    /// Committed offset for a group/topic/partition
    OffsetCommit,
    /// Group membership and assignment state
    GroupMetadata,
}

/// Decode key and value of a consumer offsets record together.
pub fn decode_record(record: &Record) -> Result<(RecordPayload, RecordPayload)> {
    let key_bytes = record
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| CodecError::parse(CONTEXT, "record has no key"))?;
    let (kind, key) = decode_key(key_bytes)?;

    let mut key_payload = RecordPayload::structured(key, PayloadEncoding::ConsumerOffsets);
    key_payload.payload_size_bytes = key_bytes.len();

    let value_payload = match record.value.as_deref() {
        None | Some([]) => RecordPayload {
            encoding: Some(PayloadEncoding::ConsumerOffsets),
            is_payload_null: record.value.is_none(),
            ..Default::default()
        },
        Some(bytes) => {
            let value = decode_value(kind, bytes)?;
            let mut payload = RecordPayload::structured(value, PayloadEncoding::ConsumerOffsets);
            payload.payload_size_bytes = bytes.len();
            payload
        }
    };
    Ok((key_payload, value_payload))
}

/// Decode a consumer offsets key.
pub fn decode_key(bytes: &[u8]) -> Result<(OffsetsRecordKind, CodecValue)> {
    let mut reader = OffsetsReader::new(bytes);
    let version = reader.i16()?;
    let mut map = ValueMap::new();
    map.insert("version".to_string(), CodecValue::Int64(i64::from(version)));

    let kind = match version {
        0 | 1 => {
            map.insert("group".to_string(), reader.string()?);
            map.insert("topic".to_string(), reader.string()?);
            map.insert("partition".to_string(), reader.i32_value()?);
            OffsetsRecordKind::OffsetCommit
        }
        2 => {
            map.insert("group".to_string(), reader.string()?);
            OffsetsRecordKind::GroupMetadata
        }
        other => {
            return Err(CodecError::parse(
                CONTEXT,
                format!("unknown key version {other}"),
            ))
        }
    };
    reader.finish()?;
    Ok((kind, CodecValue::Map(map)))
}

/// Decode a non-empty consumer offsets value.
pub fn decode_value(kind: OffsetsRecordKind, bytes: &[u8]) -> Result<CodecValue> {
    let mut reader = OffsetsReader::new(bytes);
    let version = reader.i16()?;
    let mut map = ValueMap::new();
    map.insert("version".to_string(), CodecValue::Int64(i64::from(version)));

    match kind {
        OffsetsRecordKind::OffsetCommit => {
            if !(0..=3).contains(&version) {
                return Err(CodecError::unsupported(format!(
                    "offset commit value version {version}"
                )));
            }
            map.insert("offset".to_string(), reader.i64_value()?);
            if version >= 3 {
                map.insert("leaderEpoch".to_string(), reader.i32_value()?);
            }
            map.insert("metadata".to_string(), reader.string()?);
            map.insert("commitTimestamp".to_string(), reader.i64_value()?);
            if version == 1 {
                map.insert("expireTimestamp".to_string(), reader.i64_value()?);
            }
        }
        OffsetsRecordKind::GroupMetadata => {
            if !(0..=3).contains(&version) {
                return Err(CodecError::unsupported(format!(
                    "group metadata value version {version}"
                )));
            }
            map.insert("protocolType".to_string(), reader.string()?);
            map.insert("generation".to_string(), reader.i32_value()?);
            map.insert("protocol".to_string(), reader.nullable_string()?);
            map.insert("leader".to_string(), reader.nullable_string()?);
            if version >= 2 {
                map.insert("currentStateTimestamp".to_string(), reader.i64_value()?);
            }

            let count = reader.array_len()?;
            let mut members = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                members.push(decode_member(&mut reader, version)?);
            }
            map.insert("members".to_string(), CodecValue::Array(members));
        }
    }
    reader.finish()?;
    Ok(CodecValue::Map(map))
}

fn decode_member(reader: &mut OffsetsReader<'_>, version: i16) -> Result<CodecValue> {
    let mut member = ValueMap::new();
    member.insert("memberId".to_string(), reader.string()?);
    if version >= 3 {
        member.insert("groupInstanceId".to_string(), reader.nullable_string()?);
    }
    member.insert("clientId".to_string(), reader.string()?);
    member.insert("clientHost".to_string(), reader.string()?);
    if version >= 1 {
        member.insert("rebalanceTimeout".to_string(), reader.i32_value()?);
    }
    member.insert("sessionTimeout".to_string(), reader.i32_value()?);
    member.insert("subscription".to_string(), reader.bytes()?);
    member.insert("assignment".to_string(), reader.bytes()?);
    Ok(CodecValue::Map(member))
}

/// Big-endian reader over the Kafka protocol primitives used by this topic.
struct OffsetsReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> OffsetsReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    fn short(&self, requested: usize) -> CodecError {
        CodecError::buffer_too_short(requested, self.remaining(), self.cursor.position())
    }

    fn i16(&mut self) -> Result<i16> {
        self.cursor.read_i16::<BigEndian>().map_err(|_| self.short(2))
    }

    fn i32_value(&mut self) -> Result<CodecValue> {
        let v = self.cursor.read_i32::<BigEndian>().map_err(|_| self.short(4))?;
        Ok(CodecValue::Int64(i64::from(v)))
    }

    fn i64_value(&mut self) -> Result<CodecValue> {
        let v = self.cursor.read_i64::<BigEndian>().map_err(|_| self.short(8))?;
        Ok(CodecValue::Int64(v))
    }

    fn array_len(&mut self) -> Result<usize> {
        let len = self.cursor.read_i32::<BigEndian>().map_err(|_| self.short(4))?;
        usize::try_from(len).map_err(|_| CodecError::parse(CONTEXT, format!("negative array length {len}")))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.short(len));
        }
        let start = self.cursor.position() as usize;
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    fn nullable_string(&mut self) -> Result<CodecValue> {
        let len = self.i16()?;
        if len < 0 {
            return Ok(CodecValue::Null);
        }
        let bytes = self.take(len as usize)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CodecError::parse(CONTEXT, format!("invalid UTF-8 string: {e}")))?;
        Ok(CodecValue::String(text.to_string()))
    }

    fn string(&mut self) -> Result<CodecValue> {
        match self.nullable_string()? {
            CodecValue::Null => Err(CodecError::parse(CONTEXT, "unexpected null string")),
            value => Ok(value),
        }
    }

    fn bytes(&mut self) -> Result<CodecValue> {
        let len = self.cursor.read_i32::<BigEndian>().map_err(|_| self.short(4))?;
        if len < 0 {
            return Ok(CodecValue::Null);
        }
        Ok(CodecValue::Bytes(self.take(len as usize)?.to_vec()))
    }

    fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::parse(CONTEXT, format!("{n} trailing bytes"))),
        }
    }
}
