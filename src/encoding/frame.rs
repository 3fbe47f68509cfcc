// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema registry wire framing.
//!
//! ```text
//! [0x00][schema id: u32 big endian][payload]
//! ```
//!
//! Protobuf payloads additionally start with a list of message indexes
//! (zig-zag varints: count, then indexes; a lone `0` means `[0]`).

use byteorder::{BigEndian, ByteOrder};

use crate::core::{CodecError, Result};

/// First byte of every framed payload.
pub const MAGIC_BYTE: u8 = 0x00;

/// Length of the magic byte plus schema id.
pub const FRAME_HEADER_LEN: usize = 5;

/// Split a framed payload into its schema id and body.
///
/// Payloads of five bytes or fewer are rejected: a frame with an empty body is
/// never valid.
pub fn parse_frame(payload: &[u8]) -> Result<(u32, &[u8])> {
    if payload.len() <= FRAME_HEADER_LEN {
        return Err(CodecError::malformed_frame("payload length is < 5"));
    }
    if payload[0] != MAGIC_BYTE {
        return Err(CodecError::malformed_frame("incorrect magic byte"));
    }
    let schema_id = BigEndian::read_u32(&payload[1..FRAME_HEADER_LEN]);
    Ok((schema_id, &payload[FRAME_HEADER_LEN..]))
}

/// Prefix a body with the magic byte and schema id.
pub fn write_frame(schema_id: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    write_header(schema_id, &mut out);
    out.extend_from_slice(body);
    out
}

/// Append the magic byte and schema id.
pub fn write_header(schema_id: u32, out: &mut Vec<u8>) {
    let mut id = [0u8; 4];
    BigEndian::write_u32(&mut id, schema_id);
    out.push(MAGIC_BYTE);
    out.extend_from_slice(&id);
}

/// Read the protobuf message index list at the start of a framed body.
pub fn read_message_indexes(body: &[u8]) -> Result<(Vec<usize>, &[u8])> {
    let mut pos = 0;
    let count = read_zigzag_varint(body, &mut pos)?;
    if count == 0 {
        return Ok((vec![0], &body[pos..]));
    }
    if count < 0 || count as usize > body.len() {
        return Err(CodecError::malformed_frame(format!(
            "invalid message index count {count}"
        )));
    }
    let mut indexes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = read_zigzag_varint(body, &mut pos)?;
        if index < 0 {
            return Err(CodecError::malformed_frame(format!(
                "invalid message index {index}"
            )));
        }
        indexes.push(index as usize);
    }
    Ok((indexes, &body[pos..]))
}

/// Append a protobuf message index list; `[0]` is written as a single zero byte.
pub fn write_message_indexes(indexes: &[usize], out: &mut Vec<u8>) {
    if indexes.is_empty() || indexes == [0] {
        out.push(0);
        return;
    }
    write_zigzag_varint(indexes.len() as i64, out);
    for &index in indexes {
        write_zigzag_varint(index as i64, out);
    }
}

fn read_zigzag_varint(data: &[u8], pos: &mut usize) -> Result<i64> {
    let mut raw: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| CodecError::buffer_too_short(1, 0, *pos as u64))?;
        *pos += 1;
        if shift >= 64 {
            return Err(CodecError::malformed_frame("varint overflow"));
        }
        raw |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
}

fn write_zigzag_varint(value: i64, out: &mut Vec<u8>) {
    let mut raw = ((value << 1) ^ (value >> 63)) as u64;
    while raw >= 0x80 {
        out.push((raw as u8 & 0x7f) | 0x80);
        raw >>= 7;
    }
    out.push(raw as u8);
}
