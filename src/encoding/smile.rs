// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Smile (binary JSON) payloads.
//!
//! Decode-only. Supports the full token set written by Jackson except
//! arbitrary-precision numbers.

use async_trait::async_trait;

use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result, ValueMap,
};
use crate::encoding::codec::{payload_from_record, Serde, SerializeOption};

/// Leading bytes of every Smile document.
pub const SMILE_HEADER: [u8; 3] = [b':', b')', b'\n'];

const FLAG_SHARED_NAMES: u8 = 0x01;
const FLAG_SHARED_VALUES: u8 = 0x02;
const FLAG_RAW_BINARY: u8 = 0x04;

const MAX_SHARED_REFS: usize = 1024;
const MAX_SHARED_VALUE_LEN: usize = 64;
/// Maximum array/object nesting.
const MAX_DEPTH: usize = 128;

const TOKEN_END_STRING: u8 = 0xFC;
const TOKEN_END_CONTENT: u8 = 0xFF;
const TOKEN_START_ARRAY: u8 = 0xF8;
const TOKEN_END_ARRAY: u8 = 0xF9;
const TOKEN_START_OBJECT: u8 = 0xFA;
const TOKEN_END_OBJECT: u8 = 0xFB;

/// Smile codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmileSerde;

#[async_trait]
impl Serde for SmileSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::Smile
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        let payload = payload_from_record(record, payload_type);
        let value = decode_smile(payload)?;
        Ok(RecordPayload::structured(value, PayloadEncoding::Smile))
    }

    async fn serialize_object(
        &self,
        _value: &CodecValue,
        _payload_type: PayloadType,
        _options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        Err(CodecError::unsupported("serializing to smile"))
    }
}

/// Decode a complete Smile document including its header.
pub fn decode_smile(payload: &[u8]) -> Result<CodecValue> {
    if payload.len() < 4 || payload[..3] != SMILE_HEADER {
        return Err(CodecError::parse("smile", "payload does not start with the smile header"));
    }
    let flags = payload[3];
    if flags >> 4 != 0 {
        return Err(CodecError::parse(
            "smile",
            format!("unsupported smile version {}", flags >> 4),
        ));
    }

    let mut decoder = SmileDecoder::new(&payload[4..], flags);
    let value = decoder.read_value()?;
    decoder.finish()?;
    Ok(value)
}

struct SmileDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    shared_names: Option<Vec<String>>,
    shared_values: Option<Vec<String>>,
    raw_binary: bool,
    depth: usize,
}

impl<'a> SmileDecoder<'a> {
    fn new(data: &'a [u8], flags: u8) -> Self {
        Self {
            data,
            pos: 0,
            shared_names: (flags & FLAG_SHARED_NAMES != 0).then(Vec::new),
            shared_values: (flags & FLAG_SHARED_VALUES != 0).then(Vec::new),
            raw_binary: flags & FLAG_RAW_BINARY != 0,
            depth: 0,
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.data.get(self.pos..) {
            Some([]) | Some([TOKEN_END_CONTENT]) => Ok(()),
            Some(rest) => Err(CodecError::parse(
                "smile",
                format!("{} trailing bytes after smile document", rest.len()),
            )),
            None => Ok(()),
        }
    }

    fn next_byte(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| CodecError::buffer_too_short(1, 0, self.pos as u64))?;
        self.pos += 1;
        Ok(b)
    }

    fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| CodecError::buffer_too_short(1, 0, self.pos as u64))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.data.len().saturating_sub(self.pos);
        if n > available {
            return Err(CodecError::buffer_too_short(n, available, self.pos as u64));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Variable-length unsigned int: 7 bits per byte, the last byte has the high
    /// bit set and carries 6 bits.
    fn read_vuint(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        for _ in 0..11 {
            let b = self.next_byte()?;
            if b & 0x80 != 0 {
                return Ok((value << 6) | u64::from(b & 0x3F));
            }
            value = (value << 7) | u64::from(b);
        }
        Err(CodecError::parse("smile", "variable-length integer too long"))
    }

    fn read_string_bytes(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::parse("smile", format!("invalid UTF-8 in string: {e}")))
    }

    fn read_until_end_marker(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == TOKEN_END_STRING)
            .ok_or_else(|| CodecError::parse("smile", "unterminated long string"))?;
        let text = std::str::from_utf8(&rest[..end])
            .map_err(|e| CodecError::parse("smile", format!("invalid UTF-8 in string: {e}")))?
            .to_string();
        self.pos += end + 1;
        Ok(text)
    }

    fn read_value(&mut self) -> Result<CodecValue> {
        let token = self.next_byte()?;
        match token {
            0x01..=0x1F => self.shared_value(usize::from(token - 1)),
            0x20 => Ok(CodecValue::String(String::new())),
            0x21 => Ok(CodecValue::Null),
            0x22 => Ok(CodecValue::Bool(false)),
            0x23 => Ok(CodecValue::Bool(true)),
            0x24 => Ok(CodecValue::Int64(i64::from(zigzag32(self.read_vuint()?)))),
            0x25 => Ok(CodecValue::Int64(zigzag64(self.read_vuint()?))),
            0x26 => Err(CodecError::unsupported("smile BigInteger values")),
            0x28 => {
                let bits = self.read_7bit_word(5)?;
                Ok(CodecValue::Float64(f64::from(f32::from_bits(bits as u32))))
            }
            0x29 => Ok(CodecValue::Float64(f64::from_bits(self.read_7bit_word(10)?))),
            0x2A => Err(CodecError::unsupported("smile BigDecimal values")),
            0x40..=0x5F => self.shared_candidate(usize::from(token & 0x1F) + 1),
            0x60..=0x7F => self.shared_candidate(usize::from(token & 0x1F) + 33),
            0x80..=0x9F => self.shared_candidate(usize::from(token & 0x1F) + 2),
            0xA0..=0xBF => self.shared_candidate(usize::from(token & 0x1F) + 34),
            0xC0..=0xDF => Ok(CodecValue::Int64(i64::from(zigzag32(u64::from(token & 0x1F))))),
            0xE0 | 0xE4 => Ok(CodecValue::String(self.read_until_end_marker()?)),
            0xE8 => {
                let len = self.read_length()?;
                Ok(CodecValue::Bytes(self.read_7bit_binary(len)?))
            }
            0xEC..=0xEF => {
                let index = (usize::from(token & 0x03) << 8) | usize::from(self.next_byte()?);
                self.shared_value(index)
            }
            TOKEN_START_ARRAY => self.nested(Self::read_array),
            TOKEN_START_OBJECT => self.nested(Self::read_object),
            0xFD => {
                if !self.raw_binary {
                    return Err(CodecError::parse(
                        "smile",
                        "raw binary found but not enabled in header",
                    ));
                }
                let len = self.read_length()?;
                Ok(CodecValue::Bytes(self.take(len)?.to_vec()))
            }
            other => Err(CodecError::parse(
                "smile",
                format!("invalid value token 0x{other:02X} at offset {}", self.pos - 1),
            )),
        }
    }

    fn read_length(&mut self) -> Result<usize> {
        let len = self.read_vuint()?;
        usize::try_from(len)
            .ok()
            .filter(|&l| l <= self.data.len())
            .ok_or_else(|| CodecError::parse("smile", format!("invalid binary length {len}")))
    }

    /// Read `n` bytes of 7 significant bits each as one big-endian word.
    fn read_7bit_word(&mut self, n: usize) -> Result<u64> {
        let mut value: u64 = 0;
        for &b in self.take(n)? {
            value = (value << 7) | u64::from(b & 0x7F);
        }
        Ok(value)
    }

    /// Binary data where every 7 raw bytes are spread over 8 encoded bytes;
    /// a final partial group of `k` bytes uses `k + 1` encoded bytes.
    fn read_7bit_binary(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        let mut left = len;
        while left >= 7 {
            let group = self.read_7bit_word(8)?;
            for shift in (0..7).rev() {
                out.push((group >> (shift * 8)) as u8);
            }
            left -= 7;
        }
        if left > 0 {
            let mut value = u32::from(self.next_byte()? & 0x7F);
            for i in 1..left {
                value = (value << 7) | u32::from(self.next_byte()? & 0x7F);
                out.push((value >> (7 - i)) as u8);
            }
            value <<= left;
            out.push(value.wrapping_add(u32::from(self.next_byte()? & 0x7F)) as u8);
        }
        Ok(out)
    }

    fn shared_candidate(&mut self, len: usize) -> Result<CodecValue> {
        let text = self.read_string_bytes(len)?;
        if len <= MAX_SHARED_VALUE_LEN {
            if let Some(values) = self.shared_values.as_mut() {
                if values.len() >= MAX_SHARED_REFS {
                    values.clear();
                }
                values.push(text.clone());
            }
        }
        Ok(CodecValue::String(text))
    }

    fn shared_value(&self, index: usize) -> Result<CodecValue> {
        let values = self.shared_values.as_ref().ok_or_else(|| {
            CodecError::parse("smile", "shared value reference but sharing is disabled")
        })?;
        values
            .get(index)
            .map(|s| CodecValue::String(s.clone()))
            .ok_or_else(|| CodecError::parse("smile", format!("invalid shared value index {index}")))
    }

    fn nested(&mut self, read: fn(&mut Self) -> Result<CodecValue>) -> Result<CodecValue> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::parse("smile", "nesting too deep"));
        }
        self.depth += 1;
        let value = read(self);
        self.depth -= 1;
        value
    }

    fn read_array(&mut self) -> Result<CodecValue> {
        let mut items = Vec::new();
        loop {
            if self.peek_byte()? == TOKEN_END_ARRAY {
                self.pos += 1;
                return Ok(CodecValue::Array(items));
            }
            items.push(self.read_value()?);
        }
    }

    fn read_object(&mut self) -> Result<CodecValue> {
        let mut map = ValueMap::new();
        loop {
            let token = self.next_byte()?;
            let key = match token {
                TOKEN_END_OBJECT => return Ok(CodecValue::Map(map)),
                0x20 => String::new(),
                0x30..=0x33 => {
                    let index = (usize::from(token & 0x03) << 8) | usize::from(self.next_byte()?);
                    self.shared_name(index)?
                }
                0x34 => {
                    let name = self.read_until_end_marker()?;
                    self.remember_name(&name);
                    name
                }
                0x40..=0x7F => self.shared_name(usize::from(token & 0x3F))?,
                0x80..=0xBF => {
                    let name = self.read_string_bytes(usize::from(token & 0x3F) + 1)?;
                    self.remember_name(&name);
                    name
                }
                0xC0..=0xF7 => {
                    let name = self.read_string_bytes(usize::from(token & 0x3F) + 2)?;
                    self.remember_name(&name);
                    name
                }
                other => {
                    return Err(CodecError::parse(
                        "smile",
                        format!("invalid key token 0x{other:02X} at offset {}", self.pos - 1),
                    ))
                }
            };
            let value = self.read_value()?;
            map.insert(key, value);
        }
    }

    fn remember_name(&mut self, name: &str) {
        if let Some(names) = self.shared_names.as_mut() {
            if names.len() >= MAX_SHARED_REFS {
                names.clear();
            }
            names.push(name.to_string());
        }
    }

    fn shared_name(&self, index: usize) -> Result<String> {
        let names = self.shared_names.as_ref().ok_or_else(|| {
            CodecError::parse("smile", "shared key reference but sharing is disabled")
        })?;
        names
            .get(index)
            .cloned()
            .ok_or_else(|| CodecError::parse("smile", format!("invalid shared key index {index}")))
    }
}

fn zigzag32(n: u64) -> i32 {
    let n = n as u32;
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

fn zigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(flags: u8, body: &[u8]) -> Vec<u8> {
        let mut out = SMILE_HEADER.to_vec();
        out.push(flags);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_simple_object() {
        // {"a": 1, "b": "xy"}
        let body = [0xFA, 0x80, b'a', 0xC2, 0x80, b'b', 0x41, b'x', b'y', 0xFB];
        let value = decode_smile(&doc(0x00, &body)).unwrap();
        assert_eq!(value, CodecValue::from(json!({"a": 1, "b": "xy"})));
    }

    #[test]
    fn test_shared_names_and_values() {
        // [{"id": "x"}, {"id": "x"}] with back references on the second object
        let body = [
            0xF8, 0xFA, 0x81, b'i', b'd', 0x40, b'x', 0xFB, 0xFA, 0x40, 0x01, 0xFB, 0xF9,
        ];
        let value = decode_smile(&doc(FLAG_SHARED_NAMES | FLAG_SHARED_VALUES, &body)).unwrap();
        assert_eq!(value, CodecValue::from(json!([{"id": "x"}, {"id": "x"}])));
    }

    #[test]
    fn test_literals_and_small_ints() {
        let body = [0xF8, 0x21, 0x22, 0x23, 0x20, 0xC1, 0xDF, 0xF9, TOKEN_END_CONTENT];
        let value = decode_smile(&doc(0x00, &body)).unwrap();
        assert_eq!(value, CodecValue::from(json!([null, false, true, "", -1, -16])));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let body = vec![TOKEN_START_ARRAY; 200_000];
        let err = decode_smile(&doc(0x00, &body)).unwrap_err();
        assert!(err.to_string().contains("nesting too deep"));

        let mut body = vec![TOKEN_START_ARRAY; MAX_DEPTH];
        body.extend(vec![TOKEN_END_ARRAY; MAX_DEPTH]);
        assert!(decode_smile(&doc(0x00, &body)).is_ok());
    }

    #[test]
    fn test_vint_long() {
        // zigzag(300) = 600 = 0b1001011000 -> 0x09, 0x80 | 0x18
        let value = decode_smile(&doc(0x00, &[0x24, 0x09, 0x98])).unwrap();
        assert_eq!(value, CodecValue::Int64(300));
    }

    #[test]
    fn test_long_text() {
        let mut body = vec![0xE0];
        body.extend_from_slice(b"long ascii");
        body.push(TOKEN_END_STRING);
        let value = decode_smile(&doc(0x00, &body)).unwrap();
        assert_eq!(value, CodecValue::from("long ascii"));
    }

    #[test]
    fn test_raw_binary_requires_flag() {
        let body = [0xFD, 0x82, 0xDE, 0xAD];
        assert!(decode_smile(&doc(0x00, &body)).is_err());
        let value = decode_smile(&doc(FLAG_RAW_BINARY, &body)).unwrap();
        assert_eq!(value, CodecValue::Bytes(vec![0xDE, 0xAD]));
    }

    #[test]
    fn test_7bit_binary_partial_group() {
        // one byte 0xFF: upper seven bits, then the remaining low bit
        let body = [0xE8, 0x81, 0x7F, 0x01];
        let value = decode_smile(&doc(0x00, &body)).unwrap();
        assert_eq!(value, CodecValue::Bytes(vec![0xFF]));
    }

    #[test]
    fn test_missing_header() {
        assert!(decode_smile(br#"{"a":1}"#).is_err());
    }

    #[test]
    fn test_big_decimal_unsupported() {
        let err = decode_smile(&doc(0x00, &[0x2A])).unwrap_err();
        assert!(matches!(err, CodecError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_serialize_unsupported() {
        let err = SmileSerde
            .serialize_object(&CodecValue::Null, PayloadType::Value, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::Unsupported { .. }));
    }
}
