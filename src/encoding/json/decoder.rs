// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # JSON Document Decoder
//!
//! Shared by the plain JSON codec and the schema-framed JSON codec.
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use topiccodec::encoding::json::decoder::JsonDecoder;
//!
//! let decoder = JsonDecoder::new();
//! let decoded = decoder.decode_bytes(br#"{"x": 1, "y": 2}"#)?;
//! # Ok(())
//! # }
//! ```

use crate::core::{CodecError, CodecValue, Result as CoreResult};

/// Decoder for JSON object and array documents.
///
/// Only documents whose first non-whitespace byte is `{` or `[` are accepted;
/// bare scalars such as `123` or `"abc"` are left to the text codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder {
    _private: (),
}

impl JsonDecoder {
    /// Create a new JSON decoder.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Decode JSON bytes into a value tree.
    pub fn decode_bytes(&self, data: &[u8]) -> CoreResult<CodecValue> {
        let trimmed = data.trim_ascii_start();
        let Some(first) = trimmed.first() else {
            return Err(CodecError::parse(
                "json",
                "after trimming whitespaces there were no characters left",
            ));
        };
        if *first != b'{' && *first != b'[' {
            return Err(CodecError::parse(
                "json",
                "first byte indicates this is not valid JSON, expected brackets",
            ));
        }

        let value: serde_json::Value = serde_json::from_slice(trimmed)
            .map_err(|e| CodecError::parse("json", format!("failed to parse JSON payload: {e}")))?;
        Ok(CodecValue::from(value))
    }

    /// Encode a value tree as JSON.
    ///
    /// A string value is treated as an already encoded JSON document and is
    /// validated rather than quoted.
    pub fn encode(&self, value: &CodecValue, pretty: bool) -> CoreResult<Vec<u8>> {
        if let Some(text) = value.as_str() {
            self.decode_bytes(text.as_bytes())
                .map_err(|e| CodecError::encode("json", e.to_string()))?;
            return Ok(text.trim().as_bytes().to_vec());
        }

        let json = value.to_json();
        let encoded = if pretty {
            serde_json::to_vec_pretty(&json)
        } else {
            serde_json::to_vec(&json)
        };
        encoded.map_err(|e| CodecError::encode("json", format!("{e}")))
    }
}
