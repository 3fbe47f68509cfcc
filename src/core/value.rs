// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Codec value type system.
//!
//! Provides a unified value representation for payloads decoded from JSON,
//! Avro, Protobuf, MessagePack, Smile and XML. Values are serde-serializable
//! and convert losslessly to and from `serde_json::Value` (except for raw bytes,
//! which render as a hex string).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Type alias for a decoded object: field name -> value mapping.
pub type ValueMap = BTreeMap<String, CodecValue>;

/// Unified value type for decoded payloads.
///
/// Every format-specific decoder populates this tree; the dispatch engine never
/// mutates it. Serialized untagged, so a decoded Avro record renders as a plain
/// JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodecValue {
    // Null / absent value
    Null,

    // Boolean
    Bool(bool),

    // Signed integer
    Int64(i64),

    // Unsigned integer that does not fit into i64
    UInt64(u64),

    // Floating point
    Float64(f64),

    // String (UTF-8)
    String(String),

    // Ordered sequence of values
    Array(Vec<CodecValue>),

    // String-keyed mapping
    Map(ValueMap),

    // Raw binary data
    Bytes(Vec<u8>),
}

impl CodecValue {
    // ========================================================================
    // Type Checking Predicates
    // ========================================================================

    /// Check if this value is a numeric type (integers or floats).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            CodecValue::Int64(_) | CodecValue::UInt64(_) | CodecValue::Float64(_)
        )
    }

    /// Check if this value is an integer type (signed or unsigned).
    pub fn is_integer(&self) -> bool {
        matches!(self, CodecValue::Int64(_) | CodecValue::UInt64(_))
    }

    /// Check if this value is a container type (array or map).
    pub fn is_container(&self) -> bool {
        matches!(self, CodecValue::Array(_) | CodecValue::Map(_))
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, CodecValue::Null)
    }

    // ========================================================================
    // Type Conversion Methods
    // ========================================================================

    /// Try to convert this value to f64 (for numeric values only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CodecValue::Int64(v) => Some(*v as f64),
            CodecValue::UInt64(v) => Some(*v as f64),
            CodecValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to convert this value to i64 (for integer types only).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CodecValue::Int64(v) => Some(*v),
            CodecValue::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to convert this value to u64 (for non-negative integers only).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CodecValue::UInt64(v) => Some(*v),
            CodecValue::Int64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get the inner string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CodecValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the inner bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CodecValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get the inner map.
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            CodecValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Try to get the inner array.
    pub fn as_array(&self) -> Option<&[CodecValue]> {
        match self {
            CodecValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Look up a field of a map value.
    pub fn get(&self, field: &str) -> Option<&CodecValue> {
        self.as_map().and_then(|m| m.get(field))
    }

    /// Get the type name of this value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            CodecValue::Null => "null",
            CodecValue::Bool(_) => "bool",
            CodecValue::Int64(_) => "int64",
            CodecValue::UInt64(_) => "uint64",
            CodecValue::Float64(_) => "float64",
            CodecValue::String(_) => "string",
            CodecValue::Array(_) => "array",
            CodecValue::Map(_) => "map",
            CodecValue::Bytes(_) => "bytes",
        }
    }

    /// Estimate the in-memory size of this value in bytes.
    ///
    /// This is an approximation for memory usage tracking.
    pub fn size_hint(&self) -> usize {
        match self {
            CodecValue::Null => 0,
            CodecValue::Bool(_) => 1,
            CodecValue::Int64(_) | CodecValue::UInt64(_) | CodecValue::Float64(_) => 8,
            CodecValue::String(s) => s.len(),
            CodecValue::Bytes(b) => b.len(),
            CodecValue::Array(arr) => {
                arr.iter().map(|v| v.size_hint()).sum::<usize>() + (arr.len() * 8)
            }
            CodecValue::Map(map) => map
                .iter()
                .map(|(k, v)| k.len() + v.size_hint())
                .sum::<usize>(),
        }
    }

    // ========================================================================
    // JSON Conversion
    // ========================================================================

    /// Convert to a `serde_json::Value`.
    ///
    /// Bytes render as a lowercase hex string and non-finite floats as null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CodecValue::Null => serde_json::Value::Null,
            CodecValue::Bool(b) => serde_json::Value::Bool(*b),
            CodecValue::Int64(v) => serde_json::Value::from(*v),
            CodecValue::UInt64(v) => serde_json::Value::from(*v),
            CodecValue::Float64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CodecValue::String(s) => serde_json::Value::String(s.clone()),
            CodecValue::Bytes(b) => serde_json::Value::String(hex::encode(b)),
            CodecValue::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(CodecValue::to_json).collect())
            }
            CodecValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Render as compact JSON bytes.
    pub fn to_json_vec(&self) -> Vec<u8> {
        // Value -> bytes serialization cannot fail: all map keys are strings.
        serde_json::to_vec(&self.to_json()).unwrap_or_default()
    }
}

impl From<serde_json::Value> for CodecValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CodecValue::Null,
            serde_json::Value::Bool(b) => CodecValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CodecValue::Int64(i)
                } else if let Some(u) = n.as_u64() {
                    CodecValue::UInt64(u)
                } else {
                    CodecValue::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => CodecValue::String(s),
            serde_json::Value::Array(arr) => {
                CodecValue::Array(arr.into_iter().map(CodecValue::from).collect())
            }
            serde_json::Value::Object(obj) => CodecValue::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, CodecValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for CodecValue {
    fn from(s: &str) -> Self {
        CodecValue::String(s.to_string())
    }
}

impl From<String> for CodecValue {
    fn from(s: String) -> Self {
        CodecValue::String(s)
    }
}

impl From<i64> for CodecValue {
    fn from(v: i64) -> Self {
        CodecValue::Int64(v)
    }
}

impl From<u64> for CodecValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => CodecValue::Int64(i),
            Err(_) => CodecValue::UInt64(v),
        }
    }
}

impl From<f64> for CodecValue {
    fn from(v: f64) -> Self {
        CodecValue::Float64(v)
    }
}

impl From<bool> for CodecValue {
    fn from(v: bool) -> Self {
        CodecValue::Bool(v)
    }
}

impl From<ValueMap> for CodecValue {
    fn from(m: ValueMap) -> Self {
        CodecValue::Map(m)
    }
}

impl fmt::Display for CodecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecValue::Null => write!(f, "null"),
            CodecValue::Bool(v) => write!(f, "{v}"),
            CodecValue::Int64(v) => write!(f, "{v}"),
            CodecValue::UInt64(v) => write!(f, "{v}"),
            CodecValue::Float64(v) => write!(f, "{v}"),
            CodecValue::String(v) => write!(f, "\"{v}\""),
            CodecValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            CodecValue::Array(v) => write!(f, "[{} elements]", v.len()),
            CodecValue::Map(v) => write!(f, "{{{} fields}}", v.len()),
        }
    }
}
