// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema registry request and response types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Error code the registry returns when a subject does not exist.
pub const CODE_SUBJECT_NOT_FOUND: i32 = 40401;
/// Error code the registry returns when a subject version does not exist.
pub const CODE_VERSION_NOT_FOUND: i32 = 40402;
/// Error code the registry returns when a schema id does not exist.
pub const CODE_SCHEMA_NOT_FOUND: i32 = 40403;
/// Error code the registry returns when a subject has no compatibility override.
pub const CODE_SUBJECT_LEVEL_COMPATIBILITY_NOT_CONFIGURED: i32 = 40408;

/// Compatibility level reported for subjects without their own override.
pub const COMPATIBILITY_DEFAULT: &str = "DEFAULT";

/// Schema type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SchemaType {
    /// Avro (the default for registries that predate type tagging)
    #[default]
    #[serde(rename = "AVRO")]
    Avro,
    /// Protocol buffers
    #[serde(rename = "PROTOBUF")]
    Protobuf,
    /// JSON schema
    #[serde(rename = "JSON")]
    Json,
}

impl SchemaType {
    /// Convert to the registry's string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Avro => "AVRO",
            SchemaType::Protobuf => "PROTOBUF",
            SchemaType::Json => "JSON",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "" | "AVRO" => Ok(SchemaType::Avro),
            "PROTOBUF" => Ok(SchemaType::Protobuf),
            "JSON" => Ok(SchemaType::Json),
            other => Err(format!("unknown schema type '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for SchemaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(SchemaType::Avro),
            Some(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A subject version selector: a specific version or the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// The last registered version of the subject
    Latest,
    /// A specific version, in `[1, 2^31-1]`
    Number(u32),
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Latest => f.write_str("latest"),
            SchemaVersion::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") || s == "-1" {
            return Ok(SchemaVersion::Latest);
        }
        match s.parse::<u32>() {
            Ok(n) if n >= 1 && n <= i32::MAX as u32 => Ok(SchemaVersion::Number(n)),
            _ => Err(format!(
                "invalid schema version '{s}', expected a positive integer or 'latest'"
            )),
        }
    }
}

impl From<u32> for SchemaVersion {
    fn from(n: u32) -> Self {
        SchemaVersion::Number(n)
    }
}

/// A reference from one schema to another registered schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaReference {
    /// Name the referencing schema uses (Avro full name, proto import path, JSON `$ref` URL)
    pub name: String,
    /// Subject the referenced schema is registered under
    pub subject: String,
    /// Version of the referenced schema
    pub version: u32,
}

/// Response of `GET /schemas/ids/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaResponse {
    /// Schema text
    pub schema: String,
    /// Schema type tag (absent means AVRO)
    #[serde(rename = "schemaType", default)]
    pub schema_type: SchemaType,
    /// Referenced schemas
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SchemaReference>,
}

/// A versioned schema registered under a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaVersionedResponse {
    /// Subject name
    pub subject: String,
    /// Globally unique schema id
    #[serde(rename = "id")]
    pub schema_id: u32,
    /// Version within the subject
    pub version: u32,
    /// Schema text
    pub schema: String,
    /// Schema type tag (absent means AVRO)
    #[serde(rename = "schemaType", default)]
    pub schema_type: SchemaType,
    /// Referenced schemas
    #[serde(default)]
    pub references: Vec<SchemaReference>,
}

impl From<SchemaVersionedResponse> for SchemaResponse {
    fn from(v: SchemaVersionedResponse) -> Self {
        Self {
            schema: v.schema,
            schema_type: v.schema_type,
            references: v.references,
        }
    }
}

/// Response of `GET /mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeResponse {
    /// IMPORT, READONLY or READWRITE
    pub mode: String,
}

/// Response of `GET /config` and `GET /config/{subject}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// BACKWARD, BACKWARD_TRANSITIVE, FORWARD, FORWARD_TRANSITIVE, FULL,
    /// FULL_TRANSITIVE, NONE, or DEFAULT (subject configs only)
    #[serde(rename = "compatibilityLevel")]
    pub compatibility: String,
}

/// Request body of `POST /subjects/{subject}/versions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Unescaped schema text
    pub schema: String,
    /// Schema type; the registry assumes AVRO when omitted
    #[serde(rename = "schemaType")]
    pub schema_type: SchemaType,
    /// Referenced schemas
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SchemaReference>,
}

/// Response of `POST /subjects/{subject}/versions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSchemaResponse {
    /// Id of the (possibly pre-existing) schema
    pub id: u32,
}

/// Structured error body returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct RestErrorBody {
    pub error_code: i32,
    #[serde(default)]
    pub message: String,
}
