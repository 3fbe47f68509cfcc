// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Shared helpers for integration tests.

#![allow(dead_code)]

use topiccodec::config::{Config, SchemaRegistryConfig};
use topiccodec::schema::SchemaRegistryClient;
use topiccodec::{DeserializationOptions, Record, RecordPayload, SerdeService};

// ============================================================================
// Schemas
// ============================================================================

/// Avro record used across registry tests.
pub const USER_AVRO_SCHEMA: &str = r#"{"type":"record","name":"User","namespace":"example","fields":[{"name":"name","type":"string"},{"name":"age","type":"int"},{"name":"email","type":["null","string"],"default":null}]}"#;

/// Registry content type.
pub const REGISTRY_JSON: &str = "application/vnd.schemaregistry.v1+json";

/// `GET /schemas/ids/{id}` body for a schema without a type tag.
pub fn schema_by_id_body(schema: &str) -> String {
    serde_json::json!({ "schema": schema }).to_string()
}

/// `GET /subjects/{subject}/versions/{version}` body.
pub fn versioned_body(subject: &str, id: u32, version: u32, schema: &str) -> String {
    serde_json::json!({
        "subject": subject,
        "id": id,
        "version": version,
        "schema": schema,
    })
    .to_string()
}

/// Registry error body.
pub fn error_body(code: i32, message: &str) -> String {
    serde_json::json!({ "error_code": code, "message": message }).to_string()
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration pointing at a registry under test.
pub fn registry_config(url: &str) -> Config {
    Config {
        schema_registry: SchemaRegistryConfig {
            enabled: true,
            urls: vec![url.to_string()],
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn registry_client(url: &str) -> SchemaRegistryClient {
    SchemaRegistryClient::new(&registry_config(url).schema_registry)
        .expect("registry client should build")
}

// ============================================================================
// Payloads
// ============================================================================

/// Prefix a body with the magic byte and a big-endian schema id.
pub fn framed(schema_id: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + body.len());
    out.push(0);
    out.extend_from_slice(&schema_id.to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Avro datum for `User { name, age, email: null }`.
pub fn user_avro_datum(name: &str, age: i32) -> Vec<u8> {
    let mut out = Vec::new();
    write_avro_long(&mut out, name.len() as i64);
    out.extend_from_slice(name.as_bytes());
    write_avro_long(&mut out, i64::from(age));
    // union branch 0: null
    out.push(0);
    out
}

fn write_avro_long(out: &mut Vec<u8>, value: i64) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n >= 0x80 {
        out.push((n as u8 & 0x7F) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}

/// Decode only the value of a record on `topic`.
pub async fn decode_value(service: &SerdeService, topic: &str, value: Vec<u8>) -> RecordPayload {
    decode_value_with(service, topic, value, &DeserializationOptions::default()).await
}

pub async fn decode_value_with(
    service: &SerdeService,
    topic: &str,
    value: Vec<u8>,
    opts: &DeserializationOptions,
) -> RecordPayload {
    let record = Record::new(topic).with_value(value);
    service.deserialize_record(&record, opts).await.value
}
