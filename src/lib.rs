// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # topiccodec
//!
//! Payload codec library for records read from partitioned logs.
//!
//! Given the raw key and value bytes of a record, the library works out which
//! encoding they use (JSON, Avro, Protobuf, MessagePack, Smile, XML, text,
//! integers) and decodes them into a [`CodecValue`] tree. Avro, Protobuf and
//! JSON payloads framed with a schema id are resolved against a
//! Confluent-compatible schema registry.
//!
//! ## Architecture
//!
//! - `core/` - records, decode results, values and errors
//! - `encoding/` - one [`Serde`](encoding::Serde) implementation per payload format
//! - `schema/` - schema registry client, resolver trait and cache
//! - `service` - the ordered codec chain ([`SerdeService`])
//! - `progress` - counters and periodic progress events for topic scans
//! - `config` - TOML configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! # async fn run() {
//! use topiccodec::{DeserializationOptions, Record, SerdeService};
//!
//! let service = SerdeService::default();
//! let record = Record::new("orders").with_value(br#"{"id": 1}"#.to_vec());
//! let decoded = service
//!     .deserialize_record(&record, &DeserializationOptions::default())
//!     .await;
//! println!("{:?}", decoded.value.encoding);
//! # }
//! ```

// Core types
pub mod core;

pub use core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordHeader, RecordPayload,
    Result, TroubleshootingReport,
};

// Codecs
pub mod encoding;

// Schema registry access
pub mod schema;

// Dispatch engine
pub mod service;

pub use service::{
    DeserializationOptions, DeserializedRecord, RecordPayloadSerializeResult, SerdeService,
    SerializeInput, SerializeOutput, SerializePayloadInput, SerializeRecordError,
};

pub mod config;
pub mod progress;

pub use config::Config;
pub use progress::{ProgressEvent, StreamProgressReporter};
