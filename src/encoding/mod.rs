// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Payload codec implementations.
//!
//! Every codec implements the [`Serde`] trait:
//! - [`NoneSerde`], [`TextSerde`], [`Utf8Serde`], [`UintSerde`] - empty, text and integer payloads
//! - [`json`] - plain and schema-framed JSON
//! - [`XmlSerde`] - XML documents
//! - [`AvroSerde`] - schema-framed Avro
//! - [`protobuf`] - topic-mapped and schema-framed Protobuf
//! - [`MsgPackSerde`] - MessagePack, gated by topic
//! - [`SmileSerde`] - Smile binary JSON (decode only)
//! - [`consumer_offsets`] - the internal offsets topic
//!
//! [`frame`] holds the registry wire frame shared by the framed codecs.

pub mod avro;
pub mod codec;
pub mod consumer_offsets;
pub mod frame;
pub mod json;
pub mod msgpack;
pub mod protobuf;
pub mod smile;
pub mod text;
pub mod uint;
pub mod xml;

pub use avro::AvroSerde;
pub use codec::{
    payload_from_record, structured_input, Serde, SerializeConfig, SerializeOption, UintSize,
};
pub use frame::{parse_frame, write_frame, FRAME_HEADER_LEN, MAGIC_BYTE};
pub use json::{JsonDecoder, JsonSchemaSerde, JsonSerde};
pub use msgpack::MsgPackSerde;
pub use protobuf::{ProtobufSchemaSerde, ProtobufSerde};
pub use smile::SmileSerde;
pub use text::{NoneSerde, TextSerde, Utf8Serde};
pub use uint::UintSerde;
pub use xml::XmlSerde;
