// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf codec module.
//!
//! Provides topic-mapped ([`ProtobufSerde`]) and registry-framed
//! ([`ProtobufSchemaSerde`]) Protobuf support.

pub mod codec;
pub mod schema;
pub mod topic;

pub use schema::ProtobufSchemaSerde;
pub use topic::ProtobufSerde;
