// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema registry access.
//!
//! This module provides:
//! - [`SchemaRegistryClient`], a REST client for Confluent-compatible registries
//! - [`SchemaResolver`], the narrow lookup surface the framed codecs depend on
//! - [`CachedSchemaResolver`], a caching decorator over any resolver

pub mod client;
pub mod error;
pub mod resolver;
pub mod types;

pub use client::{SchemaRegistryClient, DEFAULT_TIMEOUT, REGISTRY_CONTENT_TYPE};
pub use error::RegistryError;
pub use resolver::{resolve_references, CachedSchemaResolver, ResolvedReference, SchemaResolver};
pub use types::{
    ConfigResponse, CreateSchemaResponse, ModeResponse, Schema, SchemaReference, SchemaResponse,
    SchemaType, SchemaVersion, SchemaVersionedResponse,
};
