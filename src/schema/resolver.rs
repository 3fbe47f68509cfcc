// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema lookup surface used by the framed codecs.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use super::client::SchemaRegistryClient;
use super::error::RegistryError;
use super::types::{SchemaReference, SchemaResponse, SchemaVersion, SchemaVersionedResponse};

/// Resolves schema ids and subject versions to schemas.
///
/// Implementations do no caching of their own; wrap them in
/// [`CachedSchemaResolver`] when repeated lookups should be served locally.
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    /// Look up a schema by its globally unique id.
    async fn schema_by_id(&self, id: u32) -> Result<SchemaResponse, RegistryError>;

    /// Look up a schema by subject and version.
    async fn schema_by_subject(
        &self,
        subject: &str,
        version: SchemaVersion,
    ) -> Result<SchemaVersionedResponse, RegistryError>;
}

#[async_trait]
impl SchemaResolver for SchemaRegistryClient {
    async fn schema_by_id(&self, id: u32) -> Result<SchemaResponse, RegistryError> {
        SchemaRegistryClient::schema_by_id(self, id).await
    }

    async fn schema_by_subject(
        &self,
        subject: &str,
        version: SchemaVersion,
    ) -> Result<SchemaVersionedResponse, RegistryError> {
        SchemaRegistryClient::schema_by_subject(self, subject, version, false).await
    }
}

/// Caching decorator over another resolver.
///
/// Successful id lookups are cached forever (ids are immutable in the
/// registry), as are lookups of numbered subject versions. `latest` lookups
/// always reach the inner resolver. Failures are never cached.
pub struct CachedSchemaResolver<R> {
    inner: R,
    by_id: RwLock<HashMap<u32, SchemaResponse>>,
    by_subject: RwLock<HashMap<(String, u32), SchemaVersionedResponse>>,
}

impl<R: SchemaResolver> CachedSchemaResolver<R> {
    /// Wrap a resolver.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            by_id: RwLock::new(HashMap::new()),
            by_subject: RwLock::new(HashMap::new()),
        }
    }

    /// The wrapped resolver.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Number of cached id lookups.
    pub fn cached_ids(&self) -> usize {
        self.by_id.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Drop every cached entry.
    pub fn invalidate(&self) {
        if let Ok(mut by_id) = self.by_id.write() {
            by_id.clear();
        }
        if let Ok(mut by_subject) = self.by_subject.write() {
            by_subject.clear();
        }
    }
}

#[async_trait]
impl<R: SchemaResolver> SchemaResolver for CachedSchemaResolver<R> {
    async fn schema_by_id(&self, id: u32) -> Result<SchemaResponse, RegistryError> {
        if let Some(hit) = self.by_id.read().ok().and_then(|m| m.get(&id).cloned()) {
            return Ok(hit);
        }
        let schema = self.inner.schema_by_id(id).await?;
        if let Ok(mut by_id) = self.by_id.write() {
            by_id.insert(id, schema.clone());
        }
        Ok(schema)
    }

    async fn schema_by_subject(
        &self,
        subject: &str,
        version: SchemaVersion,
    ) -> Result<SchemaVersionedResponse, RegistryError> {
        let SchemaVersion::Number(number) = version else {
            return self.inner.schema_by_subject(subject, version).await;
        };
        let key = (subject.to_string(), number);
        if let Some(hit) = self.by_subject.read().ok().and_then(|m| m.get(&key).cloned()) {
            return Ok(hit);
        }
        let schema = self.inner.schema_by_subject(subject, version).await?;
        if let Ok(mut by_subject) = self.by_subject.write() {
            by_subject.insert(key, schema.clone());
        }
        Ok(schema)
    }
}

/// A referenced schema together with the name the referencing schema uses for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReference {
    /// Name used by the referencing schema (Avro full name, proto import path)
    pub name: String,
    /// The referenced schema
    pub schema: SchemaVersionedResponse,
}

/// Fetch every schema reachable through `references`, transitively.
///
/// Each (subject, version) pair is fetched once, so reference cycles terminate.
/// Results are in discovery order.
pub async fn resolve_references(
    resolver: &dyn SchemaResolver,
    references: &[SchemaReference],
) -> Result<Vec<ResolvedReference>, RegistryError> {
    let mut resolved = Vec::new();
    let mut seen = HashSet::new();
    let mut pending: Vec<SchemaReference> = references.iter().rev().cloned().collect();

    while let Some(reference) = pending.pop() {
        if !seen.insert((reference.subject.clone(), reference.version)) {
            continue;
        }
        let schema = resolver
            .schema_by_subject(&reference.subject, SchemaVersion::Number(reference.version))
            .await?;
        pending.extend(schema.references.iter().rev().cloned());
        resolved.push(ResolvedReference {
            name: reference.name,
            schema,
        });
    }

    Ok(resolved)
}
