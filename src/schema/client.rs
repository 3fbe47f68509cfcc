// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema registry REST client.
//!
//! Talks to a Confluent-compatible registry over HTTP(S). Every call carries a
//! bounded timeout. The client is cheap to clone; clones share one connection
//! pool.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

use crate::config::SchemaRegistryConfig;

use super::error::RegistryError;
use super::types::{
    ConfigResponse, CreateSchemaResponse, ModeResponse, RestErrorBody, Schema,
    SchemaResponse, SchemaVersion, SchemaVersionedResponse, CODE_SUBJECT_LEVEL_COMPATIBILITY_NOT_CONFIGURED,
    CODE_SUBJECT_NOT_FOUND, COMPATIBILITY_DEFAULT,
};

/// Media type spoken by the registry.
pub const REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("topiccodec/", env!("CARGO_PKG_VERSION"));

type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone)]
enum Credentials {
    None,
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

#[derive(Debug)]
struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

/// Client for a Confluent-compatible schema registry.
#[derive(Debug, Clone)]
pub struct SchemaRegistryClient {
    inner: Arc<ClientInner>,
}

impl SchemaRegistryClient {
    /// Build a client from configuration.
    ///
    /// Only the first configured URL is used. TLS material is read from disk here.
    pub fn new(config: &SchemaRegistryConfig) -> RegistryResult<Self> {
        let url = config
            .urls
            .first()
            .ok_or_else(|| RegistryError::Config("no schema registry url configured".into()))?;
        let base_url = Url::parse(url)
            .map_err(|e| RegistryError::Config(format!("invalid registry url '{url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::Config(format!(
                "registry url '{url}' cannot be used as a base url"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(REGISTRY_CONTENT_TYPE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(REGISTRY_CONTENT_TYPE));

        let timeout = if config.timeout_secs == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(config.timeout_secs)
        };

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout);

        let tls = &config.tls;
        if tls.enabled {
            builder = builder.use_rustls_tls();
            if let Some(ca_path) = &tls.ca_filepath {
                let pem = std::fs::read(ca_path).map_err(|e| {
                    RegistryError::Config(format!("failed to read ca file {}: {e}", ca_path.display()))
                })?;
                let ca = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    RegistryError::Config(format!(
                        "failed to append ca file to cert pool, is this a valid PEM format? {e}"
                    ))
                })?;
                builder = builder.add_root_certificate(ca);
            }
            if let (Some(cert_path), Some(key_path)) = (&tls.cert_filepath, &tls.key_filepath) {
                let mut pem = std::fs::read(cert_path).map_err(|e| {
                    RegistryError::Config(format!(
                        "failed to read cert file for schema registry client: {e}"
                    ))
                })?;
                let key = std::fs::read(key_path).map_err(|e| {
                    RegistryError::Config(format!(
                        "failed to read key file for schema registry client: {e}"
                    ))
                })?;
                pem.push(b'\n');
                pem.extend_from_slice(&key);
                let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                    RegistryError::Config(format!(
                        "failed to load certificate pair for schema registry client: {e}"
                    ))
                })?;
                builder = builder.identity(identity);
            }
            builder = builder.danger_accept_invalid_certs(tls.insecure_skip_tls_verify);
        }

        let http = builder
            .build()
            .map_err(|e| RegistryError::Config(format!("failed to build http client: {e}")))?;

        let credentials = match (&config.bearer_token, &config.username) {
            (Some(token), _) if !token.is_empty() => Credentials::Bearer(token.clone()),
            (_, Some(username)) if !username.is_empty() => Credentials::Basic {
                username: username.clone(),
                password: config.password.clone(),
            },
            _ => Credentials::None,
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                credentials,
            }),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    /// `GET /schemas/ids/{id}`.
    pub async fn schema_by_id(&self, id: u32) -> RegistryResult<SchemaResponse> {
        let id = id.to_string();
        let url = self.endpoint(&["schemas", "ids", &id], &[]);
        self.fetch("get schema by id", Method::GET, url).await
    }

    /// `GET /subjects/{subject}/versions/{version}`.
    ///
    /// A response without a schema type is reported as AVRO.
    pub async fn schema_by_subject(
        &self,
        subject: &str,
        version: SchemaVersion,
        show_soft_deleted: bool,
    ) -> RegistryResult<SchemaVersionedResponse> {
        let version = version.to_string();
        let url = self.endpoint(
            &["subjects", subject, "versions", &version],
            deleted_query(show_soft_deleted),
        );
        self.fetch("get schema by subject", Method::GET, url).await
    }

    /// `GET /schemas/types`.
    pub async fn schema_types(&self) -> RegistryResult<Vec<String>> {
        let url = self.endpoint(&["schemas", "types"], &[]);
        self.fetch("get schema types", Method::GET, url).await
    }

    /// `POST /subjects/{subject}/versions?normalize=true`.
    ///
    /// Registering a schema equivalent to an existing one returns the existing id.
    pub async fn create_schema(
        &self,
        subject: &str,
        schema: &Schema,
    ) -> RegistryResult<CreateSchemaResponse> {
        let url = self.endpoint(&["subjects", subject, "versions"], &[("normalize", "true")]);
        let request = self.request(Method::POST, url).json(schema);
        let (status, body) = self.execute("create schema", request).await?;
        decode_response("create schema", status, &body)
    }

    /// List every schema in the registry.
    ///
    /// Registries without the `GET /schemas` endpoint answer 404; the listing is
    /// then assembled from the latest version of every subject. Any failing
    /// subject fails the whole listing.
    pub async fn schemas(
        &self,
        show_soft_deleted: bool,
    ) -> RegistryResult<Vec<SchemaVersionedResponse>> {
        let url = self.endpoint(&["schemas"], deleted_query(show_soft_deleted));
        let request = self.request(Method::GET, url);
        let (status, body) = self.execute("get schemas", request).await?;
        if status == StatusCode::NOT_FOUND {
            warn!(
                registry = %self.inner.base_url,
                "schema registry does not support GET /schemas, fetching subjects individually"
            );
            return self.schemas_individually(show_soft_deleted).await;
        }
        decode_response("get schemas", status, &body)
    }

    /// List the latest schema of every subject with one concurrent request per subject.
    pub async fn schemas_individually(
        &self,
        show_soft_deleted: bool,
    ) -> RegistryResult<Vec<SchemaVersionedResponse>> {
        let subjects = self.subjects(show_soft_deleted).await?;

        let mut tasks = JoinSet::new();
        for subject in &subjects {
            let client = self.clone();
            let subject = subject.clone();
            tasks.spawn(async move {
                client
                    .schema_by_subject(&subject, SchemaVersion::Latest, show_soft_deleted)
                    .await
            });
        }

        let mut schemas = Vec::with_capacity(subjects.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(Ok(schema)) => {
                    schemas.push(schema);
                    continue;
                }
                Ok(Err(e)) => RegistryError::Partial(Box::new(e)),
                Err(e) => RegistryError::Join(e.to_string()),
            };
            tasks.shutdown().await;
            return Err(outcome);
        }
        Ok(schemas)
    }

    // ========================================================================
    // Subjects
    // ========================================================================

    /// `GET /subjects`.
    pub async fn subjects(&self, show_soft_deleted: bool) -> RegistryResult<Vec<String>> {
        let url = self.endpoint(&["subjects"], deleted_query(show_soft_deleted));
        self.fetch("get subjects", Method::GET, url).await
    }

    /// `GET /subjects/{subject}/versions`.
    pub async fn subject_versions(
        &self,
        subject: &str,
        show_soft_deleted: bool,
    ) -> RegistryResult<Vec<u32>> {
        let url = self.endpoint(
            &["subjects", subject, "versions"],
            deleted_query(show_soft_deleted),
        );
        self.fetch("get subject versions", Method::GET, url).await
    }

    /// `DELETE /subjects/{subject}?permanent={bool}`; returns the deleted versions.
    ///
    /// A permanent delete requires a prior soft delete.
    pub async fn delete_subject(&self, subject: &str, permanent: bool) -> RegistryResult<Vec<u32>> {
        let url = self.endpoint(&["subjects", subject], permanent_query(permanent));
        self.fetch("delete subject", Method::DELETE, url).await
    }

    /// `DELETE /subjects/{subject}/versions/{version}?permanent={bool}`; returns the deleted version.
    pub async fn delete_subject_version(
        &self,
        subject: &str,
        version: SchemaVersion,
        permanent: bool,
    ) -> RegistryResult<u32> {
        let version = version.to_string();
        let url = self.endpoint(
            &["subjects", subject, "versions", &version],
            permanent_query(permanent),
        );
        self.fetch("delete subject version", Method::DELETE, url).await
    }

    // ========================================================================
    // Mode and compatibility
    // ========================================================================

    /// `GET /mode`.
    pub async fn mode(&self) -> RegistryResult<ModeResponse> {
        let url = self.endpoint(&["mode"], &[]);
        self.fetch("get mode", Method::GET, url).await
    }

    /// `GET /config`: the global compatibility level.
    pub async fn config(&self) -> RegistryResult<ConfigResponse> {
        let url = self.endpoint(&["config"], &[]);
        self.fetch("get config", Method::GET, url).await
    }

    /// `GET /config/{subject}?defaultToGlobal=true`.
    ///
    /// A subject without its own compatibility level reports `DEFAULT`.
    pub async fn subject_config(&self, subject: &str) -> RegistryResult<ConfigResponse> {
        let url = self.endpoint(&["config", subject], &[("defaultToGlobal", "true")]);
        match self.fetch("get config for subject", Method::GET, url).await {
            Err(RegistryError::Rest { error_code, .. })
                if error_code == CODE_SUBJECT_NOT_FOUND
                    || error_code == CODE_SUBJECT_LEVEL_COMPATIBILITY_NOT_CONFIGURED =>
            {
                Ok(ConfigResponse {
                    compatibility: COMPATIBILITY_DEFAULT.to_string(),
                })
            }
            other => other,
        }
    }

    /// Check that the registry is reachable and accepts our credentials.
    pub async fn check_connectivity(&self) -> RegistryResult<()> {
        let url = self.endpoint(&["subjects"], &[]);
        let request = self.request(Method::GET, url);
        let (status, body) = self.execute("check connectivity", request).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(error_from_body("check connectivity", status, &body))
        }
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.inner.base_url.clone();
        // Checked at construction: the base url can carry path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.inner.http.request(method, url);
        match &self.inner.credentials {
            Credentials::None => request,
            Credentials::Basic { username, password } => {
                request.basic_auth(username, password.as_deref())
            }
            Credentials::Bearer(token) => request.bearer_auth(token),
        }
    }

    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> RegistryResult<(StatusCode, Vec<u8>)> {
        let response = request
            .send()
            .await
            .map_err(|source| RegistryError::Transport { operation, source })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| RegistryError::Transport { operation, source })?;
        debug!(operation, status = status.as_u16(), bytes = body.len(), "schema registry response");
        Ok((status, body.to_vec()))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
    ) -> RegistryResult<T> {
        debug!(operation, %url, "schema registry request");
        let request = self.request(method, url);
        let (status, body) = self.execute(operation, request).await?;
        decode_response(operation, status, &body)
    }
}

fn deleted_query(show_soft_deleted: bool) -> &'static [(&'static str, &'static str)] {
    if show_soft_deleted {
        &[("deleted", "true")]
    } else {
        &[]
    }
}

fn permanent_query(permanent: bool) -> &'static [(&'static str, &'static str)] {
    if permanent {
        &[("permanent", "true")]
    } else {
        &[("permanent", "false")]
    }
}

fn decode_response<T: DeserializeOwned>(
    operation: &'static str,
    status: StatusCode,
    body: &[u8],
) -> RegistryResult<T> {
    if !status.is_success() {
        return Err(error_from_body(operation, status, body));
    }
    serde_json::from_slice(body).map_err(|source| RegistryError::Decode { operation, source })
}

fn error_from_body(operation: &'static str, status: StatusCode, body: &[u8]) -> RegistryError {
    match serde_json::from_slice::<RestErrorBody>(body) {
        Ok(rest) => RegistryError::Rest {
            status: status.as_u16(),
            error_code: rest.error_code,
            message: rest.message,
        },
        Err(_) => RegistryError::Status {
            operation,
            status: status.as_u16(),
        },
    }
}
