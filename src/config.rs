// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Configuration loaded from TOML.
//!
//! ```toml
//! [schema_registry]
//! enabled = true
//! urls = ["http://localhost:8081"]
//!
//! [msgpack]
//! enabled = true
//! topic_names = ["^metrics-"]
//!
//! [protobuf]
//! enabled = true
//! descriptor_set_filepath = "descriptors.bin"
//!
//! [[protobuf.mappings]]
//! topic_name = "orders"
//! value_proto_type = "shop.Order"
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::DEFAULT_TIMEOUT;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema registry connection
    pub schema_registry: SchemaRegistryConfig,
    /// MessagePack decoding
    pub msgpack: MsgPackConfig,
    /// Topic-mapped protobuf decoding
    pub protobuf: ProtobufConfig,
}

impl Config {
    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schema_registry.validate()?;
        self.msgpack.validate()?;
        self.protobuf.validate()
    }
}

/// Schema registry connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaRegistryConfig {
    /// Whether a registry is used at all
    pub enabled: bool,
    /// Registry URLs; only the first one is used
    pub urls: Vec<String>,
    /// Basic auth user name
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Bearer token, takes precedence over basic auth
    pub bearer_token: Option<String>,
    /// Request timeout in seconds; zero means the default
    pub timeout_secs: u64,
    /// TLS settings
    pub tls: TlsConfig,
}

impl Default for SchemaRegistryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            urls: Vec::new(),
            username: None,
            password: None,
            bearer_token: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            tls: TlsConfig::default(),
        }
    }
}

impl SchemaRegistryConfig {
    /// Validate the section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.urls.is_empty() {
            return Err(ConfigError::Invalid(
                "schema registry is enabled but no URL is configured".into(),
            ));
        }
        self.tls.validate()
    }
}

/// TLS settings for the registry client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    /// CA bundle to trust, in PEM format
    pub ca_filepath: Option<PathBuf>,
    /// Client certificate, in PEM format
    pub cert_filepath: Option<PathBuf>,
    /// Client key, in PEM format
    pub key_filepath: Option<PathBuf>,
    pub insecure_skip_tls_verify: bool,
}

impl TlsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.cert_filepath.is_some() != self.key_filepath.is_some() {
            return Err(ConfigError::Invalid(
                "TLS cert_filepath and key_filepath must be set together".into(),
            ));
        }
        Ok(())
    }
}

/// MessagePack decoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsgPackConfig {
    pub enabled: bool,
    /// Regular expressions selecting the topics MessagePack is attempted on
    pub topic_names: Vec<String>,
}

impl Default for MsgPackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            topic_names: vec![".*".to_string()],
        }
    }
}

impl MsgPackConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        for pattern in &self.topic_names {
            Regex::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("invalid msgpack topic pattern '{pattern}': {e}"))
            })?;
        }
        Ok(())
    }
}

/// Topic-mapped protobuf settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtobufConfig {
    pub enabled: bool,
    /// Serialized `FileDescriptorSet` containing every mapped type
    pub descriptor_set_filepath: Option<PathBuf>,
    /// Topic to message type mappings
    pub mappings: Vec<ProtobufTopicMapping>,
}

impl ProtobufConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.descriptor_set_filepath.is_none() {
            return Err(ConfigError::Invalid(
                "protobuf is enabled but no descriptor_set_filepath is configured".into(),
            ));
        }
        for (i, mapping) in self.mappings.iter().enumerate() {
            if mapping.topic_name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "protobuf mapping {i} has an empty topic_name"
                )));
            }
        }
        Ok(())
    }
}

/// Message types for the keys and values of one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtobufTopicMapping {
    pub topic_name: String,
    #[serde(default)]
    pub key_proto_type: Option<String>,
    #[serde(default)]
    pub value_proto_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_valid() {
        let config = Config::from_toml_str("").unwrap();
        assert!(!config.schema_registry.enabled);
        assert_eq!(config.schema_registry.timeout_secs, 5);
        assert_eq!(config.msgpack.topic_names, vec![".*".to_string()]);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [schema_registry]
            enabled = true
            urls = ["http://localhost:8081"]
            username = "user"
            password = "secret"
            timeout_secs = 2

            [schema_registry.tls]
            enabled = true
            ca_filepath = "/etc/ca.pem"

            [msgpack]
            enabled = true
            topic_names = ["^metrics-"]

            [protobuf]
            enabled = true
            descriptor_set_filepath = "descriptors.bin"

            [[protobuf.mappings]]
            topic_name = "orders"
            value_proto_type = "shop.Order"
            "#,
        )
        .unwrap();
        assert_eq!(config.schema_registry.urls, vec!["http://localhost:8081"]);
        assert_eq!(config.schema_registry.timeout_secs, 2);
        assert_eq!(
            config.schema_registry.tls.ca_filepath,
            Some(PathBuf::from("/etc/ca.pem"))
        );
        assert_eq!(config.protobuf.mappings[0].value_proto_type.as_deref(), Some("shop.Order"));
        assert!(config.protobuf.mappings[0].key_proto_type.is_none());
    }

    #[test]
    fn test_registry_requires_url() {
        let err = Config::from_toml_str("[schema_registry]\nenabled = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_tls_pair_must_be_complete() {
        let err = Config::from_toml_str(
            r#"
            [schema_registry]
            enabled = true
            urls = ["https://registry"]
            [schema_registry.tls]
            enabled = true
            cert_filepath = "client.pem"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be set together"));
    }

    #[test]
    fn test_bad_msgpack_pattern() {
        assert!(Config::from_toml_str("[msgpack]\nenabled = true\ntopic_names = [\"(\"]\n").is_err());
    }

    #[test]
    fn test_protobuf_requires_descriptor_set() {
        assert!(Config::from_toml_str("[protobuf]\nenabled = true\n").is_err());
    }
}
