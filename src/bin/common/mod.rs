// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use topiccodec::{Config, RecordPayload};

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Install the log subscriber; `RUST_LOG` overrides the default `warn` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the configuration file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Read a payload given either as hex text or as a file.
pub fn read_payload(hex_text: Option<&str>, file: Option<&PathBuf>) -> Result<Option<Vec<u8>>> {
    match (hex_text, file) {
        (Some(_), Some(_)) => Err(anyhow::anyhow!(
            "a payload can be given as hex or as a file, not both"
        )),
        (Some(text), None) => {
            let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            let cleaned = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
            Ok(Some(hex::decode(cleaned).context("invalid hex payload")?))
        }
        (None, Some(path)) => Ok(Some(
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
        )),
        (None, None) => Ok(None),
    }
}

/// Parse a comma-separated list of message indexes, e.g. `1,0`.
pub fn parse_indexes(s: &str) -> std::result::Result<Vec<usize>, String> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| format!("invalid message index '{part}': {e}"))
        })
        .collect()
}

/// Render a decode result for display.
pub fn payload_to_json(payload: &RecordPayload) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    out.insert(
        "encoding".into(),
        serde_json::json!(payload.encoding.map(|e| e.as_str())),
    );
    if let Some(id) = payload.schema_id {
        out.insert("schemaID".into(), id.into());
    }
    out.insert("payloadSizeBytes".into(), payload.payload_size_bytes.into());
    out.insert("isPayloadNull".into(), payload.is_payload_null.into());
    out.insert("isPayloadTooLarge".into(), payload.is_payload_too_large.into());
    if let Some(parsed) = &payload.parsed_payload {
        out.insert("payload".into(), parsed.to_json());
    }
    if let Some(original) = &payload.original_payload {
        out.insert("originalPayload".into(), hex::encode(original).into());
    }
    if let Some(reports) = &payload.troubleshooting {
        out.insert(
            "troubleshooting".into(),
            serde_json::to_value(reports).unwrap_or_default(),
        );
    }
    serde_json::Value::Object(out)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
