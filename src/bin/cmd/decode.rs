// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decode command - detect and decode a record's key and value.

use std::path::PathBuf;

use clap::Args;

use crate::common::{payload_to_json, print_json, read_payload, Result};
use topiccodec::{Config, DeserializationOptions, PayloadEncoding, Record, SerdeService};

/// Decode a record's key and value.
#[derive(Args, Clone, Debug)]
pub struct DecodeCmd {
    /// Topic the record was read from
    #[arg(short, long)]
    topic: String,

    /// Key bytes as hex
    #[arg(long, conflicts_with = "key_file")]
    key_hex: Option<String>,

    /// File holding the raw key bytes
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Value bytes as hex
    #[arg(long, conflicts_with = "value_file")]
    value_hex: Option<String>,

    /// File holding the raw value bytes
    #[arg(long)]
    value_file: Option<PathBuf>,

    /// Only try this encoding for the key
    #[arg(long)]
    key_encoding: Option<PayloadEncoding>,

    /// Only try this encoding for the value
    #[arg(long)]
    value_encoding: Option<PayloadEncoding>,

    /// Report why every attempted codec failed
    #[arg(long)]
    troubleshoot: bool,

    /// Include the raw bytes in the output
    #[arg(long)]
    raw: bool,

    /// Flag payloads larger than this many bytes
    #[arg(long, default_value_t = 0)]
    max_size: usize,
}

impl DecodeCmd {
    pub async fn run(self, config: &Config) -> Result<()> {
        let service = SerdeService::from_config(config)?;

        let mut record = Record::new(self.topic);
        record.key = read_payload(self.key_hex.as_deref(), self.key_file.as_ref())?;
        record.value = read_payload(self.value_hex.as_deref(), self.value_file.as_ref())?;

        let opts = DeserializationOptions {
            key_encoding: self.key_encoding,
            value_encoding: self.value_encoding,
            max_payload_size: self.max_size,
            troubleshoot: self.troubleshoot,
            include_raw_data: self.raw,
        };
        let decoded = service.deserialize_record(&record, &opts).await;

        print_json(&serde_json::json!({
            "key": payload_to_json(&decoded.key),
            "value": payload_to_json(&decoded.value),
        }))
    }
}
