// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Encode command - serialize a key and value with named encodings.

use clap::Args;

use crate::common::{parse_indexes, print_json, Result};
use topiccodec::encoding::{SerializeOption, UintSize};
use topiccodec::{
    Config, PayloadEncoding, RecordPayloadSerializeResult, SerdeService, SerializeInput,
    SerializePayloadInput,
};

/// Encode a record's key and value.
#[derive(Args, Clone, Debug)]
pub struct EncodeCmd {
    /// Topic the record will be produced to
    #[arg(short, long, default_value = "")]
    topic: String,

    /// Encoding for the key
    #[arg(long, default_value = "none")]
    key_encoding: PayloadEncoding,

    /// Key as text or JSON
    #[arg(long, default_value = "")]
    key: String,

    /// Encoding for the value
    #[arg(long)]
    value_encoding: PayloadEncoding,

    /// Value as text or JSON
    #[arg(long)]
    value: String,

    /// Schema registry id for the key
    #[arg(long)]
    key_schema_id: Option<u32>,

    /// Schema registry id for the value
    #[arg(long)]
    value_schema_id: Option<u32>,

    /// Protobuf message indexes for the value, e.g. `1,0`
    #[arg(long)]
    value_index: Option<String>,

    /// Byte width for uint keys (1, 2, 4 or 8)
    #[arg(long, value_parser = parse_uint_size)]
    key_uint_size: Option<UintSize>,
}

fn parse_uint_size(s: &str) -> std::result::Result<UintSize, String> {
    s.parse::<usize>()
        .ok()
        .and_then(UintSize::from_byte_len)
        .ok_or_else(|| format!("invalid uint size '{s}', expected 1, 2, 4 or 8"))
}

impl EncodeCmd {
    pub async fn run(self, config: &Config) -> Result<()> {
        let service = SerdeService::from_config(config)?;

        let mut key = SerializePayloadInput::new(self.key_encoding, self.key);
        if let Some(id) = self.key_schema_id {
            key = key.with_option(SerializeOption::SchemaId(id));
        }
        if let Some(size) = self.key_uint_size {
            key = key.with_option(SerializeOption::UintSize(size));
        }

        let mut value = SerializePayloadInput::new(self.value_encoding, self.value);
        if let Some(id) = self.value_schema_id {
            value = value.with_option(SerializeOption::SchemaId(id));
        }
        if let Some(index) = self.value_index.as_deref() {
            let index = parse_indexes(index).map_err(anyhow::Error::msg)?;
            value = value.with_option(SerializeOption::Index(index));
        }

        let input = SerializeInput {
            topic: self.topic,
            key,
            value,
        };
        match service.serialize_record(&input).await {
            Ok(output) => print_json(&serde_json::json!({
                "key": result_to_json(&output.key),
                "value": result_to_json(&output.value),
            })),
            Err(e) => {
                print_json(&serde_json::json!({
                    "key": result_to_json(&e.output.key),
                    "value": result_to_json(&e.output.value),
                }))?;
                Err(e.into())
            }
        }
    }
}

fn result_to_json(result: &RecordPayloadSerializeResult) -> serde_json::Value {
    serde_json::json!({
        "encoding": result.encoding.map(|e| e.as_str()),
        "payload": hex::encode(&result.payload),
        "troubleshooting": result.troubleshooting,
    })
}
