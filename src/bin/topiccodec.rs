// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # topiccodec CLI
//!
//! Decode and encode record payloads and query a schema registry.
//!
//! ## Usage
//!
//! ```sh
//! # Detect the encoding of a value
//! topiccodec decode --topic orders --value-hex 7b226964223a317d
//!
//! # Decode a registry-framed Avro value
//! topiccodec --config topiccodec.toml decode --topic users --value-file value.bin --troubleshoot
//!
//! # Encode a value with a registered schema
//! topiccodec --config topiccodec.toml encode --topic users \
//!     --value-encoding avro --value-schema-id 7 --value '{"name":"John","age":30}'
//!
//! # List registry subjects
//! topiccodec --config topiccodec.toml registry subjects
//! ```

mod cmd;
mod common;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use cmd::{DecodeCmd, EncodeCmd, RegistryCmd};
use common::Result;

/// topiccodec - record payload toolkit
///
/// Detects JSON, Avro, Protobuf, MessagePack, Smile, XML and text payloads
/// and resolves schemas from a schema registry.
#[derive(Parser, Clone)]
#[command(name = "topiccodec")]
#[command(about = "Decode and encode record payloads", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Detect and decode a record's key and value
    Decode(DecodeCmd),

    /// Encode a key and value with named encodings
    Encode(EncodeCmd),

    /// Schema registry operations
    #[command(subcommand)]
    Registry(RegistryCmd),
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    common::init_tracing();
    let config = common::load_config(cli.config.as_deref())?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match cli.command {
            Commands::Decode(cmd) => cmd.run(&config).await,
            Commands::Encode(cmd) => cmd.run(&config).await,
            Commands::Registry(cmd) => cmd.run(&config).await,
        }
    })
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
