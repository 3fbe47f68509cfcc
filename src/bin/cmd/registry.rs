// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Registry command - query the configured schema registry.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Subcommand;

use crate::common::{print_json, Result};
use topiccodec::schema::{Schema, SchemaRegistryClient, SchemaType, SchemaVersion};
use topiccodec::Config;

/// Schema registry operations.
#[derive(Subcommand, Clone, Debug)]
pub enum RegistryCmd {
    /// List subjects
    Subjects {
        /// Include soft-deleted subjects
        #[arg(long)]
        deleted: bool,
    },

    /// List the versions of a subject
    Versions {
        subject: String,
        #[arg(long)]
        deleted: bool,
    },

    /// Show a schema by id
    SchemaById { id: u32 },

    /// Show a schema by subject and version
    Schema {
        subject: String,
        /// Version number or `latest`
        #[arg(long, default_value = "latest")]
        version: SchemaVersion,
        #[arg(long)]
        deleted: bool,
    },

    /// List the latest schema of every subject
    Schemas {
        #[arg(long)]
        deleted: bool,
    },

    /// Register a schema under a subject
    Register {
        subject: String,
        /// File holding the schema text
        #[arg(value_name = "FILE")]
        schema_file: PathBuf,
        /// AVRO, PROTOBUF or JSON
        #[arg(long, default_value = "AVRO")]
        schema_type: SchemaType,
    },

    /// Delete a subject
    DeleteSubject {
        subject: String,
        #[arg(long)]
        permanent: bool,
    },

    /// Delete one version of a subject
    DeleteVersion {
        subject: String,
        version: SchemaVersion,
        #[arg(long)]
        permanent: bool,
    },

    /// Show the global or a subject's compatibility level
    Config { subject: Option<String> },

    /// Show the registry mode
    Mode,

    /// List supported schema types
    Types,

    /// Check that the registry is reachable
    Check,
}

impl RegistryCmd {
    pub async fn run(self, config: &Config) -> Result<()> {
        let client = SchemaRegistryClient::new(&config.schema_registry)
            .context("failed to create schema registry client")?;

        match self {
            RegistryCmd::Subjects { deleted } => print_json(&client.subjects(deleted).await?),
            RegistryCmd::Versions { subject, deleted } => {
                print_json(&client.subject_versions(&subject, deleted).await?)
            }
            RegistryCmd::SchemaById { id } => print_json(&client.schema_by_id(id).await?),
            RegistryCmd::Schema {
                subject,
                version,
                deleted,
            } => print_json(&client.schema_by_subject(&subject, version, deleted).await?),
            RegistryCmd::Schemas { deleted } => print_json(&client.schemas(deleted).await?),
            RegistryCmd::Register {
                subject,
                schema_file,
                schema_type,
            } => {
                let text = std::fs::read_to_string(&schema_file)
                    .with_context(|| format!("failed to read {}", schema_file.display()))?;
                let schema = Schema {
                    schema: text,
                    schema_type,
                    references: Vec::new(),
                };
                print_json(&client.create_schema(&subject, &schema).await?)
            }
            RegistryCmd::DeleteSubject { subject, permanent } => {
                print_json(&client.delete_subject(&subject, permanent).await?)
            }
            RegistryCmd::DeleteVersion {
                subject,
                version,
                permanent,
            } => print_json(
                &client
                    .delete_subject_version(&subject, version, permanent)
                    .await?,
            ),
            RegistryCmd::Config { subject: Some(subject) } => {
                print_json(&client.subject_config(&subject).await?)
            }
            RegistryCmd::Config { subject: None } => print_json(&client.config().await?),
            RegistryCmd::Mode => print_json(&client.mode().await?),
            RegistryCmd::Types => print_json(&client.schema_types().await?),
            RegistryCmd::Check => {
                client.check_connectivity().await?;
                println!("schema registry at {} is reachable", client.base_url());
                Ok(())
            }
        }
    }
}
