//! Page Table Creation
//!
//! Creates the table for one node kind in a configured database. The table
//! gets the administrative columns every page table carries plus one text
//! column per custom field, and a unique index on
//! `(slug, parent, version, language)`.
//!
//! # Usage
//!
//! ```bash
//! # Everything on the command line
//! table-create --config ./rowpages.json main articles --fields text,tags
//!
//! # Missing values are prompted for
//! ROWPAGES_CONFIG=./rowpages.json table-create
//! ```
//!
//! # Environment Variables
//!
//! - `ROWPAGES_CONFIG`: configuration file (same as `--config`)
//! - `RUST_LOG`: logging level (e.g., "info", "debug")

use anyhow::Context;
use clap::Parser;
use dialoguer::Input;
use rowpages_core::db::schema;
use rowpages_core::{ConnectionResolver, StoreConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "table-create", about = "Create a page table in a configured database")]
struct Cli {
    /// Configuration file with the `database.<name>` entries
    #[arg(long, env = "ROWPAGES_CONFIG")]
    config: Option<PathBuf>,

    /// Logical database name
    database: Option<String>,

    /// Table name
    name: Option<String>,

    /// Comma separated custom fields
    #[arg(long)]
    fields: Option<String>,
}

fn prompt(label: &str) -> anyhow::Result<String> {
    let value = Input::<String>::new().with_prompt(label).interact_text()?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => PathBuf::from(prompt("Configuration file")?),
    };
    let config = StoreConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let database = match cli.database {
        Some(database) => database,
        None => prompt("Enter a database name")?,
    };
    let name = match cli.name {
        Some(name) => name,
        None => prompt("Enter a table name")?,
    };
    let fields = match cli.fields {
        Some(fields) => fields,
        None => Input::<String>::new()
            .with_prompt("Enter custom fields (comma separated)")
            .allow_empty(true)
            .interact_text()?,
    };
    let fields = schema::split_fields(&fields);

    let resolver = ConnectionResolver::from_config(&config).await?;
    let handle = resolver.resolve(&database)?;

    tracing::debug!("Creating table {} in {}", name, handle.path().display());
    schema::create_table(&handle, &name, &fields)
        .await
        .with_context(|| format!("Failed to create table {}", name))?;

    println!("Table {} created in database {}", name, database);
    Ok(())
}
