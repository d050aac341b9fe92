//! Page table provisioning
//!
//! Page tables are created once by administrative tooling, never by the
//! runtime. Every table carries the fixed administrative columns plus one
//! `TEXT` column per custom field of the node kind stored in it.

use crate::db::{DatabaseError, DatabaseService};

/// Columns every page table carries, in creation order
pub const ADMINISTRATIVE_COLUMNS: [&str; 13] = [
    "id", "title", "slug", "uuid", "created", "modified", "version", "language", "parent",
    "template", "num", "lock", "draft",
];

/// Check that `name` can be used as a table or column name
///
/// Only ASCII letters, digits and underscores are allowed, and the first
/// character must not be a digit.
pub fn validate_identifier(name: &str) -> Result<(), DatabaseError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(DatabaseError::invalid_identifier(name))
    }
}

/// Quote an identifier for use in SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Split a comma separated field list, dropping blanks
pub fn split_fields(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the `CREATE TABLE` statement for a page table
pub fn create_table_sql(table: &str, fields: &[String]) -> Result<String, DatabaseError> {
    validate_identifier(table)?;

    let mut columns = vec![
        "\"id\" INTEGER UNIQUE NOT NULL PRIMARY KEY ASC AUTOINCREMENT".to_string(),
        "\"title\" TEXT".to_string(),
        "\"slug\" TEXT NOT NULL".to_string(),
        "\"uuid\" TEXT NOT NULL".to_string(),
        "\"created\" TEXT DEFAULT CURRENT_TIMESTAMP NOT NULL".to_string(),
        "\"modified\" TEXT DEFAULT CURRENT_TIMESTAMP NOT NULL".to_string(),
        "\"version\" TEXT NOT NULL".to_string(),
        "\"language\" TEXT NOT NULL".to_string(),
        "\"parent\" TEXT".to_string(),
        "\"template\" TEXT".to_string(),
        "\"num\" INTEGER DEFAULT NULL".to_string(),
        "\"lock\" TEXT".to_string(),
        "\"draft\" INTEGER DEFAULT 1 NOT NULL".to_string(),
    ];

    for field in fields {
        validate_identifier(field)?;
        if ADMINISTRATIVE_COLUMNS.contains(&field.as_str()) {
            return Err(DatabaseError::invalid_identifier(field.clone()));
        }
        columns.push(format!("{} TEXT", quote_identifier(field)));
    }

    Ok(format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_identifier(table),
        columns.join(",\n    ")
    ))
}

/// Build the unique index backing `(slug, parent, version, language)`
///
/// Top-level pages have a NULL `parent`, which SQLite treats as distinct in
/// unique indexes, so the index covers `IFNULL("parent", '')` instead.
pub fn create_unique_index_sql(table: &str) -> Result<String, DatabaseError> {
    validate_identifier(table)?;
    Ok(format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} (\"slug\", IFNULL(\"parent\", ''), \"version\", \"language\")",
        quote_identifier(&format!("idx_{}_location", table)),
        quote_identifier(table)
    ))
}

/// Create a page table and its location index
///
/// Fails if the table already exists.
pub async fn create_table(
    db: &DatabaseService,
    table: &str,
    fields: &[String],
) -> Result<(), DatabaseError> {
    let ddl = format!(
        "{};\n{};",
        create_table_sql(table, fields)?,
        create_unique_index_sql(table)?
    );

    db.execute_batch(&ddl).await?;

    tracing::info!(
        "Created page table '{}' with {} custom field(s)",
        table,
        fields.len()
    );

    Ok(())
}
