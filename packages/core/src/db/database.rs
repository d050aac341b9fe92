//! Database Connection Management
//!
//! This module provides the database handle used by every page table:
//! opening (or creating) a libsql database file, configuring it, and running
//! the handful of parameterized statements the storage adapter needs.
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** It configures a
//! busy timeout so concurrent writers wait instead of failing immediately with
//! `SQLITE_BUSY`. Every statement helper on [`DatabaseService`] goes through it.
//!
//! A handle is cheap to clone; all clones share the same underlying database.

use crate::db::error::DatabaseError;
use crate::db::value::{from_sql, Fields};
use libsql::params::Params;
use libsql::{Builder, Database};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default busy timeout applied to every connection
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Query-capable handle to one libsql database
///
/// # Examples
///
/// ```no_run
/// use rowpages_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("./data/content.db")).await?;
///     let rows = db.query("SELECT 1 AS one", Vec::new()).await?;
///     assert_eq!(rows.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DatabaseService {
    /// libsql database (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    busy_timeout: Duration,
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("db_path", &self.db_path)
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

impl DatabaseService {
    /// Open (or create) the database at `db_path` with the default busy timeout
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Switch the journal to WAL mode
    ///
    /// Tables are NOT created here; page tables are provisioned by the
    /// administrative tooling (see [`crate::db::schema`]).
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Open (or create) the database with an explicit busy timeout
    pub async fn with_busy_timeout(
        db_path: PathBuf,
        busy_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            busy_timeout,
        };

        let conn = service.connect()?;
        service
            .execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        tracing::debug!("Opened database at {}", service.db_path.display());

        Ok(service)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// Only for single-threaded contexts where the connection is not held
    /// across `.await` points. Prefer `connect_with_timeout()`.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with the busy timeout configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;
        let pragma = format!("PRAGMA busy_timeout = {}", self.busy_timeout.as_millis());
        self.execute_pragma(&conn, &pragma).await?;
        Ok(conn)
    }

    /// Run a statement that does not return rows
    ///
    /// # Returns
    ///
    /// Number of rows affected (0 is not an error)
    pub async fn execute(
        &self,
        sql: &str,
        params: Vec<libsql::Value>,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(sql, Params::Positional(params))
            .await
            .map_err(|e| DatabaseError::statement("Failed to execute statement", e))
    }

    /// Run an INSERT and return the new row id
    pub async fn insert(
        &self,
        sql: &str,
        params: Vec<libsql::Value>,
    ) -> Result<i64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(sql, Params::Positional(params))
            .await
            .map_err(|e| DatabaseError::statement("Failed to insert row", e))?;

        Ok(conn.last_insert_rowid())
    }

    /// Run a query and collect every row into a column-keyed field map
    ///
    /// Empty results are NOT an error.
    pub async fn query(
        &self,
        sql: &str,
        params: Vec<libsql::Value>,
    ) -> Result<Vec<Fields>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(sql, Params::Positional(params))
            .await
            .map_err(|e| DatabaseError::statement("Failed to execute query", e))?;

        let mut result = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let mut fields = Fields::new();
            for idx in 0..row.column_count() {
                let name = row.column_name(idx).unwrap_or_default().to_string();
                let value = row.get_value(idx).map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to read column '{}': {}", name, e))
                })?;
                fields.insert(name, from_sql(value));
            }
            result.push(fields);
        }

        Ok(result)
    }

    /// Run several statements separated by semicolons (DDL)
    pub async fn execute_batch(&self, sql: &str) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute_batch(sql)
            .await
            .map_err(|e| DatabaseError::statement("Failed to execute batch", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db_service = DatabaseService::new(db_path.clone()).await.unwrap();

        assert_eq!(db_service.path(), db_path.as_path());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_parent_directory_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("dirs").join("test.db");

        let _db_service = DatabaseService::new(nested_path.clone()).await.unwrap();

        assert!(nested_path.exists());
    }

    #[tokio::test]
    async fn test_wal_mode_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let db_service = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();

        let rows = db_service.query("PRAGMA journal_mode", Vec::new()).await.unwrap();
        let mode = rows[0]
            .values()
            .next()
            .and_then(|v| v.as_str())
            .unwrap()
            .to_lowercase();
        assert_eq!(mode, "wal");
    }

    #[tokio::test]
    async fn test_insert_and_query_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();

        db.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, n INTEGER)")
            .await
            .unwrap();

        let first = db
            .insert(
                "INSERT INTO t (name, n) VALUES (?, ?)",
                vec![libsql::Value::Text("a".into()), libsql::Value::Null],
            )
            .await
            .unwrap();
        let second = db
            .insert(
                "INSERT INTO t (name, n) VALUES (?, ?)",
                vec![libsql::Value::Text("b".into()), libsql::Value::Integer(2)],
            )
            .await
            .unwrap();
        assert!(second > first);

        let rows = db
            .query("SELECT id, name, n FROM t ORDER BY id", Vec::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("a"));
        assert_eq!(rows[0]["n"], serde_json::Value::Null);
        assert_eq!(rows[1]["n"], json!(2));
    }

    #[tokio::test]
    async fn test_constraint_failure_is_classified() {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();

        db.execute_batch("CREATE TABLE t (name TEXT NOT NULL)")
            .await
            .unwrap();

        let err = db
            .execute("INSERT INTO t (name) VALUES (?)", vec![libsql::Value::Null])
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_update_without_match_affects_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();

        db.execute_batch("CREATE TABLE t (name TEXT)").await.unwrap();
        let affected = db
            .execute(
                "UPDATE t SET name = ? WHERE name = ?",
                vec![libsql::Value::Text("x".into()), libsql::Value::Text("y".into())],
            )
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }
}
