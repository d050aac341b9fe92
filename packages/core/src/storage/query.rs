//! Equality-filtered row queries against one page table
//!
//! This is deliberately not a query builder: a query is a table plus a list
//! of `column = value` filters (`IS NULL` for null values), and the only
//! ordering available is the fixed sibling order.

use crate::db::schema::quote_identifier;
use crate::db::value::to_sql;
use crate::db::{DatabaseService, Fields};
use crate::services::PageStoreError;
use serde_json::Value;

/// `num` ascending with NULLs last, then `title` ascending
pub const SIBLING_ORDER: &str = "\"num\" IS NULL, \"num\" ASC, \"title\" ASC";

/// Rows of one table matching a set of equality filters
#[derive(Debug, Clone)]
pub struct TableQuery {
    db: DatabaseService,
    table: String,
    filters: Vec<(String, Value)>,
    sibling_order: bool,
}

impl TableQuery {
    pub fn new(db: DatabaseService, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            filters: Vec::new(),
            sibling_order: false,
        }
    }

    /// Add a `column = value` filter; a later filter on the same column wins
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        self.filters.retain(|(c, _)| *c != column);
        self.filters.push((column, value.into()));
        self
    }

    /// Return rows in sibling order
    pub fn in_sibling_order(mut self) -> Self {
        self.sibling_order = true;
        self
    }

    fn where_clause(&self) -> (String, Vec<libsql::Value>) {
        if self.filters.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut conditions = Vec::with_capacity(self.filters.len());
        let mut params = Vec::new();
        for (column, value) in &self.filters {
            if value.is_null() {
                conditions.push(format!("{} IS NULL", quote_identifier(column)));
            } else {
                conditions.push(format!("{} = ?", quote_identifier(column)));
                params.push(to_sql(value));
            }
        }

        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }

    /// Every matching row
    pub async fn all(&self) -> Result<Vec<Fields>, PageStoreError> {
        let (clause, params) = self.where_clause();
        let mut sql = format!("SELECT * FROM {}{}", quote_identifier(&self.table), clause);
        if self.sibling_order {
            sql.push_str(" ORDER BY ");
            sql.push_str(SIBLING_ORDER);
        }
        Ok(self.db.query(&sql, params).await?)
    }

    /// The first matching row, if any
    pub async fn first(&self) -> Result<Option<Fields>, PageStoreError> {
        let (clause, params) = self.where_clause();
        let sql = format!(
            "SELECT * FROM {}{} LIMIT 1",
            quote_identifier(&self.table),
            clause
        );
        Ok(self.db.query(&sql, params).await?.into_iter().next())
    }

    /// Update every matching row; returns the number of rows changed
    pub async fn update(&self, fields: &Fields) -> Result<u64, PageStoreError> {
        if fields.is_empty() {
            return Ok(0);
        }

        let mut assignments = Vec::with_capacity(fields.len());
        let mut params = Vec::with_capacity(fields.len() + self.filters.len());
        for (column, value) in fields {
            assignments.push(format!("{} = ?", quote_identifier(column)));
            params.push(to_sql(value));
        }

        let (clause, filter_params) = self.where_clause();
        params.extend(filter_params);

        let sql = format!(
            "UPDATE {} SET {}{}",
            quote_identifier(&self.table),
            assignments.join(", "),
            clause
        );
        Ok(self.db.execute(&sql, params).await?)
    }

    /// Delete every matching row; returns the number of rows removed
    pub async fn delete(&self) -> Result<u64, PageStoreError> {
        let (clause, params) = self.where_clause();
        let sql = format!("DELETE FROM {}{}", quote_identifier(&self.table), clause);
        Ok(self.db.execute(&sql, params).await?)
    }

    /// Insert one row into the table (filters are ignored)
    pub async fn insert(&self, fields: &Fields) -> Result<i64, PageStoreError> {
        let columns: Vec<String> = fields.keys().map(|c| quote_identifier(c)).collect();
        let placeholders = vec!["?"; fields.len()].join(", ");
        let params = fields.values().map(to_sql).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table),
            columns.join(", "),
            placeholders
        );
        Ok(self.db.insert(&sql, params).await?)
    }
}
