//! Rowpages Core
//!
//! Relational row storage for a tree of versioned, multi-language pages.
//! Every page kind lives in its own table; each (page, version, language)
//! is one row.
//!
//! # Modules
//!
//! - [`config`] - store configuration (databases, languages, file roots)
//! - [`db`] - libsql handles, the connection resolver and table provisioning
//! - [`models`] - nodes, node kind descriptors, versions and languages
//! - [`storage`] - the storage adapter and the row field codec
//! - [`services`] - the page tree, caches and children loading
//! - [`operations`] - lifecycle operations (slug, num, status, delete)

pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;
pub mod storage;

// Re-export commonly used types
pub use config::{DatabaseConfig, StoreConfig};
pub use db::{ConnectionResolver, DatabaseService};
pub use models::*;
pub use services::{PageStoreError, PageTree};
pub use storage::{DatabaseStorage, Storage};
