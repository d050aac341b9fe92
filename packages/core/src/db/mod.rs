//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Opening databases and handing out busy-timeout connections
//! - Resolving logical database names to handles
//! - Provisioning page tables (administrative)
//! - Converting between JSON field values and column values

mod connection;
mod database;
mod error;
pub mod schema;
pub mod value;

pub use connection::ConnectionResolver;
pub use database::{DatabaseService, DEFAULT_BUSY_TIMEOUT};
pub use error::DatabaseError;
pub use value::Fields;
