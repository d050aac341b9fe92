//! Store configuration
//!
//! Databases are configured under the `database` key, one entry per logical
//! name, so the handle for `main` lives at `database.main`:
//!
//! ```json
//! {
//!   "database": { "main": { "path": "./content.db" } },
//!   "default_language": "en",
//!   "languages": ["en", "de"],
//!   "media_root": "./media",
//!   "content_root": "./content"
//! }
//! ```

use crate::models::Languages;
use crate::services::PageStoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_language() -> String {
    "en".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// One configured database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file location
    pub path: PathBuf,

    /// How long a connection waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Top-level configuration for a page store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Logical database name → database
    #[serde(default)]
    pub database: BTreeMap<String, DatabaseConfig>,

    #[serde(default = "default_language")]
    pub default_language: String,

    /// Every configured language code; the default is added if missing
    #[serde(default)]
    pub languages: Vec<String>,

    /// Root of derived media (thumbnails etc.)
    #[serde(default)]
    pub media_root: Option<PathBuf>,

    /// Root of page attachments, one directory per page uuid
    #[serde(default)]
    pub content_root: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: BTreeMap::new(),
            default_language: default_language(),
            languages: Vec::new(),
            media_root: None,
            content_root: None,
        }
    }
}

impl StoreConfig {
    /// Parse a JSON configuration
    pub fn from_json_str(input: &str) -> Result<Self, PageStoreError> {
        serde_json::from_str(input)
            .map_err(|e| PageStoreError::configuration(format!("Invalid configuration: {}", e)))
    }

    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, PageStoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PageStoreError::configuration(format!(
                "Unable to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// Register a database under a logical name
    pub fn with_database(mut self, name: impl Into<String>, config: DatabaseConfig) -> Self {
        self.database.insert(name.into(), config);
        self
    }

    /// Look up an option by its dotted key
    ///
    /// Only `database.<name>` keys are defined.
    pub fn option(&self, key: &str) -> Option<&DatabaseConfig> {
        key.strip_prefix("database.")
            .and_then(|name| self.database.get(name))
    }

    /// Configured languages with the default first
    pub fn languages(&self) -> Languages {
        Languages::new(&self.default_language, self.languages.iter().cloned())
    }
}
