//! Version labels and languages that address a page's rows

use crate::services::PageStoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label of a content generation (`latest`, `changes`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub const LATEST: &'static str = "latest";
    pub const CHANGES: &'static str = "changes";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The published generation; children are always listed from it
    pub fn latest() -> Self {
        Self::new(Self::LATEST)
    }

    /// Unsaved edits
    pub fn changes() -> Self {
        Self::new(Self::CHANGES)
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A configured content language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Language {
    code: String,
    default: bool,
}

impl Language {
    pub fn new(code: impl Into<String>, default: bool) -> Self {
        Self {
            code: code.into(),
            default,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_default(&self) -> bool {
        self.default
    }
}

/// The set of configured languages
///
/// Single-language sites are a `Languages` with only the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Languages {
    default: String,
    others: Vec<String>,
}

impl Languages {
    /// Build from the default code and any further codes
    ///
    /// Duplicates and repeats of the default are ignored.
    pub fn new(default: &str, codes: impl IntoIterator<Item = String>) -> Self {
        let mut others: Vec<String> = Vec::new();
        for code in codes {
            if code != default && !others.contains(&code) {
                others.push(code);
            }
        }
        Self {
            default: default.to_string(),
            others,
        }
    }

    /// Only the default language
    pub fn single(default: &str) -> Self {
        Self::new(default, Vec::new())
    }

    pub fn default(&self) -> Language {
        Language::new(self.default.clone(), true)
    }

    pub fn is_multilingual(&self) -> bool {
        !self.others.is_empty()
    }

    /// Every code, default first
    pub fn codes(&self) -> Vec<&str> {
        std::iter::once(self.default.as_str())
            .chain(self.others.iter().map(String::as_str))
            .collect()
    }

    /// Every language, default first
    pub fn all(&self) -> Vec<Language> {
        std::iter::once(self.default())
            .chain(self.others.iter().map(|code| Language::new(code.clone(), false)))
            .collect()
    }

    /// Resolve a language code
    ///
    /// `None`, `"default"` and `"current"` all resolve to the default
    /// language; there is no request context to carry a current language.
    pub fn ensure(&self, code: Option<&str>) -> Result<Language, PageStoreError> {
        match code {
            None | Some("default") | Some("current") => Ok(self.default()),
            Some(code) if code == self.default => Ok(self.default()),
            Some(code) if self.others.iter().any(|c| c == code) => {
                Ok(Language::new(code, false))
            }
            Some(code) => Err(PageStoreError::unknown_language(code)),
        }
    }
}
