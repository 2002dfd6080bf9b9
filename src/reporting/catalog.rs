//! Error catalog
//!
//! Maps symbolic error codes to the title, description and HTTP status that
//! are rendered for them. The catalog is read from a JSON file once at
//! startup and never changes afterwards.
//!
//! Reporting a code that is not registered here aborts the process (see
//! [`super::channel`]). To catch a code/catalog mismatch before serving,
//! startup calls [`ErrorCatalog::ensure_registered`] with [`codes::ALL`].

use std::collections::HashMap;
use std::path::Path;

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Symbolic codes reported by this crate
pub mod codes {
    pub const MISSING_AUTHORIZATION_HEADER: &str = "MISSING_AUTHORIZATION_HEADER";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const INVALID_REGISTER_UUID: &str = "INVALID_REGISTER_UUID";
    pub const INVALID_JSON: &str = "INVALID_JSON";
    pub const INVALID_TRANSACTION: &str = "INVALID_TRANSACTION";
    pub const INVALID_STATISTICS_WINDOW: &str = "INVALID_STATISTICS_WINDOW";

    /// Every code above; all of them must be present in the catalog
    pub const ALL: &[&str] = &[
        MISSING_AUTHORIZATION_HEADER,
        UNAUTHORIZED,
        FORBIDDEN,
        INVALID_REGISTER_UUID,
        INVALID_JSON,
        INVALID_TRANSACTION,
        INVALID_STATISTICS_WINDOW,
    ];
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("unable to read error catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse error catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("error code {code} has invalid http status {status}")]
    InvalidStatus { code: String, status: u16 },

    #[error("error code {0} is defined more than once")]
    Duplicate(String),

    #[error("error codes missing from catalog: {}", .0.join(", "))]
    Missing(Vec<String>),
}

/// One catalog definition as stored in the JSON file
#[derive(Debug, Deserialize)]
struct RawEntry {
    code: String,
    title: String,
    description: String,
    #[serde(rename = "httpCode")]
    http_code: u16,
}

/// Rendered text and status for one symbolic code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    pub description: String,
    pub status: StatusCode,
}

#[derive(Debug, Clone, Default)]
pub struct ErrorCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl ErrorCatalog {
    /// Load the catalog from a JSON file containing an array of definitions
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&contents)?;
        tracing::info!("Loaded {} predefined errors", catalog.len());
        Ok(catalog)
    }

    /// Parse the catalog from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawEntry> = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(raw.len());

        for entry in raw {
            let status = StatusCode::from_u16(entry.http_code).map_err(|_| {
                CatalogError::InvalidStatus {
                    code: entry.code.clone(),
                    status: entry.http_code,
                }
            })?;

            let previous = entries.insert(
                entry.code.clone(),
                CatalogEntry {
                    title: entry.title,
                    description: entry.description,
                    status,
                },
            );
            if previous.is_some() {
                return Err(CatalogError::Duplicate(entry.code));
            }
        }

        Ok(Self { entries })
    }

    pub fn lookup(&self, code: &str) -> Option<&CatalogEntry> {
        self.entries.get(code)
    }

    /// Fail if any of the given codes has no catalog entry
    pub fn ensure_registered(&self, codes: &[&str]) -> Result<(), CatalogError> {
        let missing: Vec<String> = codes
            .iter()
            .filter(|code| !self.entries.contains_key(**code))
            .map(|code| code.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Missing(missing))
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
