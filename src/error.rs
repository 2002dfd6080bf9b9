//! Error types for the register backend
//!
//! `BackendError` covers everything that can stop the service from starting.
//! Per-request failures never surface here; they travel through
//! [`crate::reporting`] instead.

use thiserror::Error;

use crate::config::DatabaseConfigError;
use crate::db::DataAccessError;
use crate::oidc::OidcConfigError;
use crate::reporting::CatalogError;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid database configuration: {0}")]
    Database(#[from] DatabaseConfigError),

    #[error("Invalid OIDC configuration: {0}")]
    Oidc(#[from] OidcConfigError),

    #[error("Error catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Data access error: {0}")]
    DataAccess(#[from] DataAccessError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;
