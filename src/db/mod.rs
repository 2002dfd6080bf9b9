//! Data access
//!
//! Route handlers only see the [`QueryExecutor`] contract: a named statement
//! plus positional parameters in, JSON rows or an affected-row count out.

pub mod postgres;
pub mod queries;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use postgres::PgExecutor;
pub use queries::NamedQueries;

/// One result row, keyed by column name
pub type Row = Map<String, Value>;

#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("unknown query '{0}'")]
    UnknownQuery(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unable to decode row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unable to read query file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid query file: {0}")]
    InvalidQueryFile(String),
}

/// Positional statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Text(String),
    OptionalText(Option<String>),
    Float(f64),
    Integer(i64),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a row-returning statement
    async fn query(&self, name: &str, params: &[QueryParam]) -> Result<Vec<Row>, DataAccessError>;

    /// Run a statement and return the number of affected rows
    async fn execute(&self, name: &str, params: &[QueryParam]) -> Result<u64, DataAccessError>;
}

/// Decode JSON rows into typed records
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, DataAccessError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(DataAccessError::from))
        .collect()
}
