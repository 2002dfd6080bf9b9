//! Shared helpers for in-crate tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::db::{DataAccessError, QueryExecutor, QueryParam, Row};
use crate::reporting::{ApiError, ErrorCatalog};

/// The catalog shipped in `errors.json`
pub fn catalog() -> Arc<ErrorCatalog> {
    Arc::new(ErrorCatalog::from_json(include_str!("../errors.json")).unwrap())
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn api_error_body(response: Response) -> ApiError {
    serde_json::from_value(json_body(response).await).unwrap()
}

/// In-memory executor that records every call
#[derive(Default)]
pub struct FakeExecutor {
    rows: HashMap<String, Vec<Row>>,
    failing: Vec<String>,
    calls: Mutex<Vec<(String, Vec<QueryParam>)>>,
}

impl FakeExecutor {
    pub fn with_rows(mut self, name: &str, rows: Value) -> Self {
        let rows = match rows {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => row,
                    other => panic!("row must be an object, got {}", other),
                })
                .collect(),
            other => panic!("rows must be an array, got {}", other),
        };
        self.rows.insert(name.to_string(), rows);
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<QueryParam>)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &str, params: &[QueryParam]) -> Result<(), DataAccessError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), params.to_vec()));
        if self.failing.iter().any(|failing| failing == name) {
            return Err(DataAccessError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn query(&self, name: &str, params: &[QueryParam]) -> Result<Vec<Row>, DataAccessError> {
        self.record(name, params)?;
        Ok(self.rows.get(name).cloned().unwrap_or_default())
    }

    async fn execute(&self, name: &str, params: &[QueryParam]) -> Result<u64, DataAccessError> {
        self.record(name, params)?;
        Ok(1)
    }
}
