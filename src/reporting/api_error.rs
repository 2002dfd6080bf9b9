//! JSON error response body

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use super::catalog::CatalogEntry;

const INTERNAL_ERROR_CODE: &str = "INTERNAL_ERROR";
const INTERNAL_ERROR_TITLE: &str = "Internal Error";

/// Body written for every reported error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "httpCode")]
    pub http_code: u16,
    #[serde(rename = "httpError")]
    pub http_error: String,
}

impl ApiError {
    /// Build the body for a registered catalog code
    pub fn from_entry(code: &str, entry: &CatalogEntry) -> Self {
        Self::new(code, &entry.title, &entry.description, entry.status)
    }

    /// Wrap an internal failure; the cause's message becomes the description
    pub fn internal(cause: &anyhow::Error) -> Self {
        Self::new(
            INTERNAL_ERROR_CODE,
            INTERNAL_ERROR_TITLE,
            &cause.to_string(),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    }

    fn new(code: &str, title: &str, description: &str, status: StatusCode) -> Self {
        Self {
            code: code.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            http_code: status.as_u16(),
            http_error: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.http_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
