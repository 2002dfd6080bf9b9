//! Route tree
//!
//! Every handler runs behind the authentication chain, so it can rely on an
//! [`Identity`](crate::oidc::Identity) and an
//! [`ErrorReporter`](crate::reporting::ErrorReporter) in the request
//! extensions. Handlers hand failures to the reporter and return its marker
//! instead of writing an error response themselves.

pub mod register_items;
pub mod registers;
pub mod statistics;

use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;

use crate::db::{decode_rows, DataAccessError, QueryExecutor, QueryParam};
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/registers", get(registers::list_registers))
        .route(
            "/registers/{registerId}/transactions",
            post(registers::create_transaction),
        )
        .route("/registerItems", get(register_items::list_register_items))
        .route("/statistics/items", get(statistics::item_statistics))
}

/// Run a named query and decode its rows
async fn fetch<T: DeserializeOwned>(
    queries: &dyn QueryExecutor,
    name: &str,
    params: &[QueryParam],
) -> Result<Vec<T>, DataAccessError> {
    decode_rows(queries.query(name, params).await?)
}
