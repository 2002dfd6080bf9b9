//! Error channel installation
//!
//! Opens the per-request [`ErrorChannel`], hands its reporter to the rest of
//! the chain through the request extensions, and decides which single
//! response leaves the pipeline: the rendered error if anything was reported,
//! otherwise whatever the inner chain produced.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::reporting::{ErrorCatalog, ErrorChannel};

pub async fn install_error_channel(
    State(catalog): State<Arc<ErrorCatalog>>,
    mut req: Request,
    next: Next,
) -> Response {
    let channel = ErrorChannel::open(catalog);
    req.extensions_mut().insert(channel.reporter());

    let response = next.run(req).await;

    match channel.finish().await {
        Some(rendered) => rendered,
        None => response,
    }
}
