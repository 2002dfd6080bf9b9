//! Access logging
//!
//! Runs every request inside a `request` span carrying its id, and emits one
//! event per completed request.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, Instrument};

use super::request_id::RequestContext;

pub async fn log_access(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let (request_id, remote_addr) = match req.extensions().get::<RequestContext>() {
        Some(ctx) => (
            ctx.request_id.to_string(),
            ctx.remote_addr.map(|ip| ip.to_string()),
        ),
        None => (String::new(), None),
    };

    let span = info_span!("request", request_id = %request_id);
    let response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            %method,
            path = %path,
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            remote_addr = remote_addr.as_deref().unwrap_or("-"),
            "Request completed"
        );
    });

    response
}
