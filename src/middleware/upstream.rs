//! Outbound middleware for identity-provider requests
//!
//! Implements `reqwest-middleware::Middleware` to log every upstream
//! round-trip. Requests leave untouched: the provider sees only the
//! forwarded `Authorization` header.

use std::time::Instant;

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result as MiddlewareResult};
use tracing::{debug, warn};

/// Middleware that logs requests sent to the identity provider
pub struct UpstreamMiddleware;

#[async_trait]
impl Middleware for UpstreamMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> MiddlewareResult<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        let started = Instant::now();

        let result = next.run(req, extensions).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => debug!(
                %method,
                %url,
                status = response.status().as_u16(),
                elapsed_ms,
                "Identity provider responded"
            ),
            Err(e) => warn!(%method, %url, elapsed_ms, "Identity provider request failed: {}", e),
        }

        result
    }
}
