//! Authentication middleware
//!
//! Validates the caller's `Authorization` header against the identity
//! provider's userinfo endpoint and attaches the resulting [`Identity`] to the
//! request. Requests that fail validation never reach a route handler; the
//! failure is reported through the request's error channel instead.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};

use crate::oidc::{UserInfoClient, UserInfoError};
use crate::reporting::{codes, ErrorReport, ErrorReporter};

pub async fn authenticate(
    State(userinfo): State<Arc<UserInfoClient>>,
    Extension(errors): Extension<ErrorReporter>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(authorization) = authorization_header(req.headers()) else {
        return errors
            .api(codes::MISSING_AUTHORIZATION_HEADER)
            .await
            .into_response();
    };

    match userinfo.fetch_identity(&authorization).await {
        Ok(identity) => {
            tracing::debug!(user = %identity.username, "Request authenticated");
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => errors.report(report_for(e)).await.into_response(),
    }
}

/// The trimmed `Authorization` value, or `None` when it is absent or blank
fn authorization_header(headers: &HeaderMap) -> Option<HeaderValue> {
    let trimmed = headers.get(AUTHORIZATION)?.as_bytes().trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    HeaderValue::from_bytes(trimmed).ok()
}

fn report_for(error: UserInfoError) -> ErrorReport {
    match error {
        UserInfoError::Unauthorized => ErrorReport::Api(codes::UNAUTHORIZED.to_string()),
        UserInfoError::Forbidden => ErrorReport::Api(codes::FORBIDDEN.to_string()),
        other => ErrorReport::Internal(other.into()),
    }
}
