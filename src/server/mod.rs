//! HTTP server
//!
//! Startup runs strictly in order and any failure stops the process before
//! the listener is bound: configuration file, database section, OIDC
//! endpoint, error catalog, named queries, database pool and schema.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower::ServiceBuilder;
use tracing::info;

use crate::config::{Config, Configuration};
use crate::db::{NamedQueries, PgExecutor, QueryExecutor};
use crate::error::{BackendError, Result};
use crate::middleware::access_log::log_access;
use crate::middleware::auth::authenticate;
use crate::middleware::error_channel::install_error_channel;
use crate::middleware::request_id::tag_request;
use crate::oidc::UserInfoClient;
use crate::reporting::{codes, ErrorCatalog};
use crate::routes;

/// Shared state handed to route handlers
#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<dyn QueryExecutor>,
}

impl AppState {
    pub fn new(queries: Arc<dyn QueryExecutor>) -> Self {
        Self { queries }
    }
}

/// Compose the route tree behind the request pipeline.
///
/// Layers run outermost first: request tagging, access log, error channel,
/// authentication.
pub fn build_router(
    state: AppState,
    catalog: Arc<ErrorCatalog>,
    userinfo: Arc<UserInfoClient>,
) -> Router {
    routes::router()
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(tag_request))
                .layer(from_fn(log_access))
                .layer(from_fn_with_state(catalog, install_error_channel))
                .layer(from_fn_with_state(userinfo, authenticate)),
        )
        .with_state(state)
}

/// Bind `listen` and serve until Ctrl+C
pub async fn serve(listen: SocketAddr, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| BackendError::Server(e.to_string()))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => tracing::error!("Unable to listen for shutdown signal: {}", e),
    }
}

/// Load everything the service needs, then serve
pub async fn run(config: Config) -> Result<()> {
    info!("Reading configuration from {}", config.config_path.display());
    let configuration = Configuration::load(&config.config_path)?;
    tracing::debug!(config = ?configuration, "Configuration loaded");

    let database = configuration.database.validate()?;

    info!("Resolving OIDC userinfo endpoint...");
    let endpoint = configuration.oidc.resolve().await?;
    info!("Using userinfo endpoint {}", endpoint);
    let userinfo = Arc::new(UserInfoClient::new(endpoint, &configuration.oidc)?);

    info!("Loading error catalog from {}", config.errors_path.display());
    let catalog = ErrorCatalog::load(&config.errors_path)?;
    catalog.ensure_registered(codes::ALL)?;
    info!("Loaded {} predefined errors", catalog.len());

    let queries = NamedQueries::load(&config.queries_path)?;
    let init = NamedQueries::load(&config.init_sql_path)?;

    let executor = PgExecutor::connect(&database, queries).await?;
    executor.bootstrap(&init).await?;
    info!("Connected to postgres");

    let router = build_router(
        AppState::new(Arc::new(executor.clone())),
        Arc::new(catalog),
        userinfo,
    );

    let served = serve(config.listen, router).await;
    executor.close().await;
    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::QueryParam;
    use crate::middleware::request_id::REQUEST_ID_HEADER;
    use crate::oidc::{OidcConfiguration, UserInfoEndpoint};
    use crate::test_support::{api_error_body, catalog, json_body, FakeExecutor};
    use axum::body::Body;
    use axum::extract::Request;
    use http::StatusCode;
    use mockito::{Matcher, ServerGuard};
    use serde_json::json;
    use tower::ServiceExt;

    fn app(server: &ServerGuard, queries: Arc<FakeExecutor>) -> Router {
        let endpoint = UserInfoEndpoint::insecure(&format!("{}/userinfo", server.url()));
        let userinfo =
            Arc::new(UserInfoClient::new(endpoint, &OidcConfiguration::default()).unwrap());
        build_router(AppState::new(queries), catalog(), userinfo)
    }

    #[tokio::test]
    async fn test_authenticated_request_reaches_handler() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/userinfo")
            .match_header("authorization", "Bearer token")
            .with_status(200)
            .with_body(r#"{"preferred_username": "alice", "email": "alice@example.com"}"#)
            .create_async()
            .await;
        let queries = Arc::new(
            FakeExecutor::default().with_rows("get-article-statistics", json!([{"name": "Cola", "count": 1}])),
        );

        let response = app(&server, queries.clone())
            .oneshot(
                Request::builder()
                    .uri("/statistics/items?from=0&until=10")
                    .header("authorization", "Bearer token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(json_body(response).await, json!([{"name": "Cola", "count": 1}]));
        assert_eq!(queries.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_forbidden_caller_never_reaches_handler() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/userinfo")
            .with_status(403)
            .create_async()
            .await;
        let queries = Arc::new(FakeExecutor::default());

        let response = app(&server, queries.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/registers/0b0c6f3e-55e1-4f8a-a3a2-6b8f3f5b7d20/transactions")
                    .header("authorization", "Bearer revoked")
                    .body(Body::from(r#"{"title": "x", "total": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = api_error_body(response).await;
        assert_eq!(body.code, "FORBIDDEN");
        assert_eq!(body.http_code, 403);
        assert_eq!(body.http_error, "Forbidden");
        assert!(queries.calls().is_empty());
    }

    #[tokio::test]
    async fn test_identity_provider_sees_no_extra_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/userinfo")
            .match_header("authorization", "Bearer abc")
            .match_header(REQUEST_ID_HEADER, Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"preferred_username": "alice"}"#)
            .expect(2)
            .create_async()
            .await;

        for incoming_id in [None, Some("req-42")] {
            let mut request = Request::builder()
                .uri("/registerItems")
                .header("authorization", "Bearer abc");
            if let Some(id) = incoming_id {
                request = request.header(REQUEST_ID_HEADER, id);
            }

            let response = app(&server, Arc::new(FakeExecutor::default()))
                .oneshot(request.body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let echoed = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
            match incoming_id {
                Some(id) => assert_eq!(echoed, id),
                None => assert!(!echoed.is_empty()),
            }
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_responses_carry_request_id() {
        let server = mockito::Server::new_async().await;

        let response = app(&server, Arc::new(FakeExecutor::default()))
            .oneshot(Request::builder().uri("/registers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(
            api_error_body(response).await.code,
            "MISSING_AUTHORIZATION_HEADER"
        );
    }

    #[tokio::test]
    async fn test_transaction_is_booked_for_provider_username() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(r#"{"preferred_username": "bob"}"#)
            .create_async()
            .await;
        let queries = Arc::new(FakeExecutor::default());

        let response = app(&server, queries.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/registers/0b0c6f3e-55e1-4f8a-a3a2-6b8f3f5b7d20/transactions")
                    .header("authorization", "Bearer token")
                    .body(Body::from(r#"{"title": "Matinee", "total": 4}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let calls = queries.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1[3], QueryParam::Text("bob".to_string()));
    }
}
