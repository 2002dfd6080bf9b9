use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use super::fetch;
use crate::reporting::ErrorReporter;
use crate::server::AppState;
use crate::types::RegisterItem;

/// `GET /registerItems`
pub async fn list_register_items(
    State(state): State<AppState>,
    Extension(errors): Extension<ErrorReporter>,
) -> Response {
    match fetch::<RegisterItem>(state.queries.as_ref(), "get-register-items", &[]).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors.internal(e).await.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::Request;
    use http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::routes::tests::app;
    use crate::test_support::{api_error_body, json_body, FakeExecutor};

    #[tokio::test]
    async fn test_lists_register_items() {
        let queries = Arc::new(FakeExecutor::default().with_rows(
            "get-register-items",
            json!([{
                "id": "6f1c1c6e-8c1f-4a43-9a53-0b5b3f0a8d11",
                "name": "Popcorn",
                "price": 2.5,
                "icon": "popcorn.svg"
            }]),
        ));

        let response = app(queries.clone())
            .oneshot(Request::builder().uri("/registerItems").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!([{
                "id": "6f1c1c6e-8c1f-4a43-9a53-0b5b3f0a8d11",
                "name": "Popcorn",
                "price": 2.5,
                "icon": "popcorn.svg"
            }])
        );
        assert_eq!(queries.calls()[0].0, "get-register-items");
    }

    #[tokio::test]
    async fn test_query_failure_is_internal() {
        let queries = Arc::new(FakeExecutor::default().failing("get-register-items"));

        let response = app(queries)
            .oneshot(Request::builder().uri("/registerItems").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error_body(response).await.code, "INTERNAL_ERROR");
    }
}
