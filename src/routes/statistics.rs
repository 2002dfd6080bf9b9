use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;

use super::fetch;
use crate::reporting::{codes, ErrorReporter};
use crate::server::AppState;
use crate::types::{ArticleStatistic, StatisticsParams, StatisticsWindow};

/// `GET /statistics/items?from=<unix>&until=<unix>`
pub async fn item_statistics(
    State(state): State<AppState>,
    Extension(errors): Extension<ErrorReporter>,
    params: Result<Query<StatisticsParams>, QueryRejection>,
) -> Response {
    let window = match params {
        Ok(Query(params)) => StatisticsWindow::resolve(&params, Utc::now()),
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable statistics query string");
            None
        }
    };
    let Some(window) = window else {
        return errors
            .api(codes::INVALID_STATISTICS_WINDOW)
            .await
            .into_response();
    };

    match fetch::<ArticleStatistic>(
        state.queries.as_ref(),
        "get-article-statistics",
        &window.params(),
    )
    .await
    {
        Ok(statistics) => Json(statistics).into_response(),
        Err(e) => errors.internal(e).await.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::Request;
    use chrono::{TimeZone, Utc};
    use http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::QueryParam;
    use crate::routes::tests::app;
    use crate::test_support::{api_error_body, json_body, FakeExecutor};

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_statistics_for_explicit_window() {
        let queries = Arc::new(FakeExecutor::default().with_rows(
            "get-article-statistics",
            json!([{"name": "Cola", "count": 4}, {"name": "Popcorn", "count": 9}]),
        ));

        let response = app(queries.clone())
            .oneshot(get("/statistics/items?from=1600000000&until=1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!([{"name": "Cola", "count": 4}, {"name": "Popcorn", "count": 9}])
        );
        assert_eq!(
            queries.calls()[0].1,
            vec![
                QueryParam::Timestamp(Utc.timestamp_opt(1_600_000_000, 0).unwrap()),
                QueryParam::Timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            ]
        );
    }

    #[tokio::test]
    async fn test_statistics_default_window() {
        let queries = Arc::new(FakeExecutor::default());
        let before = Utc::now();

        let response = app(queries.clone()).oneshot(get("/statistics/items")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));

        let calls = queries.calls();
        let (QueryParam::Timestamp(from), QueryParam::Timestamp(until)) =
            (&calls[0].1[0], &calls[0].1[1])
        else {
            panic!("expected timestamps, got {:?}", calls[0].1);
        };
        assert_eq!(*until - *from, chrono::Duration::hours(24));
        assert!(*until >= before);
    }

    #[tokio::test]
    async fn test_statistics_invalid_window() {
        for uri in [
            "/statistics/items?from=yesterday",
            "/statistics/items?from=1&from=2",
            "/statistics/items?until=10&until=20",
        ] {
            let queries = Arc::new(FakeExecutor::default());

            let response = app(queries.clone()).oneshot(get(uri)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body = api_error_body(response).await;
            assert_eq!(body.code, "INVALID_STATISTICS_WINDOW", "{}", uri);
            assert_eq!(body.http_error, "Bad Request");
            assert!(queries.calls().is_empty());
        }
    }
}
