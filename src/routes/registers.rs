use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use http::StatusCode;
use serde_json::error::Category;
use uuid::Uuid;

use super::fetch;
use crate::db::QueryParam;
use crate::oidc::Identity;
use crate::reporting::{codes, ErrorReporter};
use crate::server::AppState;
use crate::types::{Register, RegisterTransaction, Transaction};

/// `GET /registers`
pub async fn list_registers(
    State(state): State<AppState>,
    Extension(errors): Extension<ErrorReporter>,
) -> Response {
    match fetch::<Register>(state.queries.as_ref(), "get-registers", &[]).await {
        Ok(registers) => Json(registers).into_response(),
        Err(e) => errors.internal(e).await.into_response(),
    }
}

/// `POST /registers/{registerId}/transactions`
///
/// Books the transaction for the authenticated user, then records one
/// article sale per submitted article.
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(errors): Extension<ErrorReporter>,
    Extension(identity): Extension<Identity>,
    Path(register_id): Path<String>,
    body: Bytes,
) -> Response {
    let Ok(register) = Uuid::parse_str(&register_id) else {
        return errors
            .api(codes::INVALID_REGISTER_UUID)
            .await
            .into_response();
    };

    let submitted: RegisterTransaction = match serde_json::from_slice(&body) {
        Ok(submitted) => submitted,
        Err(e) => {
            return match e.classify() {
                Category::Syntax | Category::Eof => {
                    tracing::warn!(error = %e, "Received invalid JSON payload");
                    errors.api(codes::INVALID_JSON).await.into_response()
                }
                Category::Data => {
                    tracing::warn!(error = %e, "Received payload that is not a transaction");
                    errors.api(codes::INVALID_TRANSACTION).await.into_response()
                }
                Category::Io => errors.internal(e).await.into_response(),
            };
        }
    };

    let transaction = Transaction::new(&submitted, &identity.username, register);
    if let Err(e) = state
        .queries
        .execute("insert-transaction", &transaction.params())
        .await
    {
        tracing::error!(error = %e, "Error while inserting transaction");
        return errors.internal(e).await.into_response();
    }

    for (article, count) in &submitted.articles {
        let params = [QueryParam::Text(article.clone()), QueryParam::Integer(*count)];
        if let Err(e) = state.queries.execute("insert-article-sale", &params).await {
            tracing::error!(error = %e, article = %article, "Error while inserting article statistics");
            return errors.internal(e).await.into_response();
        }
    }

    tracing::info!(
        register = %register,
        by = %identity.username,
        amount = transaction.amount,
        "Transaction stored"
    );
    StatusCode::CREATED.into_response()
}
