//! Per-request error reporting channel
//!
//! Every request gets one [`ErrorChannel`]. Handlers receive a cloneable
//! [`ErrorReporter`] and may hand it exactly one [`ErrorReport`]; a consumer
//! task spawned alongside the request renders that report into the single
//! response the request produces and then signals completion. Reporters wait
//! for that signal before returning, so once `report` resolves the error
//! response exists and nothing downstream can produce a competing one.
//!
//! A second report for the same request is logged and dropped.
//!
//! Reporting a code missing from the [`ErrorCatalog`] aborts the process.
//! This can only happen when a call site and `errors.json` disagree, so no
//! guessed response is sent.

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::api_error::ApiError;
use super::catalog::ErrorCatalog;

/// A failure handed to the error channel
#[derive(Debug)]
pub enum ErrorReport {
    /// Opaque internal failure, rendered as `INTERNAL_ERROR` with status 500
    Internal(anyhow::Error),
    /// Symbolic code from the error catalog
    Api(String),
}

/// A reported code that has no catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnregisteredCode(pub String);

impl ErrorReport {
    /// Turn the report into its response body
    pub fn render(self, catalog: &ErrorCatalog) -> Result<ApiError, UnregisteredCode> {
        match self {
            ErrorReport::Internal(cause) => {
                tracing::error!(error = %cause, "Internal error while handling request");
                Ok(ApiError::internal(&cause))
            }
            ErrorReport::Api(code) => match catalog.lookup(&code) {
                Some(entry) => {
                    tracing::warn!(code = %code, status = entry.status.as_u16(), "Request failed");
                    Ok(ApiError::from_entry(&code, entry))
                }
                None => Err(UnregisteredCode(code)),
            },
        }
    }
}

type ReportSink = Arc<Mutex<Option<oneshot::Sender<ErrorReport>>>>;

/// Marker returned once a report has been rendered.
///
/// Its own response is a placeholder; the error channel middleware discards
/// it in favour of the rendered error.
#[derive(Debug)]
#[must_use = "return the marker from the handler once the error is reported"]
pub struct Reported(());

impl IntoResponse for Reported {
    fn into_response(self) -> Response {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// Handle used by middleware and handlers to report a request's error
#[derive(Clone)]
pub struct ErrorReporter {
    sink: ReportSink,
    completion: watch::Receiver<bool>,
}

impl ErrorReporter {
    /// Report a failure and wait until its response has been rendered
    pub async fn report(&self, report: ErrorReport) -> Reported {
        let sender = self.sink.lock().await.take();
        match sender {
            Some(sender) => {
                if sender.send(report).is_err() {
                    tracing::debug!("Error channel consumer is gone; report dropped");
                }
            }
            None => {
                tracing::warn!(report = ?report, "Error already reported for this request; ignoring");
            }
        }

        // An Err here means the consumer exited without rendering, which
        // only happens once the request itself is gone.
        let mut completion = self.completion.clone();
        let _ = completion.wait_for(|rendered| *rendered).await;

        Reported(())
    }

    /// Report an internal failure
    pub async fn internal<E>(&self, cause: E) -> Reported
    where
        E: Into<anyhow::Error>,
    {
        self.report(ErrorReport::Internal(cause.into())).await
    }

    /// Report a symbolic catalog code
    pub async fn api(&self, code: &str) -> Reported {
        self.report(ErrorReport::Api(code.to_string())).await
    }
}

/// The channel owned by the request pipeline for one request
pub struct ErrorChannel {
    sink: ReportSink,
    completion: watch::Receiver<bool>,
    consumer: Option<JoinHandle<Option<Response>>>,
}

impl ErrorChannel {
    /// Open a channel and spawn its consumer task
    pub fn open(catalog: Arc<ErrorCatalog>) -> Self {
        let (report_tx, report_rx) = oneshot::channel();
        let (completion_tx, completion_rx) = watch::channel(false);

        let consumer = tokio::spawn(consume(report_rx, catalog, completion_tx).in_current_span());

        Self {
            sink: Arc::new(Mutex::new(Some(report_tx))),
            completion: completion_rx,
            consumer: Some(consumer),
        }
    }

    pub fn reporter(&self) -> ErrorReporter {
        ErrorReporter {
            sink: self.sink.clone(),
            completion: self.completion.clone(),
        }
    }

    /// Close the channel and collect the rendered error, if one was reported.
    ///
    /// Reports arriving after this point find the sink closed and are
    /// ignored.
    pub async fn finish(mut self) -> Option<Response> {
        drop(self.sink.lock().await.take());

        let consumer = self.consumer.take()?;
        match consumer.await {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!("Error channel consumer failed: {}", e);
                None
            }
        }
    }
}

impl Drop for ErrorChannel {
    fn drop(&mut self) {
        // Request dropped before `finish` (client went away): nothing is left
        // to write to, so the consumer must not linger.
        if let Some(consumer) = self.consumer.take() {
            consumer.abort();
        }
    }
}

async fn consume(
    receiver: oneshot::Receiver<ErrorReport>,
    catalog: Arc<ErrorCatalog>,
    completion: watch::Sender<bool>,
) -> Option<Response> {
    let report = receiver.await.ok()?;

    let error = match report.render(&catalog) {
        Ok(error) => error,
        Err(UnregisteredCode(code)) => {
            tracing::error!(
                code = %code,
                "Reported error code is not registered in the error catalog; aborting"
            );
            std::process::abort();
        }
    };

    let response = error.into_response();
    completion.send_replace(true);
    Some(response)
}
