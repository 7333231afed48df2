//! HTTP surface: question in, pivot + narrative out, CSV download by session.
//!
//! `POST /gen_query`      `{"userMessage": "...", "sessionId": "..."?}`
//! `GET  /download_pivot?session=<id>`
//! `GET  /health`

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::PipelineError;
use crate::export::{new_session_id, PivotStore};
use crate::logging::{backend_error, backend_info, backend_warn};
use crate::pipeline::{Pipeline, PipelineOutcome};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    pivots: Arc<PivotStore>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, pivots: Arc<PivotStore>) -> Self {
        Self { pipeline, pivots }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenQueryRequest {
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub session: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/gen_query", post(gen_query_handler))
        .route("/download_pivot", get(download_pivot_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    backend_info(format!("Listening on http://{}", listener.local_addr()?));
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    backend_info("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        backend_error(format!("Failed to listen for shutdown signal: {}", err));
        std::future::pending::<()>().await;
    }
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::MissingMessage | PipelineError::NoValidQuery { .. } => StatusCode::BAD_REQUEST,
        PipelineError::NoResults => StatusCode::NOT_FOUND,
        PipelineError::MalformedRecords { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        PipelineError::Llm(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: PipelineError) -> Response {
    let status = status_for(&err);
    let mut body = json!({ "error": err.to_string(), "reason": err.reason() });
    if let PipelineError::NoValidQuery { raw } = &err {
        body["resp"] = json!(raw);
    }
    if status.is_server_error() {
        backend_error(format!("Request failed ({}): {}", status, err));
    } else {
        backend_warn(format!("Request rejected ({}): {}", status, err));
    }
    (status, Json(body)).into_response()
}

/// Caller-supplied ids are only honoured when they are safe to echo in a URL.
fn accept_session(id: Option<String>) -> String {
    id.filter(|s| {
        !s.is_empty()
            && s.len() <= 64
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
    .unwrap_or_else(new_session_id)
}

async fn gen_query_handler(
    State(state): State<AppState>,
    body: Result<Json<GenQueryRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            backend_warn(format!("Unreadable request body: {}", rejection.body_text()));
            return error_response(PipelineError::MissingMessage);
        }
    };
    let message = req.user_message.unwrap_or_default();
    backend_info(format!("Received userMessage: {}", message));
    if message.trim().is_empty() {
        return error_response(PipelineError::MissingMessage);
    }
    let session = accept_session(req.session_id);

    let pipeline = state.pipeline.clone();
    let outcome = match tokio::task::spawn_blocking(move || pipeline.run(&message)).await {
        Ok(outcome) => outcome,
        Err(err) => {
            backend_error(format!("Pipeline worker failed: {}", err));
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error", "reason": "internal" })),
            )
                .into_response();
        }
    };

    match outcome {
        Ok(PipelineOutcome::Scalar { value, .. }) => Json(json!({ "table_result": value })).into_response(),
        Ok(PipelineOutcome::Table(report)) => {
            let table_html = report.display.render_html();
            state.pivots.put(&session, report.display);
            Json(json!({
                "table_html": table_html,
                "summary": report.summary,
                "csv_url": format!("/download_pivot?session={}", session),
                "session_id": session,
            }))
            .into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn download_pivot_handler(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Response {
    let stored = params.session.as_deref().and_then(|s| state.pivots.get(s));
    let Some(stored) = stored else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "No pivot table available for download.",
                "reason": "no_pivot_table",
            })),
        )
            .into_response();
    };

    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=pivot_table.csv"),
        ],
        stored.table.to_csv(),
    )
        .into_response()
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&PipelineError::MissingMessage), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&PipelineError::NoValidQuery { raw: String::new() }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&PipelineError::NoResults), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&PipelineError::MalformedRecords { missing: vec![] }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(&PipelineError::Llm(LlmError::EmptyChoice)), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_accept_session() {
        assert_eq!(accept_session(Some("abc-123_x".into())), "abc-123_x");
        let generated = accept_session(Some("../../etc".into()));
        assert_ne!(generated, "../../etc");
        assert_eq!(generated.len(), 36);
        assert_eq!(accept_session(None).len(), 36);
        assert_ne!(accept_session(Some(String::new())), "");
    }
}
