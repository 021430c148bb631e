use std::{net::SocketAddr, sync::Arc};

use axum::{extract::State, routing::post, Json, Router, Server};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::ingest;

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub spans: Vec<ingest::Span>,
}

#[derive(Debug, Default, Serialize)]
pub struct ExportResponse {
    pub rejected_spans: i64,
    pub error_message: String,
}

struct CollectorState {
    tx: mpsc::Sender<Vec<crate::Span>>,
}

/// # Errors
/// If the server encounters an error
pub async fn run(tx: mpsc::Sender<Vec<crate::Span>>, addr: SocketAddr) -> Result<(), String> {
    let app = Router::new()
        .route("/v1/spans", post(export_spans))
        .with_state(Arc::new(CollectorState { tx }));

    debug!("listening on {addr}");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| e.to_string())
}

async fn export_spans(
    State(state): State<Arc<CollectorState>>,
    Json(payload): Json<ExportRequest>,
) -> Json<ExportResponse> {
    let mut spans = Vec::new();
    let mut error_message = String::new();
    let mut rejected_spans = 0i64;
    for raw in payload.spans {
        match convert(raw) {
            Ok(span) => spans.push(span),
            Err(msg) => {
                error!("{msg}");
                error_message.push_str(&format!("{msg}\n"));
                rejected_spans += 1;
            }
        }
    }

    _ = state.tx.send(spans).await;

    Json(ExportResponse {
        rejected_spans,
        error_message,
    })
}

fn convert(raw: ingest::Span) -> Result<crate::Span, String> {
    if raw.span_id.is_empty() {
        return Err("span without span_id".to_string());
    }
    if raw.trace_id.is_empty() {
        return Err(format!("span {} without trace_id", raw.span_id));
    }
    if raw.end_time < raw.start_time {
        return Err(format!("span {} ends before it starts", raw.span_id));
    }
    Ok(crate::Span::from(raw))
}
