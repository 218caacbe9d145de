//! Streaming analysis endpoint

use crate::{AppState, Result, ServerError};
use analyst_pipeline::{AnalysisRequest, StreamEvent};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::post,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, warn};

pub fn analyze_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/analyze", post(analyze_handler))
        .with_state(state)
}

/// Start an analysis and stream its events as SSE
///
/// The run is cancelled when the client disconnects (the response stream is
/// dropped) or when the configured deadline passes.
async fn analyze_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) =
        payload.map_err(|rejection| ServerError::InvalidRequest(rejection.body_text()))?;
    let request = request.normalized()?;
    info!(code = %request.code, "Analysis requested");

    let cancel = CancellationToken::new();
    spawn_deadline(cancel.clone(), state.analysis_timeout);

    let events = state.orchestrator.start(request, cancel.clone());
    let stream = sse_stream(events, cancel.drop_guard());

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    ))
}

/// SSE frames for each event; the stream owns `guard`, so dropping it cancels the run
fn sse_stream(
    events: mpsc::Receiver<StreamEvent>,
    guard: DropGuard,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    ReceiverStream::new(events).map(move |event| {
        let _guard = &guard;
        Ok(to_sse_event(&event))
    })
}

fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(event.payload().to_string())
}

fn spawn_deadline(cancel: CancellationToken, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(timeout) => {
                warn!(timeout_secs = timeout.as_secs(), "Analysis deadline reached");
                cancel.cancel();
            }
        }
    });
}
