//! Shared request dispatch for the HTTP providers

use crate::{LLMError, Result};
use reqwest::{RequestBuilder, Response};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Send a streaming request, racing it against cancellation
///
/// Non-success statuses are turned into [`LLMError::Api`] carrying the
/// vendor's status and body.
pub(crate) async fn open_stream(
    provider: &str,
    request: RequestBuilder,
    cancel: &CancellationToken,
) -> Result<Response> {
    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(LLMError::Cancelled),
        sent = request.send() => sent?,
    };

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(LLMError::Cancelled),
        text = response.text() => text.unwrap_or_else(|e| format!("<unreadable body: {e}>")),
    };
    warn!(provider, status = status.as_u16(), "Vendor rejected streaming request");

    Err(LLMError::Api {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
    })
}
