//! OpenAI-style chat-completions stream decoding
//!
//! Frames look like `data: {"choices":[{"delta":{"content":"..."}}]}` and the
//! stream ends with `data: [DONE]`. Role-only and finish frames carry no
//! content and are dropped; lines that fail to decode are skipped.

use crate::provider::forward;
use crate::sse::{PrefixPolicy, SseLine, SseLineReader, classify};
use crate::{FragmentSink, Result};
use reqwest::Response;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChatChunk {
    fn content(&self) -> Option<&str> {
        self.choices.first()?.delta.content.as_deref()
    }
}

/// Drain a chat-completions stream into `sink`
///
/// Returns the number of fragments forwarded.
pub(super) async fn pump(
    provider: &str,
    response: Response,
    policy: PrefixPolicy,
    cancel: &CancellationToken,
    sink: &mut dyn FragmentSink,
) -> Result<usize> {
    let mut lines = SseLineReader::new(response);
    let mut forwarded = 0;

    while let Some(line) = lines.next_line(cancel).await? {
        match classify(&line, policy) {
            SseLine::Ignored => {}
            SseLine::Done => break,
            SseLine::Data(payload) => match serde_json::from_str::<ChatChunk>(payload) {
                Ok(chunk) => {
                    if let Some(text) = chunk.content() {
                        if forward(sink, text).await? {
                            forwarded += 1;
                        }
                    }
                }
                Err(e) => debug!(provider, error = %e, "Skipping undecodable stream frame"),
            },
        }
    }

    Ok(forwarded)
}
