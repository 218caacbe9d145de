//! Line-delimited server-sent-event framing
//!
//! Vendor streams arrive as arbitrary byte chunks. [`SseLineReader`] re-frames
//! them into complete lines (a line may span several chunks, and a chunk may
//! carry many lines), and [`classify`] decides what a single line means.

use crate::{LLMError, Result};
use futures::stream::{BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Prefix carried by SSE data lines
pub const DATA_PREFIX: &str = "data: ";

/// Literal end-of-stream marker used by OpenAI-style vendors
pub const DONE_SENTINEL: &str = "[DONE]";

/// How lines without the `data: ` prefix are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixPolicy {
    /// Only `data: ` lines carry payload; anything else is ignored
    Required,
    /// The prefix is stripped when present; bare lines are decoded as-is
    Optional,
}

/// Meaning of one trimmed stream line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Payload to decode
    Data(&'a str),
    /// End-of-stream sentinel
    Done,
    /// Blank line, comment, `event:` line, or unprefixed line under [`PrefixPolicy::Required`]
    Ignored,
}

/// Classify a single line
pub fn classify(line: &str, policy: PrefixPolicy) -> SseLine<'_> {
    let line = line.trim();
    if line.is_empty() {
        return SseLine::Ignored;
    }

    let payload = match (line.strip_prefix(DATA_PREFIX), policy) {
        (Some(rest), _) => rest.trim(),
        (None, PrefixPolicy::Required) => return SseLine::Ignored,
        (None, PrefixPolicy::Optional) => line,
    };

    if payload == DONE_SENTINEL {
        SseLine::Done
    } else {
        SseLine::Data(payload)
    }
}

/// Re-frames a chunked response body into lines
pub struct SseLineReader {
    chunks: BoxStream<'static, Result<Vec<u8>>>,
    buffer: Vec<u8>,
    exhausted: bool,
}

impl SseLineReader {
    /// Read lines from an HTTP response body
    pub fn new(response: reqwest::Response) -> Self {
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(read_error))
            .boxed();
        Self::from_chunks(chunks)
    }

    /// Read lines from any stream of byte chunks
    pub fn from_chunks(chunks: BoxStream<'static, Result<Vec<u8>>>) -> Self {
        Self {
            chunks,
            buffer: Vec::new(),
            exhausted: false,
        }
    }

    /// Next complete line, without its line terminator
    ///
    /// Returns `Ok(None)` at end of body. A trailing line without a final
    /// newline is still returned. Bytes are decoded only once a full line is
    /// buffered, so multi-byte characters split across chunks survive.
    pub async fn next_line(&mut self, cancel: &CancellationToken) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
                return Ok(Some(decode_line(&raw)));
            }

            if self.exhausted {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let raw = std::mem::take(&mut self.buffer);
                return Ok(Some(decode_line(&raw)));
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(LLMError::Cancelled),
                chunk = self.chunks.next() => match chunk {
                    Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => return Err(e),
                    None => self.exhausted = true,
                },
            }
        }
    }
}

/// Body read failure, keeping a timeout distinguishable from a broken connection
fn read_error(e: reqwest::Error) -> LLMError {
    if e.is_timeout() {
        LLMError::Timeout(e.to_string())
    } else {
        LLMError::StreamRead(e.to_string())
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}
