//! Scripted generation provider for tests and local tooling.
//!
//! Plays back queued responses as word-by-word chunk streams, with
//! configurable per-chunk latency, error injection, and mid-stream
//! failures. Requests are recorded for verification.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::time::sleep;

use crate::ports::{GenerationChunk, GenerationError, GenerationProvider, GenerationRequest, GenerationStream};

/// Distinct lines cycled by the varied fallback mode.
const VARIED_LINES: &[&str] = &[
    "Tell me about the moment it started.",
    "Last Tuesday in the kitchen my mother said I never call.",
    "Describe what happened right before that.",
    "My heart was racing when the phone rang.",
    "Who was with you when it happened?",
    "The evening it began was cold and quiet.",
];

/// One queued script entry, consumed in order.
#[derive(Debug, Clone)]
enum ScriptItem {
    /// Stream this text chunk by chunk.
    Response(String),
    /// Fail before streaming starts.
    Error(GenerationError),
    /// Yield a prefix, then fail mid-stream.
    FailingStream {
        prefix: String,
        error: GenerationError,
    },
}

/// What to do once the queue is exhausted.
#[derive(Debug, Clone)]
enum FallbackMode {
    /// Fail with `InvalidRequest`, which surfaces scripting mistakes fast.
    Exhausted,
    /// Stream the same text for every further request.
    Repeat(String),
    /// Cycle through distinct lines.
    Varied,
    /// Yield a prefix once, then never terminate. Only cancellation ends
    /// such a stream.
    Hanging(String),
}

/// Scripted implementation of the generation port.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    script: Arc<Mutex<VecDeque<ScriptItem>>>,
    fallback: Arc<Mutex<FallbackMode>>,
    varied_cursor: Arc<AtomicUsize>,
    chunk_delay: Duration,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(FallbackMode::Exhausted)),
            varied_cursor: Arc::new(AtomicUsize::new(0)),
            chunk_delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues one response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(ScriptItem::Response(text.into()));
        self
    }

    /// Queues a failure before streaming starts.
    pub fn with_error(self, error: GenerationError) -> Self {
        self.push(ScriptItem::Error(error));
        self
    }

    /// Queues a stream that fails after yielding `prefix`.
    pub fn with_failing_stream(self, prefix: impl Into<String>, error: GenerationError) -> Self {
        self.push(ScriptItem::FailingStream {
            prefix: prefix.into(),
            error,
        });
        self
    }

    /// Repeats `text` once the queue runs dry.
    pub fn with_repeating_response(self, text: impl Into<String>) -> Self {
        *self.fallback.lock().unwrap() = FallbackMode::Repeat(text.into());
        self
    }

    /// Cycles distinct lines once the queue runs dry.
    pub fn with_varied_responses(self) -> Self {
        *self.fallback.lock().unwrap() = FallbackMode::Varied;
        self
    }

    /// Streams that never terminate once the queue runs dry.
    pub fn with_hanging_stream(self, prefix: impl Into<String>) -> Self {
        *self.fallback.lock().unwrap() = FallbackMode::Hanging(prefix.into());
        self
    }

    /// Adds latency before each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, item: ScriptItem) {
        self.script.lock().unwrap().push_back(item);
    }

    fn next_item(&self) -> ScriptItem {
        if let Some(item) = self.script.lock().unwrap().pop_front() {
            return item;
        }
        match &*self.fallback.lock().unwrap() {
            FallbackMode::Exhausted => ScriptItem::Error(GenerationError::InvalidRequest(
                "scripted provider exhausted".to_string(),
            )),
            FallbackMode::Repeat(text) => ScriptItem::Response(text.clone()),
            FallbackMode::Varied => {
                let index = self.varied_cursor.fetch_add(1, Ordering::Relaxed);
                ScriptItem::Response(VARIED_LINES[index % VARIED_LINES.len()].to_string())
            }
            FallbackMode::Hanging(prefix) => ScriptItem::FailingStream {
                prefix: prefix.clone(),
                // Marker converted to a pending tail below.
                error: GenerationError::InvalidRequest("hang".to_string()),
            },
        }
    }

    fn is_hanging(&self) -> bool {
        self.script.lock().unwrap().is_empty()
            && matches!(&*self.fallback.lock().unwrap(), FallbackMode::Hanging(_))
    }

    fn chunk_stream(&self, text: String) -> GenerationStream {
        let delay = self.chunk_delay;
        let chunks: Vec<String> = split_chunks(&text);
        Box::pin(stream::iter(chunks).then(move |chunk| async move {
            if delay > Duration::ZERO {
                sleep(delay).await;
            }
            Ok::<GenerationChunk, GenerationError>(GenerationChunk::new(chunk))
        }))
    }
}

/// Word-by-word chunking, keeping separators attached.
fn split_chunks(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationStream, GenerationError> {
        self.requests.lock().unwrap().push(request);

        let hanging = self.is_hanging();
        match self.next_item() {
            ScriptItem::Response(text) => Ok(self.chunk_stream(text)),
            ScriptItem::Error(error) => Err(error),
            ScriptItem::FailingStream { prefix, error } => {
                let head = stream::iter(vec![Ok::<GenerationChunk, GenerationError>(
                    GenerationChunk::new(prefix),
                )]);
                if hanging {
                    Ok(Box::pin(head.chain(stream::pending())))
                } else {
                    let tail = stream::iter(vec![Err(error)]);
                    Ok(Box::pin(head.chain(tail)))
                }
            }
        }
    }
}
