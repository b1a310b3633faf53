//! Request orchestration for one builder session.
//!
//! A session owns the current draft and publishes every change to it on a
//! watch channel. Only one request may stream at a time; the guard lives
//! here rather than in any front end.

use crate::extract::{Artifact, ArtifactExtractor};
use crate::prompts::{GenerationMode, GenerationRequest, SiteKind};
use crate::provider::{ChatRequest, Provider};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::StreamExt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a website description")]
    BlankDescription,
    #[error("Please enter a modification description")]
    BlankModification,
    #[error("Please generate a website first")]
    NoPriorArtifact,
}

/// The upstream call failed, before or during streaming.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to {action} website: {message}")]
pub struct GenerationError {
    pub action: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("a request is already streaming")]
    Busy,
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Streaming,
}

/// What subscribers see after every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactUpdate {
    pub request_id: u64,
    pub artifact: Artifact,
    pub streaming: bool,
}

/// Raw response text of the current request. Append-only.
#[derive(Debug, Default)]
struct StreamBuffer {
    text: String,
}

impl StreamBuffer {
    fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    fn as_str(&self) -> &str {
        &self.text
    }
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn Provider + Send + Sync>,
    model: String,
    max_tokens: u32,
    streaming: AtomicBool,
    next_request: AtomicU64,
    updates: watch::Sender<ArtifactUpdate>,
    cancels: watch::Sender<u64>,
}

impl Session {
    pub fn new(provider: Arc<dyn Provider + Send + Sync>, model: impl Into<String>, max_tokens: u32) -> Self {
        let (updates, _) = watch::channel(ArtifactUpdate::default());
        let (cancels, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                provider,
                model: model.into(),
                max_tokens,
                streaming: AtomicBool::new(false),
                next_request: AtomicU64::new(1),
                updates,
                cancels,
            }),
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.inner.streaming.load(Ordering::SeqCst) {
            SessionStatus::Streaming
        } else {
            SessionStatus::Idle
        }
    }

    /// Current draft; empty strings until something was extracted.
    pub fn artifact(&self) -> Artifact {
        self.inner.updates.borrow().artifact.clone()
    }

    /// Whether `modify` has something to work on.
    pub fn can_modify(&self) -> bool {
        self.status() == SessionStatus::Idle && self.inner.updates.borrow().artifact.has_html()
    }

    pub fn subscribe(&self) -> watch::Receiver<ArtifactUpdate> {
        self.inner.updates.subscribe()
    }

    /// Abort the in-flight request, if any. Chunks that arrive afterwards are
    /// dropped; the draft keeps whatever was extracted so far.
    pub fn cancel(&self) {
        if self.status() == SessionStatus::Streaming {
            self.inner.cancels.send_modify(|n| *n += 1);
        }
    }

    /// Generate a fresh site. The current draft is cleared first.
    pub async fn generate(&self, description: &str) -> Result<Artifact, SessionError> {
        let description = non_blank(description, ValidationError::BlankDescription)?;
        self.run(GenerationRequest::create(description)).await
    }

    /// Generate a fresh site of a given kind.
    pub async fn generate_specialized(
        &self,
        description: &str,
        kind: SiteKind,
        requirements: Option<String>,
    ) -> Result<Artifact, SessionError> {
        let description = non_blank(description, ValidationError::BlankDescription)?;
        self.run(GenerationRequest::specialized(description, kind, requirements)).await
    }

    /// Modify the session's current draft.
    pub async fn modify(&self, description: &str) -> Result<Artifact, SessionError> {
        let prior = self.artifact();
        self.modify_with(description, prior).await
    }

    /// Modify an explicit prior draft, e.g. one read back from disk.
    pub async fn modify_with(&self, description: &str, prior: Artifact) -> Result<Artifact, SessionError> {
        let description = non_blank(description, ValidationError::BlankModification)?;
        if !prior.has_html() {
            return Err(ValidationError::NoPriorArtifact.into());
        }
        self.run(GenerationRequest::modify(description, prior)).await
    }

    async fn run(&self, req: GenerationRequest) -> Result<Artifact, SessionError> {
        let _guard = StreamingGuard::acquire(&self.inner).ok_or(SessionError::Busy)?;
        let mut cancelled = self.inner.cancels.subscribe();

        let id = self.inner.next_request.fetch_add(1, Ordering::SeqCst);
        let prior = match &req.mode {
            GenerationMode::Modify { prior } => Some(prior.clone()),
            _ => None,
        };
        self.inner.updates.send_modify(|u| {
            u.request_id = id;
            u.streaming = true;
            u.artifact = prior.clone().unwrap_or_default();
        });

        let action = action_name(&req);
        tracing::info!(
            request = id,
            mode = req.mode_name(),
            provider = self.inner.provider.name(),
            model = %self.inner.model,
            "request started"
        );

        let chat = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: self.inner.max_tokens,
            system: req.system_prompt(),
            prompt: req.user_prompt(),
        };

        let mut stream = tokio::select! {
            biased;
            _ = cancelled.changed() => return Err(SessionError::Cancelled),
            res = self.inner.provider.stream_chat(chat) => res.map_err(|e| failure(id, action, &e))?,
        };

        let mut buffer = StreamBuffer::default();
        let mut extractor = ArtifactExtractor::default();
        let mut chunks = 0usize;

        loop {
            let item = tokio::select! {
                biased;
                _ = cancelled.changed() => {
                    tracing::info!(request = id, chunks, "request cancelled");
                    return Err(SessionError::Cancelled);
                }
                item = stream.next() => item,
            };

            match item {
                Some(Ok(chunk)) => {
                    chunks += 1;
                    buffer.push(&chunk.text);
                    self.publish(keep_prior(extractor.extract(buffer.as_str()), prior.as_ref()));
                }
                Some(Err(e)) => return Err(failure(id, action, &e)),
                None => break,
            }
        }
        self.publish(keep_prior(extractor.finish(buffer.as_str()), prior.as_ref()));

        let artifact = self.artifact();
        tracing::info!(
            request = id,
            chunks,
            bytes = buffer.as_str().len(),
            html_bytes = artifact.html.len(),
            css_bytes = artifact.css.len(),
            "request finished"
        );
        Ok(artifact)
    }

    fn publish(&self, artifact: Artifact) {
        self.inner.updates.send_if_modified(|u| {
            if u.artifact == artifact {
                return false;
            }
            u.artifact = artifact;
            true
        });
    }
}

/// While modifying, a field the new response has not produced yet keeps its
/// prior value.
fn keep_prior(mut next: Artifact, prior: Option<&Artifact>) -> Artifact {
    if let Some(prior) = prior {
        if next.html.is_empty() {
            next.html = prior.html.clone();
        }
        if next.css.is_empty() {
            next.css = prior.css.clone();
        }
    }
    next
}

/// Marks the session streaming for as long as it lives.
struct StreamingGuard<'a> {
    inner: &'a Inner,
}

impl<'a> StreamingGuard<'a> {
    fn acquire(inner: &'a Inner) -> Option<Self> {
        inner
            .streaming
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { inner })
    }
}

impl Drop for StreamingGuard<'_> {
    fn drop(&mut self) {
        self.inner.streaming.store(false, Ordering::SeqCst);
        self.inner.updates.send_modify(|u| u.streaming = false);
    }
}

fn non_blank(description: &str, blank: ValidationError) -> Result<&str, ValidationError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(blank);
    }
    Ok(trimmed)
}

fn action_name(req: &GenerationRequest) -> &'static str {
    match req.mode {
        GenerationMode::Modify { .. } => "modify",
        _ => "generate",
    }
}

fn failure(id: u64, action: &'static str, e: &anyhow::Error) -> SessionError {
    let message = format!("{e:#}");
    tracing::warn!(request = id, error = %message, "request failed");
    GenerationError { action, message }.into()
}
