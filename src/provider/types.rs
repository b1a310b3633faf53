use futures_core::stream::BoxStream;

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,

    /// System instruction, fixed per generation mode.
    pub system: String,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct ChatChunk {
    pub text: String,
}

pub type ChatStream = BoxStream<'static, anyhow::Result<ChatChunk>>;

/// Provider interface.
///
/// Only a streaming chat method: every request made by this tool is a single
/// user turn whose response is consumed incrementally.
pub trait Provider {
    fn name(&self) -> &'static str;

    /// Start streaming a response.
    ///
    /// The returned future fails if the request cannot be started (bad
    /// credentials, HTTP error status). Failures after the first byte are
    /// delivered as `Err` items on the stream.
    fn stream_chat(
        &self,
        req: ChatRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<ChatStream>> + Send>>;
}
