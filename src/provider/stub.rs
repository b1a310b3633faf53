use super::{ChatChunk, ChatRequest, ChatStream, Provider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const DEMO_SITE: &str = "Here is your website.\n\n```html\n<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"UTF-8\">\n  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n  <title>Stub Site</title>\n</head>\n<body>\n  <header class=\"hero\">\n    <h1>Hello from the stub provider</h1>\n    <p>No model was called to build this page.</p>\n  </header>\n</body>\n</html>\n```\n\n```css\nbody {\n  font-family: system-ui, sans-serif;\n  margin: 0;\n}\n\n.hero {\n  padding: 4rem 2rem;\n  text-align: center;\n  background: linear-gradient(135deg, #22d3ee, #a855f7);\n  color: #fff;\n}\n```\n";

/// Provider that never touches the network.
///
/// `demo()` drips a canned site with a short delay between lines; `scripted`
/// replays exactly the chunks it was given, optionally failing part-way.
#[derive(Debug, Clone)]
pub struct StubProvider {
    script: Script,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<ChatRequest>>>,
}

#[derive(Debug, Clone)]
struct Script {
    chunks: Vec<String>,
    fail_after: Option<(usize, String)>,
    refuse: Option<String>,
}

impl StubProvider {
    pub fn demo() -> Self {
        let chunks = DEMO_SITE.split_inclusive('\n').map(str::to_string).collect();
        Self::with_script(
            Script {
                chunks,
                fail_after: None,
                refuse: None,
            },
            Duration::from_millis(60),
        )
    }

    pub fn scripted<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(
            Script {
                chunks: chunks.into_iter().map(Into::into).collect(),
                fail_after: None,
                refuse: None,
            },
            Duration::ZERO,
        )
    }

    /// Emit an error item after the first `n` chunks instead of the rest.
    pub fn failing_after(mut self, n: usize, message: impl Into<String>) -> Self {
        self.script.fail_after = Some((n, message.into()));
        self
    }

    /// Reject the request before any chunk is produced.
    pub fn refusing(mut self, message: impl Into<String>) -> Self {
        self.script.refuse = Some(message.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().ok().and_then(|g| g.clone())
    }

    fn with_script(script: Script, delay: Duration) -> Self {
        Self {
            script,
            delay,
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }
}

impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn stream_chat(
        &self,
        req: ChatRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<ChatStream>> + Send>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(req);
        }

        let script = self.script.clone();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(msg) = script.refuse {
                anyhow::bail!(msg);
            }

            let (tx, rx) = mpsc::channel::<anyhow::Result<ChatChunk>>(32);

            tokio::spawn(async move {
                for (i, text) in script.chunks.into_iter().enumerate() {
                    if let Some((n, msg)) = &script.fail_after {
                        if i == *n {
                            let _ = tx.send(Err(anyhow::anyhow!(msg.clone()))).await;
                            return;
                        }
                    }
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if tx.send(Ok(ChatChunk { text })).await.is_err() {
                        return;
                    }
                }
                if let Some((_, msg)) = script.fail_after {
                    let _ = tx.send(Err(anyhow::anyhow!(msg))).await;
                }
            });

            Ok(Box::pin(ReceiverStream::new(rx)) as ChatStream)
        })
    }
}
