use super::{ChatChunk, ChatRequest, ChatStream, Provider};
use anyhow::{anyhow, Context};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    api_base: Url,
}

impl AnthropicProvider {
    pub fn new(http: reqwest::Client, api_key: String, base_url: Option<&str>) -> anyhow::Result<Self> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL);
        let api_base = Url::parse(base).with_context(|| format!("invalid Anthropic base URL: {base}"))?;
        Ok(Self { http, api_key, api_base })
    }

    fn build_url(&self) -> anyhow::Result<Url> {
        Ok(self.api_base.join("v1/messages")?)
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(API_VERSION),
        );
        let key = HeaderValue::from_str(&self.api_key).map_err(|e| anyhow!(e).context("API key is not a valid header value"))?;
        h.insert(HeaderName::from_static("x-api-key"), key);
        Ok(h)
    }
}

impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn stream_chat(
        &self,
        req: ChatRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<ChatStream>> + Send>> {
        let http = self.http.clone();
        let this = self.clone();

        Box::pin(async move {
            let url = this.build_url()?;
            let headers = this.headers()?;

            let body = MessagesRequest {
                model: &req.model,
                max_tokens: req.max_tokens,
                stream: true,
                system: &req.system,
                messages: vec![Message {
                    role: "user",
                    content: &req.prompt,
                }],
            };

            tracing::debug!(model = %req.model, max_tokens = req.max_tokens, "starting Anthropic stream");

            let resp = http
                .post(url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .context("failed to start Anthropic request")?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(anyhow!("Anthropic API error: HTTP {status}: {text}"));
            }

            let (tx, rx) = mpsc::channel::<anyhow::Result<ChatChunk>>(64);

            tokio::spawn(async move {
                let mut stream = resp.bytes_stream();
                let mut parser = SseParser::new();

                while let Some(item) = stream.next().await {
                    let bytes = match item {
                        Ok(b) => b,
                        Err(e) => {
                            let _ = tx.send(Err(anyhow!(e).context("network stream error"))).await;
                            return;
                        }
                    };

                    for ev in parser.push(&bytes) {
                        let data = match ev {
                            Ok(data) => data,
                            Err(e) => {
                                let _ = tx.send(Err(e)).await;
                                return;
                            }
                        };

                        match decode_event(&data) {
                            Ok(Decoded::Text(text)) => {
                                if tx.send(Ok(ChatChunk { text })).await.is_err() {
                                    return;
                                }
                            }
                            Ok(Decoded::Skip) => {}
                            Ok(Decoded::Stop) => return,
                            Err(e) => {
                                let _ = tx.send(Err(e)).await;
                                return;
                            }
                        }
                    }
                }
            });

            Ok(Box::pin(ReceiverStream::new(rx)) as ChatStream)
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    stream: bool,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, PartialEq)]
enum Decoded {
    Text(String),
    Skip,
    Stop,
}

fn decode_event(data: &str) -> anyhow::Result<Decoded> {
    if data.trim().is_empty() {
        return Ok(Decoded::Skip);
    }

    let ev: StreamEvent = serde_json::from_str(data).context("failed to parse SSE JSON")?;
    match ev {
        StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        } if !text.is_empty() => Ok(Decoded::Text(text)),
        StreamEvent::ContentBlockDelta { .. } | StreamEvent::Other => Ok(Decoded::Skip),
        StreamEvent::MessageStop => Ok(Decoded::Stop),
        StreamEvent::Error { error } => Err(anyhow!("Anthropic API error: {}: {}", error.kind, error.message)),
    }
}

/// Minimal SSE parser.
///
/// - Collects UTF-8 lines
/// - Emits the accumulated `data:` payload when a blank line ends an event
struct SseParser {
    buf: Vec<u8>,
    cur_data: String,
}

impl SseParser {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            cur_data: String::new(),
        }
    }

    fn push(&mut self, chunk: &[u8]) -> Vec<anyhow::Result<String>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.drain(..=pos).collect::<Vec<u8>>();
            line.pop();
            if line.ends_with(b"\r") {
                line.pop();
            }

            if line.is_empty() {
                if !self.cur_data.is_empty() {
                    if self.cur_data.ends_with('\n') {
                        self.cur_data.pop();
                    }
                    out.push(Ok(std::mem::take(&mut self.cur_data)));
                }
                continue;
            }

            let s = match std::str::from_utf8(&line) {
                Ok(s) => s,
                Err(e) => {
                    out.push(Err(anyhow!(e).context("SSE line is not valid UTF-8")));
                    continue;
                }
            };

            // event:, id:, retry: and comments carry nothing we need; the
            // JSON payload repeats the event type.
            if let Some(rest) = s.strip_prefix("data:") {
                let rest = rest.strip_prefix(' ').unwrap_or(rest);
                self.cur_data.push_str(rest);
                self.cur_data.push('\n');
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_parser_joins_events_split_across_chunks() {
        let mut p = SseParser::new();
        let first = p.push(b"event: content_block_delta\ndata: {\"a\":");
        assert!(first.is_empty());

        let second = p.push(b"1}\n\nevent: ping\r\ndata: {}\r\n\r\n");
        let data: Vec<String> = second.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(data, vec!["{\"a\":1}".to_string(), "{}".to_string()]);
    }

    #[test]
    fn sse_parser_ignores_events_without_data() {
        let mut p = SseParser::new();
        let out = p.push(b": keep-alive\n\nevent: ping\n\n");
        assert!(out.is_empty());
    }

    #[test]
    fn decodes_text_deltas() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"```html\n"}}"#;
        assert_eq!(decode_event(data).unwrap(), Decoded::Text("```html\n".to_string()));
    }

    #[test]
    fn skips_bookkeeping_events() {
        for data in [
            r#"{"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"ping"}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#,
        ] {
            assert_eq!(decode_event(data).unwrap(), Decoded::Skip, "{data}");
        }
    }

    #[test]
    fn message_stop_ends_the_stream() {
        assert_eq!(decode_event(r#"{"type":"message_stop"}"#).unwrap(), Decoded::Stop);
    }

    #[test]
    fn error_event_carries_provider_message() {
        let data = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = decode_event(data).unwrap_err();
        assert_eq!(err.to_string(), "Anthropic API error: overloaded_error: Overloaded");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(decode_event("{not json").is_err());
    }

    #[test]
    fn url_and_headers() {
        let p = AnthropicProvider::new(reqwest::Client::new(), "sk-test".to_string(), None).unwrap();
        assert_eq!(p.build_url().unwrap().as_str(), "https://api.anthropic.com/v1/messages");

        let h = p.headers().unwrap();
        assert_eq!(h.get("x-api-key").unwrap().to_str().unwrap(), "sk-test");
        assert_eq!(h.get("anthropic-version").unwrap().to_str().unwrap(), API_VERSION);
    }
}
