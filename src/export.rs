//! Hand the current draft to CodeSandbox.

use crate::extract::Artifact;
use anyhow::{anyhow, Context};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFINE_URL: &str = "https://codesandbox.io/api/v1/sandboxes/define?json=1";
const SANDBOX_BASE: &str = "https://codesandbox.io/s/";
const STYLESHEET_LINK: &str = "<link rel=\"stylesheet\" href=\"style.css\">";

#[derive(Debug, Clone, Serialize)]
pub struct SandboxDefinition {
    pub files: BTreeMap<String, SandboxFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SandboxFile {
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct DefineResponse {
    sandbox_id: String,
}

impl SandboxDefinition {
    pub fn from_artifact(artifact: &Artifact) -> Self {
        let mut files = BTreeMap::new();
        let mut put = |name: &str, content: String| {
            files.insert(name.to_string(), SandboxFile { content });
        };
        put("index.html", with_stylesheet_link(&artifact.html));
        put("style.css", artifact.css.clone());
        put(
            "package.json",
            serde_json::json!({ "name": "sitecraft-export", "version": "1.0.0", "main": "index.html" }).to_string(),
        );
        put("sandbox.config.json", serde_json::json!({ "template": "static" }).to_string());
        Self { files }
    }
}

/// Make sure the page pulls in `style.css`.
pub fn with_stylesheet_link(html: &str) -> String {
    if html.contains("style.css") {
        return html.to_string();
    }

    let lower = html.to_ascii_lowercase();
    if let Some(i) = lower.find("</head>") {
        return format!("{}  {STYLESHEET_LINK}\n{}", &html[..i], &html[i..]);
    }
    if let Some(i) = lower.find("<body") {
        return format!("{}<head>{STYLESHEET_LINK}</head>\n{}", &html[..i], &html[i..]);
    }
    format!("{STYLESHEET_LINK}\n{html}")
}

/// Create the sandbox and return the URL to open.
pub async fn open_in_sandbox(http: &reqwest::Client, artifact: &Artifact, define_url: &str) -> anyhow::Result<Url> {
    let body = SandboxDefinition::from_artifact(artifact);

    let resp = http
        .post(define_url)
        .json(&body)
        .send()
        .await
        .context("failed to reach CodeSandbox")?;

    let status = resp.status();
    let bytes = resp.bytes().await.context("failed to read CodeSandbox response")?;
    if !status.is_success() {
        return Err(anyhow!("CodeSandbox define failed: HTTP {status}: {}", String::from_utf8_lossy(&bytes)));
    }

    let parsed: DefineResponse = serde_json::from_slice(&bytes).context("failed to parse CodeSandbox response")?;
    tracing::info!(sandbox = %parsed.sandbox_id, "sandbox created");
    Ok(Url::parse(SANDBOX_BASE)?.join(&parsed.sandbox_id)?)
}
