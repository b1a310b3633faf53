//! Live preview of the current draft.
//!
//! The draft is rendered into its own document (one dedicated style element
//! plus a body) and that document is embedded through a sandboxed iframe in
//! a small host page written to disk. Keep the host page open in a browser to
//! watch the site build up.

use crate::extract::Artifact;
use crate::session::ArtifactUpdate;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

pub const STYLE_ELEMENT_ID: &str = "dynamic-style";

const PLACEHOLDER_BODY: &str = r#"<div style="display: flex; align-items: center; justify-content: center; height: 100vh; text-align: center;">
  <div>
    <svg width="64" height="64" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg" style="margin: 0 auto 16px; opacity: 0.3;">
      <path d="M12 2L2 7L12 12L22 7L12 2Z" stroke="rgba(255,255,255,0.2)" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/>
      <path d="M2 17L12 22L22 17" stroke="rgba(255,255,255,0.2)" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/>
      <path d="M2 12L12 17L22 12" stroke="rgba(255,255,255,0.2)" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/>
    </svg>
    <h2 style="color: rgba(255,255,255,0.3); font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; font-weight: 400; font-size: 18px; margin: 0;">Your website will appear here</h2>
    <p style="color: rgba(255,255,255,0.15); font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; font-size: 14px; margin-top: 8px;">Start by describing your vision</p>
  </div>
</div>"#;

const CONTENT_BASELINE: &str = "body {
  background-color: #ffffff;
  color: #333333;
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Roboto', sans-serif;
  margin: 0;
  padding: 20px;
  box-sizing: border-box;
  overflow: auto;
  height: 100%;
}
";

const PLACEHOLDER_BASELINE: &str = "body {
  background-color: transparent;
  margin: 0;
  padding: 0;
  box-sizing: border-box;
  overflow: auto;
  height: 100%;
}
";

/// What `apply` touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewChange {
    Unchanged,
    Style,
    Body,
    BodyAndStyle,
}

impl PreviewChange {
    pub fn changed(self) -> bool {
        self != Self::Unchanged
    }
}

/// The isolated document the draft renders into.
#[derive(Debug, Default, Clone)]
pub struct LivePreview {
    mounted: bool,
    body: String,
    style: String,
}

impl LivePreview {
    /// Create the empty document shell. Only the first call has an effect.
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;
        self.body.clear();
        self.style.clear();
        true
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    /// Sync the document with `artifact`.
    ///
    /// While streaming, the body is left alone when it already contains the
    /// candidate HTML so repeated partial updates do not reset the page. The
    /// style element is always brought up to date.
    pub fn apply(&mut self, artifact: &Artifact, streaming: bool) -> PreviewChange {
        self.mount();

        let mut body_changed = false;
        if !streaming || !self.body.contains(artifact.html.as_str()) {
            let next = if artifact.html.is_empty() {
                PLACEHOLDER_BODY
            } else {
                artifact.html.as_str()
            };
            if self.body != next {
                self.body = next.to_string();
                body_changed = true;
            }
        }

        let baseline = if artifact.html.is_empty() {
            PLACEHOLDER_BASELINE
        } else {
            CONTENT_BASELINE
        };
        let mut style = String::with_capacity(baseline.len() + artifact.css.len());
        style.push_str(baseline);
        style.push_str(&artifact.css);
        let style_changed = self.style != style;
        if style_changed {
            self.style = style;
        }

        match (body_changed, style_changed) {
            (true, true) => PreviewChange::BodyAndStyle,
            (true, false) => PreviewChange::Body,
            (false, true) => PreviewChange::Style,
            (false, false) => PreviewChange::Unchanged,
        }
    }

    /// Serialize the isolated document.
    pub fn document(&self) -> String {
        format!(
            "<html><head><style id=\"{STYLE_ELEMENT_ID}\">{}</style></head><body>{}</body></html>",
            self.style.replace("</style", "<\\/style"),
            self.body
        )
    }

    /// Host page embedding the document in a sandboxed iframe. While
    /// streaming it reloads itself every second.
    pub fn host_page(&self, streaming: bool) -> String {
        let refresh = if streaming {
            "\n<meta http-equiv=\"refresh\" content=\"1\">"
        } else {
            ""
        };
        format!(
            "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"UTF-8\">{refresh}
<title>Live Preview</title>
<style>html, body {{ margin: 0; height: 100%; background: #0f172a; }} iframe {{ border: 0; width: 100%; height: 100%; display: block; }}</style>
</head>
<body>
<iframe title=\"Live Preview\" sandbox=\"allow-scripts\" srcdoc=\"{}\"></iframe>
</body>
</html>
",
            escape_attr(&self.document())
        )
    }
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Preview host page on disk, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct PreviewFile {
    path: PathBuf,
}

impl PreviewFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, contents: &str) -> anyhow::Result<()> {
        write_atomic(&self.path, contents)
    }
}

/// Write via a sibling temp file and rename it into place.
pub fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents).with_context(|| format!("failed to write temp file: {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to move file into place: {}", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "preview.html".to_string());
    p.set_file_name(format!("{file}.tmp"));
    p
}

/// Keep `file` in sync with the session until the session goes away.
pub async fn follow(mut updates: watch::Receiver<ArtifactUpdate>, file: PreviewFile) -> anyhow::Result<()> {
    let mut preview = LivePreview::default();
    preview.mount();

    let mut was_streaming = None;
    loop {
        let update = updates.borrow_and_update().clone();
        let change = preview.apply(&update.artifact, update.streaming);
        // The host page also changes when the refresh tag comes or goes.
        if change.changed() || was_streaming != Some(update.streaming) {
            file.write(&preview.host_page(update.streaming))?;
            tracing::debug!(
                path = %file.path().display(),
                ?change,
                streaming = update.streaming,
                body_bytes = preview.body().len(),
                style_bytes = preview.style().len(),
                "preview updated"
            );
        }
        was_streaming = Some(update.streaming);

        if updates.changed().await.is_err() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_happens_once() {
        let mut p = LivePreview::default();
        assert!(p.mount());
        p.apply(&Artifact::new("<p>x</p>", ""), false);
        assert!(!p.mount());
        assert_eq!(p.body(), "<p>x</p>");
    }

    #[test]
    fn empty_html_shows_placeholder_with_transparent_baseline() {
        let mut p = LivePreview::default();
        assert_eq!(p.apply(&Artifact::default(), false), PreviewChange::BodyAndStyle);
        assert!(p.body().contains("Your website will appear here"));
        assert!(p.style().contains("background-color: transparent"));
    }

    #[test]
    fn content_baseline_precedes_caller_css() {
        let mut p = LivePreview::default();
        p.apply(&Artifact::new("<h1>Bread</h1>", "body { background-color: #000; }"), false);
        assert!(p.style().starts_with(CONTENT_BASELINE));
        assert!(p.style().ends_with("body { background-color: #000; }"));
    }

    #[test]
    fn streaming_skips_body_already_containing_candidate() {
        let mut p = LivePreview::default();
        p.apply(&Artifact::new("<h1>Bread</h1><p>fresh</p>", "h1{}"), false);

        let change = p.apply(&Artifact::new("<h1>Bread</h1>", "h1{color:red}"), true);
        assert_eq!(change, PreviewChange::Style);
        assert_eq!(p.body(), "<h1>Bread</h1><p>fresh</p>");
        assert!(p.style().ends_with("h1{color:red}"));

        let change = p.apply(&Artifact::new("<h1>Bread</h1><p>fresh</p><p>more", "h1{color:red}"), true);
        assert_eq!(change, PreviewChange::Body);
    }

    #[test]
    fn not_streaming_always_replaces_body() {
        let mut p = LivePreview::default();
        p.apply(&Artifact::new("<h1>Bread</h1><p>fresh</p>", ""), false);
        p.apply(&Artifact::new("<h1>Bread</h1>", ""), false);
        assert_eq!(p.body(), "<h1>Bread</h1>");
    }

    #[test]
    fn identical_update_is_unchanged() {
        let mut p = LivePreview::default();
        let a = Artifact::new("<h1>Bread</h1>", "h1{}");
        p.apply(&a, true);
        assert_eq!(p.apply(&a, true), PreviewChange::Unchanged);
        assert_eq!(p.apply(&a, false), PreviewChange::Unchanged);
    }

    #[test]
    fn document_keeps_style_element_intact() {
        let mut p = LivePreview::default();
        p.apply(&Artifact::new("<p>x</p>", "p::after { content: \"</style>\"; }"), false);
        let doc = p.document();
        assert!(doc.starts_with("<html><head><style id=\"dynamic-style\">"));
        assert_eq!(doc.matches("</style>").count(), 1);
        assert!(doc.ends_with("<body><p>x</p></body></html>"));
    }

    #[test]
    fn host_page_embeds_escaped_document() {
        let mut p = LivePreview::default();
        p.apply(&Artifact::new("<a href=\"/\">home & away</a>", ""), false);
        let page = p.host_page(false);
        assert!(page.contains("sandbox=\"allow-scripts\""));
        assert!(page.contains("&lt;a href=&quot;/&quot;&gt;home &amp; away&lt;/a&gt;"));
        assert!(!page.contains("http-equiv=\"refresh\""));
        assert!(p.host_page(true).contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn preview_file_is_written_atomically() {
        let dir = std::env::temp_dir().join(format!("sitecraft-preview-{}", std::process::id()));
        let file = PreviewFile::new(dir.join("nested").join("index.html"));
        file.write("<p>one</p>").unwrap();
        file.write("<p>two</p>").unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "<p>two</p>");
        assert!(!tmp_path(file.path()).exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
