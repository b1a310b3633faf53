//! Fenced-block extraction over a growing response buffer.
//!
//! A block opens with three backticks followed by its tag (matched without
//! regard to ASCII case) and any run of whitespace. It closes at the next
//! three backticks, or implicitly at the end of the buffer while the
//! response is still streaming. A missing block is the empty string.
//!
//! While a block is unterminated, a trailing run of one or two backticks is
//! held back: it may be the start of the closing fence, and showing it would
//! make a later result shorter than an earlier one. Once the response has
//! ended, [`BlockExtractor::finish`] releases them.

use serde::{Deserialize, Serialize};

const FENCE: &[u8] = b"```";

/// The HTML/CSS pair making up one website draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub html: String,
    pub css: String,
}

impl Artifact {
    pub fn new(html: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
        }
    }

    /// A draft exists once there is HTML to show.
    pub fn has_html(&self) -> bool {
        !self.html.is_empty()
    }
}

/// Cursor-keeping extractor for one tag.
///
/// Feed it successive states of an append-only buffer; it remembers where
/// the block content starts and how far the closing-fence search got, so
/// each call only scans the newly appended tail. Results are identical to
/// those of a fresh extractor on the same buffer.
#[derive(Debug, Clone)]
pub struct BlockExtractor {
    needle: Vec<u8>,
    opener_scan: usize,
    fence_end: Option<usize>,
    content_start: Option<usize>,
    close_scan: usize,
    content_end: Option<usize>,
}

impl BlockExtractor {
    pub fn new(tag: &str) -> Self {
        let mut needle = FENCE.to_vec();
        needle.extend_from_slice(tag.as_bytes());
        Self {
            needle,
            opener_scan: 0,
            fence_end: None,
            content_start: None,
            close_scan: 0,
            content_end: None,
        }
    }

    /// `buf` must extend the buffer passed on the previous call.
    pub fn extract<'a>(&mut self, buf: &'a str) -> &'a str {
        let bytes = buf.as_bytes();

        let start = match self.content_start {
            Some(start) => start,
            None => {
                let fence_end = match self.fence_end {
                    Some(end) => end,
                    None => {
                        let from = self.opener_scan.min(bytes.len());
                        let Some(i) = find_ignore_ascii_case(&bytes[from..], &self.needle) else {
                            self.opener_scan = bytes.len().saturating_sub(self.needle.len() - 1);
                            return "";
                        };
                        let end = from + i + self.needle.len();
                        self.fence_end = Some(end);
                        end
                    }
                };

                let after = &buf[fence_end..];
                let start = fence_end + (after.len() - after.trim_start().len());
                // More whitespace may still arrive.
                if start == buf.len() {
                    return "";
                }
                self.content_start = Some(start);
                start
            }
        };

        if let Some(end) = self.content_end {
            return &buf[start..end];
        }

        let from = self.close_scan.max(start).min(bytes.len());
        if let Some(i) = find_ignore_ascii_case(&bytes[from..], FENCE) {
            let end = from + i;
            self.content_end = Some(end);
            return &buf[start..end];
        }

        self.close_scan = bytes.len().saturating_sub(FENCE.len() - 1);
        buf[start..].trim_end_matches('`')
    }

    /// Content once `buf` is the complete response. An unterminated block
    /// runs to the end of the buffer, trailing backticks included.
    pub fn finish<'a>(&mut self, buf: &'a str) -> &'a str {
        let held = self.extract(buf);
        match (self.content_start, self.content_end) {
            (Some(start), None) => &buf[start..],
            _ => held,
        }
    }
}

/// Extracts the `html` and `css` blocks of one streamed response.
#[derive(Debug, Clone)]
pub struct ArtifactExtractor {
    html: BlockExtractor,
    css: BlockExtractor,
}

impl Default for ArtifactExtractor {
    fn default() -> Self {
        Self {
            html: BlockExtractor::new("html"),
            css: BlockExtractor::new("css"),
        }
    }
}

impl ArtifactExtractor {
    pub fn extract(&mut self, buf: &str) -> Artifact {
        Artifact::new(self.html.extract(buf), self.css.extract(buf))
    }

    pub fn finish(&mut self, buf: &str) -> Artifact {
        Artifact::new(self.html.finish(buf), self.css.finish(buf))
    }
}

fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}
