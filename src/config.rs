use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 8000;
pub const DEFAULT_TICK_MS: u64 = 500;
pub const DEFAULT_INSIGHT_MS: u64 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Default model (optional)
    pub model: Option<String>,

    /// Provider identifier: "anthropic" or "stub".
    pub provider: Option<String>,

    /// Upper bound on response length.
    pub max_tokens: Option<u32>,

    /// Where the live preview page is written.
    pub preview_path: Option<PathBuf>,

    pub anthropic: AnthropicConfig,
    pub progress: ProgressConfig,
}

#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

// Keep the key out of debug logs.
impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProgressConfig {
    /// Period of the progress tick, in milliseconds.
    pub tick_ms: Option<u64>,

    /// Period of the insight caption rotation, in milliseconds.
    pub insight_ms: Option<u64>,
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let s = String::from_utf8(bytes).context("config is not valid UTF-8")?;
        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_none() {
        let path = std::env::temp_dir().join("sitecraft-definitely-missing").join("config.toml");
        assert!(Config::load_optional(path).unwrap().is_none());
    }

    #[test]
    fn parses_all_sections() {
        let dir = std::env::temp_dir().join(format!("sitecraft-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
provider = "stub"
model = "claude-test"
max_tokens = 2048
preview_path = "/tmp/site/index.html"

[anthropic]
api_key = "sk-secret"

[progress]
tick_ms = 250
"#,
        )
        .unwrap();

        let cfg = Config::load_optional(&path).unwrap().unwrap();
        assert_eq!(cfg.provider.as_deref(), Some("stub"));
        assert_eq!(cfg.model.as_deref(), Some("claude-test"));
        assert_eq!(cfg.max_tokens, Some(2048));
        assert_eq!(cfg.preview_path, Some(PathBuf::from("/tmp/site/index.html")));
        assert_eq!(cfg.anthropic.api_key.as_deref(), Some("sk-secret"));
        assert_eq!(cfg.anthropic.base_url, None);
        assert_eq!(cfg.progress.tick_ms, Some(250));
        assert_eq!(cfg.progress.insight_ms, None);
        assert!(!format!("{cfg:?}").contains("sk-secret"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = std::env::temp_dir().join(format!("sitecraft-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        let err = Config::load_optional(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
