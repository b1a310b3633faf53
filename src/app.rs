use crate::extract::Artifact;
use crate::preview::{self, PreviewFile};
use crate::progress::{NarratorState, ProgressNarrator};
use crate::prompts::SiteKind;
use crate::session::{Session, SessionError};
use crate::{cli, config, export, paths, provider, shell};
use anyhow::Context;
use provider::Provider;
use std::future::Future;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Everything a command needs after flags, environment and config are merged.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub preview: Option<PathBuf>,
    pub tick: Duration,
    pub insight: Duration,
}

impl Settings {
    pub fn resolve(args: &cli::Args, cfg: Option<&config::Config>) -> anyhow::Result<Self> {
        let provider = args
            .provider
            .clone()
            .or_else(|| cfg.and_then(|c| c.provider.clone()))
            .unwrap_or_else(|| config::DEFAULT_PROVIDER.to_string());

        let model = args
            .model
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_MODEL").ok())
            .or_else(|| cfg.and_then(|c| c.model.clone()))
            .unwrap_or_else(|| config::DEFAULT_MODEL.to_string());

        let max_tokens = args
            .max_tokens
            .or_else(|| cfg.and_then(|c| c.max_tokens))
            .unwrap_or(config::DEFAULT_MAX_TOKENS);

        let preview = if args.no_preview {
            None
        } else if let Some(p) = args.preview.clone().or_else(|| cfg.and_then(|c| c.preview_path.clone())) {
            Some(p)
        } else {
            Some(paths::preview_path()?)
        };

        let tick = cfg.and_then(|c| c.progress.tick_ms).unwrap_or(config::DEFAULT_TICK_MS);
        let insight = cfg.and_then(|c| c.progress.insight_ms).unwrap_or(config::DEFAULT_INSIGHT_MS);

        Ok(Self {
            provider,
            model,
            max_tokens,
            preview,
            tick: Duration::from_millis(tick),
            insight: Duration::from_millis(insight),
        })
    }

    pub fn narrator(&self) -> ProgressNarrator {
        ProgressNarrator::new(self.tick, self.insight)
    }
}

pub fn build_provider(
    http: &reqwest::Client,
    cfg: Option<&config::Config>,
    provider_name: &str,
) -> anyhow::Result<Arc<dyn Provider + Send + Sync>> {
    match provider_name {
        "anthropic" => {
            #[cfg(feature = "anthropic")]
            {
                let api_key = std::env::var("ANTHROPIC_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .or_else(|| cfg.and_then(|c| c.anthropic.api_key.clone()))
                    .context("missing API key (set ANTHROPIC_API_KEY or config.toml anthropic.api_key)")?;
                let base_url = cfg.and_then(|c| c.anthropic.base_url.as_deref());

                let p = provider::anthropic::AnthropicProvider::new(http.clone(), api_key, base_url)?;
                Ok(Arc::new(p))
            }
            #[cfg(not(feature = "anthropic"))]
            {
                let _ = http;
                let _ = cfg;
                anyhow::bail!("anthropic provider is not enabled in this build")
            }
        }
        "stub" => Ok(Arc::new(provider::stub::StubProvider::demo())),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}

pub fn build_session(
    http: &reqwest::Client,
    cfg: Option<&config::Config>,
    settings: &Settings,
) -> anyhow::Result<Session> {
    let provider = build_provider(http, cfg, &settings.provider)?;
    tracing::debug!(provider = provider.name(), model = %settings.model, "session ready");
    Ok(Session::new(provider, settings.model.clone(), settings.max_tokens))
}

/// Keep the preview page in sync with `session` in the background.
pub fn spawn_preview(session: &Session, settings: &Settings) -> Option<JoinHandle<anyhow::Result<()>>> {
    let path = settings.preview.clone()?;
    eprintln!("Live preview: {}", path.display());
    Some(tokio::spawn(preview::follow(session.subscribe(), PreviewFile::new(path))))
}

pub async fn cmd_generate(
    session: Session,
    settings: &Settings,
    description: &str,
    kind: Option<SiteKind>,
    requirements: Option<String>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let preview = spawn_preview(&session, settings);
    let res = match kind {
        Some(kind) => narrate(settings, session.generate_specialized(description, kind, requirements)).await,
        None => narrate(settings, session.generate(description)).await,
    };
    finish(session, preview, res, out).await
}

pub async fn cmd_modify(
    session: Session,
    settings: &Settings,
    description: &str,
    html: &Path,
    css: &Path,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let prior = read_artifact(html, css)?;
    let preview = spawn_preview(&session, settings);
    let res = narrate(settings, session.modify_with(description, prior)).await;
    finish(session, preview, res, out).await
}

pub async fn cmd_export(http: &reqwest::Client, html: &Path, css: &Path) -> anyhow::Result<()> {
    let artifact = read_artifact(html, css)?;
    let url = export::open_in_sandbox(http, &artifact, export::DEFINE_URL).await?;
    println!("{url}");
    Ok(())
}

pub fn cmd_landing(out: Option<&Path>) -> anyhow::Result<()> {
    let page = shell::render_landing();
    match out {
        Some(dir) => {
            let path = dir.join("index.html");
            preview::write_atomic(&path, &page)?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{page}"),
    }
    Ok(())
}

/// Run `fut` while narrating synthetic progress on stderr.
async fn narrate<F>(settings: &Settings, fut: F) -> Result<Artifact, SessionError>
where
    F: Future<Output = Result<Artifact, SessionError>>,
{
    let tty = std::io::stderr().is_terminal();
    let mut narrator = settings.narrator();
    narrator.start();

    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(settings.tick.min(settings.insight));
    tokio::pin!(fut);

    let mut last_step = None;
    let res = loop {
        tokio::select! {
            res = &mut fut => break res,
            _ = ticker.tick() => {
                if !narrator.advance(started.elapsed()) {
                    continue;
                }
                if tty {
                    eprint!("\r\x1b[2K{}", narrator.status_line());
                } else if last_step != Some(narrator.snapshot().current_step) {
                    eprintln!("{}", narrator.status_line());
                }
                last_step = Some(narrator.snapshot().current_step);
            }
        }
    };

    if res.is_ok() {
        narrator.complete();
    }
    if tty {
        if narrator.state() == NarratorState::Completing {
            eprintln!("\r\x1b[2K{}", narrator.status_line());
        } else {
            eprintln!();
        }
    }
    narrator.finish();
    res
}

async fn finish(
    session: Session,
    preview: Option<JoinHandle<anyhow::Result<()>>>,
    res: Result<Artifact, SessionError>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    // Dropping the last handle closes the update channel; the follower
    // writes the final state and exits.
    drop(session);
    if let Some(handle) = preview {
        handle.await.context("preview task panicked")??;
    }

    let artifact = res?;
    write_artifact(&artifact, out)
}

fn read_artifact(html: &Path, css: &Path) -> anyhow::Result<Artifact> {
    let html = std::fs::read_to_string(html).with_context(|| format!("failed to read HTML: {}", html.display()))?;
    let css = std::fs::read_to_string(css).with_context(|| format!("failed to read CSS: {}", css.display()))?;
    Ok(Artifact::new(html, css))
}

fn write_artifact(artifact: &Artifact, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(dir) => {
            preview::write_atomic(&dir.join("index.html"), &artifact.html)?;
            preview::write_atomic(&dir.join("style.css"), &artifact.css)?;
            eprintln!("Wrote {}", dir.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "```html\n{}```\n\n```css\n{}```\n", ensure_newline(&artifact.html), ensure_newline(&artifact.css))?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn ensure_newline(s: &str) -> String {
    if s.is_empty() || s.ends_with('\n') {
        s.to_string()
    } else {
        format!("{s}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_config() {
        let cfg = config::Config {
            model: Some("from-config".into()),
            provider: Some("stub".into()),
            max_tokens: Some(100),
            preview_path: Some(PathBuf::from("/tmp/cfg-preview.html")),
            ..Default::default()
        };
        let args = cli::Args::parse_from(["sitecraft", "--max-tokens", "200", "--preview", "/tmp/flag.html", "hi"]);
        let s = Settings::resolve(&args, Some(&cfg)).unwrap();
        assert_eq!(s.provider, "stub");
        assert_eq!(s.max_tokens, 200);
        assert_eq!(s.preview, Some(PathBuf::from("/tmp/flag.html")));
        assert_eq!(s.tick, Duration::from_millis(config::DEFAULT_TICK_MS));
    }

    #[test]
    fn no_preview_disables_preview() {
        let args = cli::Args::parse_from(["sitecraft", "--no-preview", "hi"]);
        let s = Settings::resolve(&args, None).unwrap();
        assert_eq!(s.preview, None);
        assert_eq!(s.provider, config::DEFAULT_PROVIDER);
        assert_eq!(s.max_tokens, config::DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = build_provider(&reqwest::Client::new(), None, "nope").err().unwrap();
        assert_eq!(err.to_string(), "unknown provider: nope");
    }

    #[tokio::test]
    async fn generate_writes_outputs_and_preview() {
        let dir = std::env::temp_dir().join(format!("sitecraft-app-{}", std::process::id()));
        let settings = Settings {
            provider: "stub".into(),
            model: "m".into(),
            max_tokens: 10,
            preview: Some(dir.join("preview").join("index.html")),
            tick: Duration::from_millis(5),
            insight: Duration::from_millis(5),
        };
        let stub = provider::stub::StubProvider::scripted(["```html\n<h1>Bread</h1>\n```", "\n```css\n", "h1{color:red}\n```"]);
        let session = Session::new(Arc::new(stub), "m", 10);

        let out = dir.join("site");
        cmd_generate(session, &settings, "a bakery landing page", None, None, Some(&out))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(out.join("index.html")).unwrap(), "<h1>Bread</h1>\n");
        assert_eq!(std::fs::read_to_string(out.join("style.css")).unwrap(), "h1{color:red}\n");
        let page = std::fs::read_to_string(dir.join("preview").join("index.html")).unwrap();
        assert!(page.contains("&lt;h1&gt;Bread&lt;/h1&gt;"));
        assert!(!page.contains("http-equiv=\"refresh\""));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn ensure_newline_adds_only_when_missing() {
        assert_eq!(ensure_newline("a"), "a\n");
        assert_eq!(ensure_newline("a\n"), "a\n");
        assert_eq!(ensure_newline(""), "");
    }
}
