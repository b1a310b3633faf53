mod app;
mod cli;
mod config;
mod export;
mod extract;
mod paths;
mod preview;
mod progress;
mod prompts;
mod provider;
mod session;
mod shell;

#[cfg(feature = "tui")]
mod tui;

use anyhow::Context;
use clap::Parser;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the generated site; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let config_dir = paths::config_dir()?;
    let cfg = config::Config::load_optional(config_dir.join("config.toml"))?;
    tracing::debug!(?config_dir, ?cfg, "resolved config");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    let out = args.out.as_deref();

    match &args.cmd {
        Some(cli::Command::Landing) => return app::cmd_landing(out),
        Some(cli::Command::Export { html, css }) => return app::cmd_export(&http, html, css).await,
        Some(cli::Command::Modify { html, css, description }) => {
            let settings = app::Settings::resolve(&args, cfg.as_ref())?;
            let session = app::build_session(&http, cfg.as_ref(), &settings)?;
            let description = description.join(" ");
            return app::cmd_modify(session, &settings, &description, html, css, out).await;
        }
        #[cfg(feature = "tui")]
        Some(cli::Command::Tui) => {
            let settings = app::Settings::resolve(&args, cfg.as_ref())?;
            let session = app::build_session(&http, cfg.as_ref(), &settings)?;
            return tui::run_tui(session, settings).await;
        }
        None => {}
    }

    let description = args.description.join(" ");
    if description.trim().is_empty() {
        anyhow::bail!("No description provided. Try: sitecraft \"a landing page for a bakery\"");
    }

    let settings = app::Settings::resolve(&args, cfg.as_ref())?;
    let session = app::build_session(&http, cfg.as_ref(), &settings)?;
    app::cmd_generate(session, &settings, &description, args.kind, args.requirements.clone(), out).await
}
