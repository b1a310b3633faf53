use anyhow::Context;
use std::env;
use std::path::{Path, PathBuf};

fn home_dir() -> anyhow::Result<PathBuf> {
    // HOME is standard on Unix; Windows support can be expanded later.
    let home = env::var_os("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home))
}

fn ensure_dir(path: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))?;
    Ok(path.to_path_buf())
}

fn sitecraft_home() -> Option<PathBuf> {
    env::var_os("SITECRAFT_HOME").map(PathBuf::from)
}

pub fn config_dir() -> anyhow::Result<PathBuf> {
    if let Some(base) = sitecraft_home() {
        return ensure_dir(&base.join("config"));
    }

    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return ensure_dir(&xdg.join("sitecraft"));
    }

    ensure_dir(&home_dir()?.join(".config").join("sitecraft"))
}

pub fn state_dir() -> anyhow::Result<PathBuf> {
    if let Some(base) = sitecraft_home() {
        return ensure_dir(&base.join("state"));
    }

    if let Some(xdg) = env::var_os("XDG_STATE_HOME").map(PathBuf::from) {
        return ensure_dir(&xdg.join("sitecraft"));
    }

    ensure_dir(&home_dir()?.join(".local").join("state").join("sitecraft"))
}

/// Default location of the live preview host page.
pub fn preview_path() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("preview").join("index.html"))
}
