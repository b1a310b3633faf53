use crate::prompts::SiteKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate and refine websites with a language model, with a live preview
#[derive(Debug, Parser)]
#[command(name = "sitecraft")]
#[command(version)]
#[command(about = "Generate and refine websites with a language model", long_about = None)]
// Description words must never be taken for subcommand names.
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    /// Model name
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// Provider (default: config/provider or "anthropic")
    #[arg(long = "provider", global = true)]
    pub provider: Option<String>,

    /// Maximum response tokens
    #[arg(long = "max-tokens", global = true)]
    pub max_tokens: Option<u32>,

    /// Live preview page (default: config/preview_path or under the state dir)
    #[arg(long = "preview", value_name = "FILE", global = true)]
    pub preview: Option<PathBuf>,

    /// Do not write a live preview page
    #[arg(long = "no-preview", global = true, conflicts_with = "preview")]
    pub no_preview: bool,

    /// Write index.html and style.css into this directory instead of stdout
    #[arg(short = 'o', long = "out", value_name = "DIR", global = true)]
    pub out: Option<PathBuf>,

    /// Generate a specific kind of site
    #[arg(long = "kind", value_enum)]
    pub kind: Option<SiteKind>,

    /// Extra requirements for --kind
    #[arg(long = "requirements", requires = "kind")]
    pub requirements: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Website description (used when no subcommand is given)
    #[arg(value_name = "DESCRIPTION")]
    pub description: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Modify an existing site
    Modify {
        /// Current HTML
        #[arg(long = "html", value_name = "FILE")]
        html: PathBuf,
        /// Current CSS
        #[arg(long = "css", value_name = "FILE")]
        css: PathBuf,
        /// What to change
        #[arg(value_name = "DESCRIPTION")]
        description: Vec<String>,
    },

    /// Open a site in CodeSandbox
    Export {
        #[arg(long = "html", value_name = "FILE")]
        html: PathBuf,
        #[arg(long = "css", value_name = "FILE")]
        css: PathBuf,
    },

    /// Render the product landing page
    Landing,

    /// Run the interactive builder
    #[cfg(feature = "tui")]
    Tui,
}
