//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// crosspost: publish one article to several platforms at once
#[derive(Parser, Debug)]
#[command(name = "crosspost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to one platform and show the resulting identity
    Login(LoginArgs),

    /// Fetch an article and generate per-platform drafts
    Compose(ComposeArgs),

    /// Publish drafts to every logged-in platform
    Publish(PublishArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Platform to log in to (bluesky, linkedin, telegram, twitter)
    pub platform: String,

    /// Telegram login-widget payload as a JSON file (use - for stdin)
    #[arg(long)]
    pub payload: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Article URL to fetch, summarize, and attach as a link preview
    #[arg(long, conflicts_with = "file")]
    pub url: Option<String>,

    /// File containing article text (use - for stdin)
    #[arg(long, conflicts_with = "url")]
    pub file: Option<PathBuf>,

    /// Platforms to draft for (defaults to all)
    #[arg(long, value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Where to write the editable drafts file
    #[arg(long, default_value = "./drafts.toml")]
    pub out: PathBuf,

    /// Output drafts as JSON to stdout instead of writing a file
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Drafts file produced by `compose` (and freely edited since)
    #[arg(long, default_value = "./drafts.toml")]
    pub drafts: PathBuf,

    /// Platforms to publish to (defaults to every drafted platform)
    #[arg(long, value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Validate and report without calling any platform
    #[arg(long)]
    pub dry_run: bool,

    /// Telegram login-widget payload as a JSON file (use - for stdin)
    #[arg(long)]
    pub telegram_payload: Option<PathBuf>,

    /// Output the publish report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
