//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub bluesky: BlueskyConfig,

    #[serde(default)]
    pub linkedin: LinkedinConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub twitter: TwitterConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    /// Handle or account email
    #[serde(default)]
    pub identifier: String,

    #[serde(default = "default_bluesky_password_env")]
    pub app_password_env: String,

    #[serde(default = "default_bluesky_service")]
    pub service_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedinConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_linkedin_secret_env")]
    pub client_secret_env: String,

    /// Must byte-match the URI registered with the provider
    #[serde(default)]
    pub redirect_uri: String,

    /// Where `login linkedin` tells the user to store the token and
    /// where `publish` reads it back from
    #[serde(default = "default_linkedin_token_env")]
    pub access_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_token_env")]
    pub bot_token_env: String,

    /// Optional group or channel chat the bot also posts to
    #[serde(default)]
    pub group_chat_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default)]
    pub consumer_key: String,

    #[serde(default = "default_twitter_secret_env")]
    pub consumer_secret_env: String,

    #[serde(default)]
    pub callback_url: String,

    #[serde(default = "default_twitter_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_twitter_token_secret_env")]
    pub access_secret_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// "openai" or "stub"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_bluesky_password_env() -> String {
    "BLUESKY_APP_PASSWORD".to_string()
}

fn default_bluesky_service() -> String {
    "https://bsky.social".to_string()
}

fn default_linkedin_secret_env() -> String {
    "LINKEDIN_CLIENT_SECRET".to_string()
}

fn default_linkedin_token_env() -> String {
    "LINKEDIN_ACCESS_TOKEN".to_string()
}

fn default_telegram_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_twitter_secret_env() -> String {
    "TWITTER_CONSUMER_SECRET".to_string()
}

fn default_twitter_token_env() -> String {
    "TWITTER_ACCESS_TOKEN".to_string()
}

fn default_twitter_token_secret_env() -> String {
    "TWITTER_ACCESS_SECRET".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_timeout() -> u64 {
    60
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            app_password_env: default_bluesky_password_env(),
            service_url: default_bluesky_service(),
        }
    }
}

impl Default for LinkedinConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret_env: default_linkedin_secret_env(),
            redirect_uri: String::new(),
            access_token_env: default_linkedin_token_env(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_telegram_token_env(),
            group_chat_id: None,
        }
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret_env: default_twitter_secret_env(),
            callback_url: String::new(),
            access_token_env: default_twitter_token_env(),
            access_secret_env: default_twitter_token_secret_env(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout(),
            api_key_env: default_openai_api_key_env(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("CROSSPOST")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# crosspost configuration

[general]
log_level = "info"

[bluesky]
identifier = "you.bsky.social"
app_password_env = "BLUESKY_APP_PASSWORD"
service_url = "https://bsky.social"

[linkedin]
client_id = ""
client_secret_env = "LINKEDIN_CLIENT_SECRET"
# Must match the redirect URI registered with LinkedIn exactly
redirect_uri = ""
# `login linkedin` prints the export line for this variable
access_token_env = "LINKEDIN_ACCESS_TOKEN"

[telegram]
bot_token_env = "TELEGRAM_BOT_TOKEN"
# group_chat_id = -1001234567890

[twitter]
consumer_key = ""
consumer_secret_env = "TWITTER_CONSUMER_SECRET"
callback_url = ""
# `login twitter` prints the export lines for these variables
access_token_env = "TWITTER_ACCESS_TOKEN"
access_secret_env = "TWITTER_ACCESS_SECRET"

[summarizer]
provider = "openai"  # openai, stub
model = "gpt-4o-mini"
temperature = 0.7
max_output_tokens = 1024
timeout_secs = 60
api_key_env = "OPENAI_API_KEY"
"#
        .to_string()
    }
}
