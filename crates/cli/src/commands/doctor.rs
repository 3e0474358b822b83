//! Doctor command - validate configuration and show status

use anyhow::Result;
use crosspost_adapters::telegram::BotApi;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    bluesky: CheckResult,
    linkedin: CheckResult,
    telegram: CheckResult,
    twitter: CheckResult,
    summarizer: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        bluesky: CheckResult::error("Not checked"),
        linkedin: CheckResult::error("Not checked"),
        telegram: CheckResult::error("Not checked"),
        twitter: CheckResult::error("Not checked"),
        summarizer: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.bluesky = check_bluesky(config);
        report.linkedin = check_linkedin(config);
        report.telegram = check_telegram(config).await;
        report.twitter = check_twitter(config);
        report.summarizer = check_summarizer(config);
    }

    let checks = [
        &report.config,
        &report.bluesky,
        &report.linkedin,
        &report.telegram,
        &report.twitter,
        &report.summarizer,
    ];
    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());
    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        anyhow::bail!("Doctor found errors");
    }
    Ok(())
}

fn env_present(env_var: &str) -> bool {
    std::env::var(env_var).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn check_bluesky(config: &AppConfig) -> CheckResult {
    if config.bluesky.identifier.trim().is_empty() {
        return CheckResult::warn("Not configured (bluesky.identifier is empty)");
    }
    if !env_present(&config.bluesky.app_password_env) {
        return CheckResult::warn(format!(
            "Identifier set but {} is not set",
            config.bluesky.app_password_env
        ));
    }
    CheckResult::ok(format!("Configured for {}", config.bluesky.identifier))
}

fn check_linkedin(config: &AppConfig) -> CheckResult {
    if config.linkedin.client_id.trim().is_empty() {
        return CheckResult::warn("Not configured (linkedin.client_id is empty)");
    }
    if config.linkedin.redirect_uri.trim().is_empty() {
        return CheckResult::error("linkedin.redirect_uri is required and must match the registered URI");
    }
    if !env_present(&config.linkedin.client_secret_env) {
        return CheckResult::warn(format!(
            "Client id set but {} is not set",
            config.linkedin.client_secret_env
        ));
    }
    if !env_present(&config.linkedin.access_token_env) {
        return CheckResult::warn(format!(
            "No stored token ({} unset); run 'crosspost login linkedin'",
            config.linkedin.access_token_env
        ));
    }
    CheckResult::ok("OAuth client and stored token configured")
}

async fn check_telegram(config: &AppConfig) -> CheckResult {
    if !env_present(&config.telegram.bot_token_env) {
        return CheckResult::warn(format!(
            "Not configured ({} is not set)",
            config.telegram.bot_token_env
        ));
    }
    let token = match std::env::var(&config.telegram.bot_token_env) {
        Ok(token) => token,
        Err(e) => return CheckResult::error(format!("Failed to read bot token: {}", e)),
    };

    // Round trip to the Bot API; confirms the token actually works
    let api = BotApi::new(secrecy::SecretString::new(token.into()));
    let bot = match api.get_me().await {
        Ok(profile) => profile.username.unwrap_or_else(|| profile.id.to_string()),
        Err(e) => return CheckResult::error(format!("getMe failed: {}", e)),
    };

    match api.get_webhook_info().await {
        Ok(info) if info.url.is_empty() => {
            CheckResult::ok(format!("Bot @{} reachable, no webhook registered", bot))
        }
        Ok(info) => match info.last_error_message {
            Some(error) => CheckResult::warn(format!(
                "Bot @{} reachable, webhook {} last error: {}",
                bot, info.url, error
            )),
            None => CheckResult::ok(format!(
                "Bot @{} reachable, webhook {} ({} pending update(s))",
                bot, info.url, info.pending_update_count
            )),
        },
        Err(e) => CheckResult::warn(format!(
            "Bot @{} reachable but getWebhookInfo failed: {}",
            bot, e
        )),
    }
}

fn check_twitter(config: &AppConfig) -> CheckResult {
    if config.twitter.consumer_key.trim().is_empty() {
        return CheckResult::warn("Not configured (twitter.consumer_key is empty)");
    }
    if config.twitter.callback_url.trim().is_empty() {
        return CheckResult::error("twitter.callback_url is required for the login flow");
    }
    if !env_present(&config.twitter.consumer_secret_env) {
        return CheckResult::warn(format!(
            "Consumer key set but {} is not set",
            config.twitter.consumer_secret_env
        ));
    }
    if !env_present(&config.twitter.access_token_env)
        || !env_present(&config.twitter.access_secret_env)
    {
        return CheckResult::warn(format!(
            "No stored credential ({}/{} unset); run 'crosspost login twitter'",
            config.twitter.access_token_env, config.twitter.access_secret_env
        ));
    }
    CheckResult::ok("OAuth client and stored credential configured")
}

fn check_summarizer(config: &AppConfig) -> CheckResult {
    match config.summarizer.provider.as_str() {
        "stub" => CheckResult::ok("Stub summarizer (no API calls)"),
        "openai" => {
            if env_present(&config.summarizer.api_key_env) {
                CheckResult::ok(format!("OpenAI, model {}", config.summarizer.model))
            } else {
                CheckResult::warn(format!(
                    "OpenAI selected but {} is not set",
                    config.summarizer.api_key_env
                ))
            }
        }
        other => CheckResult::error(format!("Unknown summarizer provider: {}", other)),
    }
}

fn print_report(report: &DoctorReport) {
    println!("crosspost doctor");
    println!("================");
    print_check("config", &report.config);
    print_check("bluesky", &report.bluesky);
    print_check("linkedin", &report.linkedin);
    print_check("telegram", &report.telegram);
    print_check("twitter", &report.twitter);
    print_check("summarizer", &report.summarizer);
    println!();
    println!("Overall: {}", report.overall);
}

fn print_check(name: &str, check: &CheckResult) {
    println!("  [{:<5}] {:<10} {}", check.status, name, check.message);
}
