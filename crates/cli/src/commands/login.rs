//! Login command - authenticate against one platform

use anyhow::{Context, Result, bail};
use crosspost_adapters::bluesky::BlueskyAuth;
use crosspost_adapters::linkedin::LinkedInAuth;
use crosspost_adapters::telegram::{TelegramAuth, WidgetPayload};
use crosspost_adapters::twitter::TwitterAuth;
use crosspost_domain::{AuthStart, Credential, Platform, PlatformSession};
use secrecy::{ExposeSecret, SecretString};
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use crate::args::LoginArgs;
use crate::config::AppConfig;

pub async fn execute(args: LoginArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let platform: Platform = args
        .platform
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let session = acquire_session(platform, &config, args.payload.as_deref()).await?;
    print_identity(&session);
    println!();

    // OAuth tokens outlive this process only through the env vars the
    // config names; the other platforms log in again from config/env.
    match &session.credential {
        Credential::Linkedin { access_token, .. } => {
            println!("Store the token for `publish` by exporting:");
            println!(
                "  export {}='{}'",
                config.linkedin.access_token_env,
                access_token.expose_secret()
            );
        }
        Credential::Twitter {
            access_token,
            access_secret,
            ..
        } => {
            println!("Store the credential for `publish` by exporting:");
            println!(
                "  export {}='{}'",
                config.twitter.access_token_env,
                access_token.expose_secret()
            );
            println!(
                "  export {}='{}'",
                config.twitter.access_secret_env,
                access_secret.expose_secret()
            );
        }
        _ => {
            println!("`publish` repeats this login from the configured credentials.");
        }
    }

    Ok(())
}

/// Run the platform's login flow to completion
///
/// Redirect-based flows print the authorization URL and read the callback
/// URL back from stdin. The Telegram widget payload comes from a file or
/// stdin instead.
pub(crate) async fn acquire_session(
    platform: Platform,
    config: &AppConfig,
    telegram_payload: Option<&Path>,
) -> Result<PlatformSession> {
    match platform {
        Platform::Bluesky => login_bluesky(config).await,
        Platform::Linkedin => login_linkedin(config).await,
        Platform::Telegram => login_telegram(config, telegram_payload),
        Platform::Twitter => login_twitter(config).await,
    }
}

async fn login_bluesky(config: &AppConfig) -> Result<PlatformSession> {
    if config.bluesky.identifier.trim().is_empty() {
        bail!("bluesky.identifier is not configured");
    }
    let password = load_secret(&config.bluesky.app_password_env, "Bluesky app password")?;

    let auth = BlueskyAuth::with_base_url(config.bluesky.service_url.clone());
    let session = auth
        .login(&config.bluesky.identifier, &password)
        .await
        .context("Bluesky login failed")?;
    Ok(session)
}

async fn login_linkedin(config: &AppConfig) -> Result<PlatformSession> {
    let secret = load_secret(&config.linkedin.client_secret_env, "LinkedIn client secret")?;
    let auth = LinkedInAuth::new(
        config.linkedin.client_id.clone(),
        secret,
        config.linkedin.redirect_uri.clone(),
    )
    .context("LinkedIn adapter configuration is invalid")?;

    let AuthStart::Redirect { url, handshake } = auth.initiate() else {
        bail!("LinkedIn login did not produce an authorization URL");
    };

    println!("Open this URL in a browser and authorize the app:");
    println!("  {}", url);
    let callback = prompt("Paste the full redirect URL you landed on: ")?;

    let code = query_param(&callback, "code")
        .context("Redirect URL carries no `code` parameter")?;
    let state = query_param(&callback, "state").unwrap_or_default();

    auth.complete(&code, &state, handshake)
        .await
        .context("LinkedIn login failed")
}

async fn login_twitter(config: &AppConfig) -> Result<PlatformSession> {
    let secret = load_secret(&config.twitter.consumer_secret_env, "Twitter consumer secret")?;
    let auth = TwitterAuth::new(
        config.twitter.consumer_key.clone(),
        secret,
        config.twitter.callback_url.clone(),
    )
    .context("Twitter adapter configuration is invalid")?;

    let AuthStart::Redirect { url, handshake } = auth.initiate().await? else {
        bail!("Twitter login did not produce an authorization URL");
    };

    println!("Open this URL in a browser and authorize the app:");
    println!("  {}", url);
    let callback = prompt("Paste the full redirect URL you landed on: ")?;

    let token = query_param(&callback, "oauth_token")
        .context("Redirect URL carries no `oauth_token` parameter")?;
    let verifier = query_param(&callback, "oauth_verifier")
        .context("Redirect URL carries no `oauth_verifier` parameter")?;

    auth.complete(&token, &verifier, handshake)
        .await
        .context("Twitter login failed")
}

fn login_telegram(config: &AppConfig, payload_path: Option<&Path>) -> Result<PlatformSession> {
    let token = load_secret(&config.telegram.bot_token_env, "Telegram bot token")?;
    let auth = TelegramAuth::new(token).context("Telegram adapter configuration is invalid")?;

    let raw = match payload_path {
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read widget payload from stdin")?;
            text
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read widget payload: {}", path.display()))?,
        None => bail!("Telegram login needs --payload with the widget callback JSON"),
    };

    let payload: WidgetPayload =
        serde_json::from_str(&raw).context("Widget payload is not valid JSON")?;

    auth.verify(&payload).context("Telegram login failed")
}

/// Build a LinkedIn session for `publish` from the stored access token
pub(crate) async fn linkedin_session_from_env(config: &AppConfig) -> Result<PlatformSession> {
    let token = load_secret(&config.linkedin.access_token_env, "LinkedIn access token")
        .context("No stored LinkedIn token; run 'crosspost login linkedin' and export the printed variable")?;
    let secret = load_secret(&config.linkedin.client_secret_env, "LinkedIn client secret")?;
    let auth = LinkedInAuth::new(
        config.linkedin.client_id.clone(),
        secret,
        config.linkedin.redirect_uri.clone(),
    )
    .context("LinkedIn adapter configuration is invalid")?;

    auth.session_from_token(token)
        .await
        .context("Stored LinkedIn token was rejected; run 'crosspost login linkedin' again")
}

/// Build a Twitter session for `publish` from the stored access credential
pub(crate) async fn twitter_session_from_env(config: &AppConfig) -> Result<PlatformSession> {
    let token = load_secret(&config.twitter.access_token_env, "Twitter access token")
        .context("No stored Twitter credential; run 'crosspost login twitter' and export the printed variables")?;
    let token_secret = load_secret(&config.twitter.access_secret_env, "Twitter access secret")?;
    let secret = load_secret(&config.twitter.consumer_secret_env, "Twitter consumer secret")?;
    let auth = TwitterAuth::new(
        config.twitter.consumer_key.clone(),
        secret,
        config.twitter.callback_url.clone(),
    )
    .context("Twitter adapter configuration is invalid")?;

    auth.session_from_token(token, token_secret)
        .await
        .context("Stored Twitter credential was rejected; run 'crosspost login twitter' again")
}

pub(crate) fn load_secret(env_var: &str, what: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No environment variable configured for {}", what);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("Missing env var {} for {}", env_var, what))?;

    if value.trim().is_empty() {
        bail!("Env var {} is empty ({})", env_var, what);
    }

    Ok(SecretString::new(value.into()))
}

pub(crate) fn print_identity(session: &PlatformSession) {
    let identity = &session.identity;
    let name = identity
        .display_name
        .as_deref()
        .or(identity.handle.as_deref())
        .unwrap_or("(no name returned)");

    println!("Logged in to {} as {}", session.platform(), name);
    if let Some(handle) = &identity.handle {
        println!("  handle: {}", handle);
    }
    if let Some(avatar) = &identity.avatar_url {
        println!("  avatar: {}", avatar);
    }
    if let Some(expires_at) = session.expires_at {
        println!("  expires: {}", expires_at);
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn query_param(raw_url: &str, key: &str) -> Option<String> {
    let parsed = url::Url::parse(raw_url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
