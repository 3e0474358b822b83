//! Publish command - broadcast drafts to every logged-in platform

use anyhow::{Context, Result, bail};
use crosspost_adapters::StubPublisher;
use crosspost_adapters::bluesky::BlueskyPublisher;
use crosspost_adapters::linkedin::LinkedInPublisher;
use crosspost_adapters::session::InMemorySessionStore;
use crosspost_adapters::telegram::{TelegramDestination, TelegramPublisher};
use crosspost_adapters::twitter::TwitterPublisher;
use crosspost_domain::usecases::PublishAll;
use crosspost_domain::{
    Credential, DraftSet, Identity, Outcome, Platform, PlatformPublisher, PlatformSession,
    PublishReport, SessionStore,
};
use secrecy::SecretString;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::args::PublishArgs;
use crate::commands::compose::parse_platforms;
use crate::commands::login::{
    acquire_session, linkedin_session_from_env, load_secret, twitter_session_from_env,
};
use crate::config::AppConfig;

pub async fn execute(args: PublishArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref()).unwrap_or_default();

    let raw = std::fs::read_to_string(&args.drafts)
        .with_context(|| format!("Failed to read drafts file: {}", args.drafts.display()))?;
    let all_drafts: DraftSet =
        toml::from_str(&raw).context("Drafts file is not valid TOML")?;
    if all_drafts.is_empty() {
        bail!("Drafts file contains no drafts; run 'crosspost compose' first");
    }

    // Default to every drafted platform; an explicit list narrows it
    let requested = if args.platforms.is_empty() {
        all_drafts.drafts.iter().map(|d| d.platform).collect()
    } else {
        parse_platforms(&args.platforms)?
    };

    let drafts: DraftSet = all_drafts
        .drafts
        .into_iter()
        .filter(|d| requested.contains(&d.platform))
        .collect();
    if drafts.is_empty() {
        bail!("No drafts match the requested platforms");
    }

    let store = InMemorySessionStore::new();
    let platforms: Vec<Platform> = Platform::ALL
        .into_iter()
        .filter(|p| drafts.get(*p).is_some())
        .collect();

    let targets = if args.dry_run {
        // Validate drafts and show routing without touching any provider
        for &platform in &platforms {
            store.put(placeholder_session(platform)).await?;
        }
        stub_targets(&platforms, &config)
    } else {
        // Bluesky logs in and Telegram verifies its widget payload inline;
        // the OAuth platforms come from tokens stored by `login`
        for &platform in &platforms {
            let session = match platform {
                Platform::Linkedin => linkedin_session_from_env(&config).await,
                Platform::Twitter => twitter_session_from_env(&config).await,
                _ => acquire_session(platform, &config, args.telegram_payload.as_deref()).await,
            }
            .with_context(|| format!("Login failed for {}", platform))?;
            store.put(session).await?;
        }
        live_targets(&platforms, &config)?
    };

    let orchestrator = PublishAll::new(targets);
    let report = orchestrator.publish_all(&store, &drafts).await?;

    render_report(&report, args.dry_run, args.json)?;

    if report.failed() > 0 {
        bail!("{} of {} target(s) failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}

fn stub_targets(platforms: &[Platform], config: &AppConfig) -> Vec<Arc<dyn PlatformPublisher>> {
    let mut targets: Vec<Arc<dyn PlatformPublisher>> = Vec::new();
    for &platform in platforms {
        targets.push(Arc::new(StubPublisher::new(platform)));
        if platform == Platform::Telegram && config.telegram.group_chat_id.is_some() {
            targets.push(Arc::new(
                StubPublisher::new(Platform::Telegram).with_target("telegram:group"),
            ));
        }
    }
    targets
}

fn live_targets(
    platforms: &[Platform],
    config: &AppConfig,
) -> Result<Vec<Arc<dyn PlatformPublisher>>> {
    let mut targets: Vec<Arc<dyn PlatformPublisher>> = Vec::new();
    for &platform in platforms {
        match platform {
            Platform::Bluesky => {
                targets.push(Arc::new(BlueskyPublisher::with_base_url(
                    config.bluesky.service_url.clone(),
                )));
            }
            Platform::Linkedin => {
                targets.push(Arc::new(LinkedInPublisher::new()));
            }
            Platform::Telegram => {
                let token = load_secret(&config.telegram.bot_token_env, "Telegram bot token")?;
                targets.push(Arc::new(TelegramPublisher::new(
                    token.clone(),
                    TelegramDestination::SelfDm,
                )));
                if let Some(chat_id) = config.telegram.group_chat_id {
                    targets.push(Arc::new(TelegramPublisher::new(
                        token,
                        TelegramDestination::Chat(chat_id),
                    )));
                }
            }
            Platform::Twitter => {
                let secret =
                    load_secret(&config.twitter.consumer_secret_env, "Twitter consumer secret")?;
                targets.push(Arc::new(TwitterPublisher::new(
                    config.twitter.consumer_key.clone(),
                    secret,
                )));
            }
        }
    }
    Ok(targets)
}

/// Session stand-in for dry runs; never reaches a network adapter
fn placeholder_session(platform: Platform) -> PlatformSession {
    let credential = match platform {
        Platform::Bluesky => Credential::Bluesky {
            access_jwt: SecretString::new("dry-run".into()),
            refresh_jwt: SecretString::new("dry-run".into()),
            did: "did:plc:dryrun".to_string(),
            handle: "dry.run".to_string(),
        },
        Platform::Linkedin => Credential::Linkedin {
            access_token: SecretString::new("dry-run".into()),
            expires_in_secs: None,
            subject: "dry-run".to_string(),
        },
        Platform::Telegram => Credential::Telegram {
            user_id: 0,
            auth_date: OffsetDateTime::now_utc().unix_timestamp(),
        },
        Platform::Twitter => Credential::Twitter {
            access_token: SecretString::new("dry-run".into()),
            access_secret: SecretString::new("dry-run".into()),
            user_id: "0".to_string(),
            screen_name: "dry.run".to_string(),
        },
    };
    PlatformSession {
        credential,
        identity: Identity::default(),
        obtained_at: OffsetDateTime::now_utc(),
        expires_at: None,
    }
}

#[derive(Serialize)]
struct ReportLine<'a> {
    platform: &'a str,
    target: &'a str,
    status: &'static str,
    id: Option<&'a str>,
    url: Option<&'a str>,
    error: Option<&'a str>,
}

fn render_report(report: &PublishReport, dry_run: bool, json: bool) -> Result<()> {
    if json {
        let lines: Vec<ReportLine> = report
            .outcomes
            .iter()
            .map(|o| match &o.outcome {
                Outcome::Success { id, url } => ReportLine {
                    platform: o.platform.as_str(),
                    target: &o.target,
                    status: "ok",
                    id: Some(id),
                    url: url.as_deref(),
                    error: None,
                },
                Outcome::Failure { message } => ReportLine {
                    platform: o.platform.as_str(),
                    target: &o.target,
                    status: "failed",
                    id: None,
                    url: None,
                    error: Some(message),
                },
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    if dry_run {
        println!("Dry run: nothing was published.");
    }
    if report.is_empty() {
        println!("No eligible targets (missing sessions or drafts).");
        return Ok(());
    }

    for outcome in &report.outcomes {
        match &outcome.outcome {
            Outcome::Success { id, url } => {
                print!("  ok      {:<16} {}", outcome.target, id);
                if let Some(url) = url {
                    print!("  {}", url);
                }
                println!();
            }
            Outcome::Failure { message } => {
                println!("  failed  {:<16} {}", outcome.target, message);
            }
        }
    }
    println!();
    println!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(())
}
