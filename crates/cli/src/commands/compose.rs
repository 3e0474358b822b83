//! Compose command - turn one article into editable per-platform drafts

use anyhow::{Context, Result, bail};
use crosspost_adapters::metadata::HtmlMetadataFetcher;
use crosspost_adapters::summarizer::{
    OpenAiSummarizer, StubSummarizer, SummarizerConfig as AdapterSummarizerConfig,
};
use crosspost_domain::usecases::ComposeUseCase;
use crosspost_domain::{ArticleRef, MetadataFetcher, Platform, Summarizer};
use std::io::{self, Read};
use std::path::PathBuf;

use crate::args::ComposeArgs;
use crate::config::AppConfig;
use crate::commands::login::load_secret;

pub async fn execute(args: ComposeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref()).unwrap_or_default();

    let platforms = parse_platforms(&args.platforms)?;

    let (article_text, article) = gather_article(&args).await?;
    if article_text.trim().is_empty() {
        bail!("No article text to summarize");
    }

    tracing::info!(
        text_length = article_text.len(),
        platforms = platforms.len(),
        "Composing drafts"
    );

    let summarizer = build_summarizer(&config)?;
    let usecase = ComposeUseCase::new(&*summarizer);
    let drafts = usecase
        .compose(&article_text, article.as_ref(), &platforms)
        .await
        .context("Draft composition failed")?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&drafts).context("Failed to serialize drafts")?;
        println!("{}", json);
        return Ok(());
    }

    let rendered = toml::to_string_pretty(&drafts).context("Failed to render drafts")?;
    std::fs::write(&args.out, rendered)
        .with_context(|| format!("Failed to write drafts file: {}", args.out.display()))?;

    println!("Wrote {} draft(s) to {}", drafts.drafts.len(), args.out.display());
    for draft in &drafts.drafts {
        println!("  {} ({} chars)", draft.platform, draft.body.chars().count());
    }
    println!();
    println!("Edit the file freely, then run 'crosspost publish --drafts {}'", args.out.display());

    Ok(())
}

/// Resolve the article source: fetched from a URL, or raw text from a
/// file / stdin with no link preview
async fn gather_article(args: &ComposeArgs) -> Result<(String, Option<ArticleRef>)> {
    if let Some(url) = &args.url {
        let fetcher = HtmlMetadataFetcher::new();
        let metadata = fetcher
            .fetch(url)
            .await
            .with_context(|| format!("Failed to fetch article: {}", url))?;

        tracing::info!(
            title = metadata.title.as_deref().unwrap_or(""),
            body_chars = metadata.body_text.len(),
            "Fetched article metadata"
        );
        let article = metadata.article_ref();
        return Ok((metadata.body_text, Some(article)));
    }

    let text = match &args.file {
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read from stdin")?;
            text
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read from stdin")?;
            text
        }
    };

    Ok((text, None))
}

pub(crate) fn parse_platforms(raw: &[String]) -> Result<Vec<Platform>> {
    if raw.is_empty() {
        return Ok(Platform::ALL.to_vec());
    }
    raw.iter()
        .map(|s| s.parse::<Platform>().map_err(|e| anyhow::anyhow!(e)))
        .collect()
}

pub(crate) fn build_summarizer(config: &AppConfig) -> Result<Box<dyn Summarizer>> {
    match config.summarizer.provider.as_str() {
        "openai" => {
            let api_key = load_secret(&config.summarizer.api_key_env, "summarizer API key")?;
            let adapter_config = AdapterSummarizerConfig {
                model: config.summarizer.model.clone(),
                temperature: config.summarizer.temperature,
                max_output_tokens: config.summarizer.max_output_tokens,
                timeout_secs: config.summarizer.timeout_secs,
            };
            Ok(Box::new(
                OpenAiSummarizer::new(api_key, adapter_config)
                    .context("Failed to configure summarizer")?,
            ))
        }
        "stub" => Ok(Box::new(StubSummarizer)),
        other => bail!("Unknown summarizer provider: {}", other),
    }
}
