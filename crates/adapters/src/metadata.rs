//! Article metadata extraction from fetched HTML

use async_trait::async_trait;
use crosspost_domain::{ArticleMetadata, MetadataError, MetadataFetcher};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(share this|subscribe|sign up|sign in|cookie|copyright|newsletter|privacy policy|terms of (use|service)|advertisement|related articles|read more)",
    )
    .expect("boilerplate pattern is valid")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("selector is valid")
}

/// HTML metadata fetcher (Open Graph tags plus readable body text)
pub struct HtmlMetadataFetcher {
    client: Client,
}

impl HtmlMetadataFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("crosspost/0.1 (+article preview fetcher)")
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }
}

impl Default for HtmlMetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for HtmlMetadataFetcher {
    async fn fetch(&self, url: &str) -> Result<ArticleMetadata, MetadataError> {
        let parsed = Url::parse(url).map_err(|e| MetadataError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MetadataError::InvalidUrl(format!(
                "Unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| MetadataError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MetadataError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MetadataError::Fetch(e.to_string()))?;

        // Parsed synchronously: the DOM is not Send and must never be
        // held across an await point
        Ok(parse_metadata(&body, &parsed))
    }
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    document
        .select(&selector(css))
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extract preview metadata and readable body text from an HTML page
///
/// Open Graph tags win; plain `<title>` and `meta description` are the
/// fallbacks. A relative image URL is resolved against the page URL.
fn parse_metadata(html: &str, base: &Url) -> ArticleMetadata {
    let document = Html::parse_document(html);

    let title = meta_content(&document, r#"meta[property="og:title"]"#).or_else(|| {
        document
            .select(&selector("title"))
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    });

    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#));

    let image_url = meta_content(&document, r#"meta[property="og:image"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="twitter:image"]"#))
        .and_then(|raw| base.join(&raw).ok())
        .map(|u| u.to_string());

    ArticleMetadata {
        url: base.to_string(),
        title,
        description,
        image_url,
        body_text: extract_body_text(&document),
    }
}

/// Pull readable article text out of the DOM
///
/// Containers are tried in order of specificity; within the chosen
/// container, paragraph-like elements contribute one block each, with
/// boilerplate lines dropped.
fn extract_body_text(document: &Html) -> String {
    let containers = [
        "article",
        r#"[class*="article"]"#,
        r#"[class*="post-content"]"#,
        r#"[class*="content"]"#,
        "main",
    ];

    for css in containers {
        let blocks = collect_blocks(document, &format!("{} p, {} h2, {} h3, {} li", css, css, css, css));
        if !blocks.is_empty() {
            return blocks.join("\n\n");
        }
    }

    collect_blocks(document, "body p").join("\n\n")
}

fn collect_blocks(document: &Html, css: &str) -> Vec<String> {
    document
        .select(&selector(css))
        .map(|el| {
            el.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| text.chars().count() >= 20 && !BOILERPLATE.is_match(text))
        .collect()
}
