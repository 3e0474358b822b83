//! LLM-backed per-platform summarization

use async_trait::async_trait;
use crosspost_domain::{Platform, SummarizeError, Summarizer, policy::summary_budget};
use regex::Regex;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.openai.com";

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"));

/// Tuning knobs for the summarizer
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_output_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

/// Per-platform voice instructions
///
/// Emojis and hashtags are forbidden in the prompt and stripped again
/// afterwards; models ignore instructions often enough that the belt
/// needs braces.
fn platform_prompt(platform: Platform) -> &'static str {
    match platform {
        Platform::Linkedin => {
            "Write a professional, insight-led summary of the article for a \
             LinkedIn audience. Plain prose, no emojis, no hashtags."
        }
        Platform::Bluesky => {
            "Write a short, conversational summary of the article for \
             Bluesky. One or two sentences, no emojis, no hashtags."
        }
        Platform::Telegram => {
            "Write a direct, informative summary of the article for a \
             Telegram channel. No emojis, no hashtags."
        }
        Platform::Twitter => {
            "Write an engaging one-sentence summary of the article for \
             Twitter. No emojis, no hashtags."
        }
    }
}

/// OpenAI chat-completions summarizer
pub struct OpenAiSummarizer {
    client: Client,
    api_key: SecretString,
    config: SummarizerConfig,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: SecretString, config: SummarizerConfig) -> Result<Self, SummarizeError> {
        Self::with_base_url(api_key, config, DEFAULT_API_BASE.to_string())
    }

    pub fn with_base_url(
        api_key: SecretString,
        config: SummarizerConfig,
        base_url: String,
    ) -> Result<Self, SummarizeError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(SummarizeError::Config(
                "Summarizer API key is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SummarizeError::Config(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            config,
            base_url,
        })
    }

    /// Strip hashtags, collapse leftover whitespace, and enforce the
    /// platform's summary budget with a trailing ellipsis
    fn postprocess(raw: &str, platform: Platform) -> String {
        let stripped = HASHTAG.replace_all(raw, "");
        let cleaned = stripped
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let budget = summary_budget(platform);
        if cleaned.chars().count() <= budget {
            return cleaned;
        }
        let truncated: String = cleaned.chars().take(budget.saturating_sub(1)).collect();
        format!("{}…", truncated.trim_end())
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(
        &self,
        article_text: &str,
        platform: Platform,
    ) -> Result<String, SummarizeError> {
        let budget = summary_budget(platform);
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_output_tokens,
            "messages": [
                {
                    "role": "system",
                    "content": format!(
                        "{} Keep it under {} characters.",
                        platform_prompt(platform),
                        budget
                    ),
                },
                { "role": "user", "content": article_text },
            ],
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizeError::Timeout
                } else {
                    SummarizeError::Api(e.to_string())
                }
            })?;

        if response.status() == 429 {
            return Err(SummarizeError::RateLimited);
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api(format!(
                "Summarization failed: {}",
                body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::InvalidFormat(e.to_string()))?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| SummarizeError::InvalidFormat("No choices returned".to_string()))?;

        if content.trim().is_empty() {
            return Err(SummarizeError::InvalidFormat(
                "Empty completion".to_string(),
            ));
        }

        Ok(Self::postprocess(content, platform))
    }
}

/// Canned summarizer for offline runs and tests
pub struct StubSummarizer;

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(
        &self,
        article_text: &str,
        platform: Platform,
    ) -> Result<String, SummarizeError> {
        let budget = summary_budget(platform);
        let text = article_text.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(text.chars().take(budget).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summarizer(server: &MockServer) -> OpenAiSummarizer {
        OpenAiSummarizer::with_base_url(
            SecretString::new("sk-test".into()),
            SummarizerConfig::default(),
            server.uri(),
        )
        .unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[tokio::test]
    async fn summarize_sends_the_platform_prompt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("A tight summary.")),
            )
            .mount(&server)
            .await;

        let summary = summarizer(&server)
            .summarize("Long article text", Platform::Bluesky)
            .await
            .unwrap();

        assert_eq!(summary, "A tight summary.");
    }

    #[tokio::test]
    async fn hashtags_are_stripped_from_the_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "Big news today #breaking #tech and more.",
            )))
            .mount(&server)
            .await;

        let summary = summarizer(&server)
            .summarize("text", Platform::Twitter)
            .await
            .unwrap();

        assert_eq!(summary, "Big news today and more.");
    }

    #[tokio::test]
    async fn over_budget_completion_is_truncated_with_an_ellipsis() {
        let server = MockServer::start().await;

        let long = "word ".repeat(200);
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&long)))
            .mount(&server)
            .await;

        let summary = summarizer(&server)
            .summarize("text", Platform::Bluesky)
            .await
            .unwrap();

        assert!(summary.chars().count() <= summary_budget(Platform::Bluesky));
        assert!(summary.ends_with('…'));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_its_own_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = summarizer(&server).summarize("text", Platform::Bluesky).await;
        assert!(matches!(result, Err(SummarizeError::RateLimited)));
    }

    #[tokio::test]
    async fn empty_completion_is_an_invalid_format() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
            .mount(&server)
            .await;

        let result = summarizer(&server).summarize("text", Platform::Bluesky).await;
        assert!(matches!(result, Err(SummarizeError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn stub_respects_the_platform_budget() {
        let long = "a".repeat(10_000);
        let summary = StubSummarizer
            .summarize(&long, Platform::Bluesky)
            .await
            .unwrap();
        assert_eq!(summary.chars().count(), summary_budget(Platform::Bluesky));
    }
}
