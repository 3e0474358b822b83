//! Telegram publish adapter (Bot API sendMessage)

use async_trait::async_trait;
use crosspost_domain::{
    Credential, DraftContent, Platform, PlatformPublisher, PlatformSession, PublishError,
    PublishReceipt, policy::draft_limit,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Where one Telegram publisher delivers messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramDestination {
    /// Direct message to the logged-in user
    SelfDm,
    /// A fixed chat (group or channel) the bot belongs to
    Chat(i64),
}

/// Telegram publisher for one destination
///
/// The direct-message and group destinations are separate publisher
/// instances; each reports its own outcome.
pub struct TelegramPublisher {
    client: Client,
    base_url: String,
    bot_token: SecretString,
    destination: TelegramDestination,
    target: String,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Messages go out with `parse_mode: HTML`, so literal text must escape
/// the three characters the Bot API treats as markup
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl TelegramPublisher {
    pub fn new(bot_token: SecretString, destination: TelegramDestination) -> Self {
        Self::with_base_url(bot_token, destination, super::DEFAULT_API_BASE.to_string())
    }

    pub fn with_base_url(
        bot_token: SecretString,
        destination: TelegramDestination,
        base_url: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        let target = match destination {
            TelegramDestination::SelfDm => "telegram:self".to_string(),
            TelegramDestination::Chat(_) => "telegram:group".to_string(),
        };
        Self {
            client,
            base_url,
            bot_token,
            destination,
            target,
        }
    }
}

#[async_trait]
impl PlatformPublisher for TelegramPublisher {
    async fn publish(
        &self,
        session: &PlatformSession,
        draft: &DraftContent,
    ) -> Result<PublishReceipt, PublishError> {
        let Credential::Telegram { user_id, .. } = &session.credential else {
            return Err(PublishError::Auth(
                "Session does not hold Telegram credentials".to_string(),
            ));
        };

        let len = draft.body.chars().count();
        let max = draft_limit(Platform::Telegram);
        if len > max {
            return Err(PublishError::ContentTooLong { len, max });
        }

        let chat_id = match self.destination {
            TelegramDestination::SelfDm => *user_id,
            TelegramDestination::Chat(chat_id) => chat_id,
        };

        let text = match &draft.article {
            Some(article) => format!(
                "{}\n\n{}",
                escape_html(&draft.body),
                escape_html(&article.url)
            ),
            None => escape_html(&draft.body),
        };

        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.bot_token.expose_secret()
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": false,
            }))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(PublishError::Auth("Bot token rejected".to_string()));
        }
        if response.status() == 429 {
            return Err(PublishError::RateLimited);
        }

        let sent: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        match (sent.ok, sent.result) {
            (true, Some(message)) => Ok(PublishReceipt {
                id: message.message_id.to_string(),
                url: None,
            }),
            _ => Err(PublishError::Api(
                sent.description
                    .unwrap_or_else(|| "sendMessage failed".to_string()),
            )),
        }
    }

    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    fn target(&self) -> &str {
        &self.target
    }
}
