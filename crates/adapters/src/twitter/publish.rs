//! Twitter/X publish adapter (v2 tweet creation)

use async_trait::async_trait;
use crosspost_domain::{
    Credential, DraftContent, Platform, PlatformPublisher, PlatformSession, PublishError,
    PublishReceipt, policy::draft_limit,
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;

/// Twitter publisher creating tweets via the v2 endpoint
///
/// Requests are OAuth 1.0a user-context signed; the JSON body never
/// participates in the signature.
pub struct TwitterPublisher {
    client: Client,
    consumer_key: String,
    consumer_secret: secrecy::SecretString,
    base_url: String,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

impl TwitterPublisher {
    pub fn new(consumer_key: String, consumer_secret: secrecy::SecretString) -> Self {
        Self::with_base_url(consumer_key, consumer_secret, super::DEFAULT_API_BASE.to_string())
    }

    pub fn with_base_url(
        consumer_key: String,
        consumer_secret: secrecy::SecretString,
        base_url: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            consumer_key,
            consumer_secret,
            base_url,
        }
    }
}

#[async_trait]
impl PlatformPublisher for TwitterPublisher {
    async fn publish(
        &self,
        session: &PlatformSession,
        draft: &DraftContent,
    ) -> Result<PublishReceipt, PublishError> {
        let Credential::Twitter {
            access_token,
            access_secret,
            ..
        } = &session.credential
        else {
            return Err(PublishError::Auth(
                "Session does not hold Twitter credentials".to_string(),
            ));
        };

        let len = draft.body.chars().count();
        let max = draft_limit(Platform::Twitter);
        if len > max {
            return Err(PublishError::ContentTooLong { len, max });
        }

        let url = format!("{}/2/tweets", self.base_url);
        let header = super::authorization_header(
            "POST",
            &url,
            &self.consumer_key,
            self.consumer_secret.expose_secret(),
            access_token.expose_secret(),
            access_secret.expose_secret(),
            &[],
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", header)
            .json(&serde_json::json!({ "text": draft.body }))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(PublishError::Auth("Expired or invalid token".to_string()));
        }
        if response.status() == 429 {
            return Err(PublishError::RateLimited);
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "Failed to create tweet: {}",
                body
            )));
        }

        let created: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(PublishReceipt {
            url: Some(format!("https://x.com/i/status/{}", created.data.id)),
            id: created.data.id,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn target(&self) -> &str {
        "twitter"
    }
}
