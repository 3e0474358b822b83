//! LinkedIn publish adapter (UGC shares)

use async_trait::async_trait;
use crosspost_domain::{
    Credential, DraftContent, Platform, PlatformPublisher, PlatformSession, PublishError,
    PublishReceipt, policy::draft_limit,
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;

/// LinkedIn publisher creating UGC share posts
pub struct LinkedInPublisher {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UgcPostResponse {
    id: String,
}

impl LinkedInPublisher {
    pub fn new() -> Self {
        Self::with_base_url(super::DEFAULT_API_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        Self { client, base_url }
    }
}

impl Default for LinkedInPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformPublisher for LinkedInPublisher {
    async fn publish(
        &self,
        session: &PlatformSession,
        draft: &DraftContent,
    ) -> Result<PublishReceipt, PublishError> {
        let Credential::Linkedin {
            access_token,
            subject,
            ..
        } = &session.credential
        else {
            return Err(PublishError::Auth(
                "Session does not hold LinkedIn credentials".to_string(),
            ));
        };

        let len = draft.body.chars().count();
        let max = draft_limit(Platform::Linkedin);
        if len > max {
            return Err(PublishError::ContentTooLong { len, max });
        }

        let media_category = if draft.article.is_some() {
            "ARTICLE"
        } else {
            "NONE"
        };

        let mut share_content = serde_json::json!({
            "shareCommentary": { "text": draft.body },
            "shareMediaCategory": media_category,
        });

        if let Some(article) = &draft.article {
            let mut media = serde_json::json!({
                "status": "READY",
                "originalUrl": article.url,
            });
            if let Some(title) = &article.title {
                media["title"] = serde_json::json!({ "text": title });
            }
            if let Some(description) = &article.description {
                media["description"] = serde_json::json!({ "text": description });
            }
            // Thumbnail is decorative; the provider drops unreachable URLs
            // without failing the share
            if let Some(image_url) = &article.image_url {
                media["thumbnails"] = serde_json::json!([{ "url": image_url }]);
            }
            share_content["media"] = serde_json::json!([media]);
        }

        let body = serde_json::json!({
            "author": format!("urn:li:person:{}", subject),
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": share_content,
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC",
            },
        });

        let url = format!("{}/v2/ugcPosts", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token.expose_secret())
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&body)
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
                "Failed to create share: {}",
                body
            )));
        }

        let created: UgcPostResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(PublishReceipt {
            url: Some(format!(
                "https://www.linkedin.com/feed/update/{}",
                created.id
            )),
            id: created.id,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    fn target(&self) -> &str {
        "linkedin"
    }
}
