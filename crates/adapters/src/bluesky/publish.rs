//! Bluesky publish adapter (AT Protocol record creation)

use async_trait::async_trait;
use crosspost_domain::{
    ArticleRef, Credential, DraftContent, Platform, PlatformPublisher, PlatformSession,
    PublishError, PublishReceipt, policy::draft_limit,
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Bluesky publisher creating `app.bsky.feed.post` records
pub struct BlueskyPublisher {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

#[derive(Deserialize)]
struct UploadBlobResponse {
    blob: serde_json::Value,
}

impl BlueskyPublisher {
    pub fn new() -> Self {
        Self::with_base_url(super::DEFAULT_SERVICE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        Self { client, base_url }
    }

    /// Download the article image and upload it as a blob
    ///
    /// Best-effort: any failure here degrades the embed to text+link.
    async fn upload_thumb(
        &self,
        access_jwt: &str,
        image_url: &str,
    ) -> Result<serde_json::Value, PublishError> {
        let image = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if !image.status().is_success() {
            return Err(PublishError::Api(format!(
                "Image fetch returned {}",
                image.status()
            )));
        }

        let content_type = image
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = image
            .bytes()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let url = format!("{}/xrpc/com.atproto.repo.uploadBlob", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_jwt)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PublishError::Api(format!(
                "uploadBlob returned {}",
                response.status()
            )));
        }

        let uploaded: UploadBlobResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;
        Ok(uploaded.blob)
    }

    async fn build_embed(
        &self,
        access_jwt: &str,
        article: &ArticleRef,
    ) -> serde_json::Value {
        let thumb = match &article.image_url {
            Some(image_url) => match self.upload_thumb(access_jwt, image_url).await {
                Ok(blob) => Some(blob),
                Err(e) => {
                    tracing::warn!(error = %e, "Thumbnail upload failed, embedding without it");
                    None
                }
            },
            None => None,
        };

        let mut external = serde_json::json!({
            "uri": article.url,
            "title": article.title.clone().unwrap_or_else(|| article.url.clone()),
            "description": article.description.clone().unwrap_or_default(),
        });
        if let Some(thumb) = thumb {
            external["thumb"] = thumb;
        }

        serde_json::json!({
            "$type": "app.bsky.embed.external",
            "external": external,
        })
    }
}

impl Default for BlueskyPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformPublisher for BlueskyPublisher {
    async fn publish(
        &self,
        session: &PlatformSession,
        draft: &DraftContent,
    ) -> Result<PublishReceipt, PublishError> {
        let Credential::Bluesky {
            access_jwt,
            did,
            handle,
            ..
        } = &session.credential
        else {
            return Err(PublishError::Auth(
                "Session does not hold Bluesky credentials".to_string(),
            ));
        };

        let len = draft.body.chars().count();
        let max = draft_limit(Platform::Bluesky);
        if len > max {
            return Err(PublishError::ContentTooLong { len, max });
        }

        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let mut record = serde_json::json!({
            "$type": "app.bsky.feed.post",
            "text": draft.body,
            "createdAt": created_at,
        });

        if let Some(article) = &draft.article {
            record["embed"] = self.build_embed(access_jwt.expose_secret(), article).await;
        }

        let url = format!("{}/xrpc/com.atproto.repo.createRecord", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_jwt.expose_secret())
            .json(&serde_json::json!({
                "repo": did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(PublishError::Auth("Expired or invalid session".to_string()));
        }
        if response.status() == 429 {
            return Err(PublishError::RateLimited);
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "Failed to create post: {}",
                body
            )));
        }

        let created: CreateRecordResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        // at://did/collection/rkey -> public permalink
        let permalink = created
            .uri
            .rsplit('/')
            .next()
            .map(|rkey| format!("https://bsky.app/profile/{}/post/{}", handle, rkey));

        Ok(PublishReceipt {
            id: created.uri,
            url: permalink,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Bluesky
    }

    fn target(&self) -> &str {
        "bluesky"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::Identity;
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session() -> PlatformSession {
        PlatformSession {
            credential: Credential::Bluesky {
                access_jwt: SecretString::new("jwt".into()),
                refresh_jwt: SecretString::new("refresh".into()),
                did: "did:plc:abc".to_string(),
                handle: "alice.bsky.social".to_string(),
            },
            identity: Identity::default(),
            obtained_at: OffsetDateTime::now_utc(),
            expires_at: None,
        }
    }

    fn draft(body: &str, article: Option<ArticleRef>) -> DraftContent {
        DraftContent {
            platform: Platform::Bluesky,
            body: body.to_string(),
            article,
        }
    }

    fn created_body() -> serde_json::Value {
        serde_json::json!({
            "uri": "at://did:plc:abc/app.bsky.feed.post/3k44",
            "cid": "bafyrei"
        })
    }

    #[tokio::test]
    async fn publishes_text_post() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .and(header("Authorization", "Bearer jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
            .mount(&server)
            .await;

        let publisher = BlueskyPublisher::with_base_url(server.uri());
        let receipt = publisher
            .publish(&session(), &draft("hello world", None))
            .await
            .unwrap();

        assert_eq!(receipt.id, "at://did:plc:abc/app.bsky.feed.post/3k44");
        assert_eq!(
            receipt.url.as_deref(),
            Some("https://bsky.app/profile/alice.bsky.social/post/3k44")
        );
    }

    #[tokio::test]
    async fn thumbnail_failure_still_publishes_the_embed() {
        let server = MockServer::start().await;

        // Image host is down
        Mock::given(method("GET"))
            .and(path("/image.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.uploadBlob"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
            .expect(1)
            .mount(&server)
            .await;

        let article = ArticleRef {
            url: "https://example.com/story".to_string(),
            title: Some("Story".to_string()),
            description: None,
            image_url: Some(format!("{}/image.jpg", server.uri())),
        };

        let publisher = BlueskyPublisher::with_base_url(server.uri());
        let receipt = publisher
            .publish(&session(), &draft("with embed", Some(article)))
            .await
            .unwrap();

        assert!(!receipt.id.is_empty());
    }

    #[tokio::test]
    async fn over_limit_draft_is_rejected_without_a_call() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let publisher = BlueskyPublisher::with_base_url(server.uri());
        let result = publisher
            .publish(&session(), &draft(&"a".repeat(281), None))
            .await;

        assert!(matches!(
            result,
            Err(PublishError::ContentTooLong { len: 281, max: 280 })
        ));
    }

    #[tokio::test]
    async fn expired_session_maps_to_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let publisher = BlueskyPublisher::with_base_url(server.uri());
        let result = publisher.publish(&session(), &draft("hi", None)).await;

        assert!(matches!(result, Err(PublishError::Auth(_))));
    }
}
