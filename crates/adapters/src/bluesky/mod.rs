//! Bluesky (AT Protocol) adapters

mod publish;

pub use publish::BlueskyPublisher;

use crosspost_domain::{
    AuthError, Credential, Identity, PlatformSession, policy::sanitize_bluesky_identifier,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

const DEFAULT_SERVICE: &str = "https://bsky.social";

/// Bluesky password-grant auth adapter
///
/// Single round trip: identifier + app password in, JWT pair + DID out.
/// No redirect and no handshake state.
pub struct BlueskyAuth {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    #[serde(rename = "refreshJwt")]
    refresh_jwt: String,
    handle: String,
    did: String,
}

#[derive(Deserialize)]
struct XrpcError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    avatar: Option<String>,
}

impl BlueskyAuth {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_SERVICE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        Self { client, base_url }
    }

    /// Log in with an identifier (handle or email) and an app password
    ///
    /// The identifier is sanitized first; missing credentials are rejected
    /// before any network call. The follow-up avatar fetch is best-effort
    /// and never fails the login.
    pub async fn login(
        &self,
        identifier: &str,
        app_password: &SecretString,
    ) -> Result<PlatformSession, AuthError> {
        let identifier = sanitize_bluesky_identifier(identifier);
        if identifier.is_empty() {
            return Err(AuthError::MissingInput("identifier".to_string()));
        }
        if app_password.expose_secret().is_empty() {
            return Err(AuthError::MissingInput("app password".to_string()));
        }

        let url = format!("{}/xrpc/com.atproto.server.createSession", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "identifier": identifier,
                "password": app_password.expose_secret(),
            }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let err: XrpcError = response.json().await.unwrap_or(XrpcError {
                error: String::new(),
                message: String::new(),
            });
            let message = if err.error == "AuthenticationRequired" || status == 401 {
                "Invalid identifier or app password".to_string()
            } else if !err.message.is_empty() {
                err.message
            } else {
                format!("Login failed with status {}", status)
            };
            return Err(AuthError::Provider(message));
        }

        let created: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let mut identity = Identity {
            display_name: None,
            handle: Some(created.handle.clone()),
            avatar_url: None,
        };

        // Best-effort: a missing avatar must not fail the login
        match self.fetch_profile(&created.access_jwt, &created.did).await {
            Ok(profile) => {
                identity.display_name = profile.display_name;
                identity.avatar_url = profile.avatar;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile fetch failed, continuing without avatar");
            }
        }

        Ok(PlatformSession {
            credential: Credential::Bluesky {
                access_jwt: SecretString::new(created.access_jwt.into()),
                refresh_jwt: SecretString::new(created.refresh_jwt.into()),
                did: created.did,
                handle: created.handle,
            },
            identity,
            obtained_at: OffsetDateTime::now_utc(),
            expires_at: None,
        })
    }

    async fn fetch_profile(
        &self,
        access_jwt: &str,
        did: &str,
    ) -> Result<ProfileResponse, AuthError> {
        let url = format!("{}/xrpc/app.bsky.actor.getProfile", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("actor", did)])
            .bearer_auth(access_jwt)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "Profile fetch returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }
}

impl Default for BlueskyAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::Platform;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body() -> serde_json::Value {
        serde_json::json!({
            "accessJwt": "access-token",
            "refreshJwt": "refresh-token",
            "handle": "alice.bsky.social",
            "did": "did:plc:abc123"
        })
    }

    #[tokio::test]
    async fn login_sends_sanitized_identifier() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .and(body_json(serde_json::json!({
                "identifier": "alice.bsky.social",
                "password": "app-pass"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/xrpc/app.bsky.actor.getProfile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "displayName": "Alice",
                "avatar": "https://cdn.example/alice.jpg"
            })))
            .mount(&server)
            .await;

        let auth = BlueskyAuth::with_base_url(server.uri());
        let session = auth
            .login(" @alice.bsky.social. ", &SecretString::new("app-pass".into()))
            .await
            .unwrap();

        assert_eq!(session.platform(), Platform::Bluesky);
        assert_eq!(session.identity.handle.as_deref(), Some("alice.bsky.social"));
        assert_eq!(
            session.identity.avatar_url.as_deref(),
            Some("https://cdn.example/alice.jpg")
        );
    }

    #[tokio::test]
    async fn login_survives_profile_fetch_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/xrpc/app.bsky.actor.getProfile"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let auth = BlueskyAuth::with_base_url(server.uri());
        let session = auth
            .login("alice.bsky.social", &SecretString::new("app-pass".into()))
            .await
            .unwrap();

        assert!(session.identity.avatar_url.is_none());
    }

    #[tokio::test]
    async fn login_rejects_missing_credentials_before_any_call() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let auth = BlueskyAuth::with_base_url(server.uri());

        let result = auth.login("  ", &SecretString::new("pass".into())).await;
        assert!(matches!(result, Err(AuthError::MissingInput(_))));

        let result = auth
            .login("alice.bsky.social", &SecretString::new("".into()))
            .await;
        assert!(matches!(result, Err(AuthError::MissingInput(_))));
    }

    #[tokio::test]
    async fn login_surfaces_provider_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "AuthenticationRequired",
                "message": "Invalid identifier or password"
            })))
            .mount(&server)
            .await;

        let auth = BlueskyAuth::with_base_url(server.uri());
        let result = auth
            .login("alice.bsky.social", &SecretString::new("wrong".into()))
            .await;

        assert!(matches!(result, Err(AuthError::Provider(_))));
    }
}
