//! Telegram adapters (login widget verification, Bot API publishing)

mod publish;

pub use publish::{TelegramDestination, TelegramPublisher};

use crosspost_domain::{
    AuthError, Clock, Credential, Identity, PlatformSession, SystemClock,
};
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Widget payloads older than this are rejected as replays
const MAX_AUTH_AGE_SECS: i64 = 3600;

type HmacSha256 = Hmac<Sha256>;

/// Signed payload delivered by the Telegram login widget callback
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetPayload {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

/// Telegram login-widget auth adapter
///
/// There is no redirect leg: the widget hands over a payload signed with
/// HMAC-SHA256 under a key derived from the bot token, and verification is
/// a pure computation. A stale `auth_date` is rejected even when the
/// signature is valid.
pub struct TelegramAuth {
    bot_token: SecretString,
    clock: Arc<dyn Clock>,
}

impl TelegramAuth {
    pub fn new(bot_token: SecretString) -> Result<Self, AuthError> {
        Self::with_clock(bot_token, Arc::new(SystemClock))
    }

    pub fn with_clock(bot_token: SecretString, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        if bot_token.expose_secret().trim().is_empty() {
            return Err(AuthError::Config("Telegram bot token is empty".to_string()));
        }
        Ok(Self { bot_token, clock })
    }

    /// Verify a widget payload and mint a session from it
    pub fn verify(&self, payload: &WidgetPayload) -> Result<PlatformSession, AuthError> {
        let expected = self.signature_for(payload);
        if expected != payload.hash {
            return Err(AuthError::Signature);
        }

        let now = self.clock.now().unix_timestamp();
        let age_secs = now - payload.auth_date;
        if age_secs > MAX_AUTH_AGE_SECS {
            return Err(AuthError::StaleAuth {
                age_secs,
                max_secs: MAX_AUTH_AGE_SECS,
            });
        }

        let display_name = match &payload.last_name {
            Some(last) => format!("{} {}", payload.first_name, last),
            None => payload.first_name.clone(),
        };

        Ok(PlatformSession {
            credential: Credential::Telegram {
                user_id: payload.id,
                auth_date: payload.auth_date,
            },
            identity: Identity {
                display_name: Some(display_name),
                handle: payload.username.clone(),
                avatar_url: payload.photo_url.clone(),
            },
            obtained_at: self.clock.now(),
            expires_at: None,
        })
    }

    /// HMAC-SHA256 over the check string, keyed by SHA256(bot token)
    ///
    /// The check string is every present field except `hash`, rendered as
    /// `key=value` lines sorted by key and joined with `\n`. Absent
    /// optional fields contribute no line.
    fn signature_for(&self, payload: &WidgetPayload) -> String {
        let mut fields: Vec<(&str, String)> = vec![
            ("auth_date", payload.auth_date.to_string()),
            ("first_name", payload.first_name.clone()),
            ("id", payload.id.to_string()),
        ];
        if let Some(last_name) = &payload.last_name {
            fields.push(("last_name", last_name.clone()));
        }
        if let Some(photo_url) = &payload.photo_url {
            fields.push(("photo_url", photo_url.clone()));
        }
        if let Some(username) = &payload.username {
            fields.push(("username", username.clone()));
        }
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let check_string = fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n");

        let secret_key = Sha256::digest(self.bot_token.expose_secret().as_bytes());
        let mut mac = HmacSha256::new_from_slice(&secret_key)
            .expect("HMAC accepts any key length");
        mac.update(check_string.as_bytes());
        format!("{:x}", mac.finalize().into_bytes())
    }
}

#[derive(Deserialize)]
struct BotApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BotProfile {
    pub id: i64,
    pub username: Option<String>,
}

/// Webhook registration state reported by `getWebhookInfo`
///
/// A non-empty `url` means the bot delivers updates to a webhook instead
/// of long polling; `doctor` surfaces this because a stale webhook is a
/// common reason bot messages silently stop.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pending_update_count: i64,
    #[serde(default)]
    pub last_error_message: Option<String>,
}

/// Thin Bot API client used by connectivity checks
pub struct BotApi {
    client: Client,
    base_url: String,
    bot_token: SecretString,
}

impl BotApi {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_base_url(bot_token, DEFAULT_API_BASE.to_string())
    }

    pub fn with_base_url(bot_token: SecretString, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url,
            bot_token,
        }
    }

    pub async fn get_me(&self) -> Result<BotProfile, AuthError> {
        let url = format!(
            "{}/bot{}/getMe",
            self.base_url,
            self.bot_token.expose_secret()
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let envelope: BotApiEnvelope<BotProfile> = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        match (envelope.ok, envelope.result) {
            (true, Some(profile)) => Ok(profile),
            _ => Err(AuthError::Provider(
                envelope
                    .description
                    .unwrap_or_else(|| "getMe failed".to_string()),
            )),
        }
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo, AuthError> {
        let url = format!(
            "{}/bot{}/getWebhookInfo",
            self.base_url,
            self.bot_token.expose_secret()
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let envelope: BotApiEnvelope<WebhookInfo> = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        match (envelope.ok, envelope.result) {
            (true, Some(info)) => Ok(info),
            _ => Err(AuthError::Provider(
                envelope
                    .description
                    .unwrap_or_else(|| "getWebhookInfo failed".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            OffsetDateTime::from_unix_timestamp(self.0).unwrap()
        }
    }

    const AUTH_DATE: i64 = 1_700_000_000;

    fn auth_at(now: i64) -> TelegramAuth {
        TelegramAuth::with_clock(
            SecretString::new("test-bot-token".into()),
            Arc::new(FixedClock(now)),
        )
        .unwrap()
    }

    // HMAC-SHA256 over
    // "auth_date=1700000000\nfirst_name=Alice\nid=42\nusername=alice"
    // keyed by SHA256("test-bot-token")
    const ALICE_HASH: &str = "0a38232bdc91f3d534319b729bf19230e23f34fe26ccbd8f29b0cf6de510dcb2";

    fn alice() -> WidgetPayload {
        WidgetPayload {
            id: 42,
            first_name: "Alice".to_string(),
            last_name: None,
            username: Some("alice".to_string()),
            photo_url: None,
            auth_date: AUTH_DATE,
            hash: ALICE_HASH.to_string(),
        }
    }

    #[test]
    fn valid_payload_yields_a_session() {
        let session = auth_at(AUTH_DATE + 10).verify(&alice()).unwrap();

        match session.credential {
            Credential::Telegram { user_id, auth_date } => {
                assert_eq!(user_id, 42);
                assert_eq!(auth_date, AUTH_DATE);
            }
            other => panic!("unexpected credential: {:?}", other),
        }
        assert_eq!(session.identity.display_name.as_deref(), Some("Alice"));
        assert_eq!(session.identity.handle.as_deref(), Some("alice"));
    }

    #[test]
    fn absent_optional_fields_are_left_out_of_the_check_string() {
        // Vector with last_name and photo_url present but no username
        let payload = WidgetPayload {
            id: 7,
            first_name: "Bob".to_string(),
            last_name: Some("Builder".to_string()),
            username: None,
            photo_url: Some("https://t.me/i/userpic/bob.jpg".to_string()),
            auth_date: AUTH_DATE,
            hash: "2da5fff14196c9c5222103861aa359fb7205d6765ddd8cc7284be8bfb39f4e06"
                .to_string(),
        };

        let session = auth_at(AUTH_DATE).verify(&payload).unwrap();
        assert_eq!(session.identity.display_name.as_deref(), Some("Bob Builder"));
    }

    #[test]
    fn tampered_field_fails_the_signature() {
        let mut payload = alice();
        payload.id = 43;

        let result = auth_at(AUTH_DATE + 10).verify(&payload);
        assert!(matches!(result, Err(AuthError::Signature)));
    }

    #[test]
    fn forged_hash_fails_the_signature() {
        let mut payload = alice();
        payload.hash = "deadbeef".repeat(8);

        let result = auth_at(AUTH_DATE + 10).verify(&payload);
        assert!(matches!(result, Err(AuthError::Signature)));
    }

    #[test]
    fn payload_at_the_freshness_boundary_is_accepted() {
        let session = auth_at(AUTH_DATE + 3600).verify(&alice());
        assert!(session.is_ok());
    }

    #[test]
    fn payload_past_the_freshness_boundary_is_stale() {
        let result = auth_at(AUTH_DATE + 3601).verify(&alice());
        assert!(matches!(
            result,
            Err(AuthError::StaleAuth {
                age_secs: 3601,
                max_secs: 3600
            })
        ));
    }

    #[test]
    fn empty_bot_token_is_a_startup_error() {
        let result = TelegramAuth::new(SecretString::new("  ".into()));
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[tokio::test]
    async fn get_me_returns_the_bot_profile() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/bottest-bot-token/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "id": 1234, "is_bot": true, "username": "crosspost_bot" }
            })))
            .mount(&server)
            .await;

        let api = BotApi::with_base_url(SecretString::new("test-bot-token".into()), server.uri());
        let profile = api.get_me().await.unwrap();

        assert_eq!(profile.id, 1234);
        assert_eq!(profile.username.as_deref(), Some("crosspost_bot"));
    }

    #[tokio::test]
    async fn get_webhook_info_reports_the_registered_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/bottest-bot-token/getWebhookInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {
                    "url": "https://app.example/api/telegram/callback",
                    "pending_update_count": 3
                }
            })))
            .mount(&server)
            .await;

        let api = BotApi::with_base_url(SecretString::new("test-bot-token".into()), server.uri());
        let info = api.get_webhook_info().await.unwrap();

        assert_eq!(info.url, "https://app.example/api/telegram/callback");
        assert_eq!(info.pending_update_count, 3);
        assert!(info.last_error_message.is_none());
    }

    #[tokio::test]
    async fn get_webhook_info_tolerates_an_unset_webhook() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/bottest-bot-token/getWebhookInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "url": "", "has_custom_certificate": false, "pending_update_count": 0 }
            })))
            .mount(&server)
            .await;

        let api = BotApi::with_base_url(SecretString::new("test-bot-token".into()), server.uri());
        let info = api.get_webhook_info().await.unwrap();

        assert!(info.url.is_empty());
    }

    #[tokio::test]
    async fn get_me_error_surfaces_the_description() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/botbad-token/getMe"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let api = BotApi::with_base_url(SecretString::new("bad-token".into()), server.uri());
        let result = api.get_me().await;

        match result {
            Err(AuthError::Provider(message)) => assert!(message.contains("Unauthorized")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
