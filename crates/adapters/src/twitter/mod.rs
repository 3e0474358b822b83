//! Twitter/X adapters (three-legged OAuth 1.0a, v2 tweet publishing)

mod publish;

pub use publish::TwitterPublisher;

use crosspost_domain::{
    AuthError, AuthStart, Credential, HandshakeState, Identity, PlatformSession,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::Sha1;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;

const DEFAULT_API_BASE: &str = "https://api.twitter.com";

/// RFC 3986 unreserved characters pass through; everything else is escaped
const OAUTH_ENCODE_SET: &percent_encoding::AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub(crate) fn percent_encode(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// HMAC-SHA1 signature over the OAuth 1.0a signature base string
///
/// `params` holds every request parameter that participates in signing
/// (oauth_* protocol params plus query/form params, never a JSON body).
pub(crate) fn sign(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method,
        percent_encode(url),
        percent_encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );

    let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(base_string.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Build the `Authorization: OAuth ...` header for one request
///
/// `token` and `token_secret` are empty during the request-token leg.
/// `extra` carries flow parameters (oauth_callback, oauth_verifier) that
/// are signed and emitted with the protocol params.
pub(crate) fn authorization_header(
    method: &str,
    url: &str,
    consumer_key: &str,
    consumer_secret: &str,
    token: &str,
    token_secret: &str,
    extra: &[(&str, &str)],
) -> String {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), consumer_key.to_string()),
        ("oauth_nonce".to_string(), nonce()),
        (
            "oauth_signature_method".to_string(),
            "HMAC-SHA1".to_string(),
        ),
        (
            "oauth_timestamp".to_string(),
            OffsetDateTime::now_utc().unix_timestamp().to_string(),
        ),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];
    if !token.is_empty() {
        oauth_params.push(("oauth_token".to_string(), token.to_string()));
    }
    for (key, value) in extra {
        oauth_params.push((key.to_string(), value.to_string()));
    }

    let signature = sign(method, url, &oauth_params, consumer_secret, token_secret);
    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort();

    let rendered = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {}", rendered)
}

fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Twitter three-legged OAuth 1.0a auth adapter
///
/// `initiate` obtains a temporary request credential and hands back the
/// authorize URL; the temporary secret stays in the handshake state and is
/// consumed by `complete`. Losing it means restarting the login.
pub struct TwitterAuth {
    client: Client,
    consumer_key: String,
    consumer_secret: SecretString,
    callback_url: String,
    base_url: String,
}

#[derive(Deserialize)]
struct UsersMeResponse {
    data: UsersMeData,
}

#[derive(Deserialize)]
struct UsersMeData {
    id: Option<String>,
    username: Option<String>,
    name: Option<String>,
    profile_image_url: Option<String>,
}

impl TwitterAuth {
    pub fn new(
        consumer_key: String,
        consumer_secret: SecretString,
        callback_url: String,
    ) -> Result<Self, AuthError> {
        Self::with_base_url(
            consumer_key,
            consumer_secret,
            callback_url,
            DEFAULT_API_BASE.to_string(),
        )
    }

    pub fn with_base_url(
        consumer_key: String,
        consumer_secret: SecretString,
        callback_url: String,
        base_url: String,
    ) -> Result<Self, AuthError> {
        if consumer_key.trim().is_empty() {
            return Err(AuthError::Config(
                "Twitter consumer key is empty".to_string(),
            ));
        }
        url::Url::parse(&callback_url)
            .map_err(|e| AuthError::Config(format!("Invalid callback URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Ok(Self {
            client,
            consumer_key,
            consumer_secret,
            callback_url,
            base_url,
        })
    }

    /// First leg: obtain a request token and the authorize URL
    pub async fn initiate(&self) -> Result<AuthStart, AuthError> {
        let url = format!("{}/oauth/request_token", self.base_url);
        let header = authorization_header(
            "POST",
            &url,
            &self.consumer_key,
            self.consumer_secret.expose_secret(),
            "",
            "",
            &[("oauth_callback", self.callback_url.as_str())],
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", header)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "request_token failed: {}",
                body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let fields = parse_form(&body);

        if fields.get("oauth_callback_confirmed").map(String::as_str) != Some("true") {
            return Err(AuthError::Provider(
                "Callback URL not confirmed by provider".to_string(),
            ));
        }
        let request_token = fields
            .get("oauth_token")
            .cloned()
            .ok_or_else(|| AuthError::Provider("Missing oauth_token".to_string()))?;
        let request_secret = fields
            .get("oauth_token_secret")
            .cloned()
            .ok_or_else(|| AuthError::Provider("Missing oauth_token_secret".to_string()))?;

        Ok(AuthStart::Redirect {
            url: format!(
                "{}/oauth/authenticate?oauth_token={}",
                self.base_url,
                percent_encode(&request_token)
            ),
            handshake: HandshakeState::OAuth1 {
                request_token,
                request_secret: SecretString::new(request_secret.into()),
            },
        })
    }

    /// Third leg: trade the verifier for an access credential
    ///
    /// The returned token must match the one issued in `initiate`; a
    /// mismatch aborts before any token exchange.
    pub async fn complete(
        &self,
        returned_token: &str,
        verifier: &str,
        handshake: HandshakeState,
    ) -> Result<PlatformSession, AuthError> {
        let HandshakeState::OAuth1 {
            request_token,
            request_secret,
        } = handshake
        else {
            return Err(AuthError::StateMismatch);
        };
        if returned_token.is_empty() || returned_token != request_token {
            return Err(AuthError::StateMismatch);
        }
        if verifier.is_empty() {
            return Err(AuthError::MissingInput("oauth_verifier".to_string()));
        }

        let url = format!("{}/oauth/access_token", self.base_url);
        let header = authorization_header(
            "POST",
            &url,
            &self.consumer_key,
            self.consumer_secret.expose_secret(),
            &request_token,
            request_secret.expose_secret(),
            &[("oauth_verifier", verifier)],
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", header)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "access_token failed: {}",
                body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let fields = parse_form(&body);

        let access_token = fields
            .get("oauth_token")
            .cloned()
            .ok_or_else(|| AuthError::Provider("Missing oauth_token".to_string()))?;
        let access_secret = fields
            .get("oauth_token_secret")
            .cloned()
            .ok_or_else(|| AuthError::Provider("Missing oauth_token_secret".to_string()))?;
        let user_id = fields
            .get("user_id")
            .cloned()
            .ok_or_else(|| AuthError::Provider("Missing user_id".to_string()))?;
        let screen_name = fields
            .get("screen_name")
            .cloned()
            .ok_or_else(|| AuthError::Provider("Missing screen_name".to_string()))?;

        let mut identity = Identity {
            display_name: None,
            handle: Some(screen_name.clone()),
            avatar_url: None,
        };

        // Best-effort profile enrichment; never fails the login
        match self.fetch_profile(&access_token, &access_secret).await {
            Ok(profile) => {
                identity.display_name = profile.name;
                identity.avatar_url = profile.profile_image_url;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile fetch failed, continuing without avatar");
            }
        }

        Ok(PlatformSession {
            credential: Credential::Twitter {
                access_token: SecretString::new(access_token.into()),
                access_secret: SecretString::new(access_secret.into()),
                user_id,
                screen_name,
            },
            identity,
            obtained_at: OffsetDateTime::now_utc(),
            expires_at: None,
        })
    }

    /// Mint a session from a stored access credential
    ///
    /// Unlike the best-effort enrichment during login, the `users/me`
    /// round trip is load-bearing here: it validates the stored credential
    /// and recovers the account id and screen name.
    pub async fn session_from_token(
        &self,
        access_token: SecretString,
        access_secret: SecretString,
    ) -> Result<PlatformSession, AuthError> {
        let profile = self
            .fetch_profile(access_token.expose_secret(), access_secret.expose_secret())
            .await?;

        let user_id = profile
            .id
            .ok_or_else(|| AuthError::Provider("users/me returned no id".to_string()))?;
        let screen_name = profile
            .username
            .ok_or_else(|| AuthError::Provider("users/me returned no username".to_string()))?;

        Ok(PlatformSession {
            credential: Credential::Twitter {
                access_token,
                access_secret,
                user_id,
                screen_name: screen_name.clone(),
            },
            identity: Identity {
                display_name: profile.name,
                handle: Some(screen_name),
                avatar_url: profile.profile_image_url,
            },
            obtained_at: OffsetDateTime::now_utc(),
            expires_at: None,
        })
    }

    async fn fetch_profile(
        &self,
        access_token: &str,
        access_secret: &str,
    ) -> Result<UsersMeData, AuthError> {
        let url = format!("{}/2/users/me", self.base_url);
        // Query params participate in the signature
        let header = authorization_header(
            "GET",
            &url,
            &self.consumer_key,
            self.consumer_secret.expose_secret(),
            access_token,
            access_secret,
            &[("user.fields", "profile_image_url")],
        );

        let response = self
            .client
            .get(&url)
            .query(&[("user.fields", "profile_image_url")])
            .header("Authorization", header)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "users/me returned {}",
                response.status()
            )));
        }

        let parsed: UsersMeResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        Ok(parsed.data)
    }
}
