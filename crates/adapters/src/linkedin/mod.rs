//! LinkedIn adapters (OAuth 2.0 authorization-code login, UGC publishing)

mod publish;

pub use publish::LinkedInPublisher;

use crosspost_domain::{
    AuthError, AuthStart, Credential, HandshakeState, Identity, PlatformSession,
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use url::Url;

const DEFAULT_AUTH_BASE: &str = "https://www.linkedin.com";
const DEFAULT_API_BASE: &str = "https://api.linkedin.com";
const OAUTH_SCOPES: &str = "openid profile email w_member_social";

/// LinkedIn OAuth2 authorization-code auth adapter
///
/// Three states: `initiate` issues a state token and an authorization URL;
/// the callback must present the same state before any token exchange runs.
/// The redirect URI is one configured value used byte-identically in both
/// the authorization request and the token exchange.
pub struct LinkedInAuth {
    client: Client,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    auth_base: String,
    api_base: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    sub: String,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl UserInfoResponse {
    fn display_name(&self) -> Option<String> {
        self.name.clone().or_else(|| {
            match (self.given_name.as_deref(), self.family_name.as_deref()) {
                (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
                (Some(given), None) => Some(given.to_string()),
                (None, Some(family)) => Some(family.to_string()),
                (None, None) => None,
            }
        })
    }
}

impl LinkedInAuth {
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
    ) -> Result<Self, AuthError> {
        Self::with_base_urls(
            client_id,
            client_secret,
            redirect_uri,
            DEFAULT_AUTH_BASE.to_string(),
            DEFAULT_API_BASE.to_string(),
        )
    }

    pub fn with_base_urls(
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
        auth_base: String,
        api_base: String,
    ) -> Result<Self, AuthError> {
        if client_id.trim().is_empty() {
            return Err(AuthError::Config("LinkedIn client id is empty".to_string()));
        }
        // The provider matches redirect URIs byte for byte; an unparseable
        // one can only ever fail, so refuse it at construction time.
        Url::parse(&redirect_uri)
            .map_err(|e| AuthError::Config(format!("Invalid redirect URI: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Ok(Self {
            client,
            client_id,
            client_secret,
            redirect_uri,
            auth_base,
            api_base,
        })
    }

    /// Start the login: random state token plus the authorization URL
    pub fn initiate(&self) -> AuthStart {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        let mut url = Url::parse(&format!("{}/oauth/v2/authorization", self.auth_base))
            .expect("authorization base URL is valid");
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", &state)
            .append_pair("scope", OAUTH_SCOPES);

        AuthStart::Redirect {
            url: url.to_string(),
            handshake: HandshakeState::OAuth2 { state },
        }
    }

    /// Complete the login from the callback query parameters
    ///
    /// The handshake state is consumed; a mismatch between the returned
    /// state and the issued one is a CSRF rejection and no token exchange
    /// is attempted.
    pub async fn complete(
        &self,
        code: &str,
        returned_state: &str,
        handshake: HandshakeState,
    ) -> Result<PlatformSession, AuthError> {
        let HandshakeState::OAuth2 { state } = handshake else {
            return Err(AuthError::StateMismatch);
        };
        if returned_state.is_empty() || returned_state != state {
            return Err(AuthError::StateMismatch);
        }
        if code.is_empty() {
            return Err(AuthError::MissingInput("authorization code".to_string()));
        }

        let token = self.exchange_code(code).await?;
        let userinfo = self.fetch_userinfo(&token.access_token).await?;
        let display_name = userinfo.display_name();

        let obtained_at = OffsetDateTime::now_utc();
        let expires_at = token
            .expires_in
            .map(|secs| obtained_at + Duration::from_secs(secs));

        Ok(PlatformSession {
            credential: Credential::Linkedin {
                access_token: SecretString::new(token.access_token.into()),
                expires_in_secs: token.expires_in,
                subject: userinfo.sub,
            },
            identity: Identity {
                display_name,
                handle: None,
                avatar_url: userinfo.picture,
            },
            obtained_at,
            expires_at,
        })
    }

    /// Mint a session from a stored access token
    ///
    /// The `userinfo` round trip both validates the token and recovers the
    /// member subject that authors shares. Token lifetime is unknown here,
    /// so the session carries no expiry.
    pub async fn session_from_token(
        &self,
        access_token: SecretString,
    ) -> Result<PlatformSession, AuthError> {
        let userinfo = self.fetch_userinfo(access_token.expose_secret()).await?;
        let display_name = userinfo.display_name();

        Ok(PlatformSession {
            credential: Credential::Linkedin {
                access_token,
                expires_in_secs: None,
                subject: userinfo.sub,
            },
            identity: Identity {
                display_name,
                handle: None,
                avatar_url: userinfo.picture,
            },
            obtained_at: OffsetDateTime::now_utc(),
            expires_at: None,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AuthError> {
        let url = format!("{}/oauth/v2/accessToken", self.auth_base);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", self.client_secret.expose_secret()),
                ("redirect_uri", &self.redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let err: TokenErrorResponse = response.json().await.unwrap_or(TokenErrorResponse {
                error_description: None,
                error: None,
            });
            let message = err
                .error_description
                .or(err.error)
                .unwrap_or_else(|| "Failed to exchange authorization code".to_string());
            return Err(AuthError::Provider(message));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfoResponse, AuthError> {
        let url = format!("{}/v2/userinfo", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "userinfo returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::Platform;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth(server: &MockServer) -> LinkedInAuth {
        LinkedInAuth::with_base_urls(
            "client-id".to_string(),
            SecretString::new("client-secret".into()),
            "https://app.example/api/linkedin/callback".to_string(),
            server.uri(),
            server.uri(),
        )
        .unwrap()
    }

    fn issued_state(start: AuthStart) -> (String, HandshakeState) {
        match start {
            AuthStart::Redirect { url, handshake } => (url, handshake),
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[test]
    fn empty_redirect_uri_is_a_startup_error() {
        let result = LinkedInAuth::new(
            "client-id".to_string(),
            SecretString::new("secret".into()),
            "".to_string(),
        );
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[tokio::test]
    async fn initiate_embeds_state_and_redirect_uri() {
        let server = MockServer::start().await;
        let (url, handshake) = issued_state(auth(&server).initiate());

        let HandshakeState::OAuth2 { state } = &handshake else {
            panic!("expected oauth2 handshake");
        };
        assert_eq!(state.len(), 32);
        assert!(url.contains(&format!("state={}", state)));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example%2Fapi%2Flinkedin%2Fcallback"));
    }

    #[tokio::test]
    async fn state_mismatch_is_csrf_and_skips_token_exchange() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/v2/accessToken"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let adapter = auth(&server);
        let (_, handshake) = issued_state(adapter.initiate());

        let result = adapter.complete("auth-code", "forged-state", handshake).await;
        assert!(matches!(result, Err(AuthError::StateMismatch)));
    }

    #[tokio::test]
    async fn complete_exchanges_code_and_fetches_userinfo() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/v2/accessToken"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains(
                "redirect_uri=https%3A%2F%2Fapp.example%2Fapi%2Flinkedin%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-token",
                "expires_in": 5183999
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "AbC123",
                "name": "Alice Example",
                "picture": "https://cdn.example/alice.png"
            })))
            .mount(&server)
            .await;

        let adapter = auth(&server);
        let (_, handshake) = issued_state(adapter.initiate());
        let HandshakeState::OAuth2 { state } = &handshake else {
            panic!();
        };
        let state = state.clone();

        let session = adapter.complete("auth-code", &state, handshake).await.unwrap();

        assert_eq!(session.platform(), Platform::Linkedin);
        assert_eq!(session.identity.display_name.as_deref(), Some("Alice Example"));
        assert!(session.expires_at.is_some());
        match &session.credential {
            Credential::Linkedin { subject, .. } => assert_eq!(subject, "AbC123"),
            other => panic!("unexpected credential: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stored_token_mints_a_session_via_userinfo() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "AbC123",
                "given_name": "Alice",
                "family_name": "Example"
            })))
            .mount(&server)
            .await;

        let session = auth(&server)
            .session_from_token(SecretString::new("stored-token".into()))
            .await
            .unwrap();

        assert_eq!(session.platform(), Platform::Linkedin);
        assert_eq!(session.identity.display_name.as_deref(), Some("Alice Example"));
        match &session.credential {
            Credential::Linkedin { subject, .. } => assert_eq!(subject, "AbC123"),
            other => panic!("unexpected credential: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejected_stored_token_is_a_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = auth(&server)
            .session_from_token(SecretString::new("expired-token".into()))
            .await;
        assert!(matches!(result, Err(AuthError::Provider(_))));
    }

    #[tokio::test]
    async fn token_exchange_failure_is_a_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/v2/accessToken"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The authorization code expired"
            })))
            .mount(&server)
            .await;

        let adapter = auth(&server);
        let (_, handshake) = issued_state(adapter.initiate());
        let HandshakeState::OAuth2 { state } = &handshake else {
            panic!();
        };
        let state = state.clone();

        let result = adapter.complete("auth-code", &state, handshake).await;
        match result {
            Err(AuthError::Provider(message)) => {
                assert!(message.contains("authorization code expired"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
