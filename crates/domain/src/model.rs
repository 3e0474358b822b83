//! Domain models and value objects

use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Supported publishing platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Bluesky,
    Linkedin,
    Telegram,
    Twitter,
}

impl Platform {
    /// All platforms, in the order reports are rendered
    pub const ALL: [Platform; 4] = [
        Platform::Bluesky,
        Platform::Linkedin,
        Platform::Telegram,
        Platform::Twitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Bluesky => "bluesky",
            Platform::Linkedin => "linkedin",
            Platform::Telegram => "telegram",
            Platform::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bluesky" | "bsky" => Ok(Platform::Bluesky),
            "linkedin" => Ok(Platform::Linkedin),
            "telegram" => Ok(Platform::Telegram),
            "twitter" | "x" => Ok(Platform::Twitter),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

/// Platform-specific credential material, tagged by platform
///
/// Each variant's field set is fixed by the adapter that produces it;
/// there is deliberately no catch-all untyped record.
#[derive(Debug, Clone)]
pub enum Credential {
    Bluesky {
        access_jwt: SecretString,
        refresh_jwt: SecretString,
        did: String,
        handle: String,
    },
    Linkedin {
        access_token: SecretString,
        expires_in_secs: Option<u64>,
        /// OpenID subject id; the member URN authoring UGC posts
        subject: String,
    },
    Telegram {
        user_id: i64,
        auth_date: i64,
    },
    Twitter {
        access_token: SecretString,
        access_secret: SecretString,
        user_id: String,
        screen_name: String,
    },
}

impl Credential {
    pub fn platform(&self) -> Platform {
        match self {
            Credential::Bluesky { .. } => Platform::Bluesky,
            Credential::Linkedin { .. } => Platform::Linkedin,
            Credential::Telegram { .. } => Platform::Telegram,
            Credential::Twitter { .. } => Platform::Twitter,
        }
    }
}

/// Display identity returned by a platform on login (all optional)
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub avatar_url: Option<String>,
}

/// Normalized per-platform session produced by an auth adapter
///
/// At most one session per platform is held at a time; acquiring a new one
/// replaces the old one wholesale (never a field-by-field merge).
#[derive(Debug, Clone)]
pub struct PlatformSession {
    pub credential: Credential,
    pub identity: Identity,
    pub obtained_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

impl PlatformSession {
    pub fn platform(&self) -> Platform {
        self.credential.platform()
    }
}

/// Structured link-preview attachment for platforms that support embeds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Per-platform text ready to publish, freely editable by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftContent {
    pub platform: Platform,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<ArticleRef>,
}

/// The set of drafts for one article, keyed by platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftSet {
    #[serde(default)]
    pub drafts: Vec<DraftContent>,
}

impl DraftSet {
    pub fn get(&self, platform: Platform) -> Option<&DraftContent> {
        self.drafts.iter().find(|d| d.platform == platform)
    }

    /// Insert or replace the draft for its platform
    pub fn set(&mut self, draft: DraftContent) {
        match self.drafts.iter_mut().find(|d| d.platform == draft.platform) {
            Some(existing) => *existing = draft,
            None => self.drafts.push(draft),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

impl From<Vec<DraftContent>> for DraftSet {
    fn from(drafts: Vec<DraftContent>) -> Self {
        let mut set = DraftSet::default();
        for draft in drafts {
            set.set(draft);
        }
        set
    }
}

impl FromIterator<DraftContent> for DraftSet {
    fn from_iter<I: IntoIterator<Item = DraftContent>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

/// Metadata extracted from an article page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub body_text: String,
}

impl ArticleMetadata {
    pub fn article_ref(&self) -> ArticleRef {
        ArticleRef {
            url: self.url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Transient state correlating an OAuth `initiate` call with its callback
///
/// Single-use: consumed by value when the corresponding `complete` runs.
#[derive(Debug)]
pub enum HandshakeState {
    /// OAuth2 anti-CSRF state token (LinkedIn)
    OAuth2 { state: String },
    /// OAuth1 temporary request credential (Twitter); the secret never
    /// leaves the server side of the flow
    OAuth1 {
        request_token: String,
        request_secret: SecretString,
    },
}

/// Where an auth `initiate` call leads next
#[derive(Debug)]
pub enum AuthStart {
    /// Send the user agent to `url`, keep `handshake` for the callback
    Redirect {
        url: String,
        handshake: HandshakeState,
    },
    /// Handshake finished in a single round trip (Bluesky password grant)
    Established(Box<PlatformSession>),
}

/// Outcome of one publish attempt against one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { id: String, url: Option<String> },
    Failure { message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Result of a single publish target's attempt
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub platform: Platform,
    /// Target label, e.g. "bluesky" or "telegram:group"
    pub target: String,
    pub outcome: Outcome,
}

/// Aggregated per-target outcomes from one publish-all invocation
///
/// Complete before it is returned: every dispatched target contributes
/// exactly one entry, in target-list order.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub outcomes: Vec<PublishOutcome>,
}

impl PublishReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Published receipt from a platform (id plus permalink when derivable)
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    pub id: String,
    pub url: Option<String>,
}
