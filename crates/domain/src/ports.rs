//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real providers.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{
    ArticleMetadata, DraftContent, Platform, PlatformSession, PublishReceipt,
};

/// Error type for auth handshakes
///
/// Adapters never panic past their boundary; every failure mode of every
/// handshake maps onto one of these variants.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed user input, rejected before any network call
    #[error("Missing input: {0}")]
    MissingInput(String),
    /// OAuth2 state mismatch or OAuth1 temporary-secret loss; the login
    /// must be restarted from `initiate`
    #[error("State mismatch, possible CSRF; restart the login")]
    StateMismatch,
    /// Cryptographic verification failed (e.g. Telegram widget HMAC)
    #[error("Signature verification failed")]
    Signature,
    /// Auth payload presented after its freshness window
    #[error("Auth payload is stale: {age_secs}s old (max {max_secs}s)")]
    StaleAuth { age_secs: i64, max_secs: i64 },
    /// Provider rejected the credentials
    #[error("Authentication failed: {0}")]
    Provider(String),
    /// Network or transport failure; never silently retried
    #[error("Network error: {0}")]
    Network(String),
    /// Adapter misconfiguration, fatal at construction time
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error type for publish operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for publishing a draft to one platform target
///
/// A platform may expose several targets (Telegram: direct message and a
/// group chat); each target is an independent publisher instance with its
/// own outcome.
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    /// Publish a draft using the given session
    async fn publish(
        &self,
        session: &PlatformSession,
        draft: &DraftContent,
    ) -> Result<PublishReceipt, PublishError>;

    fn platform(&self) -> Platform;

    /// Target label shown in reports (e.g. "bluesky", "telegram:group")
    fn target(&self) -> &str;
}

/// Error type for the session store
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    Store(String),
}

/// Port for the client-held session set
///
/// One session per platform; `put` replaces wholesale. Lives for the
/// duration of one run — deliberately not durable.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session, replacing any existing one for the same platform
    async fn put(&self, session: PlatformSession) -> Result<(), SessionError>;

    async fn get(&self, platform: Platform) -> Result<Option<PlatformSession>, SessionError>;

    /// All active sessions, in `Platform::ALL` order
    async fn all(&self) -> Result<Vec<PlatformSession>, SessionError>;

    async fn clear(&self, platform: Platform) -> Result<(), SessionError>;
}

/// Error type for summarizer operations
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for LLM-backed per-platform summarization
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a platform-shaped summary of the article text, bounded by
    /// that platform's summary budget
    async fn summarize(
        &self,
        article_text: &str,
        platform: Platform,
    ) -> Result<String, SummarizeError>;
}

/// Error type for metadata fetching
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("Upstream returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Port for article metadata extraction
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ArticleMetadata, MetadataError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
