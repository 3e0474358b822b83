//! crosspost adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `bluesky`: password-grant login and AT Protocol post publishing
//! - `linkedin`: OAuth2 authorization-code login and UGC share publishing
//! - `telegram`: login-widget HMAC verification, Bot API publishing, diagnostics
//! - `twitter`: OAuth 1.0a three-legged login and v2 tweet publishing
//! - `summarizer`: LLM-backed per-platform draft generation
//! - `metadata`: article metadata extraction (OpenGraph + body text)
//! - `session`: in-memory session store

mod session_memory;
mod stub;

pub mod bluesky;
pub mod linkedin;
pub mod metadata;
pub mod summarizer;
pub mod telegram;
pub mod twitter;

/// Re-exports for session store adapters
pub mod session {
    pub use crate::session_memory::InMemorySessionStore;
}

pub use stub::StubPublisher;
