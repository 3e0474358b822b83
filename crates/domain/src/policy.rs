//! Per-platform content constraints and input sanitization

use crate::model::{DraftContent, Platform};

/// Maximum draft length accepted for publishing, in characters
pub fn draft_limit(platform: Platform) -> usize {
    match platform {
        Platform::Bluesky => 280,
        Platform::Twitter => 280,
        Platform::Linkedin => 3000,
        Platform::Telegram => 4096,
    }
}

/// Target length for generated summaries, in characters
///
/// Below `draft_limit` so that an appended article URL still fits.
pub fn summary_budget(platform: Platform) -> usize {
    match platform {
        Platform::Bluesky => 250,
        Platform::Twitter => 250,
        Platform::Linkedin => 1200,
        Platform::Telegram => 4000,
    }
}

/// Draft validation failure, reported before any network call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Draft is empty")]
    Empty,
    #[error("Draft too long: {len} > {max} characters")]
    TooLong { len: usize, max: usize },
}

/// Check a draft against its platform's constraints
pub fn validate_draft(draft: &DraftContent) -> Result<(), DraftError> {
    if draft.body.trim().is_empty() {
        return Err(DraftError::Empty);
    }

    let len = draft.body.chars().count();
    let max = draft_limit(draft.platform);
    if len > max {
        return Err(DraftError::TooLong { len, max });
    }

    Ok(())
}

/// Unicode characters that render as nothing but break identifier lookups
/// when pasted along with a handle.
const INVISIBLE_CHARS: [char; 7] = [
    '\u{200B}', // zero-width space
    '\u{200C}', // zero-width non-joiner
    '\u{200D}', // zero-width joiner
    '\u{200E}', // left-to-right mark
    '\u{200F}', // right-to-left mark
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte order mark
];

/// Sanitize a Bluesky identifier (handle or email) before login
///
/// Strips surrounding whitespace, invisible Unicode, a single leading `@`,
/// and trailing dots or spaces left over from copy-paste.
pub fn sanitize_bluesky_identifier(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect();

    let trimmed = cleaned.trim();
    let without_at = trimmed.strip_prefix('@').unwrap_or(trimmed);
    without_at
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(platform: Platform, body: &str) -> DraftContent {
        DraftContent {
            platform,
            body: body.to_string(),
            article: None,
        }
    }

    #[test]
    fn sanitize_strips_whitespace_at_and_trailing_dots() {
        assert_eq!(
            sanitize_bluesky_identifier(" @Name.bsky.social. "),
            "Name.bsky.social"
        );
    }

    #[test]
    fn sanitize_strips_invisible_unicode() {
        assert_eq!(
            sanitize_bluesky_identifier("\u{FEFF}alice\u{200B}.bsky.social\u{200D}"),
            "alice.bsky.social"
        );
    }

    #[test]
    fn sanitize_strips_only_one_leading_at() {
        assert_eq!(sanitize_bluesky_identifier("@@handle"), "@handle");
    }

    #[test]
    fn sanitize_keeps_emails_intact() {
        assert_eq!(
            sanitize_bluesky_identifier("user@example.com"),
            "user@example.com"
        );
    }

    #[test]
    fn bluesky_draft_at_limit_is_accepted() {
        let body = "a".repeat(280);
        assert!(validate_draft(&draft(Platform::Bluesky, &body)).is_ok());
    }

    #[test]
    fn bluesky_draft_over_limit_is_rejected() {
        let body = "a".repeat(281);
        assert_eq!(
            validate_draft(&draft(Platform::Bluesky, &body)),
            Err(DraftError::TooLong { len: 281, max: 280 })
        );
    }

    #[test]
    fn limit_counts_chars_not_bytes() {
        // 280 multibyte chars is exactly at the limit
        let body = "é".repeat(280);
        assert!(validate_draft(&draft(Platform::Twitter, &body)).is_ok());
    }

    #[test]
    fn whitespace_only_draft_is_empty() {
        assert_eq!(
            validate_draft(&draft(Platform::Telegram, "  \n ")),
            Err(DraftError::Empty)
        );
    }
}
