//! Compose use case - turn one article into per-platform drafts

use crate::{
    model::{ArticleRef, DraftContent, DraftSet, Platform},
    policy::draft_limit,
    ports::{SummarizeError, Summarizer},
};

/// Errors from draft composition
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("No article text to summarize")]
    EmptyArticle,
    #[error("Summarization failed for {platform}: {source}")]
    Summarize {
        platform: Platform,
        #[source]
        source: SummarizeError,
    },
}

/// Builds a draft per requested platform from raw article text
pub struct ComposeUseCase<'a> {
    summarizer: &'a dyn Summarizer,
}

impl<'a> ComposeUseCase<'a> {
    pub fn new(summarizer: &'a dyn Summarizer) -> Self {
        Self { summarizer }
    }

    /// Summarize the article once per platform and assemble the draft set
    ///
    /// Twitter gets the article URL appended to the body (no link-preview
    /// embed there); Bluesky, LinkedIn, and Telegram carry the article as a
    /// structured attachment their publishers turn into embeds or links.
    pub async fn compose(
        &self,
        article_text: &str,
        article: Option<&ArticleRef>,
        platforms: &[Platform],
    ) -> Result<DraftSet, ComposeError> {
        if article_text.trim().is_empty() {
            return Err(ComposeError::EmptyArticle);
        }

        let mut set = DraftSet::default();
        for &platform in platforms {
            let summary = self
                .summarizer
                .summarize(article_text, platform)
                .await
                .map_err(|source| ComposeError::Summarize { platform, source })?;

            let mut body = summary.trim().to_string();
            if platform == Platform::Twitter {
                if let Some(article) = article {
                    let with_url = format!("{}\n\n{}", body, article.url);
                    if with_url.chars().count() <= draft_limit(platform) {
                        body = with_url;
                    }
                }
            }

            set.set(DraftContent {
                platform,
                body,
                article: article.cloned(),
            });
        }

        Ok(set)
    }
}
