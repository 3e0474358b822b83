//! Recording publisher used by dry runs and tests

use async_trait::async_trait;
use crosspost_domain::{
    DraftContent, Platform, PlatformPublisher, PlatformSession, PublishError, PublishReceipt,
};
use std::sync::Mutex;

/// Publisher that records drafts instead of sending them anywhere
pub struct StubPublisher {
    platform: Platform,
    target: String,
    fail_with: Option<String>,
    published: Mutex<Vec<DraftContent>>,
}

impl StubPublisher {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            target: platform.as_str().to_string(),
            fail_with: None,
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// Drafts this publisher has accepted, in call order
    pub fn published(&self) -> Vec<DraftContent> {
        self.published.lock().expect("stub lock poisoned").clone()
    }
}

#[async_trait]
impl PlatformPublisher for StubPublisher {
    async fn publish(
        &self,
        _session: &PlatformSession,
        draft: &DraftContent,
    ) -> Result<PublishReceipt, PublishError> {
        if let Some(message) = &self.fail_with {
            return Err(PublishError::Api(message.clone()));
        }
        let mut published = self.published.lock().expect("stub lock poisoned");
        published.push(draft.clone());
        Ok(PublishReceipt {
            id: format!("{}-dry-{}", self.platform, published.len()),
            url: None,
        })
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn target(&self) -> &str {
        &self.target
    }
}
