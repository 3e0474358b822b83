//! Publish-all use case - best-effort broadcast across platform targets
//!
//! For every target whose platform has both an active session and a valid
//! draft, exactly one publish call is issued. Calls are independent: one
//! target's failure neither blocks nor rolls back another's success, and
//! the report is complete (one outcome per dispatched target) before it is
//! returned. Failed publishes are never auto-retried.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::{
    model::{DraftContent, DraftSet, Outcome, PlatformSession, PublishOutcome, PublishReport},
    policy::validate_draft,
    ports::{PlatformPublisher, SessionError, SessionStore},
};

/// Publish orchestrator over a fixed list of platform targets
pub struct PublishAll {
    targets: Vec<Arc<dyn PlatformPublisher>>,
}

impl PublishAll {
    pub fn new(targets: Vec<Arc<dyn PlatformPublisher>>) -> Self {
        Self { targets }
    }

    /// Broadcast the drafts to every eligible target
    ///
    /// Targets whose platform has no session or no draft are skipped
    /// silently. A target with a session but an invalid draft yields a
    /// local failure outcome without any network call.
    pub async fn publish_all(
        &self,
        store: &dyn SessionStore,
        drafts: &DraftSet,
    ) -> Result<PublishReport, SessionError> {
        let mut local: Vec<(usize, PublishOutcome)> = Vec::new();
        let mut dispatched: Vec<(usize, &Arc<dyn PlatformPublisher>, PlatformSession, DraftContent)> =
            Vec::new();

        for (index, target) in self.targets.iter().enumerate() {
            let platform = target.platform();
            let Some(session) = store.get(platform).await? else {
                tracing::debug!(platform = %platform, "No session, skipping target");
                continue;
            };
            let Some(draft) = drafts.get(platform) else {
                tracing::debug!(platform = %platform, "No draft, skipping target");
                continue;
            };

            if let Err(e) = validate_draft(draft) {
                local.push((
                    index,
                    PublishOutcome {
                        platform,
                        target: target.target().to_string(),
                        outcome: Outcome::Failure {
                            message: e.to_string(),
                        },
                    },
                ));
                continue;
            }

            dispatched.push((index, target, session, draft.clone()));
        }

        let mut in_flight: FuturesUnordered<_> = dispatched
            .into_iter()
            .map(|(index, target, session, draft)| async move {
                let outcome = match target.publish(&session, &draft).await {
                    Ok(receipt) => Outcome::Success {
                        id: receipt.id,
                        url: receipt.url,
                    },
                    Err(e) => Outcome::Failure {
                        message: e.to_string(),
                    },
                };
                (
                    index,
                    PublishOutcome {
                        platform: target.platform(),
                        target: target.target().to_string(),
                        outcome,
                    },
                )
            })
            .collect();

        let mut entries = local;
        while let Some(entry) = in_flight.next().await {
            entries.push(entry);
        }

        // Report follows target-list order regardless of completion order
        entries.sort_by_key(|(index, _)| *index);

        let report = PublishReport {
            outcomes: entries.into_iter().map(|(_, outcome)| outcome).collect(),
        };

        for outcome in &report.outcomes {
            match &outcome.outcome {
                Outcome::Success { id, .. } => {
                    tracing::info!(target = %outcome.target, id = %id, "Published");
                }
                Outcome::Failure { message } => {
                    tracing::warn!(target = %outcome.target, error = %message, "Publish failed");
                }
            }
        }

        Ok(report)
    }
}
