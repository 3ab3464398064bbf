//! Expiration sweeper: ends overdue proposals and tells accepted members.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use affinity_core::{
    MembershipRepository, NewNotification, NotificationPriority, NotificationRepository, Proposal,
    ProposalRepository, Result, SweepReport,
};

use crate::scheduler::{PeriodicTask, ShutdownToken};

/// Periodically ends `Proposed` proposals whose deadline has passed.
pub struct ExpirationSweeper {
    proposals: Arc<dyn ProposalRepository>,
    memberships: Arc<dyn MembershipRepository>,
    notifications: Arc<dyn NotificationRepository>,
}

impl ExpirationSweeper {
    pub fn new(
        proposals: Arc<dyn ProposalRepository>,
        memberships: Arc<dyn MembershipRepository>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            proposals,
            memberships,
            notifications,
        }
    }

    /// Run one sweep over all expired proposals.
    pub async fn run_cycle(&self, shutdown: &ShutdownToken) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let now = Utc::now();

        let expired = self.proposals.list_expired(now).await?;
        if expired.is_empty() {
            return Ok(report);
        }

        info!(
            subsystem = "scheduler",
            component = "sweeper",
            count = expired.len(),
            "Found expired proposals"
        );

        for proposal in expired {
            if shutdown.is_shutdown() {
                info!(
                    subsystem = "scheduler",
                    component = "sweeper",
                    "Shutdown requested, stopping before next proposal"
                );
                break;
            }

            // Each expired proposal is handled independently.
            match self.expire_one(&proposal).await {
                Ok(Some(notified)) => {
                    report.proposals_expired += 1;
                    report.members_notified += notified;
                }
                Ok(None) => {
                    // Already ended by a concurrent sweep; nothing to do.
                }
                Err(e) => {
                    warn!(
                        subsystem = "scheduler",
                        component = "sweeper",
                        proposal_id = %proposal.id,
                        error = %e,
                        "Failed to expire proposal"
                    );
                }
            }
        }

        info!(
            subsystem = "scheduler",
            component = "sweeper",
            op = "run_cycle",
            proposals_expired = report.proposals_expired,
            members_notified = report.members_notified,
            "Expiration sweep completed"
        );
        Ok(report)
    }

    /// End one proposal and notify its accepted members.
    ///
    /// The state flip comes first and is guarded on the current status, so a
    /// proposal that lost the race to another sweep is skipped without any
    /// duplicate notifications. Returns `Ok(None)` in that case.
    async fn expire_one(&self, proposal: &Proposal) -> Result<Option<usize>> {
        let now = Utc::now();

        if !self.proposals.end_expired(proposal.id, now).await? {
            return Ok(None);
        }

        let accepted = self.memberships.accepted_member_ids(proposal.id).await?;
        let mut notified = 0;

        for user_id in &accepted {
            let notification = NewNotification {
                title: "Study group suggestion expired".to_string(),
                content: format!(
                    "The suggested study group \"{}\" did not gather enough members \
                     in time and has been closed.",
                    proposal.name
                ),
                link: String::new(),
                priority: NotificationPriority::Normal,
                expires_at: None,
            };

            let result = async {
                let id = self.notifications.create(notification).await?;
                self.notifications.add_recipients(id, &[*user_id], now).await
            }
            .await;

            match result {
                Ok(()) => notified += 1,
                Err(e) => {
                    warn!(
                        subsystem = "scheduler",
                        component = "sweeper",
                        proposal_id = %proposal.id,
                        user_id = %user_id,
                        error = %e,
                        "Failed to notify accepted member"
                    );
                }
            }
        }

        info!(
            subsystem = "scheduler",
            component = "sweeper",
            proposal_id = %proposal.id,
            accepted = accepted.len(),
            notified,
            "Ended expired proposal"
        );
        Ok(Some(notified))
    }
}

#[async_trait]
impl PeriodicTask for ExpirationSweeper {
    fn name(&self) -> &'static str {
        "expiration_sweeper"
    }

    async fn tick(&self, shutdown: &ShutdownToken) -> Result<()> {
        self.run_cycle(shutdown).await.map(|_| ())
    }
}
