//! Proposal orchestrator: one matching cycle from pool to invitations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use affinity_core::{
    ClusteringCapability, Error, NewNotification, NewProposal, NotificationPriority,
    NotificationRepository, OrchestrationReport, ProposalPolicy, ProposalRepository, Result,
    UserCluster, UserRepository,
};

use crate::eligibility::EligibilityFilter;
use crate::naming::{proposal_name, MAX_NAME_TAGS, MIN_TAG_HOLDERS};
use crate::scheduler::{PeriodicTask, ShutdownToken};

/// Insert-once key for a cluster: sha256 over the sorted member ids plus the
/// UTC day, so overlapping replicas cannot create the same proposal twice on
/// the same day.
pub fn cluster_dedup_key(member_ids: &[Uuid], day: DateTime<Utc>) -> String {
    let mut sorted: Vec<Uuid> = member_ids.to_vec();
    sorted.sort();

    let mut hasher = Sha256::new();
    for id in &sorted {
        hasher.update(id.as_bytes());
    }
    hasher.update(day.format("%Y-%m-%d").to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Drives one matching cycle: build pool, cluster, persist, notify.
pub struct ProposalOrchestrator {
    filter: EligibilityFilter,
    users: Arc<dyn UserRepository>,
    proposals: Arc<dyn ProposalRepository>,
    notifications: Arc<dyn NotificationRepository>,
    clustering: Arc<dyn ClusteringCapability>,
    policy: ProposalPolicy,
    capability_timeout: Duration,
}

impl ProposalOrchestrator {
    pub fn new(
        filter: EligibilityFilter,
        users: Arc<dyn UserRepository>,
        proposals: Arc<dyn ProposalRepository>,
        notifications: Arc<dyn NotificationRepository>,
        clustering: Arc<dyn ClusteringCapability>,
        policy: ProposalPolicy,
        capability_timeout: Duration,
    ) -> Self {
        Self {
            filter,
            users,
            proposals,
            notifications,
            clustering,
            policy,
            capability_timeout,
        }
    }

    /// Run one orchestration cycle.
    pub async fn run_cycle(&self, shutdown: &ShutdownToken) -> Result<OrchestrationReport> {
        let mut report = OrchestrationReport::default();

        let pool = self.filter.build_pool().await?;
        report.pool_size = pool.len();

        if pool.len() < self.policy.min_members_to_activate {
            // Early exit, not an error: too few eligible users to cluster.
            debug!(
                subsystem = "scheduler",
                component = "orchestrator",
                pool_size = pool.len(),
                min_members = self.policy.min_members_to_activate,
                "Pool below activation minimum, skipping clustering"
            );
            return Ok(report);
        }

        let clusters = tokio::time::timeout(
            self.capability_timeout,
            self.clustering
                .cluster_users(&pool, self.policy.min_members_to_activate),
        )
        .await
        .map_err(|_| Error::CapabilityTimeout("cluster_users".into()))??;

        info!(
            subsystem = "scheduler",
            component = "orchestrator",
            pool_size = pool.len(),
            result_count = clusters.len(),
            "Clustering capability returned"
        );

        for cluster in clusters {
            // Never start a new creation sequence once shutdown is requested:
            // a half-created proposal with no memberships is worse than none.
            if shutdown.is_shutdown() {
                info!(
                    subsystem = "scheduler",
                    component = "orchestrator",
                    "Shutdown requested, stopping before next cluster"
                );
                break;
            }

            // Defensive re-filter: the capability promises min-size clusters
            // but the invariant is ours to uphold.
            if cluster.members.len() < self.policy.min_members_to_activate {
                debug!(
                    subsystem = "scheduler",
                    component = "orchestrator",
                    cluster_size = cluster.members.len(),
                    "Dropping undersized cluster"
                );
                continue;
            }

            // Independent failure boundary per cluster.
            match self.create_proposal(&cluster).await {
                Ok(Some(_)) => {
                    report.proposals_created += 1;
                    report.users_invited += cluster.members.len();
                }
                Ok(None) => {
                    // Another replica already created this proposal today.
                }
                Err(e) => {
                    warn!(
                        subsystem = "scheduler",
                        component = "orchestrator",
                        cluster_size = cluster.members.len(),
                        error = %e,
                        "Failed to create proposal for cluster"
                    );
                }
            }
        }

        info!(
            subsystem = "scheduler",
            component = "orchestrator",
            op = "run_cycle",
            pool_size = report.pool_size,
            proposals_created = report.proposals_created,
            users_invited = report.users_invited,
            "Orchestration cycle completed"
        );
        Ok(report)
    }

    /// Persist one cluster as a proposal and fan out invitations.
    ///
    /// The proposal and its memberships commit as one atomic unit before any
    /// notification is written; a notification failure for one member never
    /// blocks the rest of the fan-out.
    async fn create_proposal(&self, cluster: &UserCluster) -> Result<Option<Uuid>> {
        let member_ids = cluster.member_ids();
        let now = Utc::now();

        let name = self.display_name(&member_ids, now).await;
        let expires_at = now + ChronoDuration::days(self.policy.proposal_expiration_days);

        // Deterministic creator: lowest member id. All members are equally
        // invited; this only pins the nominal creator across replicas and
        // unstable capability orderings.
        let created_by = member_ids
            .iter()
            .min()
            .copied()
            .ok_or_else(|| Error::InvalidInput("cluster has no members".into()))?;

        let proposal_id = match self
            .proposals
            .create_with_members(
                NewProposal {
                    name: name.clone(),
                    ai_suggested: true,
                    expires_at,
                    created_by,
                    dedup_key: Some(cluster_dedup_key(&member_ids, now)),
                },
                &cluster.members,
            )
            .await?
        {
            Some(id) => id,
            None => return Ok(None),
        };

        info!(
            subsystem = "scheduler",
            component = "orchestrator",
            proposal_id = %proposal_id,
            member_count = cluster.members.len(),
            name = %name,
            "Created proposal"
        );

        for member in &cluster.members {
            let notification = NewNotification {
                title: "New study group suggestion".to_string(),
                content: format!(
                    "You are invited to join a study group with {} peers who share \
                     your interests. Review and respond before it expires!",
                    cluster.members.len() - 1
                ),
                link: format!("/proposals/{}", proposal_id),
                priority: NotificationPriority::High,
                expires_at: Some(expires_at),
            };

            if let Err(e) = self.notify_one(notification, member.user_id, now).await {
                warn!(
                    subsystem = "scheduler",
                    component = "orchestrator",
                    proposal_id = %proposal_id,
                    user_id = %member.user_id,
                    error = %e,
                    "Failed to notify invited member"
                );
            }
        }

        Ok(Some(proposal_id))
    }

    async fn notify_one(
        &self,
        notification: NewNotification,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let notification_id = self.notifications.create(notification).await?;
        self.notifications
            .add_recipients(notification_id, &[user_id], now)
            .await
    }

    /// Look up shared interests and apply the naming heuristic.
    ///
    /// Interest lookups degrade to the timestamped fallback rather than
    /// failing the whole cluster.
    async fn display_name(&self, member_ids: &[Uuid], now: DateTime<Utc>) -> String {
        let majors = match self.users.major_histogram(member_ids).await {
            Ok(majors) => majors,
            Err(e) => {
                warn!(
                    subsystem = "scheduler",
                    component = "orchestrator",
                    error = %e,
                    "Major lookup failed, falling back"
                );
                Vec::new()
            }
        };

        let tags = match self
            .users
            .shared_tags(member_ids, MIN_TAG_HOLDERS, MAX_NAME_TAGS as i64)
            .await
        {
            Ok(tags) => tags,
            Err(e) => {
                warn!(
                    subsystem = "scheduler",
                    component = "orchestrator",
                    error = %e,
                    "Tag lookup failed, falling back"
                );
                Vec::new()
            }
        };

        proposal_name(member_ids.len(), &majors, &tags, now)
    }
}

#[async_trait]
impl PeriodicTask for ProposalOrchestrator {
    fn name(&self) -> &'static str {
        "proposal_orchestrator"
    }

    async fn tick(&self, shutdown: &ShutdownToken) -> Result<()> {
        self.run_cycle(shutdown).await.map(|_| ())
    }
}
