//! Eligibility filter: from raw candidates to the matching pool.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use affinity_core::{
    MembershipRepository, PoolEntry, ProposalPolicy, Result, UserRepository,
};

/// Filters raw candidates down to the pool handed to clustering.
///
/// Raw candidates are already narrowed by the store (non-deleted,
/// suggestible, major assigned, active vector present); this filter applies
/// the temporal predicates: membership quotas and the decline cooldown.
pub struct EligibilityFilter {
    users: Arc<dyn UserRepository>,
    memberships: Arc<dyn MembershipRepository>,
    policy: ProposalPolicy,
}

impl EligibilityFilter {
    pub fn new(
        users: Arc<dyn UserRepository>,
        memberships: Arc<dyn MembershipRepository>,
        policy: ProposalPolicy,
    ) -> Self {
        Self {
            users,
            memberships,
            policy,
        }
    }

    /// Build the eligible pool.
    ///
    /// Every predicate is conjunctive; a candidate failing any one of them
    /// is dropped. Per-candidate lookup failures exclude that candidate and
    /// never abort the batch. A pool smaller than the activation minimum is
    /// the caller's early-exit signal, not an error.
    pub async fn build_pool(&self) -> Result<Vec<PoolEntry>> {
        let candidates = self.users.candidates().await?;
        if candidates.is_empty() {
            debug!(
                subsystem = "scheduler",
                component = "eligibility",
                "No candidates with active vectors"
            );
            return Ok(Vec::new());
        }

        let mut pool = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self.is_eligible(candidate.user_id).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(
                        subsystem = "scheduler",
                        component = "eligibility",
                        user_id = %candidate.user_id,
                        error = %e,
                        "Eligibility check failed, excluding candidate"
                    );
                    continue;
                }
            }

            let vector = candidate.embedding.as_slice().to_vec();
            if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
                warn!(
                    subsystem = "scheduler",
                    component = "eligibility",
                    user_id = %candidate.user_id,
                    "Candidate has malformed vector, excluding"
                );
                continue;
            }

            pool.push(PoolEntry {
                user_id: candidate.user_id,
                vector,
            });
        }

        info!(
            subsystem = "scheduler",
            component = "eligibility",
            op = "build_pool",
            pool_size = pool.len(),
            "Eligibility filtering complete"
        );
        Ok(pool)
    }

    /// The three temporal predicates, conjunctively.
    async fn is_eligible(&self, user_id: Uuid) -> Result<bool> {
        let joined = self.memberships.joined_active_count(user_id).await?;
        if joined >= self.policy.max_active_conversations {
            return Ok(false);
        }

        let pending = self.memberships.pending_proposed_count(user_id).await?;
        if pending >= self.policy.max_pending_proposals {
            return Ok(false);
        }

        if let Some(last_decline) = self.memberships.latest_decline(user_id).await? {
            let cooldown_threshold = Utc::now() - ChronoDuration::days(self.policy.cooldown_days);
            if last_decline > cooldown_threshold {
                return Ok(false);
            }
        }

        Ok(true)
    }
}
