//! Core traits for the affinity scheduler abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. The repositories are
//! implemented over PostgreSQL in `affinity-db`; the capabilities over the
//! external matching service in `affinity-match`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER AND TOPIC GROUP REPOSITORIES
// =============================================================================

/// A raw matching candidate: a suggestible user joined to their active vector.
#[derive(Debug, Clone)]
pub struct CandidateUser {
    pub user_id: Uuid,
    pub embedding: Vector,
}

/// One major with the number of cluster members declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorCount {
    pub name: String,
    pub count: i64,
}

/// Read-only view of users as the scheduler needs them.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// IDs of all non-deleted users (vector refresh walks these).
    async fn active_user_ids(&self) -> Result<Vec<Uuid>>;

    /// Non-deleted, suggestible users with a major, inner-joined to their
    /// active profile vector. Users without a vector simply do not appear.
    async fn candidates(&self) -> Result<Vec<CandidateUser>>;

    /// Majors declared by the given users, with per-major member counts,
    /// most common first.
    async fn major_histogram(&self, user_ids: &[Uuid]) -> Result<Vec<MajorCount>>;

    /// Interest tags held by at least `min_holders` distinct users among
    /// `user_ids`, ranked by holder count (ties by name), at most `limit`.
    async fn shared_tags(&self, user_ids: &[Uuid], min_holders: i64, limit: i64)
        -> Result<Vec<String>>;
}

/// Read-only view of topic groups for vector refresh.
#[async_trait]
pub trait TopicGroupRepository: Send + Sync {
    /// All non-deleted topic groups with their subject and tags.
    async fn list_active(&self) -> Result<Vec<TopicGroup>>;
}

// =============================================================================
// PROFILE VECTOR REPOSITORY
// =============================================================================

/// Storage for similarity vectors with single-active-row semantics.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Upsert the active vector for an owner. Any previously active row for
    /// the same (owner, kind) is deactivated in the same transaction.
    async fn upsert_active(&self, owner_id: Uuid, kind: VectorKind, embedding: Vector)
        -> Result<Uuid>;

    /// Fetch the active vector for an owner, if any.
    async fn get_active(&self, owner_id: Uuid, kind: VectorKind) -> Result<Option<ProfileVector>>;
}

// =============================================================================
// PROPOSAL AND MEMBERSHIP REPOSITORIES
// =============================================================================

/// Request to persist one proposal with its pending memberships.
#[derive(Debug, Clone)]
pub struct NewProposal {
    pub name: String,
    pub ai_suggested: bool,
    pub expires_at: DateTime<Utc>,
    pub created_by: Uuid,
    /// Insert-once key for replica races; `None` disables deduplication.
    pub dedup_key: Option<String>,
}

/// Repository for proposals and their lifecycle.
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// Atomically insert a proposal and one Pending membership per member.
    ///
    /// Returns `Ok(None)` when the dedup key already exists (another replica
    /// created the same proposal); nothing is written in that case.
    async fn create_with_members(
        &self,
        proposal: NewProposal,
        members: &[ClusterMember],
    ) -> Result<Option<Uuid>>;

    /// Fetch a proposal by id.
    async fn fetch(&self, id: Uuid) -> Result<Proposal>;

    /// Proposals still Proposed, past their deadline, and not yet removed.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Proposal>>;

    /// Force a still-Proposed proposal to Ended and remove it from listings.
    ///
    /// Returns `false` when the row no longer matches the Proposed predicate
    /// (already ended or activated), which makes repeated sweeps no-ops.
    async fn end_expired(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;
}

/// Repository for membership state the eligibility filter and sweeper read.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Joined memberships in Active, non-deleted groups for a user.
    async fn joined_active_count(&self, user_id: Uuid) -> Result<i64>;

    /// Pending memberships in Proposed, non-deleted proposals for a user.
    async fn pending_proposed_count(&self, user_id: Uuid) -> Result<i64>;

    /// Timestamp of the user's most recent decline, if any.
    async fn latest_decline(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>>;

    /// Memberships of a proposal, all invite states.
    async fn list_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Membership>>;

    /// User ids of Accepted, non-deleted memberships of a proposal.
    async fn accepted_member_ids(&self, proposal_id: Uuid) -> Result<Vec<Uuid>>;
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Fire-and-forget notification dispatch; delivery transport is out of scope.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Create a notification row, returning its id.
    async fn create(&self, notification: NewNotification) -> Result<Uuid>;

    /// Attach recipients to a notification as one atomic batch.
    async fn add_recipients(
        &self,
        notification_id: Uuid,
        user_ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<()>;
}

// =============================================================================
// EXTERNAL CAPABILITIES
// =============================================================================

/// Behavioral signal snapshots driving vector refresh.
#[async_trait]
pub trait BehaviorSignalSource: Send + Sync {
    /// Signal snapshot for a user; `None` means no recorded behavior yet
    /// (the refresher skips such users silently).
    async fn signals_for_user(&self, user_id: Uuid) -> Result<Option<BehaviorSnapshot>>;
}

/// External embedding capability: named signal weights in, fixed-length
/// vector out.
#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    async fn compute_vector(&self, signals: &[SignalScore]) -> Result<Vec<f32>>;
}

/// External clustering capability.
///
/// Contract: returned groups are disjoint and carry a per-member similarity
/// to the cluster centroid. Callers must still re-check minimum size.
#[async_trait]
pub trait ClusteringCapability: Send + Sync {
    async fn cluster_users(&self, pool: &[PoolEntry], min_size: usize)
        -> Result<Vec<UserCluster>>;
}
