//! Domain models for the affinity group proposal scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export the pgvector type so downstream crates share one Vector.
pub use pgvector::Vector;

// =============================================================================
// USERS AND TOPIC GROUPS
// =============================================================================

/// A platform user as seen by the scheduler (read-only here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    /// Whether the user opted into group suggestions.
    pub suggestible: bool,
    /// Declared major, if any. Candidates without one are never pooled.
    pub major_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A topic group (subject community) whose vector is refreshed alongside users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicGroup {
    pub id: Uuid,
    pub subject: String,
    pub tags: Vec<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// PROFILE VECTORS
// =============================================================================

/// What kind of entity a profile vector describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorKind {
    User,
    TopicGroup,
}

impl VectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorKind::User => "user",
            VectorKind::TopicGroup => "topic_group",
        }
    }
}

/// A stored similarity vector for a user or topic group.
///
/// At most one active row exists per (owner, kind); the upsert deactivates
/// any prior row in the same transaction.
#[derive(Debug, Clone)]
pub struct ProfileVector {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: VectorKind,
    pub embedding: Vector,
    pub computed_at: DateTime<Utc>,
    pub active: bool,
}

/// One named behavioral signal with its accumulated score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalScore {
    pub name: String,
    pub weight: f32,
}

/// Snapshot of a user's behavioral signals, grouped by signal family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorSnapshot {
    pub topic_scores: Vec<SignalScore>,
    pub tag_scores: Vec<SignalScore>,
}

impl BehaviorSnapshot {
    /// Flatten into the `(name, weight)` list the embedding capability takes.
    pub fn into_signals(self) -> Vec<SignalScore> {
        let mut signals = self.topic_scores;
        signals.extend(self.tag_scores);
        signals
    }

    pub fn is_empty(&self) -> bool {
        self.topic_scores.is_empty() && self.tag_scores.is_empty()
    }
}

// =============================================================================
// PROPOSALS AND MEMBERSHIPS
// =============================================================================

/// Lifecycle status of a group proposal.
///
/// The scheduler creates `Proposed` rows and forces expired ones to `Ended`.
/// The transition to `Active` happens in the external accept/decline flow on
/// quorum; both `Active` and `Ended` are terminal from this subsystem's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Proposed,
    Active,
    Ended,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Proposed => "proposed",
            ProposalStatus::Active => "active",
            ProposalStatus::Ended => "ended",
        }
    }
}

/// A time-boxed group proposal awaiting member confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub name: String,
    pub status: ProposalStatus,
    pub ai_suggested: bool,
    /// Fixed at creation (now + expiration days); never updated afterwards.
    pub expires_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Role of a member within a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Member,
    Owner,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Member => "member",
            MemberRole::Owner => "owner",
        }
    }
}

/// One user's invitation state within a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
    Joined,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Declined => "declined",
            InviteStatus::Joined => "joined",
        }
    }
}

/// One user's membership in a proposal. Unique per (proposal, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub invite_status: InviteStatus,
    /// Similarity to the cluster centroid, supplied by the clustering capability.
    pub similarity_score: f32,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// CLUSTERING
// =============================================================================

/// One eligible candidate handed to the clustering capability.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub user_id: Uuid,
    pub vector: Vec<f32>,
}

/// One member of a returned cluster with its similarity to the centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub user_id: Uuid,
    pub similarity_to_centroid: f32,
}

/// A candidate study group returned by the clustering capability.
///
/// Disjointness across clusters and the internal similarity threshold are the
/// capability's own contract; the orchestrator still re-checks minimum size.
#[derive(Debug, Clone, Default)]
pub struct UserCluster {
    pub members: Vec<ClusterMember>,
}

impl UserCluster {
    pub fn member_ids(&self) -> Vec<Uuid> {
        self.members.iter().map(|m| m.user_id).collect()
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Delivery priority for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Normal,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }
}

/// Request to create a notification (delivery transport is out of scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub title: String,
    pub content: String,
    pub link: String,
    pub priority: NotificationPriority,
    pub expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// CYCLE REPORTS
// =============================================================================

/// Summary of one vector refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub users_refreshed: usize,
    pub groups_refreshed: usize,
    pub skipped: usize,
}

/// Summary of one orchestration cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestrationReport {
    pub pool_size: usize,
    pub proposals_created: usize,
    pub users_invited: usize,
}

/// Summary of one expiration sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub proposals_expired: usize,
    pub members_notified: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_status_as_str() {
        assert_eq!(ProposalStatus::Proposed.as_str(), "proposed");
        assert_eq!(ProposalStatus::Active.as_str(), "active");
        assert_eq!(ProposalStatus::Ended.as_str(), "ended");
    }

    #[test]
    fn test_invite_status_as_str() {
        assert_eq!(InviteStatus::Pending.as_str(), "pending");
        assert_eq!(InviteStatus::Accepted.as_str(), "accepted");
        assert_eq!(InviteStatus::Declined.as_str(), "declined");
        assert_eq!(InviteStatus::Joined.as_str(), "joined");
    }

    #[test]
    fn test_vector_kind_as_str() {
        assert_eq!(VectorKind::User.as_str(), "user");
        assert_eq!(VectorKind::TopicGroup.as_str(), "topic_group");
    }

    #[test]
    fn test_behavior_snapshot_into_signals_preserves_order() {
        let snapshot = BehaviorSnapshot {
            topic_scores: vec![SignalScore {
                name: "databases".to_string(),
                weight: 0.7,
            }],
            tag_scores: vec![SignalScore {
                name: "sql".to_string(),
                weight: 0.3,
            }],
        };

        let signals = snapshot.into_signals();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].name, "databases");
        assert_eq!(signals[1].name, "sql");
    }

    #[test]
    fn test_behavior_snapshot_is_empty() {
        assert!(BehaviorSnapshot::default().is_empty());

        let snapshot = BehaviorSnapshot {
            topic_scores: vec![],
            tag_scores: vec![SignalScore {
                name: "rust".to_string(),
                weight: 1.0,
            }],
        };
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_cluster_member_ids() {
        let cluster = UserCluster {
            members: vec![
                ClusterMember {
                    user_id: Uuid::nil(),
                    similarity_to_centroid: 0.9,
                },
                ClusterMember {
                    user_id: Uuid::max(),
                    similarity_to_centroid: 0.8,
                },
            ],
        };
        assert_eq!(cluster.member_ids(), vec![Uuid::nil(), Uuid::max()]);
    }

    #[test]
    fn test_invite_status_serde_lowercase() {
        let json = serde_json::to_string(&InviteStatus::Accepted).unwrap();
        assert_eq!(json, "\"accepted\"");
        let back: InviteStatus = serde_json::from_str("\"declined\"").unwrap();
        assert_eq!(back, InviteStatus::Declined);
    }
}
