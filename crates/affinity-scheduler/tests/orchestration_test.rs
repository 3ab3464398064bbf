//! End-to-end orchestration cycle over in-memory repositories and a mock
//! clustering capability.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use affinity_core::{Error, InviteStatus, NotificationPriority, ProposalPolicy, ProposalStatus};
use affinity_match::mock::MockClustering;
use affinity_scheduler::{EligibilityFilter, ProposalOrchestrator, ShutdownToken};

use common::{FakeMemberships, FakeNotifications, FakeProposals, FakeUsers, SeededUser};

const TIMEOUT: Duration = Duration::from_secs(5);

fn policy() -> ProposalPolicy {
    ProposalPolicy {
        min_members_to_activate: 5,
        max_active_conversations: 5,
        max_pending_proposals: 3,
        cooldown_days: 7,
        proposal_expiration_days: 3,
    }
}

struct Fixture {
    users: Arc<FakeUsers>,
    memberships: Arc<FakeMemberships>,
    proposals: Arc<FakeProposals>,
    notifications: Arc<FakeNotifications>,
}

impl Fixture {
    fn new(seeded: Vec<SeededUser>) -> Self {
        Self {
            users: Arc::new(FakeUsers::new(seeded)),
            memberships: Arc::new(FakeMemberships::default()),
            proposals: Arc::new(FakeProposals::default()),
            notifications: Arc::new(FakeNotifications::default()),
        }
    }

    fn orchestrator(&self, clustering: Arc<MockClustering>) -> ProposalOrchestrator {
        ProposalOrchestrator::new(
            EligibilityFilter::new(self.users.clone(), self.memberships.clone(), policy()),
            self.users.clone(),
            self.proposals.clone(),
            self.notifications.clone(),
            clustering,
            policy(),
            TIMEOUT,
        )
    }
}

/// Five users sharing a major come back as one cluster: one proposal named
/// after the major, five pending memberships with scores, five invitations.
#[tokio::test]
async fn test_cluster_becomes_proposal_with_invitations() {
    let seeded: Vec<SeededUser> = (0..5)
        .map(|_| SeededUser::new("Computer Science"))
        .collect();
    let cluster: Vec<(uuid::Uuid, f32)> = seeded
        .iter()
        .enumerate()
        .map(|(i, u)| (u.id, 0.95 - i as f32 * 0.01))
        .collect();

    let fx = Fixture::new(seeded);
    let orchestrator = fx.orchestrator(Arc::new(MockClustering::returning(vec![cluster])));

    let report = orchestrator
        .run_cycle(&ShutdownToken::never())
        .await
        .unwrap();

    assert_eq!(report.pool_size, 5);
    assert_eq!(report.proposals_created, 1);
    assert_eq!(report.users_invited, 5);

    let stored = fx.proposals.stored.lock().unwrap();
    let (proposal, memberships) = &stored[0];
    assert_eq!(proposal.name, "Study Group – Computer Science");
    assert_eq!(proposal.status, ProposalStatus::Proposed);
    assert!(proposal.ai_suggested);
    assert_eq!(memberships.len(), 5);
    for m in memberships {
        assert_eq!(m.invite_status, InviteStatus::Pending);
        assert!(m.similarity_score > 0.9);
    }
    // Creator is the lowest member id, not whatever order the capability used.
    let min_id = memberships.iter().map(|m| m.user_id).min().unwrap();
    assert_eq!(proposal.created_by, min_id);
    drop(stored);

    let sent = fx.notifications.sent();
    assert_eq!(sent.len(), 5);
    for s in &sent {
        assert_eq!(s.recipients.len(), 1);
        assert_eq!(s.notification.priority, NotificationPriority::High);
        assert!(s.notification.content.contains("4 peers"));
        assert!(s.notification.link.starts_with("/proposals/"));
    }
}

/// A cluster smaller than the activation minimum is dropped even if the
/// capability returned it.
#[tokio::test]
async fn test_undersized_cluster_is_never_persisted() {
    let seeded: Vec<SeededUser> = (0..6).map(|_| SeededUser::new("Mathematics")).collect();
    let small: Vec<(uuid::Uuid, f32)> =
        seeded.iter().take(3).map(|u| (u.id, 0.9)).collect();

    let fx = Fixture::new(seeded);
    let orchestrator = fx.orchestrator(Arc::new(MockClustering::returning(vec![small])));

    let report = orchestrator
        .run_cycle(&ShutdownToken::never())
        .await
        .unwrap();

    assert_eq!(report.proposals_created, 0);
    assert_eq!(fx.proposals.created_count(), 0);
    assert_eq!(fx.notifications.sent_count(), 0);
}

/// A pool below the activation minimum never calls the capability.
#[tokio::test]
async fn test_small_pool_skips_clustering() {
    let seeded: Vec<SeededUser> = (0..3).map(|_| SeededUser::new("Physics")).collect();
    let clustering = Arc::new(MockClustering::empty());

    let fx = Fixture::new(seeded);
    let orchestrator = fx.orchestrator(clustering.clone());

    let report = orchestrator
        .run_cycle(&ShutdownToken::never())
        .await
        .unwrap();

    assert_eq!(report.pool_size, 3);
    assert_eq!(report.proposals_created, 0);
    assert_eq!(clustering.call_count(), 0);
}

/// Two cycles over the same membership on the same day create one proposal.
#[tokio::test]
async fn test_duplicate_cluster_is_created_once() {
    let seeded: Vec<SeededUser> = (0..5).map(|_| SeededUser::new("Biology")).collect();
    let cluster: Vec<(uuid::Uuid, f32)> = seeded.iter().map(|u| (u.id, 0.9)).collect();

    let fx = Fixture::new(seeded);
    let orchestrator =
        fx.orchestrator(Arc::new(MockClustering::returning(vec![cluster.clone()])));

    orchestrator
        .run_cycle(&ShutdownToken::never())
        .await
        .unwrap();
    let second = orchestrator
        .run_cycle(&ShutdownToken::never())
        .await
        .unwrap();

    assert_eq!(second.proposals_created, 0);
    assert_eq!(fx.proposals.created_count(), 1);
    // No invitations for the skipped duplicate either.
    assert_eq!(fx.notifications.sent_count(), 5);
}

/// A clustering failure aborts the cycle; the next tick retries from scratch.
#[tokio::test]
async fn test_clustering_failure_aborts_cycle() {
    let seeded: Vec<SeededUser> = (0..5).map(|_| SeededUser::new("Chemistry")).collect();

    let fx = Fixture::new(seeded);
    let orchestrator = fx.orchestrator(Arc::new(MockClustering::failing()));

    let err = orchestrator
        .run_cycle(&ShutdownToken::never())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Clustering(_)));
    assert_eq!(fx.proposals.created_count(), 0);
}

/// Users without a shared-major majority get a tag-based name; with neither,
/// the timestamped fallback.
#[tokio::test]
async fn test_mixed_majors_name_from_shared_tags() {
    let seeded = vec![
        SeededUser::new("Physics").with_tags(&["algorithms", "rust"]),
        SeededUser::new("Mathematics").with_tags(&["algorithms", "rust"]),
        SeededUser::new("Biology").with_tags(&["algorithms"]),
        SeededUser::new("Chemistry").with_tags(&["rust"]),
        SeededUser::new("History"),
    ];
    let cluster: Vec<(uuid::Uuid, f32)> = seeded.iter().map(|u| (u.id, 0.8)).collect();

    let fx = Fixture::new(seeded);
    let orchestrator = fx.orchestrator(Arc::new(MockClustering::returning(vec![cluster])));

    orchestrator
        .run_cycle(&ShutdownToken::never())
        .await
        .unwrap();

    let stored = fx.proposals.stored.lock().unwrap();
    assert_eq!(stored[0].0.name, "Group algorithms, rust");
}
