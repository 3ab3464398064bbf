//! In-memory repository fakes for exercising the scheduler jobs without
//! PostgreSQL.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use affinity_core::{
    BehaviorSnapshot, BehaviorSignalSource, CandidateUser, ClusterMember, Error, InviteStatus,
    MajorCount, MemberRole, Membership, MembershipRepository, NewNotification, NewProposal,
    NotificationRepository, ProfileVector, Proposal, ProposalRepository, ProposalStatus, Result,
    TopicGroup, TopicGroupRepository, UserRepository, Vector, VectorKind, VectorRepository,
};

/// One seeded user with everything the scheduler reads about them.
#[derive(Clone)]
pub struct SeededUser {
    pub id: Uuid,
    pub major: Option<String>,
    pub tags: Vec<String>,
    pub embedding: Vec<f32>,
}

impl SeededUser {
    pub fn new(major: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            major: Some(major.to_string()),
            tags: Vec::new(),
            embedding: vec![0.1; 4],
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Fake user view backed by a seeded list.
#[derive(Default)]
pub struct FakeUsers {
    pub seeded: Vec<SeededUser>,
}

impl FakeUsers {
    pub fn new(seeded: Vec<SeededUser>) -> Self {
        Self { seeded }
    }
}

#[async_trait]
impl UserRepository for FakeUsers {
    async fn active_user_ids(&self) -> Result<Vec<Uuid>> {
        Ok(self.seeded.iter().map(|u| u.id).collect())
    }

    async fn candidates(&self) -> Result<Vec<CandidateUser>> {
        Ok(self
            .seeded
            .iter()
            .filter(|u| u.major.is_some())
            .map(|u| CandidateUser {
                user_id: u.id,
                embedding: Vector::from(u.embedding.clone()),
            })
            .collect())
    }

    async fn major_histogram(&self, user_ids: &[Uuid]) -> Result<Vec<MajorCount>> {
        let wanted: HashSet<Uuid> = user_ids.iter().copied().collect();
        let mut counts: HashMap<String, i64> = HashMap::new();
        for user in &self.seeded {
            if wanted.contains(&user.id) {
                if let Some(major) = &user.major {
                    *counts.entry(major.clone()).or_default() += 1;
                }
            }
        }
        let mut histogram: Vec<MajorCount> = counts
            .into_iter()
            .map(|(name, count)| MajorCount { name, count })
            .collect();
        histogram.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));
        Ok(histogram)
    }

    async fn shared_tags(
        &self,
        user_ids: &[Uuid],
        min_holders: i64,
        limit: i64,
    ) -> Result<Vec<String>> {
        let wanted: HashSet<Uuid> = user_ids.iter().copied().collect();
        let mut counts: HashMap<String, i64> = HashMap::new();
        for user in &self.seeded {
            if wanted.contains(&user.id) {
                for tag in &user.tags {
                    *counts.entry(tag.clone()).or_default() += 1;
                }
            }
        }
        let mut ranked: Vec<(String, i64)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_holders)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(ranked
            .into_iter()
            .take(limit as usize)
            .map(|(tag, _)| tag)
            .collect())
    }
}

/// Fake membership state with per-user counters and per-proposal rosters.
#[derive(Default)]
pub struct FakeMemberships {
    pub joined_counts: HashMap<Uuid, i64>,
    pub pending_counts: HashMap<Uuid, i64>,
    pub declines: HashMap<Uuid, DateTime<Utc>>,
    pub rosters: Mutex<HashMap<Uuid, Vec<Membership>>>,
}

impl FakeMemberships {
    pub fn add_member(
        &self,
        proposal_id: Uuid,
        user_id: Uuid,
        invite_status: InviteStatus,
    ) {
        let membership = Membership {
            id: Uuid::new_v4(),
            proposal_id,
            user_id,
            role: MemberRole::Member,
            invite_status,
            similarity_score: 0.9,
            responded_at: None,
            created_at: Utc::now(),
        };
        self.rosters
            .lock()
            .unwrap()
            .entry(proposal_id)
            .or_default()
            .push(membership);
    }
}

#[async_trait]
impl MembershipRepository for FakeMemberships {
    async fn joined_active_count(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.joined_counts.get(&user_id).copied().unwrap_or(0))
    }

    async fn pending_proposed_count(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.pending_counts.get(&user_id).copied().unwrap_or(0))
    }

    async fn latest_decline(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Ok(self.declines.get(&user_id).copied())
    }

    async fn list_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Membership>> {
        Ok(self
            .rosters
            .lock()
            .unwrap()
            .get(&proposal_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn accepted_member_ids(&self, proposal_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .rosters
            .lock()
            .unwrap()
            .get(&proposal_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| m.invite_status == InviteStatus::Accepted)
                    .map(|m| m.user_id)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Fake proposal store recording everything the orchestrator persists.
#[derive(Default)]
pub struct FakeProposals {
    pub stored: Mutex<Vec<(Proposal, Vec<Membership>)>>,
    dedup_keys: Mutex<HashSet<String>>,
}

impl FakeProposals {
    /// Seed a proposal directly, bypassing deduplication.
    pub fn seed(&self, proposal: Proposal) {
        self.stored.lock().unwrap().push((proposal, Vec::new()));
    }

    pub fn created_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl ProposalRepository for FakeProposals {
    async fn create_with_members(
        &self,
        proposal: NewProposal,
        members: &[ClusterMember],
    ) -> Result<Option<Uuid>> {
        if let Some(key) = &proposal.dedup_key {
            if !self.dedup_keys.lock().unwrap().insert(key.clone()) {
                return Ok(None);
            }
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = Proposal {
            id,
            name: proposal.name,
            status: ProposalStatus::Proposed,
            ai_suggested: proposal.ai_suggested,
            expires_at: proposal.expires_at,
            created_by: proposal.created_by,
            created_at: now,
            deleted_at: None,
        };
        let memberships = members
            .iter()
            .map(|m| Membership {
                id: Uuid::new_v4(),
                proposal_id: id,
                user_id: m.user_id,
                role: MemberRole::Member,
                invite_status: InviteStatus::Pending,
                similarity_score: m.similarity_to_centroid,
                responded_at: None,
                created_at: now,
            })
            .collect();
        self.stored.lock().unwrap().push((row, memberships));
        Ok(Some(id))
    }

    async fn fetch(&self, id: Uuid) -> Result<Proposal> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p.id == id)
            .map(|(p, _)| p.clone())
            .ok_or(Error::ProposalNotFound(id))
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Proposal>> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| {
                p.status == ProposalStatus::Proposed
                    && p.deleted_at.is_none()
                    && p.expires_at < now
            })
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn end_expired(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut stored = self.stored.lock().unwrap();
        for (proposal, _) in stored.iter_mut() {
            if proposal.id == id
                && proposal.status == ProposalStatus::Proposed
                && proposal.deleted_at.is_none()
            {
                proposal.status = ProposalStatus::Ended;
                proposal.deleted_at = Some(now);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// One dispatched notification with its recipient batch.
#[derive(Clone)]
pub struct SentNotification {
    pub notification: NewNotification,
    pub recipients: Vec<Uuid>,
}

/// Fake notification sink.
#[derive(Default)]
pub struct FakeNotifications {
    sent: Mutex<Vec<(Uuid, SentNotification)>>,
}

impl FakeNotifications {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationRepository for FakeNotifications {
    async fn create(&self, notification: NewNotification) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.sent.lock().unwrap().push((
            id,
            SentNotification {
                notification,
                recipients: Vec::new(),
            },
        ));
        Ok(id)
    }

    async fn add_recipients(
        &self,
        notification_id: Uuid,
        user_ids: &[Uuid],
        _at: DateTime<Utc>,
    ) -> Result<()> {
        let mut sent = self.sent.lock().unwrap();
        let entry = sent
            .iter_mut()
            .find(|(id, _)| *id == notification_id)
            .ok_or_else(|| Error::NotFound("notification".into()))?;
        entry.1.recipients.extend_from_slice(user_ids);
        Ok(())
    }
}

/// Fake topic group view.
#[derive(Default)]
pub struct FakeTopicGroups {
    pub groups: Vec<TopicGroup>,
}

#[async_trait]
impl TopicGroupRepository for FakeTopicGroups {
    async fn list_active(&self) -> Result<Vec<TopicGroup>> {
        Ok(self.groups.clone())
    }
}

/// Fake vector store keeping one active row per (owner, kind).
#[derive(Default)]
pub struct FakeVectors {
    pub active: Mutex<HashMap<(Uuid, VectorKind), ProfileVector>>,
}

impl FakeVectors {
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn get(&self, owner_id: Uuid, kind: VectorKind) -> Option<ProfileVector> {
        self.active.lock().unwrap().get(&(owner_id, kind)).cloned()
    }
}

#[async_trait]
impl VectorRepository for FakeVectors {
    async fn upsert_active(
        &self,
        owner_id: Uuid,
        kind: VectorKind,
        embedding: Vector,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.active.lock().unwrap().insert(
            (owner_id, kind),
            ProfileVector {
                id,
                owner_id,
                kind,
                embedding,
                computed_at: Utc::now(),
                active: true,
            },
        );
        Ok(id)
    }

    async fn get_active(&self, owner_id: Uuid, kind: VectorKind) -> Result<Option<ProfileVector>> {
        Ok(self.active.lock().unwrap().get(&(owner_id, kind)).cloned())
    }
}

/// Fake behavior source mapping each user to a fixed snapshot.
#[derive(Default)]
pub struct FakeBehavior {
    pub snapshots: HashMap<Uuid, BehaviorSnapshot>,
}

#[async_trait]
impl BehaviorSignalSource for FakeBehavior {
    async fn signals_for_user(&self, user_id: Uuid) -> Result<Option<BehaviorSnapshot>> {
        Ok(self.snapshots.get(&user_id).cloned())
    }
}
