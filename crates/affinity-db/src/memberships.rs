//! Membership repository implementation.
//!
//! The eligibility filter reads quota counts and decline timestamps from
//! here; the sweeper reads Accepted members. Membership writes happen only
//! through [`crate::proposals::PgProposalRepository`] (at proposal creation)
//! and the external accept/decline flow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use affinity_core::{
    Error, InviteStatus, MemberRole, Membership, MembershipRepository, Result,
};

pub(crate) fn parse_role(s: &str) -> Result<MemberRole> {
    match s {
        "member" => Ok(MemberRole::Member),
        "owner" => Ok(MemberRole::Owner),
        other => Err(Error::Internal(format!("unknown member role: {}", other))),
    }
}

pub(crate) fn parse_invite_status(s: &str) -> Result<InviteStatus> {
    match s {
        "pending" => Ok(InviteStatus::Pending),
        "accepted" => Ok(InviteStatus::Accepted),
        "declined" => Ok(InviteStatus::Declined),
        "joined" => Ok(InviteStatus::Joined),
        other => Err(Error::Internal(format!("unknown invite status: {}", other))),
    }
}

/// PostgreSQL implementation of MembershipRepository.
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: Pool<Postgres>,
}

impl PgMembershipRepository {
    /// Create a new PgMembershipRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn joined_active_count(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM membership m
            JOIN proposal p ON p.id = m.proposal_id
            WHERE m.user_id = $1
              AND m.deleted_at IS NULL
              AND m.invite_status = 'joined'
              AND p.deleted_at IS NULL
              AND p.status = 'active'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("n"))
    }

    async fn pending_proposed_count(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM membership m
            JOIN proposal p ON p.id = m.proposal_id
            WHERE m.user_id = $1
              AND m.deleted_at IS NULL
              AND m.invite_status = 'pending'
              AND p.deleted_at IS NULL
              AND p.status = 'proposed'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("n"))
    }

    async fn latest_decline(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT MAX(responded_at) AS last_decline
             FROM membership
             WHERE user_id = $1 AND invite_status = 'declined'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("last_decline"))
    }

    async fn list_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Membership>> {
        let rows = sqlx::query(
            "SELECT id, proposal_id, user_id, role, invite_status,
                    similarity_score, responded_at, created_at
             FROM membership
             WHERE proposal_id = $1 AND deleted_at IS NULL
             ORDER BY user_id",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                Ok(Membership {
                    id: row.get("id"),
                    proposal_id: row.get("proposal_id"),
                    user_id: row.get("user_id"),
                    role: parse_role(row.get("role"))?,
                    invite_status: parse_invite_status(row.get("invite_status"))?,
                    similarity_score: row.get("similarity_score"),
                    responded_at: row.get("responded_at"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn accepted_member_ids(&self, proposal_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT user_id FROM membership
             WHERE proposal_id = $1
               AND deleted_at IS NULL
               AND invite_status = 'accepted'
             ORDER BY user_id",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("user_id")).collect())
    }
}
