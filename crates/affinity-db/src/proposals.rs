//! Proposal repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use affinity_core::{
    ClusterMember, Error, NewProposal, Proposal, ProposalRepository, ProposalStatus, Result,
};

fn parse_status(s: &str) -> Result<ProposalStatus> {
    match s {
        "proposed" => Ok(ProposalStatus::Proposed),
        "active" => Ok(ProposalStatus::Active),
        "ended" => Ok(ProposalStatus::Ended),
        other => Err(Error::Internal(format!("unknown proposal status: {}", other))),
    }
}

fn map_proposal(row: PgRow) -> Result<Proposal> {
    Ok(Proposal {
        id: row.get("id"),
        name: row.get("name"),
        status: parse_status(row.get("status"))?,
        ai_suggested: row.get("ai_suggested"),
        expires_at: row.get("expires_at"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    })
}

/// PostgreSQL implementation of ProposalRepository.
#[derive(Clone)]
pub struct PgProposalRepository {
    pool: Pool<Postgres>,
}

impl PgProposalRepository {
    /// Create a new PgProposalRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProposalRepository for PgProposalRepository {
    async fn create_with_members(
        &self,
        proposal: NewProposal,
        members: &[ClusterMember],
    ) -> Result<Option<Uuid>> {
        if members.is_empty() {
            return Err(Error::InvalidInput(
                "proposal must have at least one member".into(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let proposal_id = Uuid::new_v4();
        let now = Utc::now();

        // ON CONFLICT DO NOTHING on the dedup key makes creation insert-once
        // across replicas: the loser sees no returned row and writes nothing.
        let inserted = sqlx::query(
            r#"
            INSERT INTO proposal
                (id, name, status, ai_suggested, expires_at, created_by, created_at, dedup_key)
            VALUES ($1, $2, 'proposed', $3, $4, $5, $6, $7)
            ON CONFLICT (dedup_key) WHERE dedup_key IS NOT NULL DO NOTHING
            RETURNING id
            "#,
        )
        .bind(proposal_id)
        .bind(&proposal.name)
        .bind(proposal.ai_suggested)
        .bind(proposal.expires_at)
        .bind(proposal.created_by)
        .bind(now)
        .bind(&proposal.dedup_key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if inserted.is_none() {
            tx.rollback().await.map_err(Error::Database)?;
            debug!(
                subsystem = "database",
                component = "proposals",
                op = "create",
                name = %proposal.name,
                "Duplicate dedup key, proposal skipped"
            );
            return Ok(None);
        }

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO membership
                    (id, proposal_id, user_id, role, invite_status,
                     similarity_score, created_at)
                VALUES ($1, $2, $3, 'member', 'pending', $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(proposal_id)
            .bind(member.user_id)
            .bind(member.similarity_to_centroid)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(Some(proposal_id))
    }

    async fn fetch(&self, id: Uuid) -> Result<Proposal> {
        let row = sqlx::query(
            "SELECT id, name, status, ai_suggested, expires_at,
                    created_by, created_at, deleted_at
             FROM proposal WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::ProposalNotFound(id))?;

        map_proposal(row)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Proposal>> {
        let rows = sqlx::query(
            "SELECT id, name, status, ai_suggested, expires_at,
                    created_by, created_at, deleted_at
             FROM proposal
             WHERE status = 'proposed'
               AND deleted_at IS NULL
               AND expires_at < $1
             ORDER BY expires_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(map_proposal).collect()
    }

    async fn end_expired(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        // The predicate repeats the sweep query so a row that was already
        // ended (or activated by quorum in the meantime) is left untouched.
        let result = sqlx::query(
            "UPDATE proposal
             SET status = 'ended', deleted_at = $2
             WHERE id = $1 AND status = 'proposed' AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }
}
