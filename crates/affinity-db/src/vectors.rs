//! Profile vector repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use affinity_core::{Error, ProfileVector, Result, VectorKind, VectorRepository};

/// Parse a stored vector kind string.
fn parse_kind(s: &str) -> Result<VectorKind> {
    match s {
        "user" => Ok(VectorKind::User),
        "topic_group" => Ok(VectorKind::TopicGroup),
        other => Err(Error::Internal(format!("unknown vector kind: {}", other))),
    }
}

/// PostgreSQL implementation of VectorRepository.
#[derive(Clone)]
pub struct PgVectorRepository {
    pool: Pool<Postgres>,
}

impl PgVectorRepository {
    /// Create a new PgVectorRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorRepository for PgVectorRepository {
    async fn upsert_active(
        &self,
        owner_id: Uuid,
        kind: VectorKind,
        embedding: Vector,
    ) -> Result<Uuid> {
        // Deactivate-then-insert in one transaction keeps the partial unique
        // index (one active row per owner) satisfied while preserving history.
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "UPDATE profile_vector SET active = FALSE
             WHERE owner_id = $1 AND kind = $2 AND active",
        )
        .bind(owner_id)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO profile_vector (id, owner_id, kind, embedding, computed_at, active)
             VALUES ($1, $2, $3, $4, $5, TRUE)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(kind.as_str())
        .bind(&embedding)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(id)
    }

    async fn get_active(&self, owner_id: Uuid, kind: VectorKind) -> Result<Option<ProfileVector>> {
        let row = sqlx::query(
            "SELECT id, owner_id, kind, embedding, computed_at, active
             FROM profile_vector
             WHERE owner_id = $1 AND kind = $2 AND active",
        )
        .bind(owner_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|row| {
            Ok(ProfileVector {
                id: row.get("id"),
                owner_id: row.get("owner_id"),
                kind: parse_kind(row.get("kind"))?,
                embedding: row.get::<Vector, _>("embedding"),
                computed_at: row.get("computed_at"),
                active: row.get("active"),
            })
        })
        .transpose()
    }
}
