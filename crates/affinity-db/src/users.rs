//! User repository implementation (read-only from the scheduler's side).

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use affinity_core::{CandidateUser, Error, MajorCount, Result, UserRepository};

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn active_user_ids(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM app_user WHERE deleted_at IS NULL ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("id")).collect())
    }

    async fn candidates(&self) -> Result<Vec<CandidateUser>> {
        // Inner join: users without an active vector are silently excluded.
        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, v.embedding
            FROM app_user u
            JOIN profile_vector v
              ON v.owner_id = u.id AND v.kind = 'user' AND v.active
            WHERE u.deleted_at IS NULL
              AND u.suggestible
              AND u.major_id IS NOT NULL
            ORDER BY u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| CandidateUser {
                user_id: row.get("user_id"),
                embedding: row.get::<Vector, _>("embedding"),
            })
            .collect())
    }

    async fn major_histogram(&self, user_ids: &[Uuid]) -> Result<Vec<MajorCount>> {
        let rows = sqlx::query(
            r#"
            SELECT m.name, COUNT(*) AS member_count
            FROM app_user u
            JOIN major m ON m.id = u.major_id
            WHERE u.id = ANY($1)
            GROUP BY m.id, m.name
            ORDER BY member_count DESC, m.name
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| MajorCount {
                name: row.get("name"),
                count: row.get("member_count"),
            })
            .collect())
    }

    async fn shared_tags(
        &self,
        user_ids: &[Uuid],
        min_holders: i64,
        limit: i64,
    ) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT tag_name
            FROM user_tag
            WHERE user_id = ANY($1)
            GROUP BY tag_name
            HAVING COUNT(DISTINCT user_id) >= $2
            ORDER BY COUNT(DISTINCT user_id) DESC, tag_name
            LIMIT $3
            "#,
        )
        .bind(user_ids)
        .bind(min_holders)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("tag_name")).collect())
    }
}
