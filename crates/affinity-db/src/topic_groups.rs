//! Topic group repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use affinity_core::{Error, Result, TopicGroup, TopicGroupRepository};

/// PostgreSQL implementation of TopicGroupRepository.
#[derive(Clone)]
pub struct PgTopicGroupRepository {
    pool: Pool<Postgres>,
}

impl PgTopicGroupRepository {
    /// Create a new PgTopicGroupRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TopicGroupRepository for PgTopicGroupRepository {
    async fn list_active(&self) -> Result<Vec<TopicGroup>> {
        let rows = sqlx::query(
            r#"
            SELECT g.id, g.subject, g.deleted_at,
                   COALESCE(
                       array_agg(t.tag_name ORDER BY t.tag_name)
                           FILTER (WHERE t.tag_name IS NOT NULL),
                       '{}'
                   ) AS tags
            FROM topic_group g
            LEFT JOIN topic_group_tag t ON t.group_id = g.id
            WHERE g.deleted_at IS NULL
            GROUP BY g.id, g.subject, g.deleted_at
            ORDER BY g.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| TopicGroup {
                id: row.get("id"),
                subject: row.get("subject"),
                tags: row.get::<Vec<String>, _>("tags"),
                deleted_at: row.get("deleted_at"),
            })
            .collect())
    }
}
