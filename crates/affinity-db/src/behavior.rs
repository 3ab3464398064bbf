//! Behavioral signal source backed by the platform's activity rollups.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use affinity_core::{BehaviorSignalSource, BehaviorSnapshot, Error, Result, SignalScore};

/// PostgreSQL implementation of BehaviorSignalSource.
///
/// Reads the `user_behavior` rollup the platform's activity tracking writes;
/// a user with no rows has no recorded behavior and yields `None`.
#[derive(Clone)]
pub struct PgBehaviorSignalRepository {
    pool: Pool<Postgres>,
}

impl PgBehaviorSignalRepository {
    /// Create a new PgBehaviorSignalRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BehaviorSignalSource for PgBehaviorSignalRepository {
    async fn signals_for_user(&self, user_id: Uuid) -> Result<Option<BehaviorSnapshot>> {
        let rows = sqlx::query(
            "SELECT signal_kind, signal_name, score
             FROM user_behavior
             WHERE user_id = $1
             ORDER BY signal_kind, signal_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut snapshot = BehaviorSnapshot::default();
        for row in rows {
            let score = SignalScore {
                name: row.get("signal_name"),
                weight: row.get("score"),
            };
            match row.get::<&str, _>("signal_kind") {
                "topic" => snapshot.topic_scores.push(score),
                "tag" => snapshot.tag_scores.push(score),
                other => {
                    return Err(Error::Internal(format!("unknown signal kind: {}", other)))
                }
            }
        }

        Ok(Some(snapshot))
    }
}
