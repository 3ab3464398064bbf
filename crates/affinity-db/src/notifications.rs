//! Notification repository implementation.
//!
//! Notifications are fire-and-forget rows here; the real-time delivery
//! transport lives elsewhere in the platform.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use affinity_core::{Error, NewNotification, NotificationRepository, Result};

/// PostgreSQL implementation of NotificationRepository.
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

impl PgNotificationRepository {
    /// Create a new PgNotificationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO notification (id, title, content, link, priority, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(&notification.link)
        .bind(notification.priority.as_str())
        .bind(notification.expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn add_recipients(
        &self,
        notification_id: Uuid,
        user_ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }

        // One statement for the whole batch: the recipient list is atomic.
        sqlx::query(
            "INSERT INTO notification_recipient (notification_id, user_id, created_at)
             SELECT $1, unnest($2::uuid[]), $3",
        )
        .bind(notification_id)
        .bind(user_ids)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}
