//! # affinity-db
//!
//! PostgreSQL storage layer for the affinity group proposal scheduler.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, topic groups, profile vectors,
//!   proposals, memberships, notifications, and behavior signals
//! - Vector storage with pgvector
//! - SQL migrations (`sqlx::migrate!`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use affinity_db::Database;
//! use affinity_core::UserRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/affinity").await?;
//!     db.migrate().await?;
//!
//!     let pool = db.users.candidates().await?;
//!     println!("{} raw candidates", pool.len());
//!     Ok(())
//! }
//! ```

pub mod behavior;
pub mod memberships;
pub mod notifications;
pub mod pool;
pub mod proposals;
pub mod topic_groups;
pub mod users;
pub mod vectors;

pub use behavior::PgBehaviorSignalRepository;
pub use memberships::PgMembershipRepository;
pub use notifications::PgNotificationRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use proposals::PgProposalRepository;
pub use topic_groups::PgTopicGroupRepository;
pub use users::PgUserRepository;
pub use vectors::PgVectorRepository;

// Re-export core types
pub use affinity_core::*;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Read-only user view.
    pub users: PgUserRepository,
    /// Read-only topic group view.
    pub topic_groups: PgTopicGroupRepository,
    /// Profile vector storage.
    pub vectors: PgVectorRepository,
    /// Proposal lifecycle storage.
    pub proposals: PgProposalRepository,
    /// Membership state (quotas, declines, accepted members).
    pub memberships: PgMembershipRepository,
    /// Notification dispatch rows.
    pub notifications: PgNotificationRepository,
    /// Behavioral signal rollups.
    pub behavior: PgBehaviorSignalRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            topic_groups: PgTopicGroupRepository::new(pool.clone()),
            vectors: PgVectorRepository::new(pool.clone()),
            proposals: PgProposalRepository::new(pool.clone()),
            memberships: PgMembershipRepository::new(pool.clone()),
            notifications: PgNotificationRepository::new(pool.clone()),
            behavior: PgBehaviorSignalRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Run pending SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Ok(())
    }
}
