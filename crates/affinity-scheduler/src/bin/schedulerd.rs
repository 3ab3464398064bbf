//! affinity-schedulerd - background scheduler for study group matching

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use affinity_core::{
    BehaviorSignalSource, ClusteringCapability, EmbeddingCapability, MembershipRepository,
    NotificationRepository, ProposalPolicy, ProposalRepository, SchedulerConfig,
    TopicGroupRepository, UserRepository, VectorRepository,
};
use affinity_db::Database;
use affinity_match::MatchServiceClient;
use affinity_scheduler::{
    EligibilityFilter, ExpirationSweeper, ProposalOrchestrator, Scheduler, TaskTiming,
    VectorRefresher,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   RUST_LOG    - standard env filter (default: "affinity_scheduler=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "affinity_scheduler=debug,affinity_db=info,affinity_match=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Configuration is fatal at startup: a daemon running with a half-parsed
    // policy silently mismatches everyone.
    let policy = ProposalPolicy::from_env()?;
    policy.validate()?;
    let config = SchedulerConfig::from_env()?;
    config.validate()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/affinity".to_string());

    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;

    info!("Running database migrations...");
    db.migrate().await?;

    let match_client = Arc::new(MatchServiceClient::from_env(config.capability_timeout)?);

    let users: Arc<dyn UserRepository> = Arc::new(db.users.clone());
    let topic_groups: Arc<dyn TopicGroupRepository> = Arc::new(db.topic_groups.clone());
    let vectors: Arc<dyn VectorRepository> = Arc::new(db.vectors.clone());
    let proposals: Arc<dyn ProposalRepository> = Arc::new(db.proposals.clone());
    let memberships: Arc<dyn MembershipRepository> = Arc::new(db.memberships.clone());
    let notifications: Arc<dyn NotificationRepository> = Arc::new(db.notifications.clone());
    let behavior: Arc<dyn BehaviorSignalSource> = Arc::new(db.behavior.clone());
    let embedding: Arc<dyn EmbeddingCapability> = match_client.clone();
    let clustering: Arc<dyn ClusteringCapability> = match_client;

    let refresher = VectorRefresher::new(
        users.clone(),
        topic_groups,
        vectors,
        behavior,
        embedding,
        config.capability_timeout,
    );

    let orchestrator = ProposalOrchestrator::new(
        EligibilityFilter::new(users.clone(), memberships.clone(), policy.clone()),
        users,
        proposals.clone(),
        notifications.clone(),
        clustering,
        policy,
        config.capability_timeout,
    );

    let sweeper = ExpirationSweeper::new(proposals, memberships, notifications);

    let mut scheduler = Scheduler::new();
    scheduler.register(
        Arc::new(refresher),
        TaskTiming {
            startup_delay: config.refresh_startup_delay,
            interval: config.refresh_interval,
        },
    );
    scheduler.register(
        Arc::new(orchestrator),
        TaskTiming {
            startup_delay: config.orchestrate_startup_delay,
            interval: config.orchestrate_interval,
        },
    );
    scheduler.register(
        Arc::new(sweeper),
        TaskTiming {
            startup_delay: config.sweep_startup_delay,
            interval: config.sweep_interval,
        },
    );

    let handle = scheduler.start();
    info!("affinity-schedulerd started, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping task loops...");
    handle.shutdown().await;
    info!("All task loops stopped");

    Ok(())
}
