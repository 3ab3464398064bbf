//! Periodic similarity vector refresh for users and topic groups.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use affinity_core::{
    BehaviorSignalSource, EmbeddingCapability, Error, RefreshReport, Result, SignalScore,
    TopicGroupRepository, UserRepository, Vector, VectorKind, VectorRepository,
};

use crate::scheduler::{PeriodicTask, ShutdownToken};

/// Weight given to a topic group's declared subject when embedding it.
const SUBJECT_WEIGHT: f32 = 1.0;

/// Weight given to each of a topic group's declared tags.
const TAG_WEIGHT: f32 = 0.5;

/// Recomputes profile vectors from behavioral signals on a fixed interval.
pub struct VectorRefresher {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn TopicGroupRepository>,
    vectors: Arc<dyn VectorRepository>,
    behavior: Arc<dyn BehaviorSignalSource>,
    embedding: Arc<dyn EmbeddingCapability>,
    capability_timeout: Duration,
}

impl VectorRefresher {
    pub fn new(
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn TopicGroupRepository>,
        vectors: Arc<dyn VectorRepository>,
        behavior: Arc<dyn BehaviorSignalSource>,
        embedding: Arc<dyn EmbeddingCapability>,
        capability_timeout: Duration,
    ) -> Self {
        Self {
            users,
            groups,
            vectors,
            behavior,
            embedding,
            capability_timeout,
        }
    }

    /// Run one refresh cycle over all users and topic groups.
    ///
    /// Per-entity failures are logged and skipped; one bad profile never
    /// aborts the batch. An embedding capability timeout aborts the cycle
    /// (retried on the next tick).
    pub async fn run_cycle(&self, shutdown: &ShutdownToken) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();

        let user_ids = self.users.active_user_ids().await?;
        for user_id in user_ids {
            if shutdown.is_shutdown() {
                break;
            }

            let snapshot = match self.behavior.signals_for_user(user_id).await {
                Ok(Some(snapshot)) if !snapshot.is_empty() => snapshot,
                Ok(_) => {
                    // No recorded behavior yet: nothing to embed.
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        subsystem = "scheduler",
                        component = "refresher",
                        user_id = %user_id,
                        error = %e,
                        "Failed to load behavior signals, skipping user"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            match self.embed(snapshot.into_signals()).await {
                Ok(vector) => {
                    if let Err(e) = self
                        .vectors
                        .upsert_active(user_id, VectorKind::User, vector)
                        .await
                    {
                        warn!(
                            subsystem = "scheduler",
                            component = "refresher",
                            user_id = %user_id,
                            error = %e,
                            "Failed to store user vector"
                        );
                        report.skipped += 1;
                    } else {
                        report.users_refreshed += 1;
                    }
                }
                Err(e @ Error::CapabilityTimeout(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        subsystem = "scheduler",
                        component = "refresher",
                        user_id = %user_id,
                        error = %e,
                        "Failed to compute user vector, skipping"
                    );
                    report.skipped += 1;
                }
            }
        }

        let groups = self.groups.list_active().await?;
        for group in groups {
            if shutdown.is_shutdown() {
                break;
            }

            let mut signals = vec![SignalScore {
                name: group.subject.clone(),
                weight: SUBJECT_WEIGHT,
            }];
            signals.extend(group.tags.iter().map(|tag| SignalScore {
                name: tag.clone(),
                weight: TAG_WEIGHT,
            }));

            match self.embed(signals).await {
                Ok(vector) => {
                    if let Err(e) = self
                        .vectors
                        .upsert_active(group.id, VectorKind::TopicGroup, vector)
                        .await
                    {
                        warn!(
                            subsystem = "scheduler",
                            component = "refresher",
                            group_id = %group.id,
                            error = %e,
                            "Failed to store topic group vector"
                        );
                        report.skipped += 1;
                    } else {
                        report.groups_refreshed += 1;
                    }
                }
                Err(e @ Error::CapabilityTimeout(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        subsystem = "scheduler",
                        component = "refresher",
                        group_id = %group.id,
                        error = %e,
                        "Failed to compute topic group vector, skipping"
                    );
                    report.skipped += 1;
                }
            }
        }

        info!(
            subsystem = "scheduler",
            component = "refresher",
            op = "run_cycle",
            users_refreshed = report.users_refreshed,
            groups_refreshed = report.groups_refreshed,
            skipped = report.skipped,
            "Vector refresh completed"
        );
        Ok(report)
    }

    /// Call the embedding capability under the bounded timeout.
    async fn embed(&self, signals: Vec<SignalScore>) -> Result<Vector> {
        let vector = tokio::time::timeout(
            self.capability_timeout,
            self.embedding.compute_vector(&signals),
        )
        .await
        .map_err(|_| Error::CapabilityTimeout("compute_vector".into()))??;

        if vector.is_empty() {
            return Err(Error::Embedding("capability returned empty vector".into()));
        }
        Ok(Vector::from(vector))
    }
}

#[async_trait]
impl PeriodicTask for VectorRefresher {
    fn name(&self) -> &'static str {
        "vector_refresher"
    }

    async fn tick(&self, shutdown: &ShutdownToken) -> Result<()> {
        self.run_cycle(shutdown).await.map(|_| ())
    }
}
