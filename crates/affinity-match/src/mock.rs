//! Deterministic mock capabilities for testing.
//!
//! Always compiled (not `#[cfg(test)]`) so downstream crates can drive the
//! orchestrator and refresher without a live matching service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use affinity_core::{
    defaults, ClusteringCapability, EmbeddingCapability, Error, PoolEntry, Result, SignalScore,
    UserCluster,
};

/// Mock embedding capability producing deterministic vectors.
///
/// The vector is a function of the signal names and weights alone, so two
/// identical snapshots always embed identically.
#[derive(Clone)]
pub struct MockEmbedding {
    dimension: usize,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self {
            dimension: defaults::VECTOR_DIMENSION,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Make every call fail, simulating an unreachable capability.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of compute_vector calls observed.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingCapability for MockEmbedding {
    async fn compute_vector(&self, signals: &[SignalScore]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("mock embedding unavailable".into()));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for signal in signals {
            let idx = signal
                .name
                .bytes()
                .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
                % self.dimension;
            vector[idx] += signal.weight;
        }
        Ok(vector)
    }
}

/// Mock clustering capability returning pre-programmed clusters.
#[derive(Clone)]
pub struct MockClustering {
    clusters: Arc<Mutex<Vec<Vec<(uuid::Uuid, f32)>>>>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockClustering {
    /// A mock that returns no clusters.
    pub fn empty() -> Self {
        Self {
            clusters: Arc::new(Mutex::new(Vec::new())),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A mock that returns the given clusters, regardless of the pool.
    pub fn returning(clusters: Vec<Vec<(uuid::Uuid, f32)>>) -> Self {
        Self {
            clusters: Arc::new(Mutex::new(clusters)),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every call fail, simulating an unreachable capability.
    pub fn failing() -> Self {
        Self {
            clusters: Arc::new(Mutex::new(Vec::new())),
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of cluster_users calls observed.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusteringCapability for MockClustering {
    async fn cluster_users(
        &self,
        _pool: &[PoolEntry],
        _min_size: usize,
    ) -> Result<Vec<UserCluster>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Clustering("mock clustering unavailable".into()));
        }

        let clusters = self.clusters.lock().expect("mock cluster lock poisoned");
        Ok(clusters
            .iter()
            .map(|members| UserCluster {
                members: members
                    .iter()
                    .map(|(user_id, score)| affinity_core::ClusterMember {
                        user_id: *user_id,
                        similarity_to_centroid: *score,
                    })
                    .collect(),
            })
            .collect())
    }
}
