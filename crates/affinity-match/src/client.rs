//! HTTP client for the matching service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use affinity_core::{
    defaults, ClusterMember, ClusteringCapability, EmbeddingCapability, Error, PoolEntry, Result,
    SignalScore, UserCluster,
};

/// Default matching service endpoint.
pub const DEFAULT_MATCH_SERVICE_URL: &str = defaults::MATCH_SERVICE_URL;

// Wire DTOs. The service is camelCase JSON; field names mirror its contract.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    signals: &'a [SignalScore],
    dimension: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbedResponse {
    vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserVectorDto {
    id: String,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterRequest {
    user_vectors: Vec<UserVectorDto>,
    min_cluster_size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterMemberDto {
    user_id: String,
    similarity_to_centroid: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterDto {
    #[serde(default)]
    users: Vec<ClusterMemberDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterResponse {
    #[serde(default)]
    clusters: Vec<ClusterDto>,
}

/// Matching service client implementing both external capabilities.
pub struct MatchServiceClient {
    client: Client,
    base_url: String,
    dimension: usize,
}

impl MatchServiceClient {
    /// Create a new client against the given base URL.
    ///
    /// `timeout` bounds every capability call; a timeout surfaces as a
    /// recoverable per-cycle failure, never a hang.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(
            subsystem = "match",
            component = "client",
            %base_url,
            timeout_secs = timeout.as_secs(),
            "Initializing matching service client"
        );

        Ok(Self {
            client,
            base_url,
            dimension: defaults::VECTOR_DIMENSION,
        })
    }

    /// Create from environment variables (`AFFINITY_MATCH_SERVICE_URL`).
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let base_url = std::env::var("AFFINITY_MATCH_SERVICE_URL")
            .unwrap_or_else(|_| DEFAULT_MATCH_SERVICE_URL.to_string());
        Self::new(base_url, timeout)
    }

    /// Override the requested vector dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[async_trait]
impl EmbeddingCapability for MatchServiceClient {
    async fn compute_vector(&self, signals: &[SignalScore]) -> Result<Vec<f32>> {
        let start = Instant::now();
        let url = format!("{}/embed/profile", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                signals,
                dimension: self.dimension,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::CapabilityTimeout("compute_vector".into())
                } else {
                    Error::Embedding(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::Embedding(format!(
                "matching service returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("invalid embed response: {}", e)))?;

        if body.vector.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "expected {}-dim vector, got {}",
                self.dimension,
                body.vector.len()
            )));
        }

        debug!(
            subsystem = "match",
            component = "client",
            op = "compute_vector",
            input_count = signals.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Computed profile vector"
        );
        Ok(body.vector)
    }
}

#[async_trait]
impl ClusteringCapability for MatchServiceClient {
    async fn cluster_users(
        &self,
        pool: &[PoolEntry],
        min_size: usize,
    ) -> Result<Vec<UserCluster>> {
        let start = Instant::now();
        let url = format!("{}/cluster/users", self.base_url);

        let request = ClusterRequest {
            user_vectors: pool
                .iter()
                .map(|entry| UserVectorDto {
                    id: entry.user_id.to_string(),
                    vector: entry.vector.clone(),
                })
                .collect(),
            min_cluster_size: min_size,
        };

        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::CapabilityTimeout("cluster_users".into())
            } else {
                Error::Clustering(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::Clustering(format!(
                "matching service returned {}",
                response.status()
            )));
        }

        let body: ClusterResponse = response
            .json()
            .await
            .map_err(|e| Error::Clustering(format!("invalid cluster response: {}", e)))?;

        let mut clusters = Vec::with_capacity(body.clusters.len());
        for dto in body.clusters {
            let mut members = Vec::with_capacity(dto.users.len());
            for user in dto.users {
                match user.user_id.parse::<Uuid>() {
                    Ok(user_id) => members.push(ClusterMember {
                        user_id,
                        similarity_to_centroid: user.similarity_to_centroid,
                    }),
                    Err(_) => {
                        warn!(
                            subsystem = "match",
                            component = "client",
                            raw_id = %user.user_id,
                            "Skipping cluster member with malformed id"
                        );
                    }
                }
            }
            clusters.push(UserCluster { members });
        }

        debug!(
            subsystem = "match",
            component = "client",
            op = "cluster_users",
            pool_size = pool.len(),
            result_count = clusters.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Clustered candidate pool"
        );
        Ok(clusters)
    }
}
