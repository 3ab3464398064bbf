//! Centralized default constants for the affinity scheduler.
//!
//! **This module is the single source of truth** for all shared default
//! values. The crates reference these constants instead of defining their own
//! magic numbers. Deployments override them through the environment (see
//! [`crate::config`]).

// =============================================================================
// PROPOSAL POLICY
// =============================================================================

/// Minimum cluster size for a proposal to be created, and the quorum the
/// external accept flow needs to activate one.
pub const MIN_MEMBERS_TO_ACTIVATE: usize = 5;

/// Maximum simultaneous Joined memberships in Active groups per user.
pub const MAX_ACTIVE_CONVERSATIONS: i64 = 5;

/// Maximum simultaneous Pending memberships in Proposed proposals per user.
pub const MAX_PENDING_PROPOSALS: i64 = 3;

/// Days a user stays out of new proposals after their most recent decline.
pub const COOLDOWN_DAYS: i64 = 7;

/// Days until a Proposed proposal expires.
pub const PROPOSAL_EXPIRATION_DAYS: i64 = 3;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Profile vector dimension produced by the matching service.
pub const VECTOR_DIMENSION: usize = 100;

// =============================================================================
// SCHEDULING
// =============================================================================

/// Vector refresh interval in seconds (hourly).
pub const REFRESH_INTERVAL_SECS: u64 = 3600;

/// Startup delay before the first vector refresh (lets the system stabilize).
pub const REFRESH_STARTUP_DELAY_SECS: u64 = 300;

/// Orchestration interval in seconds.
pub const ORCHESTRATE_INTERVAL_SECS: u64 = 300;

/// Startup delay before the first orchestration cycle.
pub const ORCHESTRATE_STARTUP_DELAY_SECS: u64 = 30;

/// Expiration sweep interval in seconds (hourly).
pub const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Startup delay before the first sweep.
pub const SWEEP_STARTUP_DELAY_SECS: u64 = 900;

// =============================================================================
// MATCHING SERVICE
// =============================================================================

/// Default base URL of the external matching service.
pub const MATCH_SERVICE_URL: &str = "http://localhost:8000";

/// Bounded timeout for embedding/clustering capability calls, in seconds.
/// A timeout aborts only the current cycle; the next tick retries.
pub const CAPABILITY_TIMEOUT_SECS: u64 = 30;
