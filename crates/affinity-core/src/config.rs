//! Deployment configuration for the affinity scheduler.
//!
//! Configuration is static per deployment and read from the environment at
//! process startup. Malformed values are [`Error::Config`] and fatal; a
//! misconfigured scheduler never limps along on per-cycle defaults.

use std::str::FromStr;
use std::time::Duration;

use crate::defaults;
use crate::error::{Error, Result};

/// Parse an environment variable, falling back to `default` when unset.
///
/// Unlike a silent `unwrap_or`, a present-but-malformed value is a hard
/// configuration error.
fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{} has invalid value {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}

/// Build a `Duration` from an env var holding whole seconds.
fn env_secs(key: &str, default_secs: u64) -> Result<Duration> {
    Ok(Duration::from_secs(env_parse(key, default_secs)?))
}

/// Policy limits governing pool eligibility and proposal creation.
#[derive(Debug, Clone, Copy)]
pub struct ProposalPolicy {
    /// Minimum cluster size to create a proposal.
    pub min_members_to_activate: usize,
    /// Max Joined memberships in Active groups per user.
    pub max_active_conversations: i64,
    /// Max Pending memberships in Proposed proposals per user.
    pub max_pending_proposals: i64,
    /// Days a user is excluded after their most recent decline.
    pub cooldown_days: i64,
    /// Days until a Proposed proposal expires.
    pub proposal_expiration_days: i64,
}

impl Default for ProposalPolicy {
    fn default() -> Self {
        Self {
            min_members_to_activate: defaults::MIN_MEMBERS_TO_ACTIVATE,
            max_active_conversations: defaults::MAX_ACTIVE_CONVERSATIONS,
            max_pending_proposals: defaults::MAX_PENDING_PROPOSALS,
            cooldown_days: defaults::COOLDOWN_DAYS,
            proposal_expiration_days: defaults::PROPOSAL_EXPIRATION_DAYS,
        }
    }
}

impl ProposalPolicy {
    /// Create policy from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `AFFINITY_MIN_MEMBERS` | `5` | Minimum cluster size for a proposal |
    /// | `AFFINITY_MAX_ACTIVE_CONVERSATIONS` | `5` | Joined-membership quota |
    /// | `AFFINITY_MAX_PENDING_PROPOSALS` | `3` | Pending-membership quota |
    /// | `AFFINITY_COOLDOWN_DAYS` | `7` | Post-decline cooldown |
    /// | `AFFINITY_PROPOSAL_EXPIRATION_DAYS` | `3` | Proposal lifetime |
    pub fn from_env() -> Result<Self> {
        let policy = Self {
            min_members_to_activate: env_parse(
                "AFFINITY_MIN_MEMBERS",
                defaults::MIN_MEMBERS_TO_ACTIVATE,
            )?,
            max_active_conversations: env_parse(
                "AFFINITY_MAX_ACTIVE_CONVERSATIONS",
                defaults::MAX_ACTIVE_CONVERSATIONS,
            )?,
            max_pending_proposals: env_parse(
                "AFFINITY_MAX_PENDING_PROPOSALS",
                defaults::MAX_PENDING_PROPOSALS,
            )?,
            cooldown_days: env_parse("AFFINITY_COOLDOWN_DAYS", defaults::COOLDOWN_DAYS)?,
            proposal_expiration_days: env_parse(
                "AFFINITY_PROPOSAL_EXPIRATION_DAYS",
                defaults::PROPOSAL_EXPIRATION_DAYS,
            )?,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Reject values that would make the state machine meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.min_members_to_activate < 2 {
            return Err(Error::Config(
                "AFFINITY_MIN_MEMBERS must be at least 2".into(),
            ));
        }
        if self.max_active_conversations < 1 || self.max_pending_proposals < 1 {
            return Err(Error::Config(
                "membership quotas must be at least 1".into(),
            ));
        }
        if self.cooldown_days < 0 {
            return Err(Error::Config("AFFINITY_COOLDOWN_DAYS must be >= 0".into()));
        }
        if self.proposal_expiration_days < 1 {
            return Err(Error::Config(
                "AFFINITY_PROPOSAL_EXPIRATION_DAYS must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Intervals and startup delays for the three periodic loops.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub refresh_interval: Duration,
    pub refresh_startup_delay: Duration,
    pub orchestrate_interval: Duration,
    pub orchestrate_startup_delay: Duration,
    pub sweep_interval: Duration,
    pub sweep_startup_delay: Duration,
    /// Bounded timeout applied to embedding/clustering calls.
    pub capability_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(defaults::REFRESH_INTERVAL_SECS),
            refresh_startup_delay: Duration::from_secs(defaults::REFRESH_STARTUP_DELAY_SECS),
            orchestrate_interval: Duration::from_secs(defaults::ORCHESTRATE_INTERVAL_SECS),
            orchestrate_startup_delay: Duration::from_secs(
                defaults::ORCHESTRATE_STARTUP_DELAY_SECS,
            ),
            sweep_interval: Duration::from_secs(defaults::SWEEP_INTERVAL_SECS),
            sweep_startup_delay: Duration::from_secs(defaults::SWEEP_STARTUP_DELAY_SECS),
            capability_timeout: Duration::from_secs(defaults::CAPABILITY_TIMEOUT_SECS),
        }
    }
}

impl SchedulerConfig {
    /// Create scheduler timings from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `AFFINITY_REFRESH_INTERVAL_SECS` | `3600` | Vector refresh cadence |
    /// | `AFFINITY_REFRESH_STARTUP_DELAY_SECS` | `300` | Refresh startup delay |
    /// | `AFFINITY_ORCHESTRATE_INTERVAL_SECS` | `300` | Orchestration cadence |
    /// | `AFFINITY_ORCHESTRATE_STARTUP_DELAY_SECS` | `30` | Orchestration startup delay |
    /// | `AFFINITY_SWEEP_INTERVAL_SECS` | `3600` | Expiration sweep cadence |
    /// | `AFFINITY_SWEEP_STARTUP_DELAY_SECS` | `900` | Sweep startup delay |
    /// | `AFFINITY_CAPABILITY_TIMEOUT_SECS` | `30` | Capability call timeout |
    pub fn from_env() -> Result<Self> {
        let config = Self {
            refresh_interval: env_secs(
                "AFFINITY_REFRESH_INTERVAL_SECS",
                defaults::REFRESH_INTERVAL_SECS,
            )?,
            refresh_startup_delay: env_secs(
                "AFFINITY_REFRESH_STARTUP_DELAY_SECS",
                defaults::REFRESH_STARTUP_DELAY_SECS,
            )?,
            orchestrate_interval: env_secs(
                "AFFINITY_ORCHESTRATE_INTERVAL_SECS",
                defaults::ORCHESTRATE_INTERVAL_SECS,
            )?,
            orchestrate_startup_delay: env_secs(
                "AFFINITY_ORCHESTRATE_STARTUP_DELAY_SECS",
                defaults::ORCHESTRATE_STARTUP_DELAY_SECS,
            )?,
            sweep_interval: env_secs("AFFINITY_SWEEP_INTERVAL_SECS", defaults::SWEEP_INTERVAL_SECS)?,
            sweep_startup_delay: env_secs(
                "AFFINITY_SWEEP_STARTUP_DELAY_SECS",
                defaults::SWEEP_STARTUP_DELAY_SECS,
            )?,
            capability_timeout: env_secs(
                "AFFINITY_CAPABILITY_TIMEOUT_SECS",
                defaults::CAPABILITY_TIMEOUT_SECS,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval.is_zero()
            || self.orchestrate_interval.is_zero()
            || self.sweep_interval.is_zero()
        {
            return Err(Error::Config("cycle intervals must be non-zero".into()));
        }
        if self.capability_timeout.is_zero() {
            return Err(Error::Config(
                "AFFINITY_CAPABILITY_TIMEOUT_SECS must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
