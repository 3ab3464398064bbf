//! # affinity-scheduler
//!
//! The cooperating periodic jobs that form study group proposals:
//!
//! - [`refresher::VectorRefresher`] keeps per-user and per-topic similarity
//!   vectors fresh from behavioral signals.
//! - [`eligibility::EligibilityFilter`] computes the pool of users eligible
//!   for matching.
//! - [`orchestrator::ProposalOrchestrator`] clusters the pool, persists
//!   qualifying clusters as time-boxed proposals with pending memberships,
//!   and fans out invitations.
//! - [`sweeper::ExpirationSweeper`] terminates proposals that never reached
//!   quorum and notifies members who had accepted.
//!
//! The [`scheduler`] module runs each job on its own interval with a
//! staggered startup delay and per-cycle failure isolation.

pub mod eligibility;
pub mod naming;
pub mod orchestrator;
pub mod refresher;
pub mod scheduler;
pub mod sweeper;

pub use eligibility::EligibilityFilter;
pub use orchestrator::ProposalOrchestrator;
pub use refresher::VectorRefresher;
pub use scheduler::{PeriodicTask, Scheduler, SchedulerHandle, ShutdownToken, TaskTiming};
pub use sweeper::ExpirationSweeper;
