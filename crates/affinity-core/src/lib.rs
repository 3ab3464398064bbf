//! # affinity-core
//!
//! Core types, traits, and abstractions for the affinity group proposal
//! scheduler.
//!
//! This crate provides the foundational data structures, the shared error
//! type, repository and capability trait definitions, and the deployment
//! configuration that the other affinity crates depend on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{ProposalPolicy, SchedulerConfig};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
