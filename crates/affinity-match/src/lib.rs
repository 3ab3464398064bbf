//! # affinity-match
//!
//! Client for the external matching service consumed by the scheduler.
//!
//! The matching service owns the similarity algorithm: it turns behavioral
//! signal weights into fixed-length profile vectors (`/embed/profile`) and
//! partitions a candidate pool into disjoint clusters (`/cluster/users`).
//! This crate only speaks its wire protocol; the algorithm itself is opaque.
//!
//! A deterministic [`mock`] module is always compiled so downstream crates
//! can exercise orchestration logic without the real service.

pub mod client;
pub mod mock;

pub use client::{MatchServiceClient, DEFAULT_MATCH_SERVICE_URL};
