//! Parallel extraction pipeline
//!
//! A fan-out of parser workers consumes a bounded file queue; a fan-in
//! collector on the coordinator thread merges per-file statistics and,
//! when replay is enabled, forwards extracted messages to the publisher
//! pool. All aggregation happens on the coordinator so workers never
//! share mutable state.

pub mod coordinator;
pub mod worker;

pub use coordinator::{run_pool, RunReport};
