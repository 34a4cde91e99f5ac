//! Orchestrator module for the dashboard update sequence
//! Routes each asset to its upstream sources and collects one snapshot per update

pub mod snapshot;

// Re-export main orchestrator
pub use snapshot::{Dashboard, DataSources, FetchFailure, FetchStage, Snapshot, SnapshotOptions};
