#![forbid(unsafe_code)]

//! Core domain model and derived-state engine for MedTrack.
//!
//! This crate provides:
//! - Domain types (medication definitions, user medications, schedule)
//! - Static reference data (catalog and interaction rules)
//! - Interaction and schedule derivation
//! - The application state store and its persistence
//! - Dashboard summaries

pub mod types;
pub mod error;
pub mod catalog;
pub mod rules;
pub mod config;
pub mod logging;
pub mod interactions;
pub mod schedule;
pub mod persistence;
pub mod store;
pub mod summary;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, default_catalog};
pub use rules::{build_default_rules, default_rules};
pub use config::Config;
pub use interactions::check_interactions;
pub use schedule::generate_schedule;
pub use persistence::{JsonFileStore, MemoryStore, SnapshotStore};
pub use store::{AppStateStore, StoreSnapshot};
pub use summary::{daily_progress, upcoming_doses, DashboardSummary};
