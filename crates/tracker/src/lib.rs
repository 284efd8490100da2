//! Watchlist tracking core: classification, transitions and the per-run pipeline.

pub mod classifier;
pub mod engine;
pub mod run;

pub use classifier::{classify, classify_candidates};
pub use engine::{Reconciliation, reconcile};
pub use run::{RunReport, Tracker, candidate_ids};
