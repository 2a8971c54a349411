//! Health-compatibility verdicts for food products.
//!
//! The [`compatibility`] module holds the evaluation pipeline: profile normalization, rule-based
//! analyzers, nutrition evaluation, score synthesis, the learned estimator, alternative retrieval and
//! ranking, and recommendation composition. [`catalog`] provides the CSV importer and an in-memory
//! product catalog used by the service binary.

pub mod catalog;
pub mod compatibility;
pub mod config;
pub mod error;
pub mod telemetry;
