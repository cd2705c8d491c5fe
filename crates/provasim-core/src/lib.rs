//! provasim-core — exam-position reconciliation, statistics, and IRT
//! scoring.
//!
//! This crate defines the domain model, the reference tables, and the
//! analysis pipeline the rest of provasim builds on: position mapping
//! across booklet colors, nullification, correctness aggregation,
//! ability-score estimation, and the 3PL consistency check.

pub mod analyzer;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod generator;
pub mod mapper;
pub mod model;
pub mod report;
pub mod scorer;
pub mod skills;
pub mod tables;
pub mod traits;
pub mod validate;
