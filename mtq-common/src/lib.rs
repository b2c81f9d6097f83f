//! # MTQ Common Library
//!
//! Core of the machine-translation quality evaluation service:
//! - Domain models (sentence pairs, sentence sets, scores, feedback)
//! - Closed language enumeration
//! - Dataset ingestion and validation
//! - Stateless per-evaluator progression through a sentence set
//! - Score deduplication and tabular export
//! - Persistence contract and its SQLite implementation
//! - Configuration loading

pub mod cleaner;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod language;
pub mod models;
pub mod progression;
pub mod time;

pub use db::EvaluationStore;
pub use error::{Error, Result};
pub use language::Language;
