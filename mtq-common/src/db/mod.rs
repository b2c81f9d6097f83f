//! Persistence contract and its SQLite implementation
//!
//! The core only talks to [`EvaluationStore`]. Every call is a single awaited
//! round trip; nothing here retries.

use crate::language::Language;
use crate::models::{SentencePair, SentencePairScore, SentenceSet, SentenceSetFeedback};
use crate::Result;
use async_trait::async_trait;

pub mod init;
pub mod sqlite_store;

pub use init::{create_schema, init_database, init_in_memory};
pub use sqlite_store::SqliteStore;

/// Key-value/query store for sentence data, scores and feedback
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Point lookup of a sentence set; `Error::NotFound` if absent
    async fn get_sentence_set(&self, set_id: &str) -> Result<SentenceSet>;

    /// Every stored sentence set
    async fn list_sentence_sets(&self) -> Result<Vec<SentenceSet>>;

    /// Upsert a sentence set, returning its id
    ///
    /// An empty possible-evaluator set is stored as `{"tester"}`.
    /// Stored evaluator ids are unioned with the given ones, never replaced.
    async fn put_sentence_set(&self, sentence_set: &SentenceSet) -> Result<String>;

    /// Atomically add one evaluator id to a set's started-evaluator set
    ///
    /// Adding an id already present is a no-op.
    async fn add_evaluator_id(&self, set_id: &str, evaluator_id: &str) -> Result<()>;

    /// Point lookup of a sentence pair; `Error::NotFound` if absent
    async fn get_sentence_pair(&self, sentence_id: &str) -> Result<SentencePair>;

    /// Upsert a sentence pair, returning its id
    async fn put_sentence_pair(&self, pair: &SentencePair) -> Result<String>;

    /// Append a score record, returning its id
    async fn put_sentence_pair_score(&self, score: &SentencePairScore) -> Result<String>;

    /// All scores for a target language, excluding the tester evaluator
    async fn get_sentence_pair_scores(&self, language: Language) -> Result<Vec<SentencePairScore>>;

    /// Append a feedback record, returning its id
    async fn put_sentence_set_feedback(&self, feedback: &SentenceSetFeedback) -> Result<String>;

    /// All feedback for a target language, excluding the tester evaluator
    async fn get_sentence_set_feedback(&self, language: Language) -> Result<Vec<SentenceSetFeedback>>;
}
