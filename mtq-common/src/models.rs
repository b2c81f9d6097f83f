//! Domain models
//!
//! Sentence pairs and sentence sets are written once at dataset submission.
//! Scores and feedback are append-only: every submission is a new record and
//! duplicates are collapsed at export time, never at write time.

use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Possible-evaluator id substituted when a set is stored without any, and
/// the evaluator id excluded from score/feedback scans
pub const TESTER_EVALUATOR_ID: &str = "tester";

/// Timestamp of scores submitted before timestamps were recorded
pub const UNKNOWN_TIMESTAMP: i64 = -1;

/// Type tag for raw-text uploads and legacy records without one
pub const DEFAULT_SENTENCE_PAIR_TYPE: &str = "A";

/// Placeholder for text attributes missing from a stored record
pub const MISSING_ATTRIBUTE: &str = "undefined";

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// One aligned (original, human, machine) triple for a language direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentencePair {
    pub sentence_id: String,
    pub original: String,
    pub human_translation: String,
    pub machine_translation: String,
    pub source_language: Language,
    pub target_language: Language,
    pub sentence_pair_type: String,
}

impl SentencePair {
    /// Create a pair with a freshly generated id
    pub fn new(
        original: impl Into<String>,
        human_translation: impl Into<String>,
        machine_translation: impl Into<String>,
        source_language: Language,
        target_language: Language,
        sentence_pair_type: impl Into<String>,
    ) -> Self {
        Self {
            sentence_id: generate_id(),
            original: original.into(),
            human_translation: human_translation.into(),
            machine_translation: machine_translation.into(),
            source_language,
            target_language,
            sentence_pair_type: sentence_pair_type.into(),
        }
    }
}

/// Named collection of sentence pair ids plus evaluator bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceSet {
    pub set_id: String,
    pub name: String,
    pub source_language: Language,
    pub target_language: Language,
    pub sentence_ids: BTreeSet<String>,
    pub possible_evaluator_ids: BTreeSet<String>,
    /// Evaluators who have started this set. Only ever grows.
    pub evaluator_ids: BTreeSet<String>,
}

impl SentenceSet {
    /// Create a set with a freshly generated id and no evaluators yet
    pub fn new(
        name: impl Into<String>,
        source_language: Language,
        target_language: Language,
        sentence_ids: BTreeSet<String>,
        possible_evaluator_ids: BTreeSet<String>,
    ) -> Self {
        Self {
            set_id: generate_id(),
            name: name.into(),
            source_language,
            target_language,
            sentence_ids,
            possible_evaluator_ids,
            evaluator_ids: BTreeSet::new(),
        }
    }

    /// Evaluation order of the set's pairs
    ///
    /// Derived from the set's sorted iteration, so every read of the same
    /// set yields the same sequence.
    pub fn ordered_sentence_ids(&self) -> Vec<String> {
        self.sentence_ids.iter().cloned().collect()
    }

    pub fn set_size(&self) -> usize {
        self.sentence_ids.len()
    }

    /// Union an evaluator id into the started-evaluator set
    ///
    /// Returns `false` when the id was already present.
    pub fn add_evaluator(&mut self, evaluator_id: &str) -> bool {
        self.evaluator_ids.insert(evaluator_id.to_string())
    }

    /// Possible evaluator ids in the form they are persisted (never empty)
    pub fn persisted_possible_evaluator_ids(&self) -> BTreeSet<String> {
        if self.possible_evaluator_ids.is_empty() {
            BTreeSet::from([TESTER_EVALUATOR_ID.to_string()])
        } else {
            self.possible_evaluator_ids.clone()
        }
    }

    /// Possible evaluators who have not started this set yet
    pub fn unused_evaluator_ids(&self) -> Vec<String> {
        self.possible_evaluator_ids
            .difference(&self.evaluator_ids)
            .cloned()
            .collect()
    }
}

/// One evaluator's judgment of one sentence pair
///
/// Carries a copy of the pair's text so exports stay stable even if the
/// pair table is later rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentencePairScore {
    pub score_id: String,
    pub sentence_pair_id: String,
    pub evaluator_id: String,
    pub q1_score: f64,
    pub q2_score: f64,
    pub target_language: String,
    pub human_translation: String,
    pub machine_translation: String,
    pub original: String,
    pub sentence_pair_type: String,
    /// Unix epoch milliseconds, or [`UNKNOWN_TIMESTAMP`]
    pub timestamp: i64,
}

impl SentencePairScore {
    /// Score for `pair` submitted now by `evaluator_id`
    pub fn for_pair(pair: &SentencePair, evaluator_id: &str, q1_score: f64, q2_score: f64) -> Self {
        Self {
            score_id: generate_id(),
            sentence_pair_id: pair.sentence_id.clone(),
            evaluator_id: evaluator_id.to_string(),
            q1_score,
            q2_score,
            target_language: pair.target_language.stored_code(),
            human_translation: pair.human_translation.clone(),
            machine_translation: pair.machine_translation.clone(),
            original: pair.original.clone(),
            sentence_pair_type: pair.sentence_pair_type.clone(),
            timestamp: crate::time::now_millis(),
        }
    }
}

/// One evaluator's free-text feedback on a completed set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceSetFeedback {
    pub feedback_id: String,
    pub set_id: String,
    pub evaluator_id: String,
    pub feedback: String,
    pub target_language: String,
}

impl SentenceSetFeedback {
    pub fn new(
        set_id: impl Into<String>,
        evaluator_id: impl Into<String>,
        feedback: impl Into<String>,
        target_language: Language,
    ) -> Self {
        Self {
            feedback_id: generate_id(),
            set_id: set_id.into(),
            evaluator_id: evaluator_id.into(),
            feedback: feedback.into(),
            target_language: target_language.stored_code(),
        }
    }
}

/// One validated sentence triple inside a [`Dataset`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSentence {
    pub original: String,
    pub human_translation: String,
    pub machine_translation: String,
    pub sentence_pair_type: String,
}

/// A cleaned upload, ready to be turned into sentence pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub sentences: Vec<DatasetSentence>,
    pub set_name: String,
    pub source_language: Language,
    pub target_language: Language,
    pub possible_evaluator_ids: BTreeSet<String>,
}
