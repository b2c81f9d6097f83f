//! Stateless evaluation progression
//!
//! Each evaluator walks a sentence set in a fixed order. No session is kept
//! on the server: the caller carries an [`EvaluationCursor`] (set id,
//! evaluator id, zero-based position, remaining practice sentences) and
//! sends it back on every step. The order is re-derived from the stored set
//! on each step, so a retried or restarted request lands on the same pair.

use crate::db::EvaluationStore;
use crate::models::{SentencePairScore, SentenceSet, SentenceSetFeedback, TESTER_EVALUATOR_ID};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Evaluation behavior taken from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSettings {
    /// Leading sentences shown without recording a score
    pub practice_sentences: u32,
    /// Whether the closing feedback must be non-empty
    pub feedback_required: bool,
}

/// Progress state echoed by the caller on every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationCursor {
    pub set_id: String,
    pub evaluator_id: String,
    /// Zero-based position; `None` until evaluation begins
    #[serde(default)]
    pub sentence_num: Option<usize>,
    #[serde(default)]
    pub practice_remaining: u32,
}

impl EvaluationCursor {
    fn advanced(&self, practice_remaining: u32) -> Self {
        Self {
            set_id: self.set_id.clone(),
            evaluator_id: self.evaluator_id.clone(),
            sentence_num: Some(self.sentence_num.map_or(0, |n| n + 1)),
            practice_remaining,
        }
    }
}

/// Per-evaluator, per-set progression state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "position", rename_all = "camelCase")]
pub enum EvaluationState {
    AwaitingFirstView,
    ShowingPair(usize),
    AwaitingFeedback,
    Complete,
}

impl EvaluationState {
    /// State implied by a cursor position within a set of `set_size` pairs
    pub fn derive(sentence_num: Option<usize>, set_size: usize) -> Self {
        match sentence_num {
            None => EvaluationState::AwaitingFirstView,
            Some(n) if n < set_size => EvaluationState::ShowingPair(n),
            Some(_) => EvaluationState::AwaitingFeedback,
        }
    }
}

/// Pair to present to the evaluator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairView {
    pub cursor: EvaluationCursor,
    pub sentence_pair_id: String,
    pub human_translation: String,
    pub machine_translation: String,
    /// One-based position for display
    pub sentence_num: usize,
    pub set_size: usize,
    pub is_practice: bool,
}

/// What the evaluator sees next
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum EvaluationStep {
    Pair(PairView),
    #[serde(rename_all = "camelCase")]
    Feedback {
        cursor: EvaluationCursor,
        feedback_required: bool,
    },
}

/// A score submitted for the pair at the cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub sentence_pair_id: String,
    /// May be omitted while practice sentences remain
    #[serde(default)]
    pub q1_score: Option<f64>,
    #[serde(default)]
    pub q2_score: Option<f64>,
}

/// Sentence set entry on the start page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceSetOption {
    pub set_id: String,
    pub name: String,
    pub source_language: String,
    pub target_language: String,
    pub set_size: usize,
    pub is_selected: bool,
}

/// Everything needed to choose a set and an evaluator id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    pub sentence_sets: Vec<SentenceSetOption>,
    /// Unused possible evaluators of the selected set, then `"tester"`
    pub possible_evaluator_ids: Vec<String>,
}

/// List sets by name and the evaluator ids still free in the selected one
pub async fn start_options(store: &dyn EvaluationStore, selected_set_id: Option<&str>) -> Result<StartOptions> {
    let mut sets = store.list_sentence_sets().await?;
    sets.sort_by(|a, b| a.name.cmp(&b.name));

    let mut possible_evaluator_ids = sets
        .iter()
        .find(|set| Some(set.set_id.as_str()) == selected_set_id)
        .map(|set| {
            set.unused_evaluator_ids()
                .into_iter()
                .filter(|id| id != TESTER_EVALUATOR_ID)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    possible_evaluator_ids.push(TESTER_EVALUATOR_ID.to_string());

    let sentence_sets = sets
        .into_iter()
        .map(|set| SentenceSetOption {
            is_selected: Some(set.set_id.as_str()) == selected_set_id,
            set_size: set.set_size(),
            source_language: set.source_language.display_name(),
            target_language: set.target_language.display_name(),
            set_id: set.set_id,
            name: set.name,
        })
        .collect();

    Ok(StartOptions {
        sentence_sets,
        possible_evaluator_ids,
    })
}

/// `AwaitingFirstView -> ShowingPair(0)`
///
/// Records the evaluator as having started a set the caller has already
/// loaded. The store performs the union as an atomic set-add, so repeating
/// this is harmless.
pub async fn begin_evaluation(
    store: &dyn EvaluationStore,
    sentence_set: &SentenceSet,
    evaluator_id: &str,
    settings: &EvaluationSettings,
) -> Result<EvaluationCursor> {
    if evaluator_id.trim().is_empty() {
        return Err(Error::Validation("Evaluator id must not be empty".to_string()));
    }

    store.add_evaluator_id(&sentence_set.set_id, evaluator_id).await?;

    info!(
        set_id = %sentence_set.set_id,
        evaluator_id = %evaluator_id,
        set_size = sentence_set.set_size(),
        "Evaluation started"
    );

    Ok(EvaluationCursor {
        set_id: sentence_set.set_id.clone(),
        evaluator_id: evaluator_id.to_string(),
        sentence_num: Some(0),
        practice_remaining: settings.practice_sentences,
    })
}

/// Resolve the cursor to the pair to show, or to the feedback step
pub async fn current_step(
    store: &dyn EvaluationStore,
    cursor: &EvaluationCursor,
    settings: &EvaluationSettings,
) -> Result<EvaluationStep> {
    let sentence_set = store.get_sentence_set(&cursor.set_id).await?;
    let ordered_ids = sentence_set.ordered_sentence_ids();

    match EvaluationState::derive(cursor.sentence_num, ordered_ids.len()) {
        EvaluationState::ShowingPair(n) => {
            let pair = store.get_sentence_pair(&ordered_ids[n]).await?;
            Ok(EvaluationStep::Pair(PairView {
                cursor: cursor.clone(),
                sentence_pair_id: pair.sentence_id,
                human_translation: pair.human_translation,
                machine_translation: pair.machine_translation,
                sentence_num: n + 1,
                set_size: ordered_ids.len(),
                is_practice: cursor.practice_remaining > 0,
            }))
        }
        EvaluationState::AwaitingFeedback | EvaluationState::Complete => Ok(EvaluationStep::Feedback {
            cursor: cursor.clone(),
            feedback_required: settings.feedback_required,
        }),
        EvaluationState::AwaitingFirstView => {
            Err(Error::Validation("Evaluation has not begun for this cursor".to_string()))
        }
    }
}

/// `ShowingPair(n) -> ShowingPair(n + 1)` (or `AwaitingFeedback` after the last pair)
///
/// While practice sentences remain the counter is decremented and nothing is
/// written. Otherwise a new score record is appended; earlier submissions for
/// the same pair are left in place for export-time deduplication.
pub async fn submit_score(
    store: &dyn EvaluationStore,
    cursor: &EvaluationCursor,
    submission: &ScoreSubmission,
) -> Result<EvaluationCursor> {
    let sentence_set = store.get_sentence_set(&cursor.set_id).await?;
    let ordered_ids = sentence_set.ordered_sentence_ids();

    let n = match EvaluationState::derive(cursor.sentence_num, ordered_ids.len()) {
        EvaluationState::ShowingPair(n) => n,
        EvaluationState::AwaitingFirstView => {
            return Err(Error::Validation("Evaluation has not begun for this cursor".to_string()));
        }
        EvaluationState::AwaitingFeedback | EvaluationState::Complete => {
            return Err(Error::Validation(format!(
                "All {} sentence pairs of set {} have already been evaluated",
                ordered_ids.len(),
                cursor.set_id
            )));
        }
    };

    if ordered_ids[n] != submission.sentence_pair_id {
        return Err(Error::Validation(format!(
            "Sentence pair {} is not at position {} of set {}",
            submission.sentence_pair_id, n, cursor.set_id
        )));
    }

    if cursor.practice_remaining > 0 {
        debug!(
            set_id = %cursor.set_id,
            evaluator_id = %cursor.evaluator_id,
            remaining = cursor.practice_remaining - 1,
            "Practice sentence viewed"
        );
        return Ok(cursor.advanced(cursor.practice_remaining - 1));
    }

    let (q1_score, q2_score) = match (submission.q1_score, submission.q2_score) {
        (Some(q1), q2) if q1.is_finite() && q2.map_or(true, f64::is_finite) => (q1, q2.unwrap_or(0.0)),
        _ => {
            return Err(Error::Validation(format!(
                "A finite q1 score is required for sentence pair {}",
                submission.sentence_pair_id
            )));
        }
    };

    let pair = store.get_sentence_pair(&submission.sentence_pair_id).await?;
    let score = SentencePairScore::for_pair(&pair, &cursor.evaluator_id, q1_score, q2_score);
    let score_id = store.put_sentence_pair_score(&score).await?;

    debug!(
        score_id = %score_id,
        sentence_pair_id = %pair.sentence_id,
        evaluator_id = %cursor.evaluator_id,
        "Score recorded"
    );

    Ok(cursor.advanced(0))
}

/// `AwaitingFeedback -> Complete`
pub async fn submit_feedback(
    store: &dyn EvaluationStore,
    cursor: &EvaluationCursor,
    feedback: &str,
    settings: &EvaluationSettings,
) -> Result<EvaluationState> {
    let sentence_set = store.get_sentence_set(&cursor.set_id).await?;

    match EvaluationState::derive(cursor.sentence_num, sentence_set.set_size()) {
        EvaluationState::AwaitingFeedback => {}
        state => {
            return Err(Error::Validation(format!(
                "Feedback is only accepted after the last sentence pair (state: {:?})",
                state
            )));
        }
    }

    if settings.feedback_required && feedback.trim().is_empty() {
        return Err(Error::Validation("Feedback is required".to_string()));
    }

    let record = SentenceSetFeedback::new(
        sentence_set.set_id.clone(),
        cursor.evaluator_id.clone(),
        feedback,
        sentence_set.target_language,
    );
    let feedback_id = store.put_sentence_set_feedback(&record).await?;

    info!(
        feedback_id = %feedback_id,
        set_id = %sentence_set.set_id,
        evaluator_id = %cursor.evaluator_id,
        "Evaluation complete"
    );
    Ok(EvaluationState::Complete)
}
