//! Score deduplication and export
//!
//! Scores are append-only, so one evaluator may have several records for the
//! same pair (retries, two open tabs). Export is where those collapse: each
//! (pair, evaluator) keeps its earliest submission. Pair ids are replaced by
//! readable labels `<CODE>_SE_<k>` and the result is rendered as CSV.

use crate::db::EvaluationStore;
use crate::language::Language;
use crate::models::{SentencePairScore, SentenceSetFeedback};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info};

/// One rendered file of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Files to be bundled into a single archive for one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBundle {
    pub language: Language,
    pub archive_name: String,
    pub files: Vec<ExportFile>,
}

#[derive(Serialize)]
struct ScoreRow<'a> {
    #[serde(rename = "sentence pair id")]
    sentence_pair_id: &'a str,
    #[serde(rename = "sentence pair type")]
    sentence_pair_type: &'a str,
    #[serde(rename = "evaluator id")]
    evaluator_id: &'a str,
    #[serde(rename = "q1 score")]
    q1_score: f64,
    #[serde(rename = "q2 score")]
    q2_score: f64,
    #[serde(rename = "target language")]
    target_language: &'a str,
    #[serde(rename = "human translation")]
    human_translation: &'a str,
    #[serde(rename = "machine translation")]
    machine_translation: &'a str,
    #[serde(rename = "original")]
    original: &'a str,
}

#[derive(Serialize)]
struct FeedbackRow<'a> {
    #[serde(rename = "evaluator id")]
    evaluator_id: &'a str,
    #[serde(rename = "feedback")]
    feedback: &'a str,
    #[serde(rename = "target language")]
    target_language: &'a str,
}

/// Group items by key, keeping groups in order of first appearance
fn group_in_order<'a, K, T, F>(items: &'a [T], key: F) -> Vec<Vec<&'a T>>
where
    K: std::hash::Hash + Eq,
    F: Fn(&'a T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<&T>> = Vec::new();
    for item in items {
        let slot = *index.entry(key(item)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(item);
    }
    groups
}

/// Replace pair ids with `<CODE>_SE_<k>`, k counting pairs in first-appearance order
///
/// Labels are only stable within one call.
pub fn make_sentence_ids_human_readable(
    scores: &[SentencePairScore],
    language: Language,
) -> Vec<SentencePairScore> {
    let prefix = language.stored_code();
    group_in_order(scores, |score| score.sentence_pair_id.as_str())
        .into_iter()
        .enumerate()
        .flat_map(|(i, group)| {
            let label = format!("{}_SE_{}", prefix, i + 1);
            group.into_iter().map(move |score| SentencePairScore {
                sentence_pair_id: label.clone(),
                ..score.clone()
            })
        })
        .collect()
}

/// Keep exactly one score per (sentence pair, evaluator): the earliest
///
/// Ties keep the record seen first. The unknown-timestamp sentinel (-1)
/// sorts before every real timestamp and therefore wins.
pub fn remove_duplicate_answers(scores: &[SentencePairScore]) -> Vec<SentencePairScore> {
    group_in_order(scores, |score| (score.sentence_pair_id.as_str(), score.evaluator_id.as_str()))
        .into_iter()
        .filter_map(|group| {
            group
                .into_iter()
                .reduce(|kept, candidate| if candidate.timestamp < kept.timestamp { candidate } else { kept })
                .cloned()
        })
        .collect()
}

/// Keep one feedback entry per (sentence set, evaluator): the first stored
///
/// Feedback is append-only like scores, so a retried submission leaves a
/// second record behind. Store scans return records in write order.
pub fn remove_duplicate_feedback(feedback: &[SentenceSetFeedback]) -> Vec<SentenceSetFeedback> {
    group_in_order(feedback, |entry| (entry.set_id.as_str(), entry.evaluator_id.as_str()))
        .into_iter()
        .filter_map(|group| group.first().map(|entry| (*entry).clone()))
        .collect()
}

/// Relabel then deduplicate, ready for rendering
pub fn prepare_scores(scores: &[SentencePairScore], language: Language) -> Vec<SentencePairScore> {
    remove_duplicate_answers(&make_sentence_ids_human_readable(scores, language))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("Could not flush CSV: {}", e)))
}

/// Render scores as UTF-8 CSV with a human-readable header row
pub fn render_scores_csv(scores: &[SentencePairScore]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if scores.is_empty() {
        writer.write_record([
            "sentence pair id",
            "sentence pair type",
            "evaluator id",
            "q1 score",
            "q2 score",
            "target language",
            "human translation",
            "machine translation",
            "original",
        ])?;
    }
    for score in scores {
        writer.serialize(ScoreRow {
            sentence_pair_id: &score.sentence_pair_id,
            sentence_pair_type: &score.sentence_pair_type,
            evaluator_id: &score.evaluator_id,
            q1_score: score.q1_score,
            q2_score: score.q2_score,
            target_language: &score.target_language,
            human_translation: &score.human_translation,
            machine_translation: &score.machine_translation,
            original: &score.original,
        })?;
    }
    finish(writer)
}

/// Render feedback as UTF-8 CSV with a human-readable header row
pub fn render_feedback_csv(feedback: &[SentenceSetFeedback]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if feedback.is_empty() {
        writer.write_record(["evaluator id", "feedback", "target language"])?;
    }
    for entry in feedback {
        writer.serialize(FeedbackRow {
            evaluator_id: &entry.evaluator_id,
            feedback: &entry.feedback,
            target_language: &entry.target_language,
        })?;
    }
    finish(writer)
}

/// Read, deduplicate and render everything recorded for one target language
///
/// The language is resolved before the store is touched. Scores and feedback
/// are read concurrently; either read failing aborts the whole export.
pub async fn build_export(store: &dyn EvaluationStore, language: &str) -> Result<ExportBundle> {
    let language = Language::resolve(language).ok_or_else(|| {
        error!("Invalid language parameter could not convert {} into Language enum", language);
        Error::Validation(format!("Unsupported language: {}", language))
    })?;

    let (scores, feedback) = tokio::try_join!(
        store.get_sentence_pair_scores(language),
        store.get_sentence_set_feedback(language)
    )?;

    let prepared = prepare_scores(&scores, language);
    let feedback_entries = remove_duplicate_feedback(&feedback);
    let code = language.code();

    info!(
        language = %language,
        scores = scores.len(),
        deduplicated = prepared.len(),
        feedback = feedback_entries.len(),
        "Export prepared"
    );

    Ok(ExportBundle {
        language,
        archive_name: format!("{}.zip", code),
        files: vec![
            ExportFile {
                name: format!("{}-sentence-pair-scores.csv", code),
                contents: render_scores_csv(&prepared)?,
            },
            ExportFile {
                name: format!("{}-feedback.csv", code),
                contents: render_feedback_csv(&feedback_entries)?,
            },
        ],
    })
}
