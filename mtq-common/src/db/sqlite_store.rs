//! SQLite-backed [`EvaluationStore`]

use super::EvaluationStore;
use crate::language::Language;
use crate::models::{
    SentencePair, SentencePairScore, SentenceSet, SentenceSetFeedback, DEFAULT_SENTENCE_PAIR_TYPE,
    MISSING_ATTRIBUTE, TESTER_EVALUATOR_ID, UNKNOWN_TIMESTAMP,
};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use tracing::debug;

/// Store over a sqlx SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for maintenance queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn set_members(&self, table: &str, value_column: &str, set_id: &str) -> Result<BTreeSet<String>> {
        let sql = format!("SELECT {value_column} FROM {table} WHERE set_id = ?");
        let values: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(set_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(values.into_iter().map(|(v,)| v).collect())
    }
}

fn parse_language(value: &str) -> Result<Language> {
    Language::resolve(value)
        .ok_or_else(|| Error::Internal(format!("Stored language '{}' is not supported", value)))
}

/// Text column that may be missing on legacy records
fn text_or_missing(row: &SqliteRow, column: &str) -> Result<String> {
    let value: Option<String> = row.try_get(column)?;
    Ok(value.unwrap_or_else(|| MISSING_ATTRIBUTE.to_string()))
}

fn score_from_row(row: &SqliteRow) -> Result<SentencePairScore> {
    let sentence_pair_type: Option<String> = row.try_get("sentence_pair_type")?;
    let q1_score: Option<f64> = row.try_get("q1_score")?;
    let q2_score: Option<f64> = row.try_get("q2_score")?;
    let timestamp: Option<i64> = row.try_get("timestamp")?;

    Ok(SentencePairScore {
        score_id: row.try_get("score_id")?,
        sentence_pair_id: text_or_missing(row, "sentence_pair_id")?,
        evaluator_id: text_or_missing(row, "evaluator_id")?,
        q1_score: q1_score.unwrap_or(0.0),
        q2_score: q2_score.unwrap_or(0.0),
        target_language: text_or_missing(row, "target_language")?,
        human_translation: text_or_missing(row, "human_translation")?,
        machine_translation: text_or_missing(row, "machine_translation")?,
        original: text_or_missing(row, "original")?,
        sentence_pair_type: sentence_pair_type.unwrap_or_else(|| DEFAULT_SENTENCE_PAIR_TYPE.to_string()),
        timestamp: timestamp.unwrap_or(UNKNOWN_TIMESTAMP),
    })
}

fn feedback_from_row(row: &SqliteRow) -> Result<SentenceSetFeedback> {
    Ok(SentenceSetFeedback {
        feedback_id: row.try_get("feedback_id")?,
        set_id: text_or_missing(row, "set_id")?,
        evaluator_id: text_or_missing(row, "evaluator_id")?,
        feedback: text_or_missing(row, "feedback")?,
        target_language: text_or_missing(row, "target_language")?,
    })
}

#[async_trait]
impl EvaluationStore for SqliteStore {
    async fn get_sentence_set(&self, set_id: &str) -> Result<SentenceSet> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT set_id, name, source_language, target_language FROM sentence_sets WHERE set_id = ?",
        )
        .bind(set_id)
        .fetch_optional(&self.pool)
        .await?;

        let (set_id, name, source_language, target_language) =
            row.ok_or_else(|| Error::NotFound(format!("Sentence set with id: {} does not exist.", set_id)))?;

        let sentence_ids = self.set_members("sentence_set_pairs", "sentence_id", &set_id).await?;
        let possible_evaluator_ids = self
            .set_members("sentence_set_possible_evaluators", "evaluator_id", &set_id)
            .await?;
        let evaluator_ids = self.set_members("sentence_set_evaluators", "evaluator_id", &set_id).await?;

        Ok(SentenceSet {
            set_id,
            name,
            source_language: parse_language(&source_language)?,
            target_language: parse_language(&target_language)?,
            sentence_ids,
            possible_evaluator_ids,
            evaluator_ids,
        })
    }

    async fn list_sentence_sets(&self) -> Result<Vec<SentenceSet>> {
        let ids: Vec<(String,)> = sqlx::query_as("SELECT set_id FROM sentence_sets ORDER BY created_at, set_id")
            .fetch_all(&self.pool)
            .await?;

        let mut sets = Vec::with_capacity(ids.len());
        for (set_id,) in ids {
            sets.push(self.get_sentence_set(&set_id).await?);
        }
        Ok(sets)
    }

    async fn put_sentence_set(&self, sentence_set: &SentenceSet) -> Result<String> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sentence_sets (set_id, name, source_language, target_language)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(set_id) DO UPDATE SET
                name = excluded.name,
                source_language = excluded.source_language,
                target_language = excluded.target_language
            "#,
        )
        .bind(&sentence_set.set_id)
        .bind(&sentence_set.name)
        .bind(sentence_set.source_language.stored_code())
        .bind(sentence_set.target_language.stored_code())
        .execute(&mut *tx)
        .await?;

        // Membership and possible evaluators are replaced wholesale
        sqlx::query("DELETE FROM sentence_set_pairs WHERE set_id = ?")
            .bind(&sentence_set.set_id)
            .execute(&mut *tx)
            .await?;
        for sentence_id in &sentence_set.sentence_ids {
            sqlx::query("INSERT INTO sentence_set_pairs (set_id, sentence_id) VALUES (?, ?)")
                .bind(&sentence_set.set_id)
                .bind(sentence_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM sentence_set_possible_evaluators WHERE set_id = ?")
            .bind(&sentence_set.set_id)
            .execute(&mut *tx)
            .await?;
        for evaluator_id in sentence_set.persisted_possible_evaluator_ids() {
            sqlx::query("INSERT INTO sentence_set_possible_evaluators (set_id, evaluator_id) VALUES (?, ?)")
                .bind(&sentence_set.set_id)
                .bind(evaluator_id)
                .execute(&mut *tx)
                .await?;
        }

        // Started evaluators only grow: union, never overwrite from a possibly stale copy
        for evaluator_id in &sentence_set.evaluator_ids {
            sqlx::query("INSERT OR IGNORE INTO sentence_set_evaluators (set_id, evaluator_id) VALUES (?, ?)")
                .bind(&sentence_set.set_id)
                .bind(evaluator_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            set_id = %sentence_set.set_id,
            sentences = sentence_set.sentence_ids.len(),
            "Stored sentence set"
        );
        Ok(sentence_set.set_id.clone())
    }

    async fn add_evaluator_id(&self, set_id: &str, evaluator_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO sentence_set_evaluators (set_id, evaluator_id)
            SELECT set_id, ? FROM sentence_sets WHERE set_id = ?
            "#,
        )
        .bind(evaluator_id)
        .bind(set_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either already present (no-op) or the set does not exist
            let exists: Option<(String,)> = sqlx::query_as("SELECT set_id FROM sentence_sets WHERE set_id = ?")
                .bind(set_id)
                .fetch_optional(&self.pool)
                .await?;
            if exists.is_none() {
                return Err(Error::NotFound(format!("Sentence set with id: {} does not exist.", set_id)));
            }
        }

        Ok(())
    }

    async fn get_sentence_pair(&self, sentence_id: &str) -> Result<SentencePair> {
        let row: Option<(String, String, String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT sentence_id, original, human_translation, machine_translation,
                   source_language, target_language, sentence_pair_type
            FROM sentence_pairs WHERE sentence_id = ?
            "#,
        )
        .bind(sentence_id)
        .fetch_optional(&self.pool)
        .await?;

        let (sentence_id, original, human_translation, machine_translation, source, target, pair_type) =
            row.ok_or_else(|| Error::NotFound(format!("Sentence pair with id: {} does not exist.", sentence_id)))?;

        Ok(SentencePair {
            sentence_id,
            original,
            human_translation,
            machine_translation,
            source_language: parse_language(&source)?,
            target_language: parse_language(&target)?,
            sentence_pair_type: pair_type,
        })
    }

    async fn put_sentence_pair(&self, pair: &SentencePair) -> Result<String> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO sentence_pairs
                (sentence_id, original, human_translation, machine_translation,
                 source_language, target_language, sentence_pair_type)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pair.sentence_id)
        .bind(&pair.original)
        .bind(&pair.human_translation)
        .bind(&pair.machine_translation)
        .bind(pair.source_language.stored_code())
        .bind(pair.target_language.stored_code())
        .bind(&pair.sentence_pair_type)
        .execute(&self.pool)
        .await?;

        Ok(pair.sentence_id.clone())
    }

    async fn put_sentence_pair_score(&self, score: &SentencePairScore) -> Result<String> {
        sqlx::query(
            r#"
            INSERT INTO sentence_pair_scores
                (score_id, sentence_pair_id, evaluator_id, q1_score, q2_score, target_language,
                 human_translation, machine_translation, original, sentence_pair_type, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&score.score_id)
        .bind(&score.sentence_pair_id)
        .bind(&score.evaluator_id)
        .bind(score.q1_score)
        .bind(score.q2_score)
        .bind(score.target_language.to_uppercase())
        .bind(&score.human_translation)
        .bind(&score.machine_translation)
        .bind(&score.original)
        .bind(&score.sentence_pair_type)
        .bind(score.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(score.score_id.clone())
    }

    async fn get_sentence_pair_scores(&self, language: Language) -> Result<Vec<SentencePairScore>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sentence_pair_scores
            WHERE target_language = ?
              AND (evaluator_id IS NULL OR evaluator_id != ?)
            ORDER BY rowid
            "#,
        )
        .bind(language.stored_code())
        .bind(TESTER_EVALUATOR_ID)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(score_from_row).collect()
    }

    async fn put_sentence_set_feedback(&self, feedback: &SentenceSetFeedback) -> Result<String> {
        sqlx::query(
            r#"
            INSERT INTO sentence_set_feedback (feedback_id, set_id, evaluator_id, feedback, target_language)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&feedback.feedback_id)
        .bind(&feedback.set_id)
        .bind(&feedback.evaluator_id)
        .bind(&feedback.feedback)
        .bind(feedback.target_language.to_uppercase())
        .execute(&self.pool)
        .await?;

        Ok(feedback.feedback_id.clone())
    }

    async fn get_sentence_set_feedback(&self, language: Language) -> Result<Vec<SentenceSetFeedback>> {
        let rows = sqlx::query(
            r#"
            SELECT feedback_id, set_id, evaluator_id, feedback, target_language
            FROM sentence_set_feedback
            WHERE target_language = ?
              AND (evaluator_id IS NULL OR evaluator_id != ?)
            ORDER BY rowid
            "#,
        )
        .bind(language.stored_code())
        .bind(TESTER_EVALUATOR_ID)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(feedback_from_row).collect()
    }
}
