//! Database initialization
//!
//! Creates the database file and schema on first run. Every statement is
//! idempotent, so opening an existing database runs the same sequence.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets score scans run while evaluators keep appending
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Limited to one connection: every SQLite memory connection is its own database.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_sentence_pairs_table(pool).await?;
    create_sentence_sets_table(pool).await?;

    // String-set attributes of a sentence set
    create_set_member_table(pool, "sentence_set_pairs", "sentence_id").await?;
    create_set_member_table(pool, "sentence_set_possible_evaluators", "evaluator_id").await?;
    create_set_member_table(pool, "sentence_set_evaluators", "evaluator_id").await?;

    create_sentence_pair_scores_table(pool).await?;
    create_sentence_set_feedback_table(pool).await?;

    Ok(())
}

async fn create_sentence_pairs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentence_pairs (
            sentence_id TEXT PRIMARY KEY,
            original TEXT NOT NULL,
            human_translation TEXT NOT NULL,
            machine_translation TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            sentence_pair_type TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sentence_sets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentence_sets (
            set_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Child table holding one string-set attribute of `sentence_sets`
///
/// The composite primary key makes `INSERT OR IGNORE` an atomic set-add.
async fn create_set_member_table(pool: &SqlitePool, table: &str, value_column: &str) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            set_id TEXT NOT NULL REFERENCES sentence_sets(set_id) ON DELETE CASCADE,
            {value_column} TEXT NOT NULL,
            added_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (set_id, {value_column})
        )
        "#
    );
    sqlx::query(&sql).execute(pool).await?;

    Ok(())
}

/// Scores are append-only; text columns are nullable to hold legacy records
async fn create_sentence_pair_scores_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentence_pair_scores (
            score_id TEXT PRIMARY KEY,
            sentence_pair_id TEXT,
            evaluator_id TEXT,
            q1_score REAL,
            q2_score REAL,
            target_language TEXT,
            human_translation TEXT,
            machine_translation TEXT,
            original TEXT,
            sentence_pair_type TEXT,
            timestamp INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sentence_pair_scores_language ON sentence_pair_scores(target_language)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sentence_set_feedback_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentence_set_feedback (
            feedback_id TEXT PRIMARY KEY,
            set_id TEXT,
            evaluator_id TEXT,
            feedback TEXT,
            target_language TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sentence_set_feedback_language ON sentence_set_feedback(target_language)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
