//! Database initialization
//!
//! Creates the database on first run, applies the schema idempotently, and
//! seeds the tag-category registry and default settings.

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
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; chunk inserts and
    // status polls run on the same file
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Schema creation (idempotent - safe to call multiple times)
    create_settings_table(&pool).await?;
    create_tag_categories_table(&pool).await?;
    create_observations_table(&pool).await?;
    create_bulk_batches_table(&pool).await?;
    create_bulk_records_table(&pool).await?;
    create_review_entries_table(&pool).await?;

    init_default_settings(&pool).await?;
    init_default_categories(&pool).await?;

    Ok(pool)
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tag_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tag_categories (
            category_key TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            allowed_values TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_observations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS observations (
            id TEXT PRIMARY KEY,
            provider_npi TEXT NOT NULL,
            provider_name TEXT NOT NULL,
            payer_name TEXT,
            field_observed TEXT NOT NULL,
            system_a_name TEXT,
            system_a_value TEXT,
            system_b_name TEXT,
            system_b_value TEXT,
            corrected_value TEXT NOT NULL,
            evidence_type TEXT NOT NULL,
            evidence_notes TEXT,
            submitted_by TEXT NOT NULL,
            submitted_by_email TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_observations_status ON observations(status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_bulk_batches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bulk_batches (
            id TEXT PRIMARY KEY,
            batch_name TEXT NOT NULL,
            category_key TEXT NOT NULL REFERENCES tag_categories(category_key),
            tag_value TEXT NOT NULL,
            id_column_name TEXT NOT NULL,
            record_count INTEGER NOT NULL,
            chunks_committed INTEGER NOT NULL DEFAULT 0,
            ingest_state TEXT NOT NULL DEFAULT 'ingesting',
            notes TEXT,
            submitted_by TEXT NOT NULL,
            submitted_by_email TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_bulk_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bulk_records (
            id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL REFERENCES bulk_batches(id) ON DELETE CASCADE,
            record_identifier TEXT NOT NULL DEFAULT '',
            original_row TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_bulk_records_batch ON bulk_records(batch_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_review_entries_table(pool: &SqlitePool) -> Result<()> {
    // Exactly one subject reference per entry
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_entries (
            id TEXT PRIMARY KEY,
            observation_id TEXT REFERENCES observations(id),
            batch_id TEXT REFERENCES bulk_batches(id),
            reviewer_id TEXT NOT NULL,
            reviewer_email TEXT NOT NULL,
            decision TEXT NOT NULL,
            comment TEXT,
            created_at TEXT NOT NULL,
            CHECK ((observation_id IS NULL) != (batch_id IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_review_entries_observation ON review_entries(observation_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_review_entries_batch ON review_entries(batch_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed tunable defaults; existing operator overrides are left alone
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    let defaults: &[(&str, &str)] = &[
        ("ir_chunk_size", "500"),
        ("ir_write_timeout_ms", "10000"),
        ("ir_sse_heartbeat_secs", "15"),
    ];

    for (key, value) in defaults {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Seed the tag-category registry on first run.
///
/// The registry is administered outside this service; these rows only make
/// a fresh database usable.
async fn init_default_categories(pool: &SqlitePool) -> Result<()> {
    let defaults: &[(&str, &str, &[&str], bool)] = &[
        (
            "enrollment_status",
            "Enrollment Status",
            &["active", "termed", "suspended", "pending_enrollment"],
            true,
        ),
        (
            "credentialing_status",
            "Credentialing Status",
            &["credentialed", "in_process", "expired"],
            true,
        ),
        (
            "review_cohort",
            "Review Cohort",
            &["quarterly_audit", "payer_escalation", "termination_sweep"],
            true,
        ),
        (
            "legacy_flags",
            "Legacy Flags",
            &["migrated", "do_not_use"],
            false,
        ),
    ];

    for (key, display, values, active) in defaults {
        let allowed = serde_json::to_string(values)
            .map_err(|e| crate::Error::Internal(format!("Failed to serialize values: {e}")))?;
        sqlx::query(
            "INSERT OR IGNORE INTO tag_categories (category_key, display_name, allowed_values, is_active) VALUES (?, ?, ?, ?)",
        )
        .bind(key)
        .bind(display)
        .bind(allowed)
        .bind(*active)
        .execute(pool)
        .await?;
    }

    Ok(())
}
