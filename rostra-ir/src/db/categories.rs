//! Tag category lookups
//!
//! The registry is read-only from this service; rows are administered
//! elsewhere.

use rostra_common::models::TagCategory;
use rostra_common::{Error, Result};
use sqlx::{Row, SqlitePool};

/// All active categories, ordered by display name
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<TagCategory>> {
    let rows = sqlx::query(
        "SELECT * FROM tag_categories WHERE is_active = 1 ORDER BY display_name",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_category).collect()
}

/// One category by key, regardless of active flag
pub async fn get(pool: &SqlitePool, category_key: &str) -> Result<Option<TagCategory>> {
    let row = sqlx::query("SELECT * FROM tag_categories WHERE category_key = ?")
        .bind(category_key)
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_category(&r)).transpose()
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<TagCategory> {
    let allowed_values: String = row.get("allowed_values");
    let allowed_values: Vec<String> = serde_json::from_str(&allowed_values)
        .map_err(|e| Error::Internal(format!("Failed to deserialize allowed values: {e}")))?;
    let is_active: i64 = row.get("is_active");

    Ok(TagCategory {
        category_key: row.get("category_key"),
        display_name: row.get("display_name"),
        allowed_values,
        is_active: is_active != 0,
    })
}
