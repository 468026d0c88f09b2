//! Read-only tag category registry
//!
//! Consumed by ingestion validation; never mutated here.

use crate::db;
use rostra_common::models::TagCategory;
use rostra_common::Result;
use sqlx::SqlitePool;

/// Snapshot of the active tag categories
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: Vec<TagCategory>,
}

impl CategoryRegistry {
    pub fn new(categories: Vec<TagCategory>) -> Self {
        Self { categories }
    }

    /// Load the active categories from the store
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let categories = db::categories::list_active(pool).await?;
        Ok(Self::new(categories))
    }

    /// Lookup by key; inactive categories are not present
    pub fn get(&self, category_key: &str) -> Option<&TagCategory> {
        self.categories
            .iter()
            .find(|c| c.category_key == category_key)
    }

    pub fn categories(&self) -> &[TagCategory] {
        &self.categories
    }
}
