// File: loyalty-common/src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked reward that can be bought with the spendable balance.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogItem {
    pub item_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub cost_points: i64,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
