// File: loyalty-common/src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's spendable points. Only the engines move `balance`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub balance: i64,
    /// Advisory metric carried over from manual credits; never used in checks.
    pub total_accumulated_weight: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
