// File: loyalty-common/src/models/redemption.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::ledger::LedgerEntry;
use crate::models::progress::ProgressRecord;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Completed,
    Failed,
}

impl RedemptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionStatus::Pending => "pending",
            RedemptionStatus::Completed => "completed",
            RedemptionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RedemptionStatus::Pending)
    }
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedemptionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RedemptionStatus::Pending),
            "completed" => Ok(RedemptionStatus::Completed),
            "failed" => Ok(RedemptionStatus::Failed),
            _ => Err(format!("Unknown redemption status: {}", s)),
        }
    }
}

/// One redemption that reached the atomic phase. Exactly one of
/// `catalog_item_id` / `progress_record_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RedemptionRecord {
    pub redemption_id: Uuid,
    pub account_id: Uuid,
    pub catalog_item_id: Option<Uuid>,
    pub progress_record_id: Option<Uuid>,
    pub points_charged: i64,
    pub status: RedemptionStatus,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fulfilment details for a catalog redemption.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionResult {
    pub redemption: RedemptionRecord,
    /// Authoritative spendable balance after commit.
    pub balance: i64,
    /// Set for catalog redemptions only.
    pub ledger_entry: Option<LedgerEntry>,
    pub remaining_stock: Option<i32>,
    /// Set for progress redemptions only.
    pub progress: Option<ProgressRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for s in [RedemptionStatus::Pending, RedemptionStatus::Completed, RedemptionStatus::Failed] {
            assert_eq!(s.as_str().parse::<RedemptionStatus>(), Ok(s));
        }
        assert!("shipped".parse::<RedemptionStatus>().is_err());
        assert!(!RedemptionStatus::Pending.is_terminal());
        assert!(RedemptionStatus::Failed.is_terminal());
    }
}
