// File: loyalty-common/src/models/scan.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::ledger::LedgerEntry;
use crate::models::progress::ProgressRecord;

/// Append-only record of one accepted scan.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScanEvent {
    pub scan_event_id: Uuid,
    pub account_id: Uuid,
    pub campaign_id: Uuid,
    pub code: String,
    pub progress_record_id: Uuid,
    pub points_awarded: i64,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Scan history row joined with its campaign labels.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScanHistoryItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: ScanEvent,
    pub brand_name: String,
    pub reward_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub points_awarded: i64,
    /// Account balance after this scan committed.
    pub balance: i64,
    pub progress: ProgressRecord,
    pub scan_event: ScanEvent,
    pub ledger_entry: LedgerEntry,
}
