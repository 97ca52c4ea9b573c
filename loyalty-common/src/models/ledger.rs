// File: loyalty-common/src/models/ledger.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReasonCode {
    /// Scan accumulation; `reference_id` is the scan event.
    Earn,
    /// Catalog redemption; `reference_id` is the redemption record.
    Spend,
    /// Manual credit with no reference.
    Adjust,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Earn => "earn",
            ReasonCode::Spend => "spend",
            ReasonCode::Adjust => "adjust",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "earn" => Ok(ReasonCode::Earn),
            "spend" => Ok(ReasonCode::Spend),
            "adjust" => Ok(ReasonCode::Adjust),
            _ => Err(format!("Unknown reason code: {}", s)),
        }
    }
}

/// One immutable signed change to an account balance.
///
/// `entry_seq` is assigned by the database and orders replay.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub entry_seq: i64,
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub delta: i64,
    pub reason_code: ReasonCode,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub resulting_balance: i64,
    pub created_at: DateTime<Utc>,
}

/// An account's balance together with its full ledger, read atomically.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub account_id: Uuid,
    pub balance: i64,
    pub entries: Vec<LedgerEntry>,
}

/// First entry whose `resulting_balance` disagrees with the running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBreak {
    pub entry_seq: i64,
    pub expected_balance: i64,
    pub recorded_balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub account_id: Uuid,
    pub balance: i64,
    pub ledger_sum: i64,
    pub entry_count: usize,
    pub first_break: Option<LedgerBreak>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_sum && self.first_break.is_none()
    }
}
