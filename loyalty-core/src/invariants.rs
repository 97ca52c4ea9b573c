// File: loyalty-core/src/invariants.rs
//
// Checks the engines run inside a unit of work right before they mutate,
// plus the ledger replay used for reconciliation.

use uuid::Uuid;
use loyalty_common::models::{CatalogItem, LedgerBreak, LedgerEntry, ProgressRecord, ReconciliationReport};
use crate::Error;

/// Upper bound on any page size a caller can ask for.
pub const MAX_PAGE_SIZE: i64 = 500;

pub fn ensure_positive_points(label: &str, points: i64) -> Result<(), Error> {
    if points <= 0 {
        return Err(Error::InvalidInput(format!("{label} must be positive, got {points}")));
    }
    Ok(())
}

pub fn ensure_page_limit(limit: i64) -> Result<i64, Error> {
    if limit <= 0 {
        return Err(Error::InvalidInput(format!("limit must be positive, got {limit}")));
    }
    Ok(limit.min(MAX_PAGE_SIZE))
}

/// Trims a scanned code; blank codes are rejected before touching storage.
pub fn normalize_code(code: &str) -> Result<&str, Error> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("code is required".into()));
    }
    Ok(trimmed)
}

pub fn check_balance_covers(balance: i64, cost: i64) -> Result<(), Error> {
    if balance < cost {
        return Err(Error::InsufficientPoints { required: cost, available: balance });
    }
    Ok(())
}

pub fn check_in_stock(item: &CatalogItem) -> Result<(), Error> {
    if !item.in_stock() {
        return Err(Error::OutOfStock { item_id: item.item_id });
    }
    Ok(())
}

pub fn check_progress_complete(rec: &ProgressRecord) -> Result<(), Error> {
    if !rec.is_complete() {
        return Err(Error::InsufficientPoints {
            required: rec.target_points,
            available: rec.current_points,
        });
    }
    Ok(())
}

/// Balance after applying `delta`. Never negative.
pub fn next_balance(balance: i64, delta: i64) -> Result<i64, Error> {
    let next = balance
        .checked_add(delta)
        .ok_or_else(|| Error::InvalidInput(format!("balance overflow applying {delta} to {balance}")))?;
    if next < 0 {
        return Err(Error::InsufficientPoints { required: -delta, available: balance });
    }
    Ok(next)
}

/// Replays `entries` (already in `entry_seq` order) and compares the result
/// with the stored balance.
pub fn replay_ledger(account_id: Uuid, balance: i64, entries: &[LedgerEntry]) -> ReconciliationReport {
    let mut running: i64 = 0;
    let mut first_break = None;

    for entry in entries {
        running = running.saturating_add(entry.delta);
        if first_break.is_none() && entry.resulting_balance != running {
            first_break = Some(LedgerBreak {
                entry_seq: entry.entry_seq,
                expected_balance: running,
                recorded_balance: entry.resulting_balance,
            });
        }
    }

    ReconciliationReport {
        account_id,
        balance,
        ledger_sum: running,
        entry_count: entries.len(),
        first_break,
    }
}
