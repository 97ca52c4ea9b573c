// File: loyalty-core/src/services/accumulation_service.rs

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;
use loyalty_common::models::{LedgerEntry, ProgressRecord, ReasonCode, ScanEvent, ScanResult};
use crate::db::{Database, Staged};
use crate::engine::EngineSettings;
use crate::invariants::{ensure_positive_points, next_balance, normalize_code};
use crate::repositories::postgres::{accounts, campaigns, ledger, progress, scan_events};
use crate::repositories::postgres::ledger::NewLedgerEntry;
use crate::Error;

/// Applies scans (and manual credits) to an account.
///
/// Every scan counts: repeated scans of the same code are not deduplicated
/// and progress is not capped at its target.
pub struct AccumulationService {
    db: Database,
    target_multiplier: i64,
    progress_horizon_days: i64,
}

impl AccumulationService {
    pub fn new(db: Database, settings: &EngineSettings) -> Self {
        Self {
            db,
            target_multiplier: settings.target_multiplier,
            progress_horizon_days: settings.progress_horizon_days,
        }
    }

    pub async fn apply_scan(
        &self,
        account_id: Uuid,
        code: &str,
        location: Option<&str>,
    ) -> Result<Staged<ScanResult>, Error> {
        let code = normalize_code(code)?;
        let now = Utc::now();
        let mut uow = self.db.begin("apply_scan").await?;

        let campaign = campaigns::resolve_active_code(uow.conn(), code)
            .await?
            .ok_or_else(|| Error::CodeNotFound { code: code.to_string() })?;
        let points = campaign.points_value;

        // Lock order: account, then progress record.
        let account = accounts::lock_account(uow.conn(), account_id)
            .await?
            .ok_or(Error::AccountNotFound { account_id })?;
        let expected = next_balance(account.balance, points)?;

        let open = match progress::lock_open_progress(uow.conn(), account_id, campaign.campaign_id).await? {
            Some(rec) => rec,
            None => {
                let rec = ProgressRecord::open(
                    account_id,
                    &campaign,
                    self.target_multiplier,
                    self.progress_horizon_days,
                    now,
                );
                progress::insert_progress(uow.conn(), &rec).await?;
                debug!(
                    "opened progress {} for account {} on campaign {} (target {})",
                    rec.progress_record_id, account_id, campaign.campaign_id, rec.target_points
                );
                rec
            }
        };

        let updated = progress::add_scan_points(uow.conn(), open.progress_record_id, points, now)
            .await?
            .ok_or_else(|| {
                Error::Conflict(format!("progress record {} closed during scan", open.progress_record_id))
            })?;

        let balance = accounts::apply_balance_delta(uow.conn(), account_id, points, None, now)
            .await?
            .ok_or_else(|| Error::Conflict(format!("account {} changed during scan", account_id)))?;
        if balance != expected {
            return Err(Error::Conflict(format!(
                "account {} balance moved under lock: expected {}, found {}",
                account_id, expected, balance
            )));
        }

        let scan_event = ScanEvent {
            scan_event_id: Uuid::new_v4(),
            account_id,
            campaign_id: campaign.campaign_id,
            code: campaign.code.clone(),
            progress_record_id: updated.progress_record_id,
            points_awarded: points,
            location: location.map(str::trim).filter(|l| !l.is_empty()).map(String::from),
            created_at: now,
        };
        scan_events::insert_scan_event(uow.conn(), &scan_event).await?;

        let ledger_entry = ledger::append_entry(
            uow.conn(),
            &NewLedgerEntry {
                account_id,
                delta: points,
                reason_code: ReasonCode::Earn,
                reference_id: Some(scan_event.scan_event_id),
                description: Some(format!("Scanned {} - {}", campaign.brand_name, campaign.reward_label)),
                resulting_balance: balance,
                created_at: now,
            },
        )
            .await?;

        let summary = format!(
            "scan '{}' => account {} +{} pts (balance {}, progress {}/{})",
            code, account_id, points, balance, updated.current_points, updated.target_points
        );
        let result = ScanResult {
            points_awarded: points,
            balance,
            progress: updated,
            scan_event,
            ledger_entry,
        };
        Ok(uow.stage(result, summary))
    }

    /// Manual credit outside any campaign. Optionally adds to the account's
    /// advisory accumulated weight.
    pub async fn credit_points(
        &self,
        account_id: Uuid,
        points: i64,
        description: Option<&str>,
        weight: Option<f64>,
    ) -> Result<Staged<LedgerEntry>, Error> {
        ensure_positive_points("points", points)?;
        if let Some(w) = weight {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidInput(format!("weight must be a non-negative number, got {w}")));
            }
        }

        let now = Utc::now();
        let mut uow = self.db.begin("credit_points").await?;

        let account = accounts::lock_account(uow.conn(), account_id)
            .await?
            .ok_or(Error::AccountNotFound { account_id })?;
        let expected = next_balance(account.balance, points)?;

        let balance = accounts::apply_balance_delta(uow.conn(), account_id, points, weight, now)
            .await?
            .ok_or_else(|| Error::Conflict(format!("account {} changed during credit", account_id)))?;
        if balance != expected {
            return Err(Error::Conflict(format!(
                "account {} balance moved under lock: expected {}, found {}",
                account_id, expected, balance
            )));
        }

        let entry = ledger::append_entry(
            uow.conn(),
            &NewLedgerEntry {
                account_id,
                delta: points,
                reason_code: ReasonCode::Adjust,
                reference_id: None,
                description: Some(description.unwrap_or("Points credited").to_string()),
                resulting_balance: balance,
                created_at: now,
            },
        )
            .await?;

        let summary = format!("credit => account {} +{} pts (balance {})", account_id, points, balance);
        Ok(uow.stage(entry, summary))
    }
}
