// File: loyalty-core/src/services/ledger_service.rs

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;
use loyalty_common::models::{
    Account, LedgerEntry, ProgressView, ReconciliationReport, RedemptionRecord, ScanHistoryItem,
};
use loyalty_common::traits::repository_traits::{
    AccountRepository, LedgerRepository, ProgressRepository, RedemptionRepository, ScanEventRepository,
};
use crate::Error;
use crate::invariants::{ensure_page_limit, replay_ledger};

/// Page size used when a caller does not ask for one.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Account-scoped reads and the balance/ledger reconciliation check.
pub struct LedgerService {
    account_repo: Arc<dyn AccountRepository + Send + Sync>,
    progress_repo: Arc<dyn ProgressRepository + Send + Sync>,
    ledger_repo: Arc<dyn LedgerRepository + Send + Sync>,
    scan_repo: Arc<dyn ScanEventRepository + Send + Sync>,
    redemption_repo: Arc<dyn RedemptionRepository + Send + Sync>,
}

impl LedgerService {
    pub fn new(
        account_repo: Arc<dyn AccountRepository + Send + Sync>,
        progress_repo: Arc<dyn ProgressRepository + Send + Sync>,
        ledger_repo: Arc<dyn LedgerRepository + Send + Sync>,
        scan_repo: Arc<dyn ScanEventRepository + Send + Sync>,
        redemption_repo: Arc<dyn RedemptionRepository + Send + Sync>,
    ) -> Self {
        Self {
            account_repo,
            progress_repo,
            ledger_repo,
            scan_repo,
            redemption_repo,
        }
    }

    /// Registers a zero-balance account for a newly signed-up user.
    pub async fn open_account(&self, account_id: Uuid) -> Result<Account, Error> {
        let account = self.account_repo.create_account(account_id).await?;
        info!("account {} opened", account_id);
        Ok(account)
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<Account, Error> {
        self.account_repo
            .get_account(account_id)
            .await?
            .ok_or(Error::AccountNotFound { account_id })
    }

    /// Open progress records, closest to completion first.
    pub async fn get_progress(&self, account_id: Uuid) -> Result<Vec<ProgressView>, Error> {
        self.get_account(account_id).await?;
        let now = Utc::now();
        let mut views: Vec<ProgressView> = self.progress_repo
            .list_open_progress(account_id)
            .await?
            .into_iter()
            .map(|rec| ProgressView::new(rec, now))
            .collect();
        views.sort_by(ProgressView::display_order);
        debug!("get_progress => account {} has {} open records", account_id, views.len());
        Ok(views)
    }

    /// Newest entries first.
    pub async fn get_ledger(&self, account_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error> {
        let limit = ensure_page_limit(limit)?;
        self.get_account(account_id).await?;
        self.ledger_repo.list_recent_entries(account_id, limit).await
    }

    pub async fn get_scan_history(
        &self,
        account_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<ScanHistoryItem>, Error> {
        let limit = ensure_page_limit(limit.unwrap_or(DEFAULT_HISTORY_LIMIT))?;
        self.get_account(account_id).await?;
        self.scan_repo.list_scans_for_account(account_id, limit).await
    }

    pub async fn get_redemptions(
        &self,
        account_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<RedemptionRecord>, Error> {
        let limit = ensure_page_limit(limit.unwrap_or(DEFAULT_HISTORY_LIMIT))?;
        self.get_account(account_id).await?;
        self.redemption_repo.list_redemptions_for_account(account_id, limit).await
    }

    /// Replays the account's ledger and compares it with the stored balance.
    pub async fn reconcile_account(&self, account_id: Uuid) -> Result<ReconciliationReport, Error> {
        let snapshot = self.ledger_repo
            .load_snapshot(account_id)
            .await?
            .ok_or(Error::AccountNotFound { account_id })?;

        let report = replay_ledger(account_id, snapshot.balance, &snapshot.entries);
        if report.is_consistent() {
            debug!(
                "reconcile => account {} consistent ({} entries, balance {})",
                account_id, report.entry_count, report.balance
            );
        } else {
            error!(
                "reconcile => account {} INCONSISTENT: balance {}, ledger sum {}, first break {:?}",
                account_id, report.balance, report.ledger_sum, report.first_break
            );
        }
        Ok(report)
    }
}
