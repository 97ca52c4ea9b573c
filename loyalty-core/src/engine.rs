// File: loyalty-core/src/engine.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use uuid::Uuid;
use loyalty_common::models::progress::{DEFAULT_PROGRESS_HORIZON_DAYS, DEFAULT_TARGET_MULTIPLIER};
use loyalty_common::models::{
    Account, CampaignDefinition, CatalogItem, DeliveryInfo, LedgerEntry, ProgressView,
    ReconciliationReport, RedemptionRecord, RedemptionResult, RedemptionStatus, ScanHistoryItem,
    ScanResult,
};
use crate::db::{Database, Staged};
use crate::repositories::{
    PostgresAccountRepository, PostgresCampaignRepository, PostgresCatalogRepository,
    PostgresLedgerRepository, PostgresProgressRepository, PostgresRedemptionRepository,
    PostgresScanEventRepository,
};
use crate::services::{AccumulationService, CatalogService, CodeRegistry, LedgerService, RedemptionService};
use crate::{Error, ErrorKind};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Deadline for one operation up to, not including, its COMMIT. On expiry
    /// the in-flight transaction is dropped and rolls back.
    pub operation_timeout: Duration,
    pub target_multiplier: i64,
    pub progress_horizon_days: i64,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.operation_timeout.is_zero() {
            return Err(Error::InvalidInput("operation timeout must be greater than zero".into()));
        }
        if self.target_multiplier < 1 {
            return Err(Error::InvalidInput(format!(
                "target multiplier must be at least 1, got {}",
                self.target_multiplier
            )));
        }
        if self.progress_horizon_days < 1 {
            return Err(Error::InvalidInput(format!(
                "progress horizon must be at least 1 day, got {}",
                self.progress_horizon_days
            )));
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            target_multiplier: DEFAULT_TARGET_MULTIPLIER,
            progress_horizon_days: DEFAULT_PROGRESS_HORIZON_DAYS,
        }
    }
}

/// Entry point for callers: scans, redemptions and account reads.
pub struct LoyaltyEngine {
    settings: EngineSettings,
    registry: CodeRegistry,
    accumulation: AccumulationService,
    redemption: RedemptionService,
    catalog: CatalogService,
    ledger: LedgerService,
}

impl LoyaltyEngine {
    pub fn new(db: Database, settings: EngineSettings) -> Result<Self, Error> {
        settings.validate()?;
        let pool = db.pool().clone();
        let redemption_repo = Arc::new(PostgresRedemptionRepository::new(pool.clone()));

        Ok(Self {
            registry: CodeRegistry::new(Arc::new(PostgresCampaignRepository::new(pool.clone()))),
            accumulation: AccumulationService::new(db.clone(), &settings),
            redemption: RedemptionService::new(db.clone(), redemption_repo.clone()),
            catalog: CatalogService::new(Arc::new(PostgresCatalogRepository::new(pool.clone()))),
            ledger: LedgerService::new(
                Arc::new(PostgresAccountRepository::new(pool.clone())),
                Arc::new(PostgresProgressRepository::new(pool.clone())),
                Arc::new(PostgresLedgerRepository::new(pool.clone())),
                Arc::new(PostgresScanEventRepository::new(pool)),
                redemption_repo,
            ),
            settings,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &CodeRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    // ---- mutations ----

    pub async fn apply_scan(&self, account_id: Uuid, code: &str, location: Option<&str>) -> Result<ScanResult, Error> {
        self.commit_bounded("apply_scan", self.accumulation.apply_scan(account_id, code, location)).await
    }

    pub async fn redeem_progress(&self, account_id: Uuid, progress_record_id: Uuid) -> Result<RedemptionResult, Error> {
        self.commit_bounded("redeem_progress", self.redemption.redeem_progress(account_id, progress_record_id)).await
    }

    pub async fn redeem_catalog_item(
        &self,
        account_id: Uuid,
        item_id: Uuid,
        delivery: DeliveryInfo,
    ) -> Result<RedemptionResult, Error> {
        self.commit_bounded(
            "redeem_catalog_item",
            self.redemption.redeem_catalog_item(account_id, item_id, delivery),
        )
            .await
    }

    pub async fn credit_points(
        &self,
        account_id: Uuid,
        points: i64,
        description: Option<&str>,
        weight: Option<f64>,
    ) -> Result<LedgerEntry, Error> {
        self.commit_bounded(
            "credit_points",
            self.accumulation.credit_points(account_id, points, description, weight),
        )
            .await
    }

    pub async fn advance_redemption(
        &self,
        redemption_id: Uuid,
        status: RedemptionStatus,
    ) -> Result<RedemptionRecord, Error> {
        self.commit_bounded("advance_redemption", self.redemption.advance_redemption(redemption_id, status)).await
    }

    // ---- reads ----

    pub async fn lookup_code(&self, code: &str) -> Result<CampaignDefinition, Error> {
        self.bounded("lookup_code", self.registry.lookup(code)).await
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<Account, Error> {
        self.bounded("get_account", self.ledger.get_account(account_id)).await
    }

    pub async fn get_progress(&self, account_id: Uuid) -> Result<Vec<ProgressView>, Error> {
        self.bounded("get_progress", self.ledger.get_progress(account_id)).await
    }

    pub async fn get_ledger(&self, account_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error> {
        self.bounded("get_ledger", self.ledger.get_ledger(account_id, limit)).await
    }

    pub async fn get_scan_history(&self, account_id: Uuid, limit: Option<i64>) -> Result<Vec<ScanHistoryItem>, Error> {
        self.bounded("get_scan_history", self.ledger.get_scan_history(account_id, limit)).await
    }

    pub async fn get_redemptions(&self, account_id: Uuid, limit: Option<i64>) -> Result<Vec<RedemptionRecord>, Error> {
        self.bounded("get_redemptions", self.ledger.get_redemptions(account_id, limit)).await
    }

    pub async fn list_catalog(&self) -> Result<Vec<CatalogItem>, Error> {
        self.bounded("list_catalog", self.catalog.list_catalog()).await
    }

    pub async fn get_catalog_item(&self, item_id: Uuid) -> Result<CatalogItem, Error> {
        self.bounded("get_catalog_item", self.catalog.get_catalog_item(item_id)).await
    }

    pub async fn reconcile_account(&self, account_id: Uuid) -> Result<ReconciliationReport, Error> {
        self.bounded("reconcile_account", self.ledger.reconcile_account(account_id)).await
    }

    /// Runs `fut` under the operation deadline and logs the failure class.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        let result = match tokio::time::timeout(self.settings.operation_timeout, fut).await {
            Ok(inner) => inner,
            Err(elapsed) => Err(Error::from(elapsed)),
        };
        log_failure(op, &result);
        result
    }

    /// Like `bounded`, but the deadline stops at the staged work. COMMIT runs
    /// unbounded so a timeout always means nothing was written.
    async fn commit_bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<Staged<T>, Error>>,
    {
        let result = match tokio::time::timeout(self.settings.operation_timeout, fut).await {
            Ok(Ok(staged)) => staged.commit().await,
            Ok(Err(e)) => Err(e),
            Err(elapsed) => Err(Error::from(elapsed)),
        };
        log_failure(op, &result);
        result
    }
}

fn log_failure<T>(op: &'static str, result: &Result<T, Error>) {
    if let Err(e) = result {
        match e.kind() {
            ErrorKind::StorageFailure => error!("{} failed: {}", op, e),
            ErrorKind::Conflict => warn!("{} hit a conflict: {}", op, e),
            _ => warn!("{} rejected: {}", op, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(EngineSettings::default().validate().is_ok());
    }

    #[test]
    fn degenerate_settings_are_rejected() {
        let bad = [
            EngineSettings { target_multiplier: 0, ..EngineSettings::default() },
            EngineSettings { target_multiplier: -3, ..EngineSettings::default() },
            EngineSettings { progress_horizon_days: -5, ..EngineSettings::default() },
            EngineSettings { progress_horizon_days: 0, ..EngineSettings::default() },
            EngineSettings { operation_timeout: Duration::ZERO, ..EngineSettings::default() },
        ];
        for settings in bad {
            let err = settings.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{settings:?}");
        }
    }
}
