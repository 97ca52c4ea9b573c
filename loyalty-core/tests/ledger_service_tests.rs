// tests/ledger_service_tests.rs
//
// LedgerService against mocked repositories; no database needed.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use mockall::mock;
use mockall::predicate::eq;
use uuid::Uuid;
use loyalty_common::models::{
    Account, LedgerEntry, LedgerSnapshot, ProgressRecord, ReasonCode, RedemptionRecord,
    ScanHistoryItem,
};
use loyalty_common::traits::repository_traits::{
    AccountRepository, LedgerRepository, ProgressRepository, RedemptionRepository, ScanEventRepository,
};
use loyalty_core::services::LedgerService;
use loyalty_core::{Error, ErrorKind};

mock! {
    AccountRepo {}
    #[async_trait]
    impl AccountRepository for AccountRepo {
        async fn create_account(&self, account_id: Uuid) -> Result<Account, Error>;
        async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, Error>;
    }
}

mock! {
    ProgressRepo {}
    #[async_trait]
    impl ProgressRepository for ProgressRepo {
        async fn list_open_progress(&self, account_id: Uuid) -> Result<Vec<ProgressRecord>, Error>;
    }
}

mock! {
    LedgerRepo {}
    #[async_trait]
    impl LedgerRepository for LedgerRepo {
        async fn list_recent_entries(&self, account_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error>;
        async fn load_snapshot(&self, account_id: Uuid) -> Result<Option<LedgerSnapshot>, Error>;
    }
}

mock! {
    ScanRepo {}
    #[async_trait]
    impl ScanEventRepository for ScanRepo {
        async fn list_scans_for_account(&self, account_id: Uuid, limit: i64) -> Result<Vec<ScanHistoryItem>, Error>;
    }
}

mock! {
    RedemptionRepo {}
    #[async_trait]
    impl RedemptionRepository for RedemptionRepo {
        async fn get_redemption_by_id(&self, redemption_id: Uuid) -> Result<Option<RedemptionRecord>, Error>;
        async fn list_redemptions_for_account(&self, account_id: Uuid, limit: i64) -> Result<Vec<RedemptionRecord>, Error>;
    }
}

struct Mocks {
    accounts: MockAccountRepo,
    progress: MockProgressRepo,
    ledger: MockLedgerRepo,
    scans: MockScanRepo,
    redemptions: MockRedemptionRepo,
}

impl Mocks {
    fn new() -> Self {
        Self {
            accounts: MockAccountRepo::new(),
            progress: MockProgressRepo::new(),
            ledger: MockLedgerRepo::new(),
            scans: MockScanRepo::new(),
            redemptions: MockRedemptionRepo::new(),
        }
    }

    fn into_service(self) -> LedgerService {
        LedgerService::new(
            Arc::new(self.accounts),
            Arc::new(self.progress),
            Arc::new(self.ledger),
            Arc::new(self.scans),
            Arc::new(self.redemptions),
        )
    }
}

fn account(account_id: Uuid, balance: i64) -> Account {
    let now = Utc::now();
    Account {
        account_id,
        balance,
        total_accumulated_weight: None,
        created_at: now,
        updated_at: now,
    }
}

fn entry(account_id: Uuid, seq: i64, delta: i64, resulting_balance: i64) -> LedgerEntry {
    LedgerEntry {
        entry_seq: seq,
        entry_id: Uuid::new_v4(),
        account_id,
        delta,
        reason_code: if delta > 0 { ReasonCode::Earn } else { ReasonCode::Spend },
        reference_id: Some(Uuid::new_v4()),
        description: None,
        resulting_balance,
        created_at: Utc::now(),
    }
}

fn progress(account_id: Uuid, current: i64, target: i64, age_days: i64) -> ProgressRecord {
    let created = Utc::now() - Duration::days(age_days);
    ProgressRecord {
        progress_record_id: Uuid::new_v4(),
        account_id,
        campaign_id: Uuid::new_v4(),
        brand_name: "Aqua".to_string(),
        reward_label: "Free Bottle".to_string(),
        current_points: current,
        target_points: target,
        scan_count: 1,
        created_at: created,
        updated_at: created,
        last_scanned_at: Some(created),
        expires_at: created + Duration::days(30),
        redeemed: false,
        redeemed_at: None,
    }
}

#[tokio::test]
async fn reconcile_flags_balance_drift() -> Result<(), Error> {
    let account_id = Uuid::new_v4();
    let mut mocks = Mocks::new();
    mocks
        .ledger
        .expect_load_snapshot()
        .with(eq(account_id))
        .times(1)
        .returning(move |id| {
            Ok(Some(LedgerSnapshot {
                account_id: id,
                balance: 120,
                entries: vec![entry(id, 1, 100, 100), entry(id, 2, -30, 70)],
            }))
        });

    let report = mocks.into_service().reconcile_account(account_id).await?;
    assert!(!report.is_consistent());
    assert_eq!(report.ledger_sum, 70);
    assert_eq!(report.balance, 120);
    assert_eq!(report.entry_count, 2);
    assert!(report.first_break.is_none());
    Ok(())
}

#[tokio::test]
async fn reconcile_points_at_a_broken_chain() -> Result<(), Error> {
    let account_id = Uuid::new_v4();
    let mut mocks = Mocks::new();
    mocks.ledger.expect_load_snapshot().returning(move |id| {
        Ok(Some(LedgerSnapshot {
            account_id: id,
            balance: 60,
            entries: vec![entry(id, 1, 50, 50), entry(id, 2, 10, 65), entry(id, 3, -5, 60)],
        }))
    });

    let report = mocks.into_service().reconcile_account(account_id).await?;
    assert_eq!(report.balance, 60);
    assert_eq!(report.ledger_sum, 55);
    let brk = report.first_break.expect("second entry is off");
    assert_eq!(brk.entry_seq, 2);
    assert_eq!(brk.expected_balance, 60);
    assert_eq!(brk.recorded_balance, 65);
    Ok(())
}

#[tokio::test]
async fn reconcile_unknown_account_is_not_found() {
    let mut mocks = Mocks::new();
    mocks.ledger.expect_load_snapshot().returning(|_| Ok(None));

    let err = mocks.into_service().reconcile_account(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::AccountNotFound { .. }));
}

#[tokio::test]
async fn progress_is_listed_closest_to_completion_first() -> Result<(), Error> {
    let account_id = Uuid::new_v4();
    let mut mocks = Mocks::new();
    mocks
        .accounts
        .expect_get_account()
        .returning(move |id| Ok(Some(account(id, 0))));
    mocks.progress.expect_list_open_progress().returning(move |id| {
        Ok(vec![
            progress(id, 100, 500, 1),
            progress(id, 450, 500, 5),
            progress(id, 200, 500, 3),
        ])
    });

    let views = mocks.into_service().get_progress(account_id).await?;
    let current: Vec<i64> = views.iter().map(|v| v.record.current_points).collect();
    assert_eq!(current, vec![450, 200, 100]);
    assert_eq!(views[0].points_needed, 50);
    assert!(views[0].days_left <= 25);
    Ok(())
}

#[tokio::test]
async fn progress_for_unknown_account_is_not_found() {
    let mut mocks = Mocks::new();
    mocks.accounts.expect_get_account().returning(|_| Ok(None));
    mocks.progress.expect_list_open_progress().never();

    let err = mocks.into_service().get_progress(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::AccountNotFound { .. }));
}

#[tokio::test]
async fn history_limits_are_checked_before_any_query() {
    let mut mocks = Mocks::new();
    mocks.accounts.expect_get_account().never();
    mocks.ledger.expect_list_recent_entries().never();
    mocks.scans.expect_list_scans_for_account().never();
    let service = mocks.into_service();

    let err = service.get_ledger(Uuid::new_v4(), 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = service.get_scan_history(Uuid::new_v4(), Some(-1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn scan_history_uses_the_default_page() -> Result<(), Error> {
    let account_id = Uuid::new_v4();
    let mut mocks = Mocks::new();
    mocks
        .accounts
        .expect_get_account()
        .returning(move |id| Ok(Some(account(id, 0))));
    mocks
        .scans
        .expect_list_scans_for_account()
        .with(eq(account_id), eq(50))
        .times(1)
        .returning(|_, _| Ok(Vec::new()));
    mocks
        .redemptions
        .expect_list_redemptions_for_account()
        .with(eq(account_id), eq(5))
        .times(1)
        .returning(|_, _| Ok(Vec::new()));

    let service = mocks.into_service();
    assert!(service.get_scan_history(account_id, None).await?.is_empty());
    assert!(service.get_redemptions(account_id, Some(5)).await?.is_empty());
    Ok(())
}
