// tests/ledger_tests.rs

use std::time::Duration;
use chrono::{TimeZone, Utc};
use uuid::Uuid;
use loyalty_core::{EngineSettings, Error, ErrorKind, LoyaltyEngine};
use loyalty_core::models::{DeliveryInfo, ReasonCode, ScanEvent};
use loyalty_core::repositories::postgres::scan_events::insert_scan_event;
use loyalty_core::test_utils::helpers::*;

#[tokio::test]
async fn mixed_history_reconciles() -> Result<(), Error> {
    let (_db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 100).await?;
    let campaign = seed_campaign_code(&engine, 40).await?;
    let item = seed_catalog_item(&engine, 120, 4).await?;

    engine.apply_scan(account_id, &campaign.code, None).await?;
    engine.apply_scan(account_id, &campaign.code, None).await?;
    engine.redeem_catalog_item(account_id, item.item_id, DeliveryInfo::default()).await?;
    engine.credit_points(account_id, 5, Some("goodwill"), None).await?;

    let report = engine.reconcile_account(account_id).await?;
    assert!(report.is_consistent());
    assert_eq!(report.balance, 65);
    assert_eq!(report.ledger_sum, 65);
    assert_eq!(report.entry_count, 5);

    let entries = engine.get_ledger(account_id, 2).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].reason_code, ReasonCode::Adjust);
    assert_eq!(entries[1].reason_code, ReasonCode::Spend);
    assert_eq!(entries[1].description.as_deref(), Some("Redeemed Tumbler"));
    assert!(entries[0].entry_seq > entries[1].entry_seq);
    Ok(())
}

#[tokio::test]
async fn drift_is_reported_with_the_first_break() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 30).await?;
    engine.credit_points(account_id, 20, None, None).await?;

    // Simulate an out-of-band write that skipped the ledger.
    sqlx::query("UPDATE accounts SET balance = balance + 7 WHERE account_id = $1")
        .bind(account_id)
        .execute(db.pool())
        .await?;

    let report = engine.reconcile_account(account_id).await?;
    assert!(!report.is_consistent());
    assert_eq!(report.balance, 57);
    assert_eq!(report.ledger_sum, 50);
    // The chain itself is intact; only the stored balance drifted.
    assert!(report.first_break.is_none());
    Ok(())
}

#[tokio::test]
async fn ledger_rows_cannot_be_rewritten() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 10).await?;

    let update = sqlx::query("UPDATE ledger_entries SET delta = 1000 WHERE account_id = $1")
        .bind(account_id)
        .execute(db.pool())
        .await
        .map_err(Error::from);
    let err = update.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert!(err.to_string().contains("append-only"));

    let delete = sqlx::query("DELETE FROM ledger_entries WHERE account_id = $1")
        .bind(account_id)
        .execute(db.pool())
        .await
        .map_err(Error::from);
    assert!(matches!(delete.unwrap_err(), Error::Database(_)));

    let entries = engine.get_ledger(account_id, 10).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].delta, 10);
    Ok(())
}

#[tokio::test]
async fn page_limits_are_validated() -> Result<(), Error> {
    let (_db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 0).await?;

    let err = engine.get_ledger(account_id, 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = engine.get_scan_history(account_id, Some(-3)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert!(engine.get_ledger(account_id, 1).await?.is_empty());
    assert!(engine.get_redemptions(account_id, None).await?.is_empty());

    let err = engine.get_ledger(Uuid::new_v4(), 10).await.unwrap_err();
    assert!(matches!(err, Error::AccountNotFound { .. }));
    let err = engine.reconcile_account(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::AccountNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn dropped_unit_of_work_leaves_no_trace() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 40).await?;

    {
        let mut uow = db.begin("abandoned").await?;
        sqlx::query("UPDATE accounts SET balance = 0 WHERE account_id = $1")
            .bind(account_id)
            .execute(uow.conn())
            .await?;
        // Dropped without commit.
    }

    assert_eq!(engine.get_account(account_id).await?.balance, 40);
    assert!(engine.reconcile_account(account_id).await?.is_consistent());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_expiry_rolls_back_a_blocked_operation() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 40).await?;

    let impatient = LoyaltyEngine::new(
        db.clone().with_lock_timeout(Duration::from_secs(30)),
        EngineSettings {
            operation_timeout: Duration::from_millis(300),
            ..EngineSettings::default()
        },
    )?;

    let mut holder = db.begin("lock_holder").await?;
    sqlx::query("SELECT account_id FROM accounts WHERE account_id = $1 FOR UPDATE")
        .bind(account_id)
        .fetch_one(holder.conn())
        .await?;

    let err = impatient.credit_points(account_id, 10, None, None).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(err.is_retryable());

    holder.rollback().await?;

    assert_eq!(engine.get_account(account_id).await?.balance, 40);
    assert_eq!(engine.get_ledger(account_id, 10).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn lock_wait_past_the_limit_is_a_conflict() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 40).await?;

    let short_wait = LoyaltyEngine::new(
        db.clone().with_lock_timeout(Duration::from_millis(100)),
        EngineSettings::default(),
    )?;

    let mut holder = db.begin("lock_holder").await?;
    sqlx::query("SELECT account_id FROM accounts WHERE account_id = $1 FOR UPDATE")
        .bind(account_id)
        .fetch_one(holder.conn())
        .await?;

    let err = short_wait.credit_points(account_id, 10, None, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(!err.is_retryable());

    holder.rollback().await?;
    assert_eq!(engine.get_account(account_id).await?.balance, 40);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_commit_is_not_reported_as_a_timeout() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 0).await?;
    let campaign = seed_campaign_code(&engine, 50).await?;

    // Deferred to COMMIT, and only for scans tagged with this location.
    sqlx::query(
        "CREATE OR REPLACE FUNCTION slow_commit() RETURNS trigger AS $$ \
         BEGIN PERFORM pg_sleep(1); RETURN NULL; END; $$ LANGUAGE plpgsql",
    )
        .execute(db.pool())
        .await?;
    sqlx::query("DROP TRIGGER IF EXISTS scan_events_slow_commit ON scan_events")
        .execute(db.pool())
        .await?;
    sqlx::query(
        "CREATE CONSTRAINT TRIGGER scan_events_slow_commit AFTER INSERT ON scan_events \
         DEFERRABLE INITIALLY DEFERRED FOR EACH ROW \
         WHEN (NEW.location = 'slow-commit') EXECUTE FUNCTION slow_commit()",
    )
        .execute(db.pool())
        .await?;

    let impatient = LoyaltyEngine::new(
        db.clone(),
        EngineSettings {
            operation_timeout: Duration::from_millis(300),
            ..EngineSettings::default()
        },
    )?;

    let result = impatient.apply_scan(account_id, &campaign.code, Some("slow-commit")).await;

    sqlx::query("DROP TRIGGER IF EXISTS scan_events_slow_commit ON scan_events")
        .execute(db.pool())
        .await?;

    let scan = result?;
    assert_eq!(scan.balance, 50);
    assert_eq!(engine.get_account(account_id).await?.balance, 50);
    assert!(engine.reconcile_account(account_id).await?.is_consistent());
    Ok(())
}

#[tokio::test]
async fn scan_history_breaks_timestamp_ties_by_id() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let account_id = seed_account(&engine, 0).await?;
    let campaign = seed_campaign_code(&engine, 10).await?;
    let first = engine.apply_scan(account_id, &campaign.code, None).await?;

    // Two rows sharing one timestamp, newer than anything the engine wrote.
    let stamp = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).single().expect("valid timestamp");
    let mut ids = vec![Uuid::new_v4(), Uuid::new_v4()];
    let mut uow = db.begin("tied_scans").await?;
    for id in &ids {
        let ev = ScanEvent {
            scan_event_id: *id,
            created_at: stamp,
            ..first.scan_event.clone()
        };
        insert_scan_event(uow.conn(), &ev).await?;
    }
    uow.commit().await?;

    ids.sort();
    ids.reverse();
    for _ in 0..3 {
        let scans = engine.get_scan_history(account_id, Some(2)).await?;
        let got: Vec<Uuid> = scans.iter().map(|s| s.event.scan_event_id).collect();
        assert_eq!(got, ids);
    }
    Ok(())
}

#[tokio::test]
async fn engine_refuses_degenerate_settings() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let bad = [
        EngineSettings { target_multiplier: 0, ..EngineSettings::default() },
        EngineSettings { progress_horizon_days: -1, ..EngineSettings::default() },
        EngineSettings { operation_timeout: Duration::ZERO, ..EngineSettings::default() },
    ];
    for settings in bad {
        let err = LoyaltyEngine::new(db.clone(), settings).err().expect("settings rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
    Ok(())
}
