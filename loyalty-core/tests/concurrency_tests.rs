// tests/concurrency_tests.rs

use std::sync::Arc;
use futures_util::future::join_all;
use loyalty_core::{Error, ErrorKind};
use loyalty_core::models::DeliveryInfo;
use loyalty_core::test_utils::helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_unit_goes_to_exactly_one_caller() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let engine = Arc::new(engine);
    let item = seed_catalog_item(&engine, 100, 1).await?;

    let mut accounts = Vec::new();
    for _ in 0..8 {
        accounts.push(seed_account(&engine, 100).await?);
    }

    let handles = accounts.iter().copied().map(|account_id| {
        let engine = engine.clone();
        let item_id = item.item_id;
        tokio::spawn(async move {
            engine.redeem_catalog_item(account_id, item_id, DeliveryInfo::default()).await
        })
    });

    let mut wins = 0;
    let mut sold_out = 0;
    for joined in join_all(handles).await {
        match joined.expect("task panicked") {
            Ok(result) => {
                wins += 1;
                assert_eq!(result.remaining_stock, Some(0));
                assert_eq!(result.balance, 0);
            }
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::OutOfStock, "unexpected failure: {e}");
                sold_out += 1;
            }
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(sold_out, 7);
    assert_eq!(engine.get_catalog_item(item.item_id).await?.stock, 0);

    let mut charged = 0;
    for account_id in &accounts {
        let balance = engine.get_account(*account_id).await?.balance;
        if balance == 0 {
            charged += 1;
            assert_eq!(count_rows_for_account(&db, "redemption_records", *account_id).await?, 1);
        } else {
            assert_eq!(balance, 100);
            assert_eq!(count_rows_for_account(&db, "redemption_records", *account_id).await?, 0);
        }
        assert!(engine.reconcile_account(*account_id).await?.is_consistent());
    }
    assert_eq!(charged, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_account_redemptions_never_overdraw() -> Result<(), Error> {
    let (_db, engine) = setup_test_engine().await?;
    let engine = Arc::new(engine);
    let account_id = seed_account(&engine, 250).await?;
    let item = seed_catalog_item(&engine, 100, 10).await?;

    let handles = (0..6).map(|_| {
        let engine = engine.clone();
        let item_id = item.item_id;
        tokio::spawn(async move {
            engine.redeem_catalog_item(account_id, item_id, DeliveryInfo::default()).await
        })
    });

    let mut wins = 0;
    for joined in join_all(handles).await {
        match joined.expect("task panicked") {
            Ok(_) => wins += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::InsufficientPoints, "unexpected failure: {e}"),
        }
    }

    assert_eq!(wins, 2);
    assert_eq!(engine.get_account(account_id).await?.balance, 50);
    assert_eq!(engine.get_catalog_item(item.item_id).await?.stock, 8);
    assert!(engine.reconcile_account(account_id).await?.is_consistent());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_keep_one_record_and_a_clean_chain() -> Result<(), Error> {
    let (db, engine) = setup_test_engine().await?;
    let engine = Arc::new(engine);
    let account_id = seed_account(&engine, 0).await?;
    let campaign = seed_campaign_code(&engine, 15).await?;

    let handles = (0..10).map(|_| {
        let engine = engine.clone();
        let code = campaign.code.clone();
        tokio::spawn(async move { engine.apply_scan(account_id, &code, None).await })
    });
    for joined in join_all(handles).await {
        joined.expect("task panicked")?;
    }

    assert_eq!(engine.get_account(account_id).await?.balance, 150);
    assert_eq!(count_rows_for_account(&db, "scan_events", account_id).await?, 10);

    let progress = engine.get_progress(account_id).await?;
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0].record.current_points, 150);
    assert_eq!(progress[0].record.scan_count, 10);

    let mut entries = engine.get_ledger(account_id, 20).await?;
    entries.reverse();
    let running: Vec<i64> = entries.iter().map(|e| e.resulting_balance).collect();
    let expected: Vec<i64> = (1..=10).map(|n| n * 15).collect();
    assert_eq!(running, expected);

    let report = engine.reconcile_account(account_id).await?;
    assert!(report.is_consistent());
    assert_eq!(report.entry_count, 10);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scans_and_spends_interleave_without_drift() -> Result<(), Error> {
    let (_db, engine) = setup_test_engine().await?;
    let engine = Arc::new(engine);
    let account_id = seed_account(&engine, 500).await?;
    let campaign = seed_campaign_code(&engine, 20).await?;
    let item = seed_catalog_item(&engine, 50, 100).await?;

    let mut handles = Vec::new();
    for i in 0..12 {
        let engine = engine.clone();
        let code = campaign.code.clone();
        let item_id = item.item_id;
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.apply_scan(account_id, &code, None).await.map(|_| ())
            } else {
                engine
                    .redeem_catalog_item(account_id, item_id, DeliveryInfo::default())
                    .await
                    .map(|_| ())
            }
        }));
    }
    for joined in join_all(handles).await {
        joined.expect("task panicked")?;
    }

    // 500 + 6 * 20 - 6 * 50
    assert_eq!(engine.get_account(account_id).await?.balance, 320);
    assert_eq!(engine.get_catalog_item(item.item_id).await?.stock, 94);
    assert!(engine.reconcile_account(account_id).await?.is_consistent());
    Ok(())
}
