// File: loyalty-core/src/services/redemption_service.rs

use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;
use loyalty_common::models::{
    DeliveryInfo, ReasonCode, RedemptionRecord, RedemptionResult, RedemptionStatus,
};
use loyalty_common::traits::repository_traits::RedemptionRepository;
use crate::db::{Database, Staged};
use crate::invariants::{check_balance_covers, check_in_stock, check_progress_complete, next_balance};
use crate::repositories::postgres::{accounts, catalog, ledger, progress, redemptions};
use crate::repositories::postgres::ledger::NewLedgerEntry;
use crate::Error;

/// Turns points into rewards.
///
/// Progress redemptions claim a campaign prize and leave the spendable
/// balance alone. Catalog redemptions spend the balance and take stock.
pub struct RedemptionService {
    db: Database,
    redemption_repo: Arc<dyn RedemptionRepository + Send + Sync>,
}

impl RedemptionService {
    pub fn new(db: Database, redemption_repo: Arc<dyn RedemptionRepository + Send + Sync>) -> Self {
        Self { db, redemption_repo }
    }

    pub async fn redeem_progress(
        &self,
        account_id: Uuid,
        progress_record_id: Uuid,
    ) -> Result<Staged<RedemptionResult>, Error> {
        let now = Utc::now();
        let mut uow = self.db.begin("redeem_progress").await?;

        // Lock order: account, then progress record.
        let account = accounts::lock_account(uow.conn(), account_id)
            .await?
            .ok_or(Error::AccountNotFound { account_id })?;

        let rec = progress::lock_owned_open_progress(uow.conn(), progress_record_id, account_id)
            .await?
            .ok_or(Error::ProgressNotFound { progress_record_id })?;

        check_progress_complete(&rec)?;

        let redeemed = progress::mark_redeemed(uow.conn(), progress_record_id, now)
            .await?
            .ok_or_else(|| {
                Error::Conflict(format!("progress record {} changed before redemption", progress_record_id))
            })?;

        let redemption = RedemptionRecord {
            redemption_id: Uuid::new_v4(),
            account_id,
            catalog_item_id: None,
            progress_record_id: Some(progress_record_id),
            points_charged: redeemed.target_points,
            status: RedemptionStatus::Completed,
            delivery_address: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        redemptions::insert_redemption(uow.conn(), &redemption).await?;

        let summary = format!(
            "progress {} redeemed by account {} ('{}', {}/{} pts)",
            progress_record_id, account_id, redeemed.reward_label,
            redeemed.current_points, redeemed.target_points
        );
        let result = RedemptionResult {
            redemption,
            balance: account.balance,
            ledger_entry: None,
            remaining_stock: None,
            progress: Some(redeemed),
        };
        Ok(uow.stage(result, summary))
    }

    pub async fn redeem_catalog_item(
        &self,
        account_id: Uuid,
        item_id: Uuid,
        delivery: DeliveryInfo,
    ) -> Result<Staged<RedemptionResult>, Error> {
        let now = Utc::now();
        let mut uow = self.db.begin("redeem_catalog_item").await?;

        // Lock order: account, then catalog item.
        let account = accounts::lock_account(uow.conn(), account_id)
            .await?
            .ok_or(Error::AccountNotFound { account_id })?;

        let item = catalog::lock_active_item(uow.conn(), item_id)
            .await?
            .ok_or(Error::ItemNotFound { item_id })?;

        check_balance_covers(account.balance, item.cost_points)?;
        check_in_stock(&item)?;
        let expected = next_balance(account.balance, -item.cost_points)?;

        let balance = accounts::apply_balance_delta(uow.conn(), account_id, -item.cost_points, None, now)
            .await?
            .ok_or_else(|| Error::Conflict(format!("account {} balance changed before redemption", account_id)))?;
        if balance != expected {
            return Err(Error::Conflict(format!(
                "account {} balance moved under lock: expected {}, found {}",
                account_id, expected, balance
            )));
        }

        let remaining_stock = catalog::take_one_unit(uow.conn(), item_id, now)
            .await?
            .ok_or_else(|| Error::Conflict(format!("item {} stock changed before redemption", item_id)))?;

        let redemption = RedemptionRecord {
            redemption_id: Uuid::new_v4(),
            account_id,
            catalog_item_id: Some(item_id),
            progress_record_id: None,
            points_charged: item.cost_points,
            status: RedemptionStatus::Pending,
            delivery_address: delivery.delivery_address,
            notes: delivery.notes,
            created_at: now,
            updated_at: now,
        };
        redemptions::insert_redemption(uow.conn(), &redemption).await?;

        let ledger_entry = ledger::append_entry(
            uow.conn(),
            &NewLedgerEntry {
                account_id,
                delta: -item.cost_points,
                reason_code: ReasonCode::Spend,
                reference_id: Some(redemption.redemption_id),
                description: Some(format!("Redeemed {}", item.name)),
                resulting_balance: balance,
                created_at: now,
            },
        )
            .await?;

        let summary = format!(
            "catalog redemption {} => account {} -{} pts for '{}' (balance {}, stock left {})",
            redemption.redemption_id, account_id, item.cost_points, item.name, balance, remaining_stock
        );
        let result = RedemptionResult {
            redemption,
            balance,
            ledger_entry: Some(ledger_entry),
            remaining_stock: Some(remaining_stock),
            progress: None,
        };
        Ok(uow.stage(result, summary))
    }

    /// Records the fulfilment outcome of a pending redemption.
    pub async fn advance_redemption(
        &self,
        redemption_id: Uuid,
        status: RedemptionStatus,
    ) -> Result<Staged<RedemptionRecord>, Error> {
        if !status.is_terminal() {
            return Err(Error::InvalidInput(format!("cannot move a redemption to '{}'", status)));
        }

        let mut uow = self.db.begin("advance_redemption").await?;
        if let Some(rec) = redemptions::advance_status(uow.conn(), redemption_id, status, Utc::now()).await? {
            return Ok(uow.stage(rec, format!("redemption {} => {}", redemption_id, status)));
        }
        uow.rollback().await?;

        match self.redemption_repo.get_redemption_by_id(redemption_id).await? {
            Some(existing) => Err(Error::Conflict(format!(
                "redemption {} is already {}",
                redemption_id, existing.status
            ))),
            None => Err(Error::RedemptionNotFound { redemption_id }),
        }
    }
}
