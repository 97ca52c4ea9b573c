use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Error;
use crate::models::{
    Account, Campaign, CampaignCode, CampaignDefinition, CatalogItem, LedgerEntry, LedgerSnapshot,
    ProgressRecord, RedemptionRecord, ScanHistoryItem,
};

// Pool-level access. Anything that moves a balance, a progress counter or
// stock goes through the engines' transactional paths instead.

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create_account(&self, account_id: Uuid) -> Result<Account, Error>;
    async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, Error>;
}

#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), Error>;
    async fn issue_code(&self, code: &CampaignCode) -> Result<(), Error>;
    async fn set_code_active(&self, code: &str, active: bool) -> Result<bool, Error>;
    /// Returns the definition whether or not the code is active.
    async fn get_definition(&self, code: &str) -> Result<Option<CampaignDefinition>, Error>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn list_open_progress(&self, account_id: Uuid) -> Result<Vec<ProgressRecord>, Error>;
}

#[async_trait]
pub trait ScanEventRepository: Send + Sync {
    async fn list_scans_for_account(&self, account_id: Uuid, limit: i64) -> Result<Vec<ScanHistoryItem>, Error>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_item(&self, item: &CatalogItem) -> Result<(), Error>;
    async fn get_item_by_id(&self, item_id: Uuid) -> Result<Option<CatalogItem>, Error>;
    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, Error>;
    async fn restock(&self, item_id: Uuid, quantity: i32) -> Result<Option<CatalogItem>, Error>;
    async fn set_item_active(&self, item_id: Uuid, active: bool) -> Result<bool, Error>;
}

#[async_trait]
pub trait RedemptionRepository: Send + Sync {
    async fn get_redemption_by_id(&self, redemption_id: Uuid) -> Result<Option<RedemptionRecord>, Error>;
    async fn list_redemptions_for_account(&self, account_id: Uuid, limit: i64) -> Result<Vec<RedemptionRecord>, Error>;
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Newest first.
    async fn list_recent_entries(&self, account_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error>;
    /// Balance and every entry (in `entry_seq` order) read from one snapshot.
    async fn load_snapshot(&self, account_id: Uuid) -> Result<Option<LedgerSnapshot>, Error>;
}
