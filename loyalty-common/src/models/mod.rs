// File: loyalty-common/src/models/mod.rs
pub mod account;
pub mod campaign;
pub mod progress;
pub mod scan;
pub mod catalog;
pub mod redemption;
pub mod ledger;

pub use account::Account;
pub use campaign::{Campaign, CampaignCode, CampaignDefinition};
pub use progress::{ProgressRecord, ProgressView};
pub use scan::{ScanEvent, ScanHistoryItem, ScanResult};
pub use catalog::CatalogItem;
pub use redemption::{DeliveryInfo, RedemptionRecord, RedemptionResult, RedemptionStatus};
pub use ledger::{LedgerBreak, LedgerEntry, LedgerSnapshot, ReasonCode, ReconciliationReport};
