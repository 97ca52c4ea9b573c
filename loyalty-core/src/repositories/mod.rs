// src/repositories/mod.rs

pub use loyalty_common::traits::repository_traits::{
    AccountRepository, CampaignRepository, CatalogRepository, LedgerRepository,
    ProgressRepository, RedemptionRepository, ScanEventRepository,
};

pub use postgres::accounts::PostgresAccountRepository;
pub use postgres::campaigns::PostgresCampaignRepository;
pub use postgres::catalog::PostgresCatalogRepository;
pub use postgres::ledger::PostgresLedgerRepository;
pub use postgres::progress::PostgresProgressRepository;
pub use postgres::redemptions::PostgresRedemptionRepository;
pub use postgres::scan_events::PostgresScanEventRepository;

pub mod postgres;
