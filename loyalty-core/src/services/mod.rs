// File: src/services/mod.rs

pub mod code_registry;
pub mod accumulation_service;
pub mod redemption_service;
pub mod catalog_service;
pub mod ledger_service;

pub use code_registry::CodeRegistry;
pub use accumulation_service::AccumulationService;
pub use redemption_service::RedemptionService;
pub use catalog_service::CatalogService;
pub use ledger_service::LedgerService;
