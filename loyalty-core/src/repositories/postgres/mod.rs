// src/repositories/postgres/mod.rs
//
// Each module pairs a pool-level repository (reads and admin writes) with the
// `&mut PgConnection` functions the engines call inside a unit of work.

pub mod accounts;
pub mod campaigns;
pub mod progress;
pub mod scan_events;
pub mod catalog;
pub mod redemptions;
pub mod ledger;
