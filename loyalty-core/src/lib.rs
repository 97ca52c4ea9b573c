// src/lib.rs

pub mod db;
pub mod invariants;
pub mod repositories;
pub mod services;
pub mod engine;
pub mod test_utils;

pub use db::{Database, DatabaseSettings, Staged, UnitOfWork};
pub use engine::{EngineSettings, LoyaltyEngine};
pub use loyalty_common::error::{Error, ErrorKind};
pub use loyalty_common::models;
