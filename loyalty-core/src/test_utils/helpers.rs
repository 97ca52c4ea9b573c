// File: loyalty-core/src/test_utils/helpers.rs

use sqlx::{Connection, PgConnection, Pool, Postgres};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;
use loyalty_common::models::{CampaignDefinition, CatalogItem};
use crate::Error;
use crate::db::Database;
use crate::engine::{EngineSettings, LoyaltyEngine};

/// Create the test database if it does not exist yet.
pub async fn ensure_test_database_exists() -> Result<(), Error> {
    let admin_url = std::env::var("DATABASE_ADMIN_URL")
        .unwrap_or_else(|_| "postgres://loyalty@localhost/postgres".to_string());

    let mut conn = PgConnection::connect(&admin_url).await.map_err(Error::Database)?;

    let test_db = "loyalty_test";
    let create_db_sql = format!("CREATE DATABASE {test_db};");
    match sqlx::query(&create_db_sql).execute(&mut conn).await {
        Ok(_) => {
            println!("Created test DB '{test_db}'.");
        }
        Err(e) => {
            // 42P04 => duplicate_database; 23505 when two test binaries race the create.
            let already_there = e
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .map(|code| code == "42P04" || code == "23505")
                .unwrap_or(false);
            if !already_there {
                return Err(Error::Database(e));
            }
        }
    }

    Ok(())
}

/// Create a connection pool to the test DB.
/// By default looks for `TEST_DATABASE_URL` in env,
/// else uses `postgres://loyalty@localhost/loyalty_test`.
pub async fn create_test_db_pool() -> Result<Pool<Postgres>, Error> {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://loyalty@localhost/loyalty_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await?;

    Ok(pool)
}

/// Returns a migrated test DB handle.
pub async fn setup_test_database() -> Result<Database, Error> {
    ensure_test_database_exists().await?;

    let pool = create_test_db_pool().await?;
    let db = Database::from_pool(pool);
    db.migrate().await?;

    Ok(db)
}

pub async fn setup_test_engine() -> Result<(Database, LoyaltyEngine), Error> {
    let db = setup_test_database().await?;
    let engine = LoyaltyEngine::new(db.clone(), EngineSettings::default())?;
    Ok((db, engine))
}

/// Opens an account and, if `opening_balance > 0`, credits it through the
/// ledger so the account reconciles from the start.
pub async fn seed_account(engine: &LoyaltyEngine, opening_balance: i64) -> Result<Uuid, Error> {
    let account_id = Uuid::new_v4();
    engine.ledger().open_account(account_id).await?;
    if opening_balance > 0 {
        engine
            .credit_points(account_id, opening_balance, Some("opening balance"), None)
            .await?;
    }
    Ok(account_id)
}

/// A fresh campaign with one active code worth `points_value`.
pub async fn seed_campaign_code(engine: &LoyaltyEngine, points_value: i64) -> Result<CampaignDefinition, Error> {
    let campaign = engine.registry().create_campaign("Test Brand", "Free Drink").await?;
    let code = format!("TEST-{}", Uuid::new_v4().simple());
    engine.registry().issue_code(campaign.campaign_id, &code, points_value).await?;
    engine.lookup_code(&code).await
}

pub async fn seed_catalog_item(engine: &LoyaltyEngine, cost_points: i64, stock: i32) -> Result<CatalogItem, Error> {
    engine
        .catalog()
        .create_item("Tumbler", Some("Stainless steel tumbler"), Some("merch"), cost_points, stock)
        .await
}

/// Count rows in `table` for an account; used to assert nothing was written.
pub async fn count_rows_for_account(db: &Database, table: &str, account_id: Uuid) -> Result<i64, Error> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE account_id = $1");
    let n: i64 = sqlx::query_scalar(&sql)
        .bind(account_id)
        .fetch_one(db.pool())
        .await?;
    Ok(n)
}
