// File: loyalty-core/src/repositories/postgres/ledger.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;
use loyalty_common::models::{LedgerEntry, LedgerSnapshot, ReasonCode};
use loyalty_common::traits::repository_traits::LedgerRepository;
use crate::Error;

/// An entry about to be appended; `entry_seq` comes back from the insert.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub account_id: Uuid,
    pub delta: i64,
    pub reason_code: ReasonCode,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub resulting_balance: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PostgresLedgerRepository {
    pool: Pool<Postgres>,
}

impl PostgresLedgerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn list_recent_entries(&self, account_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT *
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY entry_seq DESC
            LIMIT $2
            "#,
        )
            .bind(account_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn load_snapshot(&self, account_id: Uuid) -> Result<Option<LedgerSnapshot>, Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let balance: Option<i64> = sqlx::query_scalar("SELECT balance FROM accounts WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(balance) = balance else {
            tx.rollback().await?;
            return Ok(None);
        };

        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT *
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY entry_seq ASC
            "#,
        )
            .bind(account_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(LedgerSnapshot { account_id, balance, entries }))
    }
}

pub async fn append_entry(conn: &mut PgConnection, entry: &NewLedgerEntry) -> Result<LedgerEntry, Error> {
    let row = sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO ledger_entries (
            entry_id, account_id, delta, reason_code,
            reference_id, description, resulting_balance, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
        .bind(Uuid::new_v4())
        .bind(entry.account_id)
        .bind(entry.delta)
        .bind(entry.reason_code)
        .bind(entry.reference_id)
        .bind(&entry.description)
        .bind(entry.resulting_balance)
        .bind(entry.created_at)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}
