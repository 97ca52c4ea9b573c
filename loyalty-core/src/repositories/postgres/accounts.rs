// File: loyalty-core/src/repositories/postgres/accounts.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;
use loyalty_common::models::Account;
use loyalty_common::traits::repository_traits::AccountRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: Pool<Postgres>,
}

impl PostgresAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create_account(&self, account_id: Uuid) -> Result<Account, Error> {
        let now = Utc::now();
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (account_id, balance, total_accumulated_weight, created_at, updated_at)
            VALUES ($1, 0, NULL, $2, $2)
            RETURNING *
            "#,
        )
            .bind(account_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(account)
    }

    async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, Error> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT *
            FROM accounts
            WHERE account_id = $1
            "#,
        )
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }
}

/// Row-locks the account for the rest of the transaction.
pub async fn lock_account(conn: &mut PgConnection, account_id: Uuid) -> Result<Option<Account>, Error> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT *
        FROM accounts
        WHERE account_id = $1
        FOR UPDATE
        "#,
    )
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(account)
}

/// Adds `delta` to the balance and optionally `weight` to the accumulated
/// weight. Returns the new balance, or `None` when the row is gone or the
/// result would go negative.
pub async fn apply_balance_delta(
    conn: &mut PgConnection,
    account_id: Uuid,
    delta: i64,
    weight: Option<f64>,
    now: DateTime<Utc>,
) -> Result<Option<i64>, Error> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE accounts
        SET balance = balance + $2,
            total_accumulated_weight = CASE
                WHEN $3::DOUBLE PRECISION IS NULL THEN total_accumulated_weight
                ELSE COALESCE(total_accumulated_weight, 0) + $3::DOUBLE PRECISION
            END,
            updated_at = $4
        WHERE account_id = $1
          AND balance + $2 >= 0
        RETURNING balance
        "#,
    )
        .bind(account_id)
        .bind(delta)
        .bind(weight)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(balance)
}
