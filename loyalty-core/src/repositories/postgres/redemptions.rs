// File: loyalty-core/src/repositories/postgres/redemptions.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;
use loyalty_common::models::{RedemptionRecord, RedemptionStatus};
use loyalty_common::traits::repository_traits::RedemptionRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresRedemptionRepository {
    pool: Pool<Postgres>,
}

impl PostgresRedemptionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RedemptionRepository for PostgresRedemptionRepository {
    async fn get_redemption_by_id(&self, redemption_id: Uuid) -> Result<Option<RedemptionRecord>, Error> {
        let rec = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            SELECT *
            FROM redemption_records
            WHERE redemption_id = $1
            "#,
        )
            .bind(redemption_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec)
    }

    async fn list_redemptions_for_account(&self, account_id: Uuid, limit: i64) -> Result<Vec<RedemptionRecord>, Error> {
        let rows = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            SELECT *
            FROM redemption_records
            WHERE account_id = $1
            ORDER BY created_at DESC, redemption_id DESC
            LIMIT $2
            "#,
        )
            .bind(account_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

pub async fn insert_redemption(conn: &mut PgConnection, rec: &RedemptionRecord) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO redemption_records (
            redemption_id,
            account_id,
            catalog_item_id,
            progress_record_id,
            points_charged,
            status,
            delivery_address,
            notes,
            created_at,
            updated_at
        )
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        "#,
    )
        .bind(rec.redemption_id)
        .bind(rec.account_id)
        .bind(rec.catalog_item_id)
        .bind(rec.progress_record_id)
        .bind(rec.points_charged)
        .bind(rec.status)
        .bind(&rec.delivery_address)
        .bind(&rec.notes)
        .bind(rec.created_at)
        .bind(rec.updated_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Moves a pending record to `status`. `None` when the record is missing or
/// no longer pending.
pub async fn advance_status(
    conn: &mut PgConnection,
    redemption_id: Uuid,
    status: RedemptionStatus,
    now: DateTime<Utc>,
) -> Result<Option<RedemptionRecord>, Error> {
    let rec = sqlx::query_as::<_, RedemptionRecord>(
        r#"
        UPDATE redemption_records
        SET status = $2,
            updated_at = $3
        WHERE redemption_id = $1
          AND status = 'pending'
        RETURNING *
        "#,
    )
        .bind(redemption_id)
        .bind(status)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(rec)
}
