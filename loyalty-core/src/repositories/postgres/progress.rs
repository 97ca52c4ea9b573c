// File: loyalty-core/src/repositories/postgres/progress.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;
use loyalty_common::models::ProgressRecord;
use loyalty_common::traits::repository_traits::ProgressRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresProgressRepository {
    pool: Pool<Postgres>,
}

impl PostgresProgressRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressRepository for PostgresProgressRepository {
    async fn list_open_progress(&self, account_id: Uuid) -> Result<Vec<ProgressRecord>, Error> {
        let rows = sqlx::query_as::<_, ProgressRecord>(
            r#"
            SELECT *
            FROM progress_records
            WHERE account_id = $1
              AND redeemed = FALSE
            ORDER BY current_points::DOUBLE PRECISION / target_points DESC, created_at DESC, progress_record_id DESC
            "#,
        )
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// Locks the open record for (account, campaign), if there is one.
pub async fn lock_open_progress(
    conn: &mut PgConnection,
    account_id: Uuid,
    campaign_id: Uuid,
) -> Result<Option<ProgressRecord>, Error> {
    let rec = sqlx::query_as::<_, ProgressRecord>(
        r#"
        SELECT *
        FROM progress_records
        WHERE account_id = $1
          AND campaign_id = $2
          AND redeemed = FALSE
        FOR UPDATE
        "#,
    )
        .bind(account_id)
        .bind(campaign_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(rec)
}

/// Locks an open record only if `account_id` owns it.
pub async fn lock_owned_open_progress(
    conn: &mut PgConnection,
    progress_record_id: Uuid,
    account_id: Uuid,
) -> Result<Option<ProgressRecord>, Error> {
    let rec = sqlx::query_as::<_, ProgressRecord>(
        r#"
        SELECT *
        FROM progress_records
        WHERE progress_record_id = $1
          AND account_id = $2
          AND redeemed = FALSE
        FOR UPDATE
        "#,
    )
        .bind(progress_record_id)
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(rec)
}

pub async fn insert_progress(conn: &mut PgConnection, rec: &ProgressRecord) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO progress_records (
            progress_record_id,
            account_id,
            campaign_id,
            brand_name,
            reward_label,
            current_points,
            target_points,
            scan_count,
            created_at,
            updated_at,
            last_scanned_at,
            expires_at,
            redeemed,
            redeemed_at
        )
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
        "#,
    )
        .bind(rec.progress_record_id)
        .bind(rec.account_id)
        .bind(rec.campaign_id)
        .bind(&rec.brand_name)
        .bind(&rec.reward_label)
        .bind(rec.current_points)
        .bind(rec.target_points)
        .bind(rec.scan_count)
        .bind(rec.created_at)
        .bind(rec.updated_at)
        .bind(rec.last_scanned_at)
        .bind(rec.expires_at)
        .bind(rec.redeemed)
        .bind(rec.redeemed_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Counts one scan against an open record. No cap at `target_points`.
pub async fn add_scan_points(
    conn: &mut PgConnection,
    progress_record_id: Uuid,
    points: i64,
    now: DateTime<Utc>,
) -> Result<Option<ProgressRecord>, Error> {
    let rec = sqlx::query_as::<_, ProgressRecord>(
        r#"
        UPDATE progress_records
        SET current_points = current_points + $2,
            scan_count = scan_count + 1,
            last_scanned_at = $3,
            updated_at = $3
        WHERE progress_record_id = $1
          AND redeemed = FALSE
        RETURNING *
        "#,
    )
        .bind(progress_record_id)
        .bind(points)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(rec)
}

/// Flips an open, complete record to redeemed.
pub async fn mark_redeemed(
    conn: &mut PgConnection,
    progress_record_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<ProgressRecord>, Error> {
    let rec = sqlx::query_as::<_, ProgressRecord>(
        r#"
        UPDATE progress_records
        SET redeemed = TRUE,
            redeemed_at = $2,
            updated_at = $2
        WHERE progress_record_id = $1
          AND redeemed = FALSE
          AND current_points >= target_points
        RETURNING *
        "#,
    )
        .bind(progress_record_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(rec)
}
