// File: loyalty-core/src/repositories/postgres/scan_events.rs

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;
use loyalty_common::models::{ScanEvent, ScanHistoryItem};
use loyalty_common::traits::repository_traits::ScanEventRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresScanEventRepository {
    pool: Pool<Postgres>,
}

impl PostgresScanEventRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanEventRepository for PostgresScanEventRepository {
    async fn list_scans_for_account(&self, account_id: Uuid, limit: i64) -> Result<Vec<ScanHistoryItem>, Error> {
        let rows = sqlx::query_as::<_, ScanHistoryItem>(
            r#"
            SELECT se.*, c.brand_name, c.reward_label
            FROM scan_events se
            JOIN campaigns c ON c.campaign_id = se.campaign_id
            WHERE se.account_id = $1
            ORDER BY se.created_at DESC, se.scan_event_id DESC
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

pub async fn insert_scan_event(conn: &mut PgConnection, ev: &ScanEvent) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO scan_events (
            scan_event_id, account_id, campaign_id, code,
            progress_record_id, points_awarded, location, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
        .bind(ev.scan_event_id)
        .bind(ev.account_id)
        .bind(ev.campaign_id)
        .bind(&ev.code)
        .bind(ev.progress_record_id)
        .bind(ev.points_awarded)
        .bind(&ev.location)
        .bind(ev.created_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
