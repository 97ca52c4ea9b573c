// File: loyalty-core/src/repositories/postgres/campaigns.rs

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};
use loyalty_common::models::{Campaign, CampaignCode, CampaignDefinition};
use loyalty_common::traits::repository_traits::CampaignRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresCampaignRepository {
    pool: Pool<Postgres>,
}

impl PostgresCampaignRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for PostgresCampaignRepository {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO campaigns (campaign_id, brand_name, reward_label, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
            .bind(campaign.campaign_id)
            .bind(&campaign.brand_name)
            .bind(&campaign.reward_label)
            .bind(campaign.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn issue_code(&self, code: &CampaignCode) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO campaign_codes (code, campaign_id, points_value, active, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
            .bind(&code.code)
            .bind(code.campaign_id)
            .bind(code.points_value)
            .bind(code.active)
            .bind(code.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_code_active(&self, code: &str, active: bool) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE campaign_codes SET active = $2 WHERE code = $1")
            .bind(code)
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_definition(&self, code: &str) -> Result<Option<CampaignDefinition>, Error> {
        let def = sqlx::query_as::<_, CampaignDefinition>(
            r#"
            SELECT cc.code, cc.campaign_id, c.brand_name, c.reward_label,
                   cc.points_value, cc.active
            FROM campaign_codes cc
            JOIN campaigns c ON c.campaign_id = cc.campaign_id
            WHERE cc.code = $1
            "#,
        )
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(def)
    }
}

/// Resolves an active code and share-locks it so it cannot be deactivated
/// while the scan is in flight.
pub async fn resolve_active_code(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<CampaignDefinition>, Error> {
    let def = sqlx::query_as::<_, CampaignDefinition>(
        r#"
        SELECT cc.code, cc.campaign_id, c.brand_name, c.reward_label,
               cc.points_value, cc.active
        FROM campaign_codes cc
        JOIN campaigns c ON c.campaign_id = cc.campaign_id
        WHERE cc.code = $1
          AND cc.active = TRUE
        FOR SHARE OF cc
        "#,
    )
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(def)
}
