// File: loyalty-common/src/models/campaign.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campaign {
    pub campaign_id: Uuid,
    pub brand_name: String,
    pub reward_label: String,
    pub created_at: DateTime<Utc>,
}

/// One distributable QR code. Only `active` changes after issue.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CampaignCode {
    pub code: String,
    pub campaign_id: Uuid,
    pub points_value: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// What the code registry hands back for a scanned code.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CampaignDefinition {
    pub code: String,
    pub campaign_id: Uuid,
    pub brand_name: String,
    pub reward_label: String,
    pub points_value: i64,
    pub active: bool,
}
