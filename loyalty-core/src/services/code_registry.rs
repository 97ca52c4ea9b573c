// File: loyalty-core/src/services/code_registry.rs

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use loyalty_common::models::{Campaign, CampaignCode, CampaignDefinition};
use loyalty_common::traits::repository_traits::CampaignRepository;
use crate::Error;
use crate::invariants::{ensure_positive_points, normalize_code};

/// Maps scanned code strings to campaign definitions.
///
/// Scans resolve their code again inside their own transaction; this is the
/// read path for callers that only want to look.
pub struct CodeRegistry {
    campaign_repo: Arc<dyn CampaignRepository + Send + Sync>,
}

impl CodeRegistry {
    pub fn new(campaign_repo: Arc<dyn CampaignRepository + Send + Sync>) -> Self {
        Self { campaign_repo }
    }

    pub async fn lookup(&self, code: &str) -> Result<CampaignDefinition, Error> {
        let code = normalize_code(code)?;
        match self.campaign_repo.get_definition(code).await? {
            Some(def) if def.active => Ok(def),
            Some(_) => {
                debug!("code '{}' exists but is inactive", code);
                Err(Error::CodeNotFound { code: code.to_string() })
            }
            None => Err(Error::CodeNotFound { code: code.to_string() }),
        }
    }

    pub async fn create_campaign(&self, brand_name: &str, reward_label: &str) -> Result<Campaign, Error> {
        if brand_name.trim().is_empty() || reward_label.trim().is_empty() {
            return Err(Error::InvalidInput("brand name and reward label are required".into()));
        }
        let campaign = Campaign {
            campaign_id: Uuid::new_v4(),
            brand_name: brand_name.trim().to_string(),
            reward_label: reward_label.trim().to_string(),
            created_at: Utc::now(),
        };
        self.campaign_repo.create_campaign(&campaign).await?;
        info!("campaign {} created for brand '{}'", campaign.campaign_id, campaign.brand_name);
        Ok(campaign)
    }

    pub async fn issue_code(&self, campaign_id: Uuid, code: &str, points_value: i64) -> Result<CampaignCode, Error> {
        let code = normalize_code(code)?;
        ensure_positive_points("points_value", points_value)?;
        let issued = CampaignCode {
            code: code.to_string(),
            campaign_id,
            points_value,
            active: true,
            created_at: Utc::now(),
        };
        self.campaign_repo.issue_code(&issued).await?;
        info!("code '{}' issued for campaign {} ({} pts)", issued.code, campaign_id, points_value);
        Ok(issued)
    }

    pub async fn set_code_active(&self, code: &str, active: bool) -> Result<(), Error> {
        let code = normalize_code(code)?;
        if !self.campaign_repo.set_code_active(code, active).await? {
            return Err(Error::CodeNotFound { code: code.to_string() });
        }
        info!("code '{}' active={}", code, active);
        Ok(())
    }
}
