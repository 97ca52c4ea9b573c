// File: loyalty-common/src/models/progress.rs

use std::cmp::Ordering;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::campaign::CampaignDefinition;

/// Scans needed to complete a campaign, expressed as a multiple of one scan's value.
pub const DEFAULT_TARGET_MULTIPLIER: i64 = 10;

/// Days a progress record stays open after its first scan.
pub const DEFAULT_PROGRESS_HORIZON_DAYS: i64 = 30;

/// A user's accumulation toward one campaign's reward.
///
/// `current_points` is uncapped: it may run past `target_points`,
/// and completion is only judged when the record is redeemed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressRecord {
    pub progress_record_id: Uuid,
    pub account_id: Uuid,
    pub campaign_id: Uuid,
    pub brand_name: String,
    pub reward_label: String,
    pub current_points: i64,
    pub target_points: i64,
    pub scan_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// A fresh, empty record for the first scan of `campaign` by `account_id`.
    pub fn open(
        account_id: Uuid,
        campaign: &CampaignDefinition,
        target_multiplier: i64,
        horizon_days: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            progress_record_id: Uuid::new_v4(),
            account_id,
            campaign_id: campaign.campaign_id,
            brand_name: campaign.brand_name.clone(),
            reward_label: campaign.reward_label.clone(),
            current_points: 0,
            target_points: campaign.points_value.saturating_mul(target_multiplier),
            scan_count: 0,
            created_at: now,
            updated_at: now,
            last_scanned_at: None,
            expires_at: now + Duration::days(horizon_days),
            redeemed: false,
            redeemed_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_points >= self.target_points
    }

    pub fn points_needed(&self) -> i64 {
        (self.target_points - self.current_points).max(0)
    }

    /// Whole days until `expires_at`; negative once expired.
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days()
    }

    pub fn completion_ratio(&self) -> f64 {
        if self.target_points <= 0 {
            return 0.0;
        }
        self.current_points as f64 / self.target_points as f64
    }
}

/// Read-side projection returned by progress queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressView {
    #[serde(flatten)]
    pub record: ProgressRecord,
    pub days_left: i64,
    pub points_needed: i64,
}

impl ProgressView {
    pub fn new(record: ProgressRecord, now: DateTime<Utc>) -> Self {
        let days_left = record.days_left(now);
        let points_needed = record.points_needed();
        Self { record, days_left, points_needed }
    }

    /// Closest-to-complete first, then newest first.
    pub fn display_order(a: &ProgressView, b: &ProgressView) -> Ordering {
        b.record
            .completion_ratio()
            .partial_cmp(&a.record.completion_ratio())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.record.created_at.cmp(&a.record.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(points_value: i64) -> CampaignDefinition {
        CampaignDefinition {
            code: "BRAND-001".to_string(),
            campaign_id: Uuid::new_v4(),
            brand_name: "Aqua".to_string(),
            reward_label: "Free Bottle".to_string(),
            points_value,
            active: true,
        }
    }

    #[test]
    fn open_sets_target_and_horizon() {
        let now = Utc::now();
        let rec = ProgressRecord::open(Uuid::new_v4(), &campaign(50), 10, 30, now);
        assert_eq!(rec.current_points, 0);
        assert_eq!(rec.target_points, 500);
        assert_eq!(rec.scan_count, 0);
        assert_eq!(rec.expires_at, now + Duration::days(30));
        assert!(!rec.redeemed);
        assert_eq!(rec.days_left(now), 30);
    }

    #[test]
    fn completion_is_judged_against_target() {
        let now = Utc::now();
        let mut rec = ProgressRecord::open(Uuid::new_v4(), &campaign(10), 10, 30, now);
        rec.current_points = 99;
        assert!(!rec.is_complete());
        assert_eq!(rec.points_needed(), 1);

        rec.current_points = 130;
        assert!(rec.is_complete());
        assert_eq!(rec.points_needed(), 0);
    }

    #[test]
    fn display_order_prefers_nearly_complete() {
        let now = Utc::now();
        let mut far = ProgressRecord::open(Uuid::new_v4(), &campaign(10), 10, 30, now);
        far.current_points = 10;
        let mut near = ProgressRecord::open(Uuid::new_v4(), &campaign(10), 10, 30, now);
        near.current_points = 90;

        let mut views = vec![ProgressView::new(far, now), ProgressView::new(near, now)];
        views.sort_by(ProgressView::display_order);
        assert_eq!(views[0].record.current_points, 90);
        assert_eq!(views[0].points_needed, 10);
    }
}
