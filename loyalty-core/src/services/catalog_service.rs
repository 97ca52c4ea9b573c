// File: loyalty-core/src/services/catalog_service.rs

use std::sync::Arc;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use loyalty_common::models::CatalogItem;
use loyalty_common::traits::repository_traits::CatalogRepository;
use crate::Error;
use crate::invariants::ensure_positive_points;

/// Catalog reads plus the admin-side stock and visibility controls.
pub struct CatalogService {
    catalog_repo: Arc<dyn CatalogRepository + Send + Sync>,
}

impl CatalogService {
    pub fn new(catalog_repo: Arc<dyn CatalogRepository + Send + Sync>) -> Self {
        Self { catalog_repo }
    }

    pub async fn list_catalog(&self) -> Result<Vec<CatalogItem>, Error> {
        self.catalog_repo.list_active_items().await
    }

    pub async fn get_catalog_item(&self, item_id: Uuid) -> Result<CatalogItem, Error> {
        match self.catalog_repo.get_item_by_id(item_id).await? {
            Some(item) if item.active => Ok(item),
            _ => Err(Error::ItemNotFound { item_id }),
        }
    }

    pub async fn create_item(
        &self,
        name: &str,
        description: Option<&str>,
        category: Option<&str>,
        cost_points: i64,
        stock: i32,
    ) -> Result<CatalogItem, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("item name is required".into()));
        }
        ensure_positive_points("cost_points", cost_points)?;
        if stock < 0 {
            return Err(Error::InvalidInput(format!("stock cannot be negative, got {stock}")));
        }

        let now = Utc::now();
        let item = CatalogItem {
            item_id: Uuid::new_v4(),
            name: name.trim().to_string(),
            description: description.map(String::from),
            category: category.map(String::from),
            cost_points,
            stock,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.catalog_repo.create_item(&item).await?;
        info!("catalog item {} '{}' created ({} pts, stock {})", item.item_id, item.name, cost_points, stock);
        Ok(item)
    }

    pub async fn restock(&self, item_id: Uuid, quantity: i32) -> Result<CatalogItem, Error> {
        if quantity <= 0 {
            return Err(Error::InvalidInput(format!("restock quantity must be positive, got {quantity}")));
        }
        let item = self.catalog_repo
            .restock(item_id, quantity)
            .await?
            .ok_or(Error::ItemNotFound { item_id })?;
        info!("catalog item {} restocked by {} (stock {})", item_id, quantity, item.stock);
        Ok(item)
    }

    pub async fn set_item_active(&self, item_id: Uuid, active: bool) -> Result<(), Error> {
        if !self.catalog_repo.set_item_active(item_id, active).await? {
            return Err(Error::ItemNotFound { item_id });
        }
        info!("catalog item {} active={}", item_id, active);
        Ok(())
    }
}
