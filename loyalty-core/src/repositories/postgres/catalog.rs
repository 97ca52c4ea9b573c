// File: loyalty-core/src/repositories/postgres/catalog.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;
use loyalty_common::models::CatalogItem;
use loyalty_common::traits::repository_traits::CatalogRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresCatalogRepository {
    pool: Pool<Postgres>,
}

impl PostgresCatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn create_item(&self, item: &CatalogItem) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO catalog_items (
                item_id,
                name,
                description,
                category,
                cost_points,
                stock,
                active,
                created_at,
                updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            "#,
        )
            .bind(item.item_id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.category)
            .bind(item.cost_points)
            .bind(item.stock)
            .bind(item.active)
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_item_by_id(&self, item_id: Uuid) -> Result<Option<CatalogItem>, Error> {
        let item = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT *
            FROM catalog_items
            WHERE item_id = $1
            "#,
        )
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, Error> {
        let rows = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT *
            FROM catalog_items
            WHERE active = TRUE
            ORDER BY cost_points ASC, name ASC, item_id ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn restock(&self, item_id: Uuid, quantity: i32) -> Result<Option<CatalogItem>, Error> {
        let item = sqlx::query_as::<_, CatalogItem>(
            r#"
            UPDATE catalog_items
            SET stock = stock + $2,
                updated_at = $3
            WHERE item_id = $1
            RETURNING *
            "#,
        )
            .bind(item_id)
            .bind(quantity)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn set_item_active(&self, item_id: Uuid, active: bool) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE catalog_items
            SET active = $2,
                updated_at = $3
            WHERE item_id = $1
            "#,
        )
            .bind(item_id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Row-locks an active item. Inactive items are treated as absent.
pub async fn lock_active_item(conn: &mut PgConnection, item_id: Uuid) -> Result<Option<CatalogItem>, Error> {
    let item = sqlx::query_as::<_, CatalogItem>(
        r#"
        SELECT *
        FROM catalog_items
        WHERE item_id = $1
          AND active = TRUE
        FOR UPDATE
        "#,
    )
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// Takes one unit off the shelf. `None` when nothing was left to take.
pub async fn take_one_unit(
    conn: &mut PgConnection,
    item_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<i32>, Error> {
    let stock: Option<i32> = sqlx::query_scalar(
        r#"
        UPDATE catalog_items
        SET stock = stock - 1,
            updated_at = $2
        WHERE item_id = $1
          AND active = TRUE
          AND stock > 0
        RETURNING stock
        "#,
    )
        .bind(item_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(stock)
}
