//! Products and their per-location inventory

use sqlx::{Executor, Sqlite, SqlitePool};
use stacks_common::db::{Product, ProductLocationInventory};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::Result;

pub async fn get_paginated(
    pool: &SqlitePool,
    filter: &BaseFilter,
) -> Result<CollectionWithCount<Product>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    let data = sqlx::query_as::<_, Product>(
        "SELECT * FROM products ORDER BY name, id LIMIT ? OFFSET ?",
    )
    .bind(filter.take)
    .bind(filter.skip())
    .fetch_all(pool)
    .await?;

    Ok(CollectionWithCount { count, data })
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(product)
}

pub async fn get_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(product)
}

pub async fn get_active_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE slug = ? AND is_active = 1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(product)
}

pub async fn get_by_segment_id(pool: &SqlitePool, segment_id: i64) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE segment_id = ? ORDER BY name",
    )
    .bind(segment_id)
    .fetch_all(pool)
    .await?;
    Ok(products)
}

pub async fn update(pool: &SqlitePool, product: &Product) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET name = ?, is_active = ?, is_visible_to_public = ?, cache_inventory_minutes = ?,
            segment_id = ?, updated_at = ?, updated_by = ?
        WHERE id = ?
        "#,
    )
    .bind(&product.name)
    .bind(product.is_active)
    .bind(product.is_visible_to_public)
    .bind(product.cache_inventory_minutes)
    .bind(product.segment_id)
    .bind(product.updated_at)
    .bind(product.updated_by)
    .bind(product.id)
    .execute(pool)
    .await?;
    Ok(())
}

// ============================================================================
// Inventories
// ============================================================================

const INVENTORY_SELECT: &str = r#"
    SELECT i.*, l.name AS location_name
    FROM product_location_inventories i
    JOIN locations l ON l.id = i.location_id
"#;

#[derive(sqlx::FromRow)]
struct InventoryRow {
    #[sqlx(flatten)]
    inventory: ProductLocationInventory,
    location_name: String,
}

impl From<InventoryRow> for ProductLocationInventory {
    fn from(row: InventoryRow) -> Self {
        ProductLocationInventory {
            location_name: Some(row.location_name),
            ..row.inventory
        }
    }
}

pub async fn get_inventory<'e, E>(
    executor: E,
    product_id: i64,
    location_id: i64,
) -> Result<Option<ProductLocationInventory>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, InventoryRow>(&format!(
        "{} WHERE i.product_id = ? AND i.location_id = ?",
        INVENTORY_SELECT
    ))
    .bind(product_id)
    .bind(location_id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Into::into))
}

/// Inventory rows for a product, ordered by location name
pub async fn get_inventories_for_product(
    pool: &SqlitePool,
    product_id: i64,
) -> Result<Vec<ProductLocationInventory>> {
    let rows = sqlx::query_as::<_, InventoryRow>(&format!(
        "{} WHERE i.product_id = ? ORDER BY l.name",
        INVENTORY_SELECT
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn add_inventory(pool: &SqlitePool, inventory: &ProductLocationInventory) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO product_location_inventories
            (product_id, location_id, item_count, many_threshhold, created_at, created_by, updated_at, updated_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(inventory.product_id)
    .bind(inventory.location_id)
    .bind(inventory.item_count)
    .bind(inventory.many_threshhold)
    .bind(inventory.created_at)
    .bind(inventory.created_by)
    .bind(inventory.updated_at)
    .bind(inventory.updated_by)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_inventory<'e, E>(executor: E, inventory: &ProductLocationInventory) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE product_location_inventories
        SET item_count = ?, many_threshhold = ?, updated_at = ?, updated_by = ?,
            threshhold_updated_at = ?, threshhold_updated_by = ?
        WHERE product_id = ? AND location_id = ?
        "#,
    )
    .bind(inventory.item_count)
    .bind(inventory.many_threshhold)
    .bind(inventory.updated_at)
    .bind(inventory.updated_by)
    .bind(inventory.threshhold_updated_at)
    .bind(inventory.threshhold_updated_by)
    .bind(inventory.product_id)
    .bind(inventory.location_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn remove_inventory(pool: &SqlitePool, product_id: i64, location_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM product_location_inventories WHERE product_id = ? AND location_id = ?")
        .bind(product_id)
        .bind(location_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Permission groups allowed to manage the product
pub async fn get_manager_group_ids(pool: &SqlitePool, product_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        r#"
        SELECT permission_group_id FROM permission_group_product_managers
        WHERE product_id = ?
        ORDER BY permission_group_id
        "#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
