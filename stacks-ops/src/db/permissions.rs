//! Directory group mappings and permission grants

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use stacks_common::db::{ClaimGroup, PermissionGroup};
use stacks_common::Result;

pub async fn get_claim_groups(pool: &SqlitePool) -> Result<Vec<ClaimGroup>> {
    let groups = sqlx::query_as::<_, ClaimGroup>("SELECT * FROM claim_groups ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(groups)
}

pub async fn get_permission_groups(pool: &SqlitePool) -> Result<Vec<PermissionGroup>> {
    let groups = sqlx::query_as::<_, PermissionGroup>(
        "SELECT * FROM permission_groups ORDER BY permission_group_name",
    )
    .fetch_all(pool)
    .await?;
    Ok(groups)
}

fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

pub async fn get_groups_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<PermissionGroup>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM permission_groups WHERE id IN ");
    push_id_list(&mut builder, ids);
    builder.push(" ORDER BY permission_group_name");

    let groups = builder
        .build_query_as::<PermissionGroup>()
        .fetch_all(pool)
        .await?;
    Ok(groups)
}

async fn count_in(pool: &SqlitePool, table: &str, ids: &[i64]) -> Result<i64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT COUNT(*) FROM {} WHERE permission_group_id IN ",
        table
    ));
    push_id_list(&mut builder, ids);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// Permission groups hold content rights when they manage any page content or product
pub async fn has_content_rights(pool: &SqlitePool, permission_ids: &[i64]) -> Result<bool> {
    Ok(count_in(pool, "permission_group_page_contents", permission_ids).await? > 0
        || count_in(pool, "permission_group_product_managers", permission_ids).await? > 0)
}

/// Permission groups hold site rights when they carry any application permission
pub async fn has_site_rights(pool: &SqlitePool, permission_ids: &[i64]) -> Result<bool> {
    Ok(count_in(pool, "permission_group_applications", permission_ids).await? > 0)
}

/// Permission groups granted content rights over a Promenade page header
pub async fn get_page_content_group_ids(pool: &SqlitePool, page_header_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT permission_group_id FROM permission_group_page_contents WHERE page_header_id = ?",
    )
    .bind(page_header_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Permission groups holding an application permission
pub async fn get_application_group_ids(pool: &SqlitePool, permission: &str) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT permission_group_id FROM permission_group_applications WHERE application_permission = ?",
    )
    .bind(permission)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
