//! Permission group lookups for route-level checks

use sqlx::SqlitePool;
use stacks_common::db::PermissionGroup;
use stacks_common::Result;

use crate::auth::CurrentUser;
use crate::db::permissions;

#[derive(Clone)]
pub struct PermissionGroupService {
    db: SqlitePool,
}

impl PermissionGroupService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_groups_by_ids(&self, ids: &[i64]) -> Result<Vec<PermissionGroup>> {
        permissions::get_groups_by_ids(&self.db, ids).await
    }

    /// Permission groups allowed to edit content on a Promenade page
    pub async fn get_page_content_permissions(&self, page_header_id: i64) -> Result<Vec<i64>> {
        permissions::get_page_content_group_ids(&self.db, page_header_id).await
    }

    /// Site managers hold every application permission
    pub async fn has_app_permission(&self, user: &CurrentUser, permission: &str) -> Result<bool> {
        if user.is_site_manager() {
            return Ok(true);
        }

        let user_groups = user.permission_ids();
        if user_groups.is_empty() {
            return Ok(false);
        }

        let granted = permissions::get_application_group_ids(&self.db, permission).await?;
        Ok(granted.iter().any(|id| user_groups.contains(id)))
    }
}
