//! Directory group mappings consulted while building a session's claims

use sqlx::SqlitePool;
use stacks_common::db::{ClaimGroup, PermissionGroup};
use stacks_common::Result;

use crate::auth::claims::claim_type;
use crate::db::permissions;

#[derive(Clone)]
pub struct AuthorizationService {
    db: SqlitePool,
}

impl AuthorizationService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_claim_groups(&self) -> Result<Vec<ClaimGroup>> {
        permissions::get_claim_groups(&self.db).await
    }

    pub async fn get_permission_groups(&self) -> Result<Vec<PermissionGroup>> {
        permissions::get_permission_groups(&self.db).await
    }

    /// Administrative claim types implied by membership in the permission groups
    pub async fn get_admin_claims(&self, permission_ids: &[i64]) -> Result<Vec<&'static str>> {
        let mut claims = Vec::new();
        if permissions::has_content_rights(&self.db, permission_ids).await? {
            claims.push(claim_type::HAS_CONTENT_ADMIN_RIGHTS);
        }
        if permissions::has_site_rights(&self.db, permission_ids).await? {
            claims.push(claim_type::HAS_SITE_ADMIN_RIGHTS);
        }
        Ok(claims)
    }
}
