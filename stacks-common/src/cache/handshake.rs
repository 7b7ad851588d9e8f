//! Directory handshake, authenticating side
//!
//! Ops redirects an unauthenticated browser to the directory service with a
//! handshake id. The directory service authenticates the person, records the
//! username and group memberships under that id, and sends the browser back
//! to the stored return URL. Ops then picks the values up and removes them.

use super::{keys, DistributedCache};
use crate::Result;
use std::time::Duration;

/// Record a completed directory authentication for handshake `id`
///
/// Returns the URL the browser should be sent back to, if Ops stored one.
pub async fn record_authentication(
    cache: &DistributedCache,
    id: &str,
    username: &str,
    groups: &[String],
    ttl: Duration,
) -> Result<Option<String>> {
    cache.save_string(&keys::ops_username(id), username, ttl).await?;

    for (index, group) in groups.iter().enumerate() {
        cache
            .save_string(&keys::ops_group(id, index + 1), group, ttl)
            .await?;
    }

    cache.get_string(&keys::ops_return(id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    #[tokio::test]
    async fn test_records_username_groups_and_returns_url() {
        let cache = DistributedCache::new(init_memory_database().await.unwrap());
        let ttl = Duration::from_secs(120);
        cache
            .save_string(&keys::ops_return("abc"), "/Profile", ttl)
            .await
            .unwrap();

        let groups = vec!["Staff".to_string(), "Web Team".to_string()];
        let return_url = record_authentication(&cache, "abc", "LIBRARY\\jdoe", &groups, ttl)
            .await
            .unwrap();

        assert_eq!(return_url.as_deref(), Some("/Profile"));
        assert_eq!(
            cache.get_string(&keys::ops_username("abc")).await.unwrap().as_deref(),
            Some("LIBRARY\\jdoe")
        );
        assert_eq!(
            cache.get_string(&keys::ops_group("abc", 2)).await.unwrap().as_deref(),
            Some("Web Team")
        );
        assert!(cache.get_string(&keys::ops_group("abc", 3)).await.unwrap().is_none());
    }
}
