//! Segment text lookup for public pages

use crate::db::segments;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use stacks_common::cache::{keys, DistributedCache};
use stacks_common::clock::SharedClock;
use stacks_common::db::{Segment, SegmentText};
use stacks_common::Result;
use tracing::debug;

/// Segment record cached alongside its resolved, wrapped text
///
/// The record travels with the text so visibility is decided on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedSegmentText {
    segment: Segment,
    text: Option<SegmentText>,
}

impl CachedSegmentText {
    fn is_visible_at(&self, now: NaiveDateTime) -> bool {
        self.segment.is_active
            && !self.segment.start_date.is_some_and(|start| start > now)
            && !self.segment.end_date.is_some_and(|end| end < now)
    }
}

#[derive(Clone)]
pub struct SegmentService {
    db: SqlitePool,
    cache: DistributedCache,
    clock: SharedClock,
}

impl SegmentService {
    pub fn new(db: SqlitePool, cache: DistributedCache, clock: SharedClock) -> Self {
        Self { db, cache, clock }
    }

    /// Text of an active, in-window segment
    ///
    /// Uses `language` when the segment has text in it, otherwise the
    /// default language. The segment's wrap is applied to the text.
    pub async fn get_segment_text_by_segment_id(
        &self,
        segment_id: i64,
        language: Option<&str>,
        force_reload: bool,
    ) -> Result<Option<SegmentText>> {
        let cache_key = keys::segment_text(segment_id, language.unwrap_or("default"));

        let mut cached = None;
        if !force_reload {
            cached = self
                .cache
                .get_object::<CachedSegmentText>(&cache_key)
                .await?;
        }

        let entry = match cached {
            Some(entry) => entry,
            None => {
                let Some(entry) = self.load(segment_id, language).await? else {
                    return Ok(None);
                };
                self.cache
                    .save_object(&cache_key, &entry, keys::SEGMENT_CACHE_TTL)
                    .await?;
                entry
            }
        };

        if !entry.is_visible_at(self.clock.now()) {
            debug!(segment_id, "Segment inactive or outside its display window");
            return Ok(None);
        }

        Ok(entry.text)
    }

    async fn load(
        &self,
        segment_id: i64,
        language: Option<&str>,
    ) -> Result<Option<CachedSegmentText>> {
        let Some(segment) = segments::find(&self.db, segment_id).await? else {
            return Ok(None);
        };

        let mut text = None;
        if let Some(language) = language {
            if let Some(language_id) = segments::get_language_id(&self.db, language).await? {
                text = segments::get_text(&self.db, segment_id, language_id).await?;
            }
        }

        if text.is_none() {
            if let Some(default_id) = segments::get_default_language_id(&self.db).await? {
                text = segments::get_text(&self.db, segment_id, default_id).await?;
            }
        }

        if let (Some(text), Some(wrap_id)) = (text.as_mut(), segment.segment_wrap_id) {
            if let Some(wrap) = segments::find_wrap(&self.db, wrap_id).await? {
                text.text = Some(format!(
                    "{}{}{}",
                    wrap.prefix.unwrap_or_default(),
                    text.text.take().unwrap_or_default(),
                    wrap.suffix.unwrap_or_default()
                ));
            }
        }

        Ok(Some(CachedSegmentText { segment, text }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stacks_common::clock::FixedClock;
    use std::sync::Arc;

    fn may_15_at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    async fn seeded_pool() -> SqlitePool {
        let pool = stacks_common::db::init_memory_database().await.unwrap();
        for sql in [
            "INSERT INTO languages (id, name, description, is_active, is_default) VALUES (1, 'en-US', 'English', 1, 1)",
            "INSERT INTO segments (id, name, is_active, end_date) VALUES (1, 'Closing notice', 1, '2024-05-15 10:00:00')",
            "INSERT INTO segments (id, name, is_active) VALUES (2, 'Retired banner', 0)",
            "INSERT INTO segment_texts (segment_id, language_id, text) VALUES (1, 1, 'Closing early today')",
            "INSERT INTO segment_texts (segment_id, language_id, text) VALUES (2, 1, 'Old news')",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }
        pool
    }

    fn service_at(pool: &SqlitePool, now: NaiveDateTime) -> SegmentService {
        SegmentService::new(
            pool.clone(),
            DistributedCache::new(pool.clone()),
            Arc::new(FixedClock(now)),
        )
    }

    #[tokio::test]
    async fn test_cached_text_expires_with_its_window() {
        let pool = seeded_pool().await;

        let morning = service_at(&pool, may_15_at(9));
        let text = morning
            .get_segment_text_by_segment_id(1, None, false)
            .await
            .unwrap();
        assert_eq!(
            text.and_then(|t| t.text).as_deref(),
            Some("Closing early today")
        );

        // Same cache, later clock
        let midday = service_at(&pool, may_15_at(11));
        let text = midday
            .get_segment_text_by_segment_id(1, None, false)
            .await
            .unwrap();
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_inactive_segment_has_no_text() {
        let pool = seeded_pool().await;
        let service = service_at(&pool, may_15_at(9));

        for _ in 0..2 {
            let text = service
                .get_segment_text_by_segment_id(2, None, false)
                .await
                .unwrap();
            assert!(text.is_none());
        }
    }

    #[tokio::test]
    async fn test_missing_segment_has_no_text() {
        let pool = seeded_pool().await;
        let service = service_at(&pool, may_15_at(9));

        let text = service
            .get_segment_text_by_segment_id(99, Some("en-US"), false)
            .await
            .unwrap();
        assert!(text.is_none());
    }
}
