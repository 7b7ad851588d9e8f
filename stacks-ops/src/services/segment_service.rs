//! Segment administration
//!
//! A segment is a named block of localized text placed on Promenade pages,
//! locations and products. It cannot be deleted while anything still places it.

use sqlx::SqlitePool;
use stacks_common::clock::SharedClock;
use stacks_common::db::{Language, Segment, SegmentText, SegmentWrap};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::{Error, Result};
use tracing::info;

use crate::db::{languages, locations, products, segments};

pub const START_AFTER_END_MESSAGE: &str = "Start Date cannot be after the End Date.";

#[derive(Clone)]
pub struct SegmentService {
    db: SqlitePool,
    clock: SharedClock,
}

fn validate(segment: &mut Segment) -> Result<()> {
    segment.name = segment.name.trim().to_string();
    if segment.name.is_empty() {
        return Err(Error::InvalidInput("A segment name is required.".to_string()));
    }
    if let (Some(start), Some(end)) = (segment.start_date, segment.end_date) {
        if start > end {
            return Err(Error::InvalidInput(START_AFTER_END_MESSAGE.to_string()));
        }
    }
    Ok(())
}

impl SegmentService {
    pub fn new(db: SqlitePool, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    async fn ensure_unique_name(&self, segment: &Segment) -> Result<()> {
        if segments::is_duplicate_name(&self.db, segment).await? {
            return Err(Error::Conflict(format!(
                "A segment named '{}' already exists.",
                segment.name
            )));
        }
        Ok(())
    }

    async fn require(&self, id: i64) -> Result<Segment> {
        segments::find(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Could not find Segment with ID: {}", id)))
    }

    pub async fn create(&self, mut segment: Segment, user_id: Option<i64>) -> Result<Segment> {
        validate(&mut segment)?;
        self.ensure_unique_name(&segment).await?;

        segment.created_at = self.clock.now();
        segment.created_by = user_id;
        segment.id = segments::add(&self.db, &segment).await?;

        info!(segment_id = segment.id, name = %segment.name, "Created segment");
        Ok(segment)
    }

    pub async fn edit(&self, mut segment: Segment, user_id: Option<i64>) -> Result<Segment> {
        let mut current = self.require(segment.id).await?;
        validate(&mut segment)?;
        self.ensure_unique_name(&segment).await?;

        current.name = segment.name;
        current.is_active = segment.is_active;
        current.start_date = segment.start_date;
        current.end_date = segment.end_date;
        current.updated_at = Some(self.clock.now());
        current.updated_by = user_id;
        segments::update(&self.db, &current).await?;
        Ok(current)
    }

    /// Everything that places the segment, one line each
    pub async fn get_usage(&self, segment_id: i64) -> Result<Vec<String>> {
        let mut used_by: Vec<String> = locations::get_using_segment(&self.db, segment_id)
            .await?
            .into_iter()
            .map(|location| format!("Location: {}", location.name))
            .collect();

        used_by.extend(
            products::get_by_segment_id(&self.db, segment_id)
                .await?
                .into_iter()
                .map(|product| format!("Product: {}", product.name)),
        );

        if let Some(layout_id) = segments::get_page_layout_id(&self.db, segment_id).await? {
            used_by.push(format!("Page layout: {}", layout_id));
        }

        Ok(used_by)
    }

    pub async fn delete(&self, segment_id: i64) -> Result<()> {
        let segment = self.require(segment_id).await?;

        let used_by = self.get_usage(segment_id).await?;
        if !used_by.is_empty() {
            return Err(Error::InUse {
                message: "the segment is still in use.".to_string(),
                used_by,
            });
        }

        segments::remove(&self.db, segment_id).await?;
        info!(segment_id, name = %segment.name, "Deleted segment");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Segment>> {
        segments::find(&self.db, id).await
    }

    /// Segments by name, each with the languages it has text in
    pub async fn get_paginated_list(&self, filter: &BaseFilter) -> Result<CollectionWithCount<Segment>> {
        let mut page = segments::get_paginated(&self.db, filter).await?;
        for segment in &mut page.data {
            segment.languages = segments::get_languages_with_text(&self.db, segment.id).await?;
        }
        Ok(page)
    }

    pub async fn get_segment_languages(&self, segment_id: i64) -> Result<Vec<String>> {
        segments::get_languages_with_text(&self.db, segment_id).await
    }

    pub async fn get_text(&self, segment_id: i64, language_id: i64) -> Result<Option<SegmentText>> {
        segments::get_text(&self.db, segment_id, language_id).await
    }

    fn clean_text(text: &mut SegmentText) -> Result<()> {
        text.header = text
            .header
            .take()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());
        text.text = text
            .text
            .take()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if text.text.is_none() {
            return Err(Error::InvalidInput("Segment text cannot be empty.".to_string()));
        }
        Ok(())
    }

    pub async fn create_text(&self, mut text: SegmentText) -> Result<SegmentText> {
        self.require(text.segment_id).await?;
        Self::clean_text(&mut text)?;
        segments::add_text(&self.db, &text).await?;
        Ok(text)
    }

    pub async fn edit_text(&self, mut text: SegmentText) -> Result<SegmentText> {
        Self::clean_text(&mut text)?;
        if segments::get_text(&self.db, text.segment_id, text.language_id)
            .await?
            .is_none()
        {
            return Err(Error::NotFound(format!(
                "Unable to find text for segment id {} in language id {}",
                text.segment_id, text.language_id
            )));
        }
        segments::update_text(&self.db, &text).await?;
        Ok(text)
    }

    pub async fn delete_text(&self, segment_id: i64, language_id: i64) -> Result<()> {
        segments::remove_text(&self.db, segment_id, language_id).await
    }

    /// Set or clear the wrap around the segment's text
    pub async fn update_wrap(&self, segment_id: i64, wrap_id: Option<i64>, user_id: Option<i64>) -> Result<()> {
        let mut segment = self.require(segment_id).await?;

        if let Some(wrap_id) = wrap_id {
            if languages::find_active_wrap(&self.db, wrap_id).await?.is_none() {
                return Err(Error::NotFound(format!("Unable to find segment wrap id {}", wrap_id)));
            }
        }

        segment.segment_wrap_id = wrap_id;
        segment.updated_at = Some(self.clock.now());
        segment.updated_by = user_id;
        segments::update(&self.db, &segment).await
    }

    pub async fn get_page_layout_id(&self, segment_id: i64) -> Result<Option<i64>> {
        segments::get_page_layout_id(&self.db, segment_id).await
    }

    pub async fn get_page_header_id(&self, segment_id: i64) -> Result<Option<i64>> {
        segments::get_page_header_id(&self.db, segment_id).await
    }

    pub async fn get_active_languages(&self) -> Result<Vec<Language>> {
        languages::get_active(&self.db).await
    }

    pub async fn get_active_language(&self, id: i64) -> Result<Option<Language>> {
        languages::get_active_by_id(&self.db, id).await
    }

    pub async fn get_active_wraps(&self) -> Result<Vec<SegmentWrap>> {
        languages::get_active_wraps(&self.db).await
    }

    /// Sentence describing where the segment is used, for the detail view
    pub async fn get_relationship(&self, segment_id: i64) -> Result<Option<String>> {
        if let Some(layout_id) = segments::get_page_layout_id(&self.db, segment_id).await? {
            return Ok(Some(format!("This segment is used page layout ID: {}", layout_id)));
        }

        let mut relationship = None;

        let locations = locations::get_using_segment(&self.db, segment_id).await?;
        match locations.as_slice() {
            [] => {}
            [location] => {
                relationship = Some(format!("This segment is used for location: {}", location.name))
            }
            many => {
                let names: Vec<&str> = many.iter().map(|l| l.name.as_str()).collect();
                relationship = Some(format!(
                    "This segment is used for multiple locations: {}",
                    names.join(", ")
                ));
            }
        }

        let products = products::get_by_segment_id(&self.db, segment_id).await?;
        match products.as_slice() {
            [] => {}
            [product] => {
                relationship = Some(format!("This segment is used for product: {}", product.name))
            }
            many => {
                let names: Vec<&str> = many.iter().map(|p| p.name.as_str()).collect();
                relationship = Some(format!(
                    "This segment is used for multiple products: {}",
                    names.join(", ")
                ));
            }
        }

        Ok(relationship)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_validate_rejects_start_after_end() {
        let mut segment = Segment {
            name: "Summer Reading".to_string(),
            start_date: Some(at(10, 9)),
            end_date: Some(at(9, 9)),
            ..Default::default()
        };
        let err = validate(&mut segment).unwrap_err();
        assert_eq!(err.to_string(), START_AFTER_END_MESSAGE);

        segment.end_date = Some(at(10, 9));
        assert!(validate(&mut segment).is_ok());
    }

    #[test]
    fn test_validate_trims_and_requires_name() {
        let mut segment = Segment {
            name: "  Hours  ".to_string(),
            ..Default::default()
        };
        validate(&mut segment).unwrap();
        assert_eq!(segment.name, "Hours");

        segment.name = "   ".to_string();
        assert!(validate(&mut segment).is_err());
    }

    #[test]
    fn test_clean_text_drops_blank_header() {
        let mut text = SegmentText {
            segment_id: 1,
            language_id: 1,
            header: Some("  ".to_string()),
            text: Some(" Closed Monday ".to_string()),
        };
        SegmentService::clean_text(&mut text).unwrap();
        assert_eq!(text.header, None);
        assert_eq!(text.text.as_deref(), Some("Closed Monday"));

        text.text = None;
        assert!(SegmentService::clean_text(&mut text).is_err());
    }
}
