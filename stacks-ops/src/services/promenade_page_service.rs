//! Promenade page headers and their per-language pages

use sqlx::SqlitePool;
use stacks_common::clock::SharedClock;
use stacks_common::db::{Page, PageHeader};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::{Error, Result};
use tracing::info;

use crate::db::site_pages;
use crate::services::page_service::normalize_stub;

#[derive(Clone)]
pub struct PromenadePageService {
    db: SqlitePool,
    clock: SharedClock,
}

impl PromenadePageService {
    pub fn new(db: SqlitePool, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    pub async fn get_by_header_and_language(&self, header_id: i64, language_id: i64) -> Result<Option<Page>> {
        site_pages::get_page(&self.db, header_id, language_id).await
    }

    pub async fn create(&self, mut page: Page) -> Result<Page> {
        self.require_header(page.page_header_id).await?;
        page.title = page.title.trim().to_string();
        site_pages::add_page(&self.db, &page).await?;
        Ok(page)
    }

    pub async fn edit(&self, mut page: Page) -> Result<Page> {
        if site_pages::get_page(&self.db, page.page_header_id, page.language_id)
            .await?
            .is_none()
        {
            return Err(Error::NotFound(format!(
                "Unable to find page for header id {} in language id {}",
                page.page_header_id, page.language_id
            )));
        }
        page.title = page.title.trim().to_string();
        site_pages::update_page(&self.db, &page).await?;
        Ok(page)
    }

    pub async fn delete(&self, page: &Page) -> Result<()> {
        site_pages::remove_page(&self.db, page.page_header_id, page.language_id).await
    }

    /// Headers by page name, each with the languages it has pages in
    pub async fn get_paginated_header_list(
        &self,
        filter: &BaseFilter,
    ) -> Result<CollectionWithCount<PageHeader>> {
        let mut list = site_pages::get_paginated_headers(&self.db, filter).await?;
        for header in &mut list.data {
            header.languages = site_pages::get_header_languages(&self.db, header.id).await?;
        }
        Ok(list)
    }

    pub async fn get_header_by_id(&self, id: i64) -> Result<Option<PageHeader>> {
        site_pages::find_header(&self.db, id).await
    }

    async fn require_header(&self, id: i64) -> Result<PageHeader> {
        site_pages::find_header(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Unable to find page header id {}", id)))
    }

    pub async fn get_header_languages_by_id(&self, id: i64) -> Result<Vec<String>> {
        site_pages::get_header_languages(&self.db, id).await
    }

    pub async fn create_header(&self, mut header: PageHeader, user_id: Option<i64>) -> Result<PageHeader> {
        header.page_name = header.page_name.trim().to_string();
        if header.page_name.is_empty() {
            return Err(Error::InvalidInput("A page name is required.".to_string()));
        }
        header.stub = normalize_stub(&header.stub)
            .ok_or_else(|| Error::InvalidInput("A page stub is required.".to_string()))?;

        if site_pages::stub_in_use(&self.db, &header).await? {
            return Err(Error::Conflict(
                "The chosen stub is already in use. Please choose a different stub.".to_string(),
            ));
        }

        header.created_at = self.clock.now();
        header.created_by = user_id;
        header.id = site_pages::add_header(&self.db, &header).await?;
        info!(page_header_id = header.id, stub = %header.stub, "Created page header");
        Ok(header)
    }

    /// Only the page name can change once a header exists
    pub async fn edit_header(&self, header: &PageHeader, user_id: Option<i64>) -> Result<PageHeader> {
        let mut current = self.require_header(header.id).await?;
        let page_name = header.page_name.trim();
        if page_name.is_empty() {
            return Err(Error::InvalidInput("A page name is required.".to_string()));
        }

        current.page_name = page_name.to_string();
        current.updated_at = Some(self.clock.now());
        current.updated_by = user_id;
        site_pages::update_header(&self.db, &current).await?;
        Ok(current)
    }

    pub async fn delete_header(&self, id: i64) -> Result<()> {
        self.require_header(id).await?;
        site_pages::remove_header(&self.db, id).await?;
        info!(page_header_id = id, "Deleted page header");
        Ok(())
    }

    pub async fn stub_in_use(&self, header: &PageHeader) -> Result<bool> {
        let Some(stub) = normalize_stub(&header.stub) else {
            return Ok(false);
        };
        let header = PageHeader {
            stub,
            ..header.clone()
        };
        site_pages::stub_in_use(&self.db, &header).await
    }
}
