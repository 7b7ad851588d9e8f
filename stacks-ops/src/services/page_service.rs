//! Intranet pages
//!
//! Pages start as drafts. A page's stub must be unique among the published
//! pages of its section.

use sqlx::SqlitePool;
use stacks_common::clock::SharedClock;
use stacks_common::db::{FileAttachment, IntranetPage};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::{Error, Result};
use tracing::info;

use crate::auth::CurrentUser;
use crate::db::{files, pages, users};

#[derive(Clone)]
pub struct PageService {
    db: SqlitePool,
    clock: SharedClock,
}

/// Lowercase, trimmed, with runs of whitespace turned into single dashes
pub fn normalize_stub(stub: &str) -> Option<String> {
    let stub = stub
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    (!stub.is_empty()).then_some(stub)
}

impl PageService {
    pub fn new(db: SqlitePool, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    fn clean(page: &mut IntranetPage) -> Result<()> {
        page.title = page.title.trim().to_string();
        if page.title.is_empty() {
            return Err(Error::InvalidInput("A page title is required.".to_string()));
        }
        page.stub = page.stub.as_deref().and_then(normalize_stub);
        Ok(())
    }

    pub async fn create(&self, user: &CurrentUser, mut page: IntranetPage) -> Result<IntranetPage> {
        Self::clean(&mut page)?;
        page.is_draft = true;
        page.created_at = self.clock.now();
        page.created_by = Some(user.id);
        page.id = pages::add(&self.db, &page).await?;

        info!(page_id = page.id, section_id = page.section_id, "Created page");
        Ok(page)
    }

    pub async fn edit(&self, user: &CurrentUser, mut page: IntranetPage) -> Result<IntranetPage> {
        let mut current = self.require(page.id).await?;
        Self::clean(&mut page)?;

        current.title = page.title;
        current.stub = page.stub;
        current.content = page.content;
        current.is_draft = page.is_draft;
        current.updated_at = Some(self.clock.now());
        current.updated_by = Some(user.id);

        if !current.is_draft && pages::stub_in_use(&self.db, &current).await? {
            return Err(Error::Conflict(
                "The chosen stub is already in use. Please choose a different stub.".to_string(),
            ));
        }

        pages::update(&self.db, &current).await?;
        Ok(current)
    }

    pub async fn delete(&self, user: &CurrentUser, page_id: i64) -> Result<()> {
        let mut page = self.require(page_id).await?;
        page.updated_at = Some(self.clock.now());
        page.updated_by = Some(user.id);
        pages::remove(&self.db, &page).await?;
        info!(page_id, "Deleted page");
        Ok(())
    }

    async fn require(&self, id: i64) -> Result<IntranetPage> {
        pages::find(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Unable to find page id {}", id)))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<IntranetPage>> {
        pages::find(&self.db, id).await
    }

    /// Whether publishing `page` would clash with another page's stub
    pub async fn stub_in_use(&self, page: &IntranetPage) -> Result<bool> {
        let mut page = page.clone();
        page.stub = page.stub.as_deref().and_then(normalize_stub);
        if page.stub.is_none() {
            return Ok(false);
        }
        pages::stub_in_use(&self.db, &page).await
    }

    pub async fn get_paginated_by_section(
        &self,
        section_id: i64,
        filter: &BaseFilter,
    ) -> Result<CollectionWithCount<IntranetPage>> {
        let mut list = pages::get_paginated_by_section(&self.db, section_id, filter).await?;
        for page in &mut list.data {
            if let Some(creator) = page.created_by {
                page.created_by_name = users::get_name_username(&self.db, creator)
                    .await?
                    .and_then(|u| u.name);
            }
        }
        Ok(list)
    }

    pub async fn get_attachments(&self, page_id: i64) -> Result<Vec<FileAttachment>> {
        files::get_by_page_id(&self.db, page_id).await
    }
}
