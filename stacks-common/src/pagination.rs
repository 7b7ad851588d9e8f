//! Pagination helpers for list views
//!
//! Filters carry the requested page and page size; `PaginateModel` answers
//! the questions views ask afterwards (how many pages, is the request past
//! the end, where to send it instead).

use serde::{Deserialize, Serialize};

/// Default number of rows per page
pub const DEFAULT_TAKE: i64 = 10;

/// Page request shared by all paginated queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFilter {
    pub page: i64,
    pub take: i64,
}

impl BaseFilter {
    /// Page numbers are 1-based; anything lower is clamped
    pub fn new(page: Option<i64>, take: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            take: if take > 0 { take } else { DEFAULT_TAKE },
        }
    }

    /// Rows before the requested page; saturates for absurd page numbers
    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.take)
    }
}

impl Default for BaseFilter {
    fn default() -> Self {
        Self::new(None, DEFAULT_TAKE)
    }
}

/// Result rows plus the total row count before paging
#[derive(Debug, Clone, Serialize)]
pub struct CollectionWithCount<T> {
    pub count: i64,
    pub data: Vec<T>,
}

impl<T> CollectionWithCount<T> {
    pub fn empty() -> Self {
        Self {
            count: 0,
            data: Vec::new(),
        }
    }
}

/// Paging state handed to views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginateModel {
    pub item_count: i64,
    pub current_page: i64,
    pub items_per_page: i64,
}

impl PaginateModel {
    pub fn new(item_count: i64, filter: &BaseFilter) -> Self {
        Self {
            item_count,
            current_page: filter.page,
            items_per_page: filter.take,
        }
    }

    pub fn max_page(&self) -> i64 {
        if self.items_per_page <= 0 {
            return 0;
        }
        let full_pages = self.item_count / self.items_per_page;
        if self.item_count % self.items_per_page > 0 {
            full_pages + 1
        } else {
            full_pages
        }
    }

    /// True when the requested page lies beyond the last page of results
    pub fn past_max_page(&self) -> bool {
        let max_page = self.max_page();
        max_page > 0 && self.current_page > max_page
    }

    /// Page to redirect to when the request is past the end
    pub fn last_page(&self) -> Option<i64> {
        if self.past_max_page() {
            Some(self.max_page())
        } else {
            None
        }
    }
}
