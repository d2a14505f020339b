use serde::Serialize;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A resolved page request. Raw client input degrades to defaults instead
/// of rejecting the request: non-numeric or non-positive values fall back
/// to page 1 / size 5, and oversized limits are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Builds a request from untrusted path/query strings. `page` and
    /// `limit` are parsed independently; a bad value for one never
    /// affects the other.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|parsed| *parsed >= 1)
            .unwrap_or(DEFAULT_PAGE);
        let page_size = limit
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|parsed| *parsed >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the totals clients need to render pagers.
/// An out-of-range page yields an empty `items` with the same totals,
/// never an error.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: i64, request: PageRequest) -> Self {
        let page_size = request.page_size();
        // An empty collection still reports one (empty) page.
        let total_pages = ((total_items + page_size - 1) / page_size).max(1);
        Self {
            items,
            total_items,
            total_pages,
            current_page: request.page(),
            page_size,
        }
    }
}
