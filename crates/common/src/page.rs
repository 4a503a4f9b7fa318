//! Pagination primitives shared by repositories and the HTTP layer.

use serde::{Deserialize, Serialize};

/// Upper bound on page size accepted from callers.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sort direction on the creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl SortDirection {
    /// Parses `asc`/`desc` (case-insensitive). Anything else yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// A request for one page of results.
///
/// Pages are zero-based. The size is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
    direction: SortDirection,
}

impl PageRequest {
    /// Creates a page request sorted newest first.
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
            direction: SortDirection::Desc,
        }
    }

    /// Overrides the sort direction.
    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

/// One page of results plus the totals needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Builds a page from its content and the total number of matching rows.
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size());
        Self {
            content,
            page: request.page(),
            size: request.size(),
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    /// Returns an empty page for the given request.
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Converts the content while keeping the paging metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }

    /// Returns true if there is a page after this one.
    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages
    }
}
