//! Paging over view listings.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// A zero-based page of a listing. Sizes are clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: usize,
    size: usize,
}

impl PageRequest {
    pub fn new(number: usize, size: usize) -> Self {
        Self {
            number,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Missing values fall back to the first page at the default size.
    pub fn from_query(number: Option<usize>, size: Option<usize>) -> Self {
        Self::new(number.unwrap_or(0), size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn offset(&self) -> usize {
        self.number.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of rows plus the totals a client needs to walk the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cuts the requested page out of already ordered rows.
    pub fn slice(rows: Vec<T>, request: PageRequest) -> Self {
        let total_items = rows.len();
        let items = rows
            .into_iter()
            .skip(request.offset())
            .take(request.size())
            .collect();
        Self {
            items,
            page: request.number(),
            size: request.size(),
            total_items,
            total_pages: total_items.div_ceil(request.size()),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
