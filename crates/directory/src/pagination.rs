//! Page-number pagination for membership queries.

use serde::{Deserialize, Serialize};

use domainid_core::{DomainError, DomainResult};

use crate::query::RowWindow;

pub const DEFAULT_PAGE_NUMBER: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Validate raw caller input; page numbers start at 1 and pages are never empty.
    pub fn new(page_number: i64, page_size: i64) -> DomainResult<Self> {
        let page_number = u32::try_from(page_number)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                DomainError::invalid_argument(format!("page number must be >= 1, got {page_number}"))
            })?;
        let page_size = u32::try_from(page_size)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                DomainError::invalid_argument(format!("page size must be >= 1, got {page_size}"))
            })?;
        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// `skip = (page_number - 1) * page_size`, `take = page_size`.
    pub fn window(&self) -> RowWindow {
        RowWindow {
            offset: u64::from(self.page_number - 1) * u64::from(self.page_size),
            limit: u64::from(self.page_size),
        }
    }

    pub fn next(&self) -> Self {
        Self {
            page_number: self.page_number.saturating_add(1),
            page_size: self.page_size,
        }
    }
}

/// Whether a membership query returns everything or one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    All,
    Page(PageRequest),
}

impl Default for Paging {
    fn default() -> Self {
        Paging::Page(PageRequest::default())
    }
}

impl Paging {
    pub fn window(&self) -> Option<RowWindow> {
        match self {
            Paging::All => None,
            Paging::Page(request) => Some(request.window()),
        }
    }
}

impl From<PageRequest> for Paging {
    fn from(value: PageRequest) -> Self {
        Paging::Page(value)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` when the query was unpaged.
    pub request: Option<PageRequest>,
}

impl<T> Page<T> {
    /// True when no further page can contain results.
    pub fn is_last(&self) -> bool {
        match self.request {
            None => true,
            Some(request) => self.items.len() < request.page_size() as usize,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_hundred() {
        let window = PageRequest::default().window();
        assert_eq!(window, RowWindow { offset: 0, limit: 100 });
    }

    #[test]
    fn window_skips_previous_pages() {
        let window = PageRequest::new(3, 25).unwrap().window();
        assert_eq!(window, RowWindow { offset: 50, limit: 25 });
    }

    #[test]
    fn rejects_non_positive_input() {
        assert!(matches!(PageRequest::new(0, 10), Err(DomainError::InvalidArgument(_))));
        assert!(matches!(PageRequest::new(-1, 10), Err(DomainError::InvalidArgument(_))));
        assert!(matches!(PageRequest::new(1, 0), Err(DomainError::InvalidArgument(_))));
        assert!(PageRequest::new(i64::from(u32::MAX) + 1, 10).is_err());
    }

    #[test]
    fn short_page_is_last() {
        let request = PageRequest::new(1, 3).unwrap();
        let page = Page { items: vec![1, 2], request: Some(request) };
        assert!(page.is_last());

        let full = Page { items: vec![1, 2, 3], request: Some(request) };
        assert!(!full.is_last());
    }
}
