//! Offset pagination envelopes shared by every listing.

use serde::{Deserialize, Serialize};

/// A 0-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Slices an already ordered collection into this page.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total_items = items.len() as u64;
        let content = items
            .into_iter()
            .skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(self.size as usize)
            .collect();
        Page::new(content, *self, total_items)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 5 }
    }
}

/// One page of an ordered listing plus the paging metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = if request.size == 0 {
            0
        } else {
            total_items.div_ceil(u64::from(request.size))
        };
        Self {
            content,
            page: request.page,
            size: request.size,
            total_items,
            total_pages,
        }
    }

    /// Converts the content while keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_middle_page() {
        let page = PageRequest::new(1, 2).slice(vec![1, 2, 3, 4, 5]);
        assert_eq!(page.content, vec![3, 4]);
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = PageRequest::new(7, 2).slice(vec![1, 2, 3]);
        assert!(page.content.is_empty());
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn zero_size_yields_no_pages() {
        let page = PageRequest::new(0, 0).slice(vec![1, 2, 3]);
        assert!(page.content.is_empty());
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn map_keeps_metadata() {
        let page = PageRequest::new(0, 2).slice(vec![1, 2, 3]).map(|n| n * 10);
        assert_eq!(page.content, vec![10, 20]);
        assert_eq!(page.total_pages, 2);
    }
}
