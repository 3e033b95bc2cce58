use serde::{Deserialize, Serialize};

/// `?page=N`, 1-based. Missing or zero means the first page.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit_offset(&self, per_page: u32) -> (i64, i64) {
        let per_page = per_page.max(1) as i64;
        (per_page, (self.page() as i64 - 1) * per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Wraps one already-fetched page of a larger result set.
    pub fn from_slice(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        Page {
            items,
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page as u64) as u32,
        }
    }

    /// Cuts page `page` out of a fully materialized, already-sorted list.
    pub fn paginate(all: Vec<T>, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total = all.len() as u64;
        let start = (page.max(1) as usize - 1).saturating_mul(per_page as usize);
        let items = all
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Page::from_slice(items, page.max(1), per_page, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_to_one() {
        assert_eq!(PageQuery::default().page(), 1);
        assert_eq!(PageQuery { page: Some(0) }.page(), 1);
        assert_eq!(PageQuery { page: Some(3) }.limit_offset(10), (10, 20));
    }

    #[test]
    fn test_paginate_slices_and_counts() {
        let page = Page::paginate((1..=20).collect::<Vec<_>>(), 3, 9);
        assert_eq!(page.items, vec![19, 20]);
        assert_eq!(page.total, 20);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_paginate_past_end_is_empty() {
        let page = Page::paginate(vec![1, 2, 3], 5, 9);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_empty_result_has_zero_pages() {
        let page: Page<u8> = Page::paginate(vec![], 1, 12);
        assert_eq!(page.total_pages, 0);
    }
}
