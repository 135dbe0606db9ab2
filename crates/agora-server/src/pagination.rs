use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// Page selector taken from query parameters. Missing fields fall back to
/// the first page with [`DEFAULT_PAGE_SIZE`] items.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    pub fn validate(self) -> Result<Self> {
        if self.page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(self)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// One page of results with the metadata clients need to render pagers.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: i64, query: PageQuery) -> Self {
        let total_pages = total_items.div_euclid(query.page_size)
            + (total_items.rem_euclid(query.page_size) != 0) as i64;
        Self {
            items,
            page: query.page,
            page_size: query.page_size,
            total_items,
            total_pages,
            has_next_page: query.page < total_pages,
            has_previous_page: query.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: i64, page_size: i64) -> PageQuery {
        PageQuery { page, page_size }
    }

    #[test]
    fn defaults_to_first_page_of_ten() {
        let q = PageQuery::default();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn rejects_out_of_range_queries() {
        assert!(query(0, 10).validate().is_err());
        assert!(query(-3, 10).validate().is_err());
        assert!(query(1, 0).validate().is_err());
        assert!(query(1, MAX_PAGE_SIZE + 1).validate().is_err());
        assert!(query(1, MAX_PAGE_SIZE).validate().is_ok());
    }

    #[test]
    fn computes_offset_from_page() {
        assert_eq!(query(3, 10).offset(), 20);
        assert_eq!(query(1, 25).offset(), 0);
    }

    #[test]
    fn rounds_total_pages_up() {
        let page = Page::new(vec![1, 2, 3], 21, query(1, 10));
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(!page.has_previous_page);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page = Page::<i32>::new(Vec::new(), 0, query(1, 10));
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
        assert!(!page.has_previous_page);
    }

    #[test]
    fn last_page_has_previous_but_not_next() {
        let page = Page::new(vec![1], 21, query(3, 10));
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);
    }
}
