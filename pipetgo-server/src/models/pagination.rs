//! Pagination types for catalog listings

use serde::{Deserialize, Serialize};

/// Maximum items per page
const MAX_PAGE_SIZE: u32 = 50;

/// Default items per page
const DEFAULT_PAGE_SIZE: u32 = 12;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (max 50)
    pub page_size: u32,
}

impl Pagination {
    /// Create pagination with validation.
    ///
    /// - Page is clamped to minimum of 1
    /// - Page size is clamped to 1..=50
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Page metadata returned next to the items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: u32,
    pub has_more: bool,
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items for current page
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_count: i64, page: Pagination) -> Self {
        let total_pages = total_pages(total_count, page.page_size);
        Self {
            items,
            pagination: PageInfo {
                page: page.page,
                page_size: page.page_size,
                total_count,
                total_pages,
                has_more: page.page < total_pages,
            },
        }
    }
}

/// Number of pages for `total` items; zero items means zero pages.
fn total_pages(total: i64, page_size: u32) -> u32 {
    if total <= 0 {
        return 0;
    }
    let size = page_size.max(1) as i64;
    ((total + size - 1) / size) as u32
}

/// Query parameters for pagination.
///
/// Values arrive as strings so that garbage input falls back to defaults
/// instead of rejecting the whole query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl From<&PaginationParams> for Pagination {
    fn from(params: &PaginationParams) -> Self {
        let parse = |v: &Option<String>, default: u32| {
            v.as_deref()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map(|n| n.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or(default)
        };
        Self::new(
            parse(&params.page, 1),
            parse(&params.page_size, DEFAULT_PAGE_SIZE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_calculation() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(2, 10);
        assert_eq!(p.offset(), 10);

        let p = Pagination::new(3, 25);
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn clamps_page() {
        let p = Pagination::new(0, 10);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn clamps_page_size() {
        let p = Pagination::new(1, 0);
        assert_eq!(p.page_size, 1);

        let p = Pagination::new(1, 999);
        assert_eq!(p.page_size, 50);
    }

    #[test]
    fn params_fall_back_to_defaults() {
        let params = PaginationParams {
            page: Some("abc".into()),
            page_size: None,
        };
        assert_eq!(Pagination::from(&params), Pagination::default());

        let params = PaginationParams {
            page: Some("-4".into()),
            page_size: Some("100".into()),
        };
        assert_eq!(Pagination::from(&params), Pagination::new(1, 50));
    }

    #[test]
    fn page_info() {
        let page: Paginated<()> = Paginated::new(vec![], 0, Pagination::new(1, 12));
        assert_eq!(page.pagination.total_pages, 0);
        assert!(!page.pagination.has_more);

        let page: Paginated<()> = Paginated::new(vec![], 25, Pagination::new(1, 12));
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_more);

        let page: Paginated<()> = Paginated::new(vec![], 25, Pagination::new(3, 12));
        assert!(!page.pagination.has_more);
    }
}
