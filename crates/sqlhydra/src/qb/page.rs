//! Offset pagination results.

use serde::Serialize;

/// Page size used when a caller passes `per_page < 1`.
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Clamp page to `>= 1` and fall back to [`DEFAULT_PER_PAGE`] for a non-positive page size.
pub fn normalize_page(page: i64, per_page: i64) -> (i64, i64) {
    let page = page.max(1);
    let per_page = if per_page < 1 { DEFAULT_PER_PAGE } else { per_page };
    (page, per_page)
}

/// One page of results plus the totals needed to render a pager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub current_page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Assemble a page; `page` and `per_page` are normalized.
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let (current_page, per_page) = normalize_page(page, per_page);
        let total = total.max(0);
        Self {
            items,
            total,
            current_page,
            per_page,
            total_pages: total / per_page + i64::from(total % per_page != 0),
        }
    }

    /// Map the items, keeping the totals.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            current_page: self.current_page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        })
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_inputs() {
        assert_eq!(normalize_page(0, 2), (1, 2));
        assert_eq!(normalize_page(-3, 0), (1, 10));
        assert_eq!(normalize_page(4, 25), (4, 25));
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(vec![1, 2], 5, 2, 2);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
        assert!(page.has_prev());

        let empty: Page<i32> = Page::new(vec![], 0, 1, 0);
        assert_eq!(empty.per_page, 10);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next());

        let huge: Page<i32> = Page::new(vec![], 7, 1, i64::MAX);
        assert_eq!(huge.total_pages, 1);
    }

    #[test]
    fn try_map_keeps_totals() {
        let page = Page::new(vec!["1", "2"], 2, 1, 10);
        let mapped: Page<i64> = page.try_map(|s| s.parse::<i64>()).unwrap();
        assert_eq!(mapped.items, vec![1, 2]);
        assert_eq!(mapped.total, 2);
    }
}
