//! Pagination of listing rows (100 rows/page)

/// Page size for all paginated listings
pub const PAGE_SIZE: usize = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    pub total_pages: usize,
    /// Index of the first row on the page
    pub offset: usize,
}

impl Pagination {
    /// The page's rows out of the full result set
    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        let start = self.offset.min(rows.len());
        let end = (self.offset + PAGE_SIZE).min(rows.len());
        &rows[start..end]
    }
}

/// Calculate pagination metadata from total results and requested page
///
/// The page is clamped to `[1, total_pages]`.
///
/// # Examples
/// ```
/// use bnbi_dash::pagination::calculate_pagination;
///
/// // 250 total results = 3 pages (100 + 100 + 50)
/// let p = calculate_pagination(250, 2);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(250, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 200);
/// ```
pub fn calculate_pagination(total_results: usize, requested_page: usize) -> Pagination {
    let total_pages = total_results.div_ceil(PAGE_SIZE);
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * PAGE_SIZE;

    Pagination {
        page,
        total_pages,
        offset,
    }
}
