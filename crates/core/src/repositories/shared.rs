//! Helpers shared by the entity repositories: pagination, search patterns,
//! timestamps and translation of constraint violations.

use crate::constants::{DEFAULT_PER_PAGE, MAX_PER_PAGE, TIMESTAMP_FORMAT};
use crate::ClinicError;

/// A normalised `page` / `per_page` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    per_page: i64,
}

impl PageRequest {
    /// `page` defaults to 1 and is never below 1; `per_page` defaults to
    /// [`DEFAULT_PER_PAGE`] and is clamped to `1..=MAX_PER_PAGE`.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results together with the totals needed to render a pager.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let per_page = request.per_page();
        Self {
            items,
            total,
            pages: (total + per_page - 1) / per_page,
            current_page: request.page(),
            per_page,
        }
    }
}

/// Current UTC time in the storage format.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Builds a `LIKE` pattern matching `search` anywhere, or `None` for a blank search.
///
/// Queries using the pattern must declare `ESCAPE '\'`.
pub fn like_pattern(search: Option<&str>) -> Option<String> {
    let search = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// The `table.column` named by a SQLite unique-constraint failure.
pub(crate) fn unique_violation_column(err: &sqlx::Error) -> Option<&str> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    let columns = db_err.message().strip_prefix("UNIQUE constraint failed: ")?;
    columns.split(", ").next()
}

/// Maps unique violations on known columns to [`ClinicError::Conflict`].
///
/// `messages` pairs a `table.column` with the client-facing message.
pub(crate) fn conflict_on_unique(err: sqlx::Error, messages: &[(&str, &str)]) -> ClinicError {
    let message = unique_violation_column(&err).map(|column| {
        messages
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, message)| (*message).to_owned())
            .unwrap_or_else(|| format!("Duplicate value for {column}"))
    });
    match message {
        Some(message) => ClinicError::Conflict(message),
        None => ClinicError::Database(err),
    }
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_foreign_key_violation())
}

/// Maps a restricted delete to [`ClinicError::Conflict`].
pub(crate) fn conflict_on_reference(err: sqlx::Error, message: &str) -> ClinicError {
    if is_foreign_key_violation(&err) {
        ClinicError::conflict(message)
    } else {
        ClinicError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_clamps() {
        let req = PageRequest::new(None, None);
        assert_eq!((req.page(), req.per_page(), req.offset()), (1, 10, 0));

        let req = PageRequest::new(Some(0), Some(1_000));
        assert_eq!((req.page(), req.per_page()), (1, 100));

        let req = PageRequest::new(Some(3), Some(0));
        assert_eq!((req.page(), req.per_page(), req.offset()), (3, 1, 2));
    }

    #[test]
    fn page_count_rounds_up() {
        let req = PageRequest::new(Some(2), Some(10));
        let page: Page<()> = Page::new(vec![], 21, req);
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(Page::<()>::new(vec![], 0, req).pages, 0);
        assert_eq!(Page::<()>::new(vec![], 10, req).pages, 1);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(Some(" ana ")).as_deref(), Some("%ana%"));
        assert_eq!(like_pattern(Some("50%_")).as_deref(), Some("%50\\%\\_%"));
    }
}
