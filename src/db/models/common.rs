//! Shared listing plumbing: pagination envelope and filter helpers.

use serde::Serialize;

use crate::config::PaginationConfig;

/// One page of a listing, with the metadata the panel's tables expect.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, current_page: u32, per_page: u32) -> Self {
        let last_page = if total <= 0 {
            1
        } else {
            ((total as u64).div_ceil(per_page.max(1) as u64)) as u32
        };
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }
}

/// Resolve page/per_page query values against the configured defaults.
/// Returns (page, per_page), both >= 1.
pub fn resolve_page(
    page: Option<u32>,
    per_page: Option<u32>,
    config: &PaginationConfig,
) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page
        .unwrap_or(config.default_per_page)
        .clamp(1, config.max_per_page);
    (page, per_page)
}

pub fn limit_offset(page: u32, per_page: u32) -> (i64, i64) {
    (per_page as i64, ((page - 1) as i64) * per_page as i64)
}

/// A filter value counts as present when it is non-empty after trimming.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Exact-match filters additionally skip the `all` sentinel the panel's
/// dropdowns send for "no filter".
pub(crate) fn filter_value(value: &Option<String>) -> Option<&str> {
    present(value).filter(|v| !v.eq_ignore_ascii_case("all"))
}

pub(crate) fn like_pattern(value: &str) -> String {
    format!("%{}%", value)
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_math() {
        let page = Page::new(vec![1, 2, 3], 25, 2, 10);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.current_page, 2);

        let empty: Page<i32> = Page::new(vec![], 0, 1, 10);
        assert_eq!(empty.last_page, 1);
    }

    #[test]
    fn test_resolve_page_defaults() {
        let config = PaginationConfig::default();
        assert_eq!(resolve_page(None, None, &config), (1, 10));
        assert_eq!(resolve_page(Some(0), None, &config), (1, 10));
        assert_eq!(resolve_page(Some(3), Some(25), &config), (3, 25));
        // per_page is clamped to the configured ceiling
        assert_eq!(resolve_page(None, Some(100_000), &config), (1, 100));
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(limit_offset(1, 10), (10, 0));
        assert_eq!(limit_offset(4, 15), (15, 45));
    }

    #[test]
    fn test_filter_value_skips_all_sentinel() {
        assert_eq!(filter_value(&Some("Activo".to_string())), Some("Activo"));
        assert_eq!(filter_value(&Some("all".to_string())), None);
        assert_eq!(filter_value(&Some("ALL".to_string())), None);
        assert_eq!(filter_value(&Some("  ".to_string())), None);
        assert_eq!(filter_value(&None), None);
    }
}
