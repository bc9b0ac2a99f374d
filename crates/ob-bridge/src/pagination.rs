//! Offset pagination: the shared response envelope and request constraints.
//!
//! Every list endpoint enforces `limit ∈ [1, 100]` and `offset ≥ 0`;
//! violations are 422 problems. Defaults are declared per endpoint
//! (campaigns 10, everything else 20).

use serde::Serialize;

use crate::problem::Problem;

pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_LIMIT_CAMPAIGNS: i64 = 10;
pub const DEFAULT_LIMIT: i64 = 20;

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Resolve optional query values against a default, enforcing the
    /// boundary constraints.
    pub fn resolve(
        limit: Option<i64>,
        offset: Option<i64>,
        default_limit: i64,
    ) -> Result<Page, Problem> {
        let limit = limit.unwrap_or(default_limit);
        let offset = offset.unwrap_or(0);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(Problem::http(
                422,
                format!("limit must be between 1 and {MAX_LIMIT}, got {limit}"),
            ));
        }
        if offset < 0 {
            return Err(Problem::http(422, format!("offset must be >= 0, got {offset}")));
        }
        Ok(Page { limit, offset })
    }
}

/// The list response envelope: `{items, total, limit, offset}`.
#[derive(Debug, Clone, Serialize)]
pub struct OffsetPaginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> OffsetPaginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let page = Page::resolve(None, None, DEFAULT_LIMIT).unwrap();
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 0);

        let page = Page::resolve(None, None, DEFAULT_LIMIT_CAMPAIGNS).unwrap();
        assert_eq!(page.limit, 10);
    }

    #[test]
    fn explicit_values_pass_through() {
        let page = Page::resolve(Some(2), Some(4), DEFAULT_LIMIT).unwrap();
        assert_eq!(page, Page { limit: 2, offset: 4 });
        assert!(Page::resolve(Some(1), Some(0), DEFAULT_LIMIT).is_ok());
        assert!(Page::resolve(Some(100), Some(0), DEFAULT_LIMIT).is_ok());
    }

    #[test]
    fn limit_zero_is_rejected_with_422() {
        let err = Page::resolve(Some(0), None, DEFAULT_LIMIT).unwrap_err();
        assert_eq!(err.status, 422);
        assert_eq!(err.title, "Unprocessable Entity");
    }

    #[test]
    fn limit_101_is_rejected_with_422() {
        let err = Page::resolve(Some(101), None, DEFAULT_LIMIT).unwrap_err();
        assert_eq!(err.status, 422);
    }

    #[test]
    fn negative_offset_is_rejected_with_422() {
        let err = Page::resolve(None, Some(-1), DEFAULT_LIMIT).unwrap_err();
        assert_eq!(err.status, 422);
    }

    #[test]
    fn envelope_carries_window_back() {
        let page = Page::resolve(Some(2), Some(6), DEFAULT_LIMIT).unwrap();
        let paginated = OffsetPaginated::new(vec!["a", "b"], 9, page);
        assert_eq!(paginated.total, 9);
        assert_eq!(paginated.limit, 2);
        assert_eq!(paginated.offset, 6);
        assert!(paginated.items.len() <= paginated.limit as usize);
    }
}
