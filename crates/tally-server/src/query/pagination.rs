//! Page requests and page results
//!
//! Requests are clamped rather than rejected: a page below 1 becomes 1, a
//! page size below 1 falls back to the default and anything above the cap is
//! cut down to it.

use serde::{Deserialize, Serialize};

/// Page size used when the caller sends none, or a non-positive one
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page a caller may ask for
pub const MAX_PAGE_SIZE: i64 = 200;

/// Paging and sorting parameters from the query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    #[serde(alias = "page_size", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,

    #[serde(alias = "sort_by", skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,

    #[serde(alias = "sort_desc", default)]
    pub sort_desc: bool,
}

impl PageRequest {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.sort_by = Some(field.into());
        self.sort_desc = descending;
        self
    }

    /// Effective page number (1-indexed)
    pub fn page(&self) -> i64 {
        clamp_page(self.page.unwrap_or(1))
    }

    /// Effective page size after clamping
    pub fn page_size(&self) -> i64 {
        clamp_page_size(self.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    /// Number of rows to skip
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.page_size())
    }

    /// Sort field, treating blank input as absent
    pub fn sort_field(&self) -> Option<&str> {
        self.sort_by
            .as_deref()
            .map(str::trim)
            .filter(|field| !field.is_empty())
    }
}

pub(crate) fn clamp_page(page: i64) -> i64 {
    page.max(1)
}

pub(crate) fn clamp_page_size(page_size: i64) -> i64 {
    if page_size < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size.min(MAX_PAGE_SIZE)
    }
}

/// One page of results
///
/// Only the four stored fields are kept; `total_pages`, `has_next` and
/// `has_previous` are derived on demand and on serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total_count: i64, page: i64, page_size: i64) -> Self {
        Self {
            items,
            total_count,
            page,
            page_size,
        }
    }

    pub fn empty(request: &PageRequest) -> Self {
        Self::new(Vec::new(), 0, request.page(), request.page_size())
    }

    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        (self.total_count + self.page_size - 1) / self.page_size
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Transform the items, keeping the paging metadata
    pub fn map<U, F>(self, f: F) -> PageResult<U>
    where
        F: FnMut(T) -> U,
    {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageResultWire<'a, T> {
    items: &'a [T],
    total_count: i64,
    page: i64,
    page_size: i64,
    total_pages: i64,
    has_next: bool,
    has_previous: bool,
}

impl<T: Serialize> Serialize for PageResult<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PageResultWire {
            items: &self.items,
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages(),
            has_next: self.has_next(),
            has_previous: self.has_previous(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_page_request_defaults() {
        let request = PageRequest::default();
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 0);
        assert_eq!(request.sort_field(), None);
    }

    #[test]
    fn test_page_request_clamping() {
        assert_eq!(PageRequest::new(Some(0), None).page(), 1);
        assert_eq!(PageRequest::new(Some(-4), None).page(), 1);
        assert_eq!(PageRequest::new(None, Some(0)).page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::new(None, Some(-1)).page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::new(None, Some(500)).page_size(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(None, Some(200)).page_size(), 200);
    }

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_blank_sort_field_is_absent() {
        let request = PageRequest::default().sorted_by("   ", true);
        assert_eq!(request.sort_field(), None);
    }

    #[test]
    fn test_page_request_deserializes_camel_case() {
        let request: PageRequest = serde_json::from_value(serde_json::json!({
            "page": 2,
            "pageSize": 25,
            "sortBy": "amount",
            "sortDesc": true
        }))
        .unwrap();
        assert_eq!(request.page(), 2);
        assert_eq!(request.page_size(), 25);
        assert_eq!(request.sort_field(), Some("amount"));
        assert!(request.sort_desc);
    }

    #[test]
    fn test_forty_seven_items_in_pages_of_ten() {
        let first: PageResult<u8> = PageResult::new(vec![], 47, 1, 10);
        assert_eq!(first.total_pages(), 5);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last: PageResult<u8> = PageResult::new(vec![], 47, 5, 10);
        assert!(!last.has_next());
        assert!(last.has_previous());
    }

    #[test]
    fn test_empty_result() {
        let result: PageResult<u8> = PageResult::empty(&PageRequest::default());
        assert_eq!(result.total_pages(), 0);
        assert!(!result.has_next());
        assert!(!result.has_previous());
    }

    #[test]
    fn test_serialized_shape_includes_derived_fields() {
        let result = PageResult::new(vec![1, 2], 12, 1, 2);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["totalCount"], 12);
        assert_eq!(value["pageSize"], 2);
        assert_eq!(value["totalPages"], 6);
        assert_eq!(value["hasNext"], true);
        assert_eq!(value["hasPrevious"], false);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let result = PageResult::new(vec![1, 2, 3], 30, 2, 3).map(|n| n * 10);
        assert_eq!(result.items, vec![10, 20, 30]);
        assert_eq!(result.total_count, 30);
        assert_eq!(result.page, 2);
    }

    proptest! {
        #[test]
        fn prop_total_pages_is_ceiling(total in 0i64..100_000, size in 1i64..=MAX_PAGE_SIZE) {
            let result: PageResult<()> = PageResult::new(vec![], total, 1, size);
            let pages = result.total_pages();
            prop_assert!(pages * size >= total);
            prop_assert!((pages - 1).max(0) * size < total.max(1));
        }

        #[test]
        fn prop_has_flags_follow_page(total in 0i64..10_000, size in 1i64..=MAX_PAGE_SIZE, page in 1i64..100) {
            let result: PageResult<()> = PageResult::new(vec![], total, page, size);
            prop_assert_eq!(result.has_next(), page < result.total_pages());
            prop_assert_eq!(result.has_previous(), page > 1);
        }

        #[test]
        fn prop_clamped_values_are_in_range(page in any::<i64>(), size in any::<i64>()) {
            let request = PageRequest::new(Some(page), Some(size));
            prop_assert!(request.page() >= 1);
            prop_assert!((1..=MAX_PAGE_SIZE).contains(&request.page_size()));
        }
    }
}
