//! Filter, sort and paginate

use super::filter::Filter;
use super::pagination::{clamp_page, clamp_page_size, PageRequest, PageResult};
use super::sort::Sortable;
use std::cmp::Reverse;

/// Stable sort by a registered field
///
/// An absent, blank or unregistered field leaves the order untouched.
pub fn sort<T: Sortable>(mut items: Vec<T>, field: Option<&str>, descending: bool) -> Vec<T> {
    let Some(field) = field.and_then(|name| T::sort_registry().lookup(name)) else {
        return items;
    };

    if descending {
        items.sort_by_cached_key(|item| Reverse(field.key(item)));
    } else {
        items.sort_by_cached_key(|item| field.key(item));
    }
    items
}

/// Slice out one page, returning it with the pre-slice count
pub fn paginate<T>(items: Vec<T>, page: i64, page_size: i64) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let page = clamp_page(page);
    let page_size = clamp_page_size(page_size);
    let skip = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
    let take = usize::try_from(page_size).unwrap_or(usize::MAX);

    let slice = items.into_iter().skip(skip).take(take).collect();
    (slice, total)
}

/// Filter, then sort, then paginate
pub fn run<T: Sortable>(items: Vec<T>, filter: &Filter<T>, request: &PageRequest) -> PageResult<T> {
    let filtered = filter.apply(items);
    let sorted = sort(filtered, request.sort_field(), request.sort_desc);
    let (page_items, total) = paginate(sorted, request.page(), request.page_size());
    PageResult::new(page_items, total, request.page(), request.page_size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::sort::SortRegistry;
    use std::sync::OnceLock;

    #[derive(Debug, Clone, PartialEq)]
    struct Txn {
        label: &'static str,
        amount: i64,
    }

    impl Sortable for Txn {
        fn sort_registry() -> &'static SortRegistry<Self> {
            static REGISTRY: OnceLock<SortRegistry<Txn>> = OnceLock::new();
            REGISTRY.get_or_init(|| {
                SortRegistry::new()
                    .field("amount", "amount", |t: &Txn| t.amount.into())
                    .field("label", "label", |t: &Txn| t.label.into())
            })
        }
    }

    fn txns() -> Vec<Txn> {
        vec![
            Txn { label: "a", amount: 30 },
            Txn { label: "b", amount: 10 },
            Txn { label: "c", amount: 30 },
            Txn { label: "d", amount: 20 },
        ]
    }

    fn labels(items: &[Txn]) -> Vec<&'static str> {
        items.iter().map(|t| t.label).collect()
    }

    #[test]
    fn test_sort_ascending_is_stable() {
        let sorted = sort(txns(), Some("amount"), false);
        assert_eq!(labels(&sorted), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_sort_descending_is_stable() {
        let sorted = sort(txns(), Some("AMOUNT"), true);
        assert_eq!(labels(&sorted), vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn test_unknown_or_missing_field_is_noop() {
        assert_eq!(sort(txns(), Some("nonexistent"), true), txns());
        assert_eq!(sort(txns(), Some(""), false), txns());
        assert_eq!(sort(txns(), None, true), txns());
    }

    #[test]
    fn test_paginate_returns_pre_slice_total() {
        let items: Vec<i32> = (1..=47).collect();
        let (page, total) = paginate(items, 5, 10);
        assert_eq!(total, 47);
        assert_eq!(page, vec![41, 42, 43, 44, 45, 46, 47]);
    }

    #[test]
    fn test_paginate_clamps_inputs() {
        let items: Vec<i32> = (1..=300).collect();

        let (page, _) = paginate(items.clone(), 0, 0);
        assert_eq!(page.len(), 10);
        assert_eq!(page[0], 1);

        let (page, _) = paginate(items.clone(), 1, 1000);
        assert_eq!(page.len(), 200);

        let (page, total) = paginate(items, 99, 10);
        assert!(page.is_empty());
        assert_eq!(total, 300);
    }

    #[test]
    fn test_run_filters_before_counting() {
        let filter = Filter::new().range(Some(20), None, |t: &Txn| t.amount);
        let request = PageRequest::new(Some(1), Some(2)).sorted_by("amount", false);
        let result = run(txns(), &filter, &request);

        assert_eq!(result.total_count, 3);
        assert_eq!(result.total_pages(), 2);
        assert_eq!(labels(&result.items), vec!["d", "a"]);
        assert!(result.has_next());
    }
}
