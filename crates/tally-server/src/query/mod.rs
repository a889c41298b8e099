//! Generic filter, sort and paginate pipeline
//!
//! Any entity collection can be narrowed with a [`Filter`], ordered by a
//! caller-supplied field name resolved through the type's [`SortRegistry`],
//! and sliced into a [`PageResult`]. No per-entity query code is needed.

pub mod engine;
pub mod filter;
pub mod pagination;
pub mod sort;

pub use engine::{paginate, run, sort};
pub use filter::{DayRange, Filter};
pub use pagination::{PageRequest, PageResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use sort::{SortField, SortKey, SortRegistry, Sortable};
