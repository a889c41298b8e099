//! Optional-predicate filters
//!
//! Every constraint is optional: a filter built from an absent value admits
//! everything, so a request with no filter parameters returns the full
//! collection.

use chrono::{DateTime, Days, NaiveDate, Utc};
use std::fmt;
use tally_common::TallyError;

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Conjunction of predicates over `T`
pub struct Filter<T> {
    predicates: Vec<Predicate<T>>,
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl<T: 'static> Filter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary predicate
    pub fn with<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Require `field(item) == value` when `value` is present
    pub fn eq<V>(self, value: Option<V>, field: fn(&T) -> V) -> Self
    where
        V: PartialEq + Send + Sync + 'static,
    {
        match value {
            Some(expected) => self.with(move |item| field(item) == expected),
            None => self,
        }
    }

    /// Require `min <= field(item) <= max`, each bound applied only when present
    pub fn range<V>(self, min: Option<V>, max: Option<V>, field: fn(&T) -> V) -> Self
    where
        V: PartialOrd + Send + Sync + 'static,
    {
        let filter = match min {
            Some(lower) => self.with(move |item| field(item) >= lower),
            None => self,
        };
        match max {
            Some(upper) => filter.with(move |item| field(item) <= upper),
            None => filter,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, item: &T) -> bool {
        self.predicates.iter().all(|predicate| predicate(item))
    }

    pub fn apply(&self, items: Vec<T>) -> Vec<T> {
        if self.is_empty() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

/// Half-open instant range covering whole days
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayRange {
    /// Inclusive lower bound: midnight UTC at the start date
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound: midnight UTC after the end date
    pub until: Option<DateTime<Utc>>,
}

impl DayRange {
    /// Both dates are inclusive; a start after the end is rejected
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, TallyError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(TallyError::parse(format!(
                    "startDate {} is after endDate {}",
                    start, end
                )));
            }
        }

        Ok(Self {
            from: start.map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc()),
            until: end
                .and_then(|d| d.checked_add_days(Days::new(1)))
                .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc()),
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.until.map_or(true, |until| at < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        owner: u32,
        amount: i64,
    }

    fn items() -> Vec<Item> {
        vec![
            Item { owner: 1, amount: 100 },
            Item { owner: 2, amount: 250 },
            Item { owner: 1, amount: 900 },
        ]
    }

    #[test]
    fn test_absent_values_add_no_constraint() {
        let filter: Filter<Item> = Filter::new()
            .eq(None, |i: &Item| i.owner)
            .range(None, None, |i: &Item| i.amount);
        assert!(filter.is_empty());
        assert_eq!(filter.apply(items()).len(), 3);
    }

    #[test]
    fn test_eq_and_range_combine() {
        let filter = Filter::new()
            .eq(Some(1), |i: &Item| i.owner)
            .range(Some(150), None, |i: &Item| i.amount);
        assert_eq!(filter.apply(items()), vec![Item { owner: 1, amount: 900 }]);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let filter = Filter::new().range(Some(100), Some(250), |i: &Item| i.amount);
        assert_eq!(filter.apply(items()).len(), 2);
    }

    #[test]
    fn test_day_range_is_inclusive_of_end_date() {
        let range = DayRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 1),
            NaiveDate::from_ymd_opt(2026, 1, 31),
        )
        .unwrap();
        let last_moment = NaiveDate::from_ymd_opt(2026, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc();
        let next_day = NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert!(range.contains(last_moment));
        assert!(!range.contains(next_day));
    }

    #[test]
    fn test_day_range_rejects_inverted_bounds() {
        let result = DayRange::new(
            NaiveDate::from_ymd_opt(2026, 2, 1),
            NaiveDate::from_ymd_opt(2026, 1, 1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_open_day_range_admits_everything() {
        assert!(DayRange::default().contains(Utc::now()));
    }
}
