//! Sort-field registries
//!
//! Each sortable type publishes an allow-list of field names. A name maps to
//! a typed key accessor for in-memory sorting and to the SQL column the
//! PostgreSQL stores order by, so both paths accept the same names.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Comparable projection of a single field
///
/// A given field always yields the same variant (or `Null`), so the derived
/// ordering only ever compares like with like. `Null` sorts first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Null,
    Bool(bool),
    Int(i64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Text(String),
    Uuid(Uuid),
}

impl From<bool> for SortKey {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SortKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<NaiveDate> for SortKey {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for SortKey {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<&str> for SortKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SortKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for SortKey {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl<T: Into<SortKey>> From<Option<T>> for SortKey {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One allow-listed sort field
pub struct SortField<T> {
    pub name: &'static str,
    pub column: &'static str,
    key: fn(&T) -> SortKey,
}

impl<T> SortField<T> {
    pub fn key(&self, item: &T) -> SortKey {
        (self.key)(item)
    }
}

impl<T> std::fmt::Debug for SortField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortField")
            .field("name", &self.name)
            .field("column", &self.column)
            .finish()
    }
}

/// Allow-list of sortable fields for `T`
#[derive(Debug)]
pub struct SortRegistry<T> {
    fields: Vec<SortField<T>>,
}

impl<T> Default for SortRegistry<T> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<T> SortRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, sorted in SQL by `column`
    pub fn field(mut self, name: &'static str, column: &'static str, key: fn(&T) -> SortKey) -> Self {
        self.fields.push(SortField { name, column, key });
        self
    }

    /// Find a field by name
    ///
    /// Matching ignores ASCII case and underscores, so `createdAt`,
    /// `CreatedAt` and `created_at` all resolve to the same entry.
    pub fn lookup(&self, name: &str) -> Option<&SortField<T>> {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }
        self.fields.iter().find(|field| normalize(field.name) == wanted)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Types with a published sort allow-list
pub trait Sortable: Sized + 'static {
    fn sort_registry() -> &'static SortRegistry<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: String,
        score: Option<i64>,
    }

    fn registry() -> SortRegistry<Row> {
        SortRegistry::new()
            .field("name", "name", |r: &Row| r.name.as_str().into())
            .field("highScore", "high_score", |r: &Row| r.score.into())
    }

    #[test]
    fn test_lookup_ignores_case_and_underscores() {
        let registry = registry();
        assert_eq!(registry.lookup("NAME").unwrap().column, "name");
        assert_eq!(registry.lookup("high_score").unwrap().name, "highScore");
        assert_eq!(registry.lookup(" HighScore ").unwrap().column, "high_score");
    }

    #[test]
    fn test_lookup_unknown_or_empty() {
        let registry = registry();
        assert!(registry.lookup("password").is_none());
        assert!(registry.lookup("").is_none());
        assert!(registry.lookup("__").is_none());
    }

    #[test]
    fn test_null_sorts_first() {
        let row = Row {
            name: "a".into(),
            score: None,
        };
        let key = registry().lookup("highScore").unwrap().key(&row);
        assert_eq!(key, SortKey::Null);
        assert!(SortKey::Null < SortKey::Int(i64::MIN));
    }

    #[test]
    fn test_names_lists_registered_fields() {
        let names: Vec<_> = registry().names().collect();
        assert_eq!(names, vec!["name", "highScore"]);
    }
}
