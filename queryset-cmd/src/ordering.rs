//! # Order query results
//!
//! An ordering expression lists the fields that decide the relative
//! position of rows, in priority order. Each field can be prefixed
//! with a `-` to reverse its order, so `"name,-birthday"` means sort
//! by `name`, and for ties use the reverse order of `birthday`. Fields
//! may traverse relations just like filter clauses, as in
//! `user__username`.
//!
//! The expression may also be given as a JSON array of names:
//!
//! ```rust
//! use queryset_cmd::ordering::{parse_order_by, OrderBy};
//!
//! let a = parse_order_by("name,-birthday").unwrap();
//! let b = parse_order_by(r#"["name", "-birthday"]"#).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a[1], OrderBy::descending("birthday"));
//! assert_eq!(a[1].to_string(), "-birthday");
//! ```

use core::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

use crate::filtering::QueryError;
use crate::operators::LOOKUP_SEP;

/// One term of an ordering expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn ascending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn descending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }

    /// The field path, split on `__`.
    pub fn path(&self) -> Vec<&str> {
        self.field.split(LOOKUP_SEP).collect()
    }
}

impl FromStr for OrderBy {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (field, descending) = match s.strip_prefix('-') {
            Some(field) => (field, true),
            None => (s, false),
        };
        if field.is_empty() {
            return Err(QueryError::InvalidOrdering(s.to_string()));
        }
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

/// Parse an ordering expression into its terms.
///
/// Empty terms are ignored, so `""` gives no ordering at all.
pub fn parse_order_by(raw: &str) -> Result<Vec<OrderBy>, QueryError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        let names: Vec<String> = serde_json::from_str(trimmed)
            .map_err(|_| QueryError::InvalidOrdering(raw.to_string()))?;
        return names
            .iter()
            .filter(|n| !n.trim().is_empty())
            .map(|n| n.parse())
            .collect();
    }
    trimmed
        .split(',')
        .filter(|n| !n.trim().is_empty())
        .map(|n| n.parse())
        .collect()
}

/// Compare two values of another type `R`.
///
/// While [`Ord`] is a sensible trait for types that can have only one
/// ordering, it needs to be generalised when a type can have multiple
/// orderings according to some parameterisation. [`Sorter`] is just
/// that generalisation.
pub trait Sorter<R> {
    /// Compare two elements, returning an [`Ordering`].
    fn compare(&self, a: &R, b: &R) -> Ordering;

    /// Sort a [`Vec`] in place.
    fn sort_vec(&self, vec: &mut Vec<R>) {
        vec.sort_by(|x, y| self.compare(x, y))
    }

    /// Sort a [`Vec`] of references in place.
    fn sort_ref_vec(&self, vec: &mut Vec<&R>) {
        vec.sort_by(|x, y| self.compare(x, y))
    }
}

/// A [`Sorter`] which reverses the order of another.
pub struct Reverser<S> {
    inner: S,
}

impl<S> Reverser<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<R, S> Sorter<R> for Reverser<S>
where
    S: Sorter<R>,
{
    fn compare(&self, a: &R, b: &R) -> Ordering {
        self.inner.compare(a, b).reverse()
    }
}

/// A [`Sorter`] which consults each of a list of sorters in turn,
/// until one of them can tell the elements apart.
pub struct StackedSorter<'s, R> {
    sorters: Vec<Box<dyn Sorter<R> + 's>>,
}

impl<'s, R> StackedSorter<'s, R> {
    pub fn new(sorters: Vec<Box<dyn Sorter<R> + 's>>) -> Self {
        Self { sorters }
    }
}

impl<'s, R> Sorter<R> for StackedSorter<'s, R> {
    fn compare(&self, a: &R, b: &R) -> Ordering {
        for sorter in &self.sorters {
            match sorter.compare(a, b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}
