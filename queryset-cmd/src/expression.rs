//! # Parse flat filter expressions
//!
//! Filters arrive as a single string of comma separated clauses, for
//! example from a `--filter` flag:
//!
//! ```text
//! name__contains=Robert,birthday__range=1980-01-01,1980-12-31
//! ```
//!
//! The comma is both the clause separator and the separator inside
//! list valued right hand sides (for `in` and `range`), so a naive
//! split yields fragments with no `=` in them. Such a fragment can
//! only belong to the value of the clause before it, and is joined
//! back on.
//!
//! Example:
//! ```rust
//! use queryset_cmd::expression::parse;
//!
//! let clauses = parse("name=hello,id__in=1,2,3").unwrap();
//! assert_eq!(clauses.get("name"), Some("hello"));
//! assert_eq!(clauses.get("id__in"), Some("1,2,3"));
//! ```

use crate::filtering::QueryError;

/// An insertion ordered map from clause key to raw value.
///
/// Inserting an existing key replaces its value but keeps its
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clauses {
    items: Vec<(String, String)>,
}

impl Clauses {
    pub fn new() -> Self {
        Default::default()
    }

    /// Insert a clause, overwriting the value of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.items.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.items.push((key, value));
        }
    }

    /// Merge `other` into this set, with `other` taking priority.
    pub fn extend(&mut self, other: Clauses) {
        for (k, v) in other.items {
            self.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Clauses
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut c = Clauses::new();
        for (k, v) in iter {
            c.insert(k, v);
        }
        c
    }
}

impl IntoIterator for Clauses {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Parse a comma separated filter expression into [`Clauses`].
///
/// Fragments without an `=` continue the previous clause's value.
/// This fails with [`QueryError::MalformedExpression`] when a
/// fragment has more than one `=`, or when the expression opens with
/// a continuation.
pub fn parse(raw: &str) -> Result<Clauses, QueryError> {
    let mut pending: Vec<(String, String)> = Vec::new();

    for item in raw.split(',') {
        if item.is_empty() {
            continue;
        }
        let parts = item.split('=').collect::<Vec<_>>();
        match parts.as_slice() {
            [key, value] => pending.push((key.to_string(), value.to_string())),
            [fragment] => match pending.last_mut() {
                // id__in=1,2,3
                Some((_, value)) => {
                    value.push(',');
                    value.push_str(fragment);
                }
                None => {
                    return Err(QueryError::MalformedExpression(format!(
                        "'{}' does not continue any clause",
                        fragment
                    )))
                }
            },
            _ => {
                return Err(QueryError::MalformedExpression(format!(
                    "'{}' has more than one '='",
                    item
                )))
            }
        }
    }

    Ok(pending.into_iter().collect())
}
