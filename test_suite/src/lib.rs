use chrono::FixedOffset;
use queryset_cmd::fixture::load_str;
use queryset_cmd::queryset::{Database, MemoryQuerySet};
use queryset_cmd::value::Value;

pub const PEOPLE: &str = include_str!("people.json");

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// Users bob, alice and carol, and four people who refer to them.
pub fn people() -> Database {
    load_str(PEOPLE, &utc()).unwrap()
}

/// The primary keys of the rows of `qs`, in order.
pub fn pks(qs: &MemoryQuerySet<'_>) -> Vec<i64> {
    qs.rows()
        .iter()
        .map(|r| match r.pk() {
            Value::Int(i) => *i,
            other => panic!("unexpected pk {:?}", other),
        })
        .collect()
}

#[cfg(test)]
mod model;
#[cfg(test)]
mod queryset;
#[cfg(test)]
mod resolving;
