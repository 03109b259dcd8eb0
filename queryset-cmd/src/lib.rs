//! Filter querysets with Django style expressions.
//!
//! An expression such as `user__username__icontains=bob,age__gte=18`
//! is split into clauses by [`parse`], each clause is resolved against
//! a [`Schema`] into a qualified lookup and a typed [`Value`] by a
//! [`Resolver`], and the result is applied to a [`QuerySet`] by a
//! [`QuerySetFilter`].

pub mod datetime;
pub mod expression;
pub mod filtering;
pub mod fixture;
pub mod operators;
pub mod ordering;
pub mod queryset;
pub mod row;
pub mod schema;
pub mod value;

pub use crate::expression::{parse, Clauses};
pub use crate::filtering::{QueryError, QuerySetFilter, ResolvedQuery, Resolver};
pub use crate::operators::Operator;
pub use crate::ordering::OrderBy;
pub use crate::queryset::{Database, MemoryQuerySet, QuerySet, Row};
pub use crate::schema::{Field, FieldType, Model, Schema};
pub use crate::value::Value;
