//! # Execute resolved queries
//!
//! [`QuerySet`] is the interface to whatever actually stores the data:
//! it accepts [`ResolvedQuery`] values for filtering and exclusion,
//! [`OrderBy`] terms for ordering, and a limit. This crate provides
//! one implementation, [`MemoryQuerySet`], over the rows of an
//! in-memory [`Database`].
//!
//! Example:
//! ```rust
//! use queryset_cmd::filtering::{QuerySetFilter, Resolver};
//! use queryset_cmd::expression::parse;
//! use queryset_cmd::queryset::{Database, QuerySet, Row};
//! use queryset_cmd::schema::{FieldType, ModelSchema, Registry};
//! use queryset_cmd::value::Value;
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     ModelSchema::new("people.Person")
//!         .field("id", FieldType::Integer)
//!         .field("name", FieldType::Text),
//! );
//! let mut db = Database::new(registry);
//! for (id, name) in [(1, "Robert"), (2, "Alice"), (3, "Roberta")] {
//!     db.insert(
//!         "people.Person",
//!         Row::new(Value::Int(id)).with("id", Value::Int(id)).with("name", Value::from(name)),
//!     )
//!     .unwrap();
//! }
//!
//! let mut f = QuerySetFilter::new(Resolver::new());
//! f.add_filter(parse("name__contains=Robert").unwrap());
//! let qs = f.apply(db.all("people.Person").unwrap(), Some("-id"), None).unwrap();
//! assert_eq!(qs.count(), 2);
//! assert_eq!(qs.rows()[0].pk(), &Value::Int(3));
//! ```

use core::cmp::Ordering;
use std::collections::BTreeMap;

use log::trace;
use thiserror::Error;

use crate::filtering::ops::{evaluate, instantiate, ConditionError};
use crate::filtering::{walk, ResolvedQuery};
use crate::operators::Lookup;
use crate::ordering::{OrderBy, Reverser, Sorter, StackedSorter};
use crate::schema::{ModelRef, ModelSchema, Registry, Schema};
use crate::value::Value;

/// The operations the filter backend needs from a query engine.
pub trait QuerySet: Sized {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The schema of the entity this queryset returns.
    fn schema(&self) -> &dyn Schema;

    /// Remove rows which match every lookup in `query`. An empty
    /// query removes nothing.
    fn exclude(self, query: &ResolvedQuery) -> Result<Self, Self::Error>;

    /// Keep only rows which match every lookup in `query`.
    fn filter(self, query: &ResolvedQuery) -> Result<Self, Self::Error>;

    /// Sort by `ordering`, the first term taking priority.
    fn order_by(self, ordering: &[OrderBy]) -> Result<Self, Self::Error>;

    /// Keep at most `limit` rows.
    fn limit(self, limit: usize) -> Self;

    fn count(&self) -> usize;
}

/// Errors produced by [`MemoryQuerySet`] and [`Database`].
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("no such model '{0}'")]
    NoModel(String),
    #[error("cannot resolve '{field}' on {model}")]
    NoField { field: String, model: String },
    #[error(transparent)]
    Condition(#[from] ConditionError),
}

/// One stored row: a primary key, and values by field name.
///
/// A relation field stores the primary key of the related row, or a
/// list of them for a multi-valued relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pk: Value,
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(pk: Value) -> Self {
        Self {
            pk,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
    }

    pub fn pk(&self) -> &Value {
        &self.pk
    }

    /// The stored value of `field`; absent fields are null.
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&Value::Null)
    }
}

/// Rows for every model of a [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct Database {
    registry: Registry,
    tables: BTreeMap<String, Vec<Row>>,
}

impl Database {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            tables: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Add a row to the table of the model labelled `label`.
    pub fn insert(&mut self, label: &str, row: Row) -> Result<(), MemoryError> {
        let model = self
            .registry
            .model(label)
            .ok_or_else(|| MemoryError::NoModel(label.to_string()))?;
        self.tables
            .entry(model.label().to_lowercase())
            .or_default()
            .push(row);
        Ok(())
    }

    pub fn rows(&self, model: &ModelSchema) -> &[Row] {
        self.tables
            .get(&model.label().to_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Find the row of `model` whose primary key equals `pk`.
    pub fn get(&self, model: &ModelSchema, pk: &Value) -> Option<&Row> {
        self.rows(model).iter().find(|r| r.pk() == pk)
    }

    /// A queryset of every row of the model labelled `label`.
    pub fn all(&self, label: &str) -> Result<MemoryQuerySet<'_>, MemoryError> {
        let model = self
            .registry
            .get(label)
            .ok_or_else(|| MemoryError::NoModel(label.to_string()))?;
        Ok(MemoryQuerySet {
            db: self,
            model,
            rows: self.rows(model.model()).iter().collect(),
        })
    }

    /// The value at the end of `path`, starting from `row` of `model`.
    ///
    /// Relations are followed through the stored primary keys; a
    /// multi-valued relation yields a list with one entry per related
    /// row. Dangling keys read as null.
    pub fn value_at(
        &self,
        model: &ModelSchema,
        row: &Row,
        path: &[&str],
    ) -> Result<Value, MemoryError> {
        let no_field = |field: &str| MemoryError::NoField {
            field: field.to_string(),
            model: model.label().to_string(),
        };

        let (head, rest) = path.split_first().ok_or_else(|| no_field(""))?;
        let def = model.field_def(head).ok_or_else(|| no_field(head))?;
        let value = if def.name == model.pk() {
            row.pk().clone()
        } else {
            row.get(&def.name).clone()
        };

        if rest.is_empty() {
            return Ok(value);
        }

        let related = def
            .relation
            .as_ref()
            .and_then(|target| self.registry.model(target))
            .ok_or_else(|| no_field(rest[0]))?;

        match value {
            Value::Null => Ok(Value::Null),
            Value::List(pks) => pks
                .iter()
                .map(|pk| self.follow(related, pk, rest))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            pk => self.follow(related, &pk, rest),
        }
    }

    fn follow(&self, model: &ModelSchema, pk: &Value, path: &[&str]) -> Result<Value, MemoryError> {
        match self.get(model, pk) {
            Some(row) => self.value_at(model, row, path),
            None => Ok(Value::Null),
        }
    }
}

/// A [`QuerySet`] over the rows of one model in a [`Database`].
///
/// Rows are borrowed from the database, so filtering never alters it,
/// and applying the same query twice gives the same result.
#[derive(Clone)]
pub struct MemoryQuerySet<'d> {
    db: &'d Database,
    model: ModelRef<'d>,
    rows: Vec<&'d Row>,
}

impl<'d> MemoryQuerySet<'d> {
    pub fn model(&self) -> &'d ModelSchema {
        self.model.model()
    }

    pub fn rows(&self) -> &[&'d Row] {
        &self.rows
    }

    fn matches(&self, row: &Row, query: &ResolvedQuery) -> Result<bool, MemoryError> {
        for (key, rhs) in query.iter() {
            let lookup = Lookup::split(key);
            let cond = instantiate(lookup.operator, rhs)?;
            let value = self.db.value_at(self.model(), row, &lookup.path)?;
            if !evaluate(cond.as_ref(), &value) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn retain(mut self, query: &ResolvedQuery, keep_matches: bool) -> Result<Self, MemoryError> {
        let rows = std::mem::take(&mut self.rows);
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if self.matches(row, query)? == keep_matches {
                kept.push(row);
            }
        }
        self.rows = kept;
        Ok(self)
    }
}

struct PathSorter<'d> {
    db: &'d Database,
    model: &'d ModelSchema,
    path: Vec<String>,
}

impl<'d> PathSorter<'d> {
    fn key(&self, row: &Row) -> Value {
        let path = self.path.iter().map(|s| s.as_str()).collect::<Vec<_>>();
        // Paths are checked against the schema before sorting.
        self.db
            .value_at(self.model, row, &path)
            .unwrap_or(Value::Null)
    }
}

impl<'d> Sorter<Row> for PathSorter<'d> {
    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        self.key(a).sort_cmp(&self.key(b))
    }
}

impl<'d> QuerySet for MemoryQuerySet<'d> {
    type Error = MemoryError;

    fn schema(&self) -> &dyn Schema {
        &self.model
    }

    fn exclude(self, query: &ResolvedQuery) -> Result<Self, Self::Error> {
        if query.is_empty() {
            return Ok(self);
        }
        trace!("Excluding {:?} from {}", query, self.model().label());
        self.retain(query, false)
    }

    fn filter(self, query: &ResolvedQuery) -> Result<Self, Self::Error> {
        trace!("Filtering {} by {:?}", self.model().label(), query);
        self.retain(query, true)
    }

    fn order_by(mut self, ordering: &[OrderBy]) -> Result<Self, Self::Error> {
        let mut sorters: Vec<Box<dyn Sorter<Row> + 'd>> = Vec::new();
        for term in ordering {
            let path = term.path();
            walk(&self.model, &path).map_err(|(field, model)| MemoryError::NoField { field, model })?;
            let sorter = PathSorter {
                db: self.db,
                model: self.model(),
                path: path.iter().map(|s| s.to_string()).collect(),
            };
            if term.descending {
                sorters.push(Box::new(Reverser::new(sorter)));
            } else {
                sorters.push(Box::new(sorter));
            }
        }
        StackedSorter::new(sorters).sort_ref_vec(&mut self.rows);
        Ok(self)
    }

    fn limit(mut self, limit: usize) -> Self {
        self.rows.truncate(limit);
        self
    }

    fn count(&self) -> usize {
        self.rows.len()
    }
}
