//! # Resolve filter clauses against a schema
//!
//! Django encodes queries as `lhs=rhs` pairs, where the left hand side
//! names a field, possibly inside related entities, followed by an
//! optional operator: `user__username__icontains=bob` means "the
//! `username` of the related `user` contains `bob`, ignoring case".
//!
//! A [`Resolver`] turns such a clause into a fully qualified lookup
//! key and a typed [`Value`], by walking the field path through a
//! [`Schema`] and coercing the right hand side according to the type
//! of the field it lands on. A [`QuerySetFilter`] collects clauses
//! from command line flags or query parameters, resolves them, and
//! applies them to a [`QuerySet`].
//!
//! Example:
//! ```rust
//! use queryset_cmd::filtering::Resolver;
//! use queryset_cmd::schema::{FieldType, ModelSchema, Registry};
//! use queryset_cmd::value::Value;
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     ModelSchema::new("people.Person")
//!         .field("name", FieldType::Text)
//!         .field("age", FieldType::Integer),
//! );
//! let person = registry.get("people.Person").unwrap();
//!
//! let resolver = Resolver::new();
//! let (key, value) = resolver.resolve(&person, "age__gt", "30").unwrap().unwrap();
//! assert_eq!(key, "age__gt");
//! assert_eq!(value, Value::Int(30));
//!
//! let (key, value) = resolver.resolve(&person, "name", "Robert").unwrap().unwrap();
//! assert_eq!(key, "name__exact");
//! assert_eq!(value, Value::Str("Robert".to_string()));
//! ```
//!
//! Clauses that name a field which does not exist are skipped, unless
//! the resolver is strict, in which case they are an error.

pub mod ops;

use chrono::FixedOffset;
use log::{debug, trace, warn};
use thiserror::Error;

use crate::expression::Clauses;
use crate::operators::{Lookup, Operator};
use crate::ordering::parse_order_by;
use crate::queryset::QuerySet;
use crate::schema::{FieldType, Schema};
use crate::value::{str_to_bool, Coercion, Value};

/// Errors produced while parsing and resolving queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The filter expression could not be split into clauses.
    #[error("malformed expression: {0}")]
    MalformedExpression(String),
    /// A field path segment does not exist.
    #[error("no field '{field}' on {model}")]
    UnknownField { field: String, model: String },
    /// A `range` clause did not have exactly two values.
    #[error("condition range requires exactly two values, got {0}")]
    InvalidRangeArity(usize),
    #[error("'{0}' is not a boolean, expected true or false")]
    InvalidBooleanLiteral(String),
    #[error("boolean fields do not accept a list of values: '{0}'")]
    BooleanNotIterable(String),
    #[error("invalid datetime string: '{0}'")]
    InvalidDateLiteral(String),
    #[error("invalid number: '{0}'")]
    InvalidNumericLiteral(String),
    #[error("cannot order by '{0}'")]
    InvalidOrdering(String),
    #[error("invalid time zone '{0}'")]
    InvalidTimezone(String),
    /// The queryset rejected the resolved query.
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Walk `path` through `schema`, returning the terminal field's type.
///
/// A relation is descended whenever more segments remain. On failure,
/// the missing segment and the label of the schema it was looked up
/// in are returned.
pub(crate) fn walk(schema: &dyn Schema, path: &[&str]) -> Result<Option<FieldType>, (String, String)> {
    let missing = |segment: &str| (segment.to_string(), schema.label().to_string());

    let (head, rest) = path.split_first().ok_or_else(|| missing(""))?;
    let field = schema.get_field(head).ok_or_else(|| missing(head))?;

    match (rest.first(), field.related.as_deref()) {
        (None, _) => Ok(field.field_type),
        (Some(_), Some(related)) => walk(related, rest),
        // user__name__foo where name is not a relation
        (Some(next), None) => Err(missing(next)),
    }
}

/// A lookup key and typed value, ready for a [`QuerySet`].
pub type Resolved = (String, Value);

/// Resolve single clauses against a [`Schema`].
#[derive(Debug, Clone)]
pub struct Resolver {
    strict: bool,
    timezone: FixedOffset,
    warn_skipped: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            strict: false,
            // unwrap is safe: zero is always a valid offset
            timezone: FixedOffset::east_opt(0).unwrap(),
            warn_skipped: true,
        }
    }
}

impl Resolver {
    /// A lenient resolver, using UTC for naive datetimes.
    pub fn new() -> Self {
        Default::default()
    }

    /// In strict mode, any clause that cannot be resolved is an error
    /// instead of being skipped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The time zone attached to datetime literals without an offset.
    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    /// Whether skipped clauses are logged as warnings. They are
    /// skipped either way.
    pub fn warn_skipped(mut self, warn_skipped: bool) -> Self {
        self.warn_skipped = warn_skipped;
        self
    }

    /// Resolve the clause `key=raw` against `schema`.
    ///
    /// Returns `Ok(None)` when the clause names an unknown field and
    /// the resolver is not strict.
    pub fn resolve(
        &self,
        schema: &dyn Schema,
        key: &str,
        raw: &str,
    ) -> Result<Option<Resolved>, QueryError> {
        self.resolve_with_reference(schema, key, raw, None)
    }

    /// Resolve the clause `key=raw` against `schema`, coercing values
    /// for untyped fields to the type of `reference`.
    pub fn resolve_with_reference(
        &self,
        schema: &dyn Schema,
        key: &str,
        raw: &str,
        reference: Option<&Value>,
    ) -> Result<Option<Resolved>, QueryError> {
        let lookup = Lookup::split(key);

        let field_type = match walk(schema, &lookup.path) {
            Ok(field_type) => field_type,
            Err((field, model)) => {
                return self.skip(key, QueryError::UnknownField { field, model });
            }
        };

        let coercion = Coercion::new(field_type).with_reference(reference);
        let value = if lookup.operator == Operator::IsNull {
            Value::Bool(str_to_bool(raw)?)
        } else if lookup.operator.is_iterable() {
            let items = coercion.iterable(raw, &self.timezone)?;
            if lookup.operator == Operator::Range && items.len() != 2 {
                return Err(QueryError::InvalidRangeArity(items.len()));
            }
            Value::List(items)
        } else {
            coercion.scalar(raw, &self.timezone)?
        };

        let qualified = lookup.qualified();
        trace!("Resolved {}={} as {} {:?}", key, raw, qualified, value);
        Ok(Some((qualified, value)))
    }

    fn skip(&self, key: &str, reason: QueryError) -> Result<Option<Resolved>, QueryError> {
        if self.strict {
            return Err(reason);
        }
        if self.warn_skipped {
            warn!("Skipping clause '{}': {}", key, reason);
        } else {
            debug!("Skipping clause '{}': {}", key, reason);
        }
        Ok(None)
    }
}

/// A resolved query: an ordered map from qualified lookup key to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedQuery {
    items: Vec<Resolved>,
}

impl ResolvedQuery {
    pub fn new() -> Self {
        Default::default()
    }

    /// Insert a lookup, replacing the value of an existing key.
    pub fn insert(&mut self, key: String, value: Value) {
        if let Some(existing) = self.items.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.items.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Resolved> for ResolvedQuery {
    fn from_iter<I: IntoIterator<Item = Resolved>>(iter: I) -> Self {
        let mut q = ResolvedQuery::new();
        for (k, v) in iter {
            q.insert(k, v);
        }
        q
    }
}

/// Keys with this prefix are routed to the exclude group by
/// [`add_params`](QuerySetFilter::add_params).
pub const EXCLUDE_PREFIX: &str = "exclude__";

/// Collect filter and exclude clauses, and apply them to a [`QuerySet`].
///
/// Clauses can be added several times, for example once per
/// `--filter` flag; a later clause with the same key replaces an
/// earlier one.
///
/// ```rust
/// use queryset_cmd::expression::parse;
/// use queryset_cmd::filtering::{QuerySetFilter, Resolver};
///
/// let mut f = QuerySetFilter::new(Resolver::new().strict(true));
/// f.add_filter(parse("name__icontains=rob").unwrap());
/// f.add_params(vec![("exclude__age__lt", "18"), ("active", "true")]);
/// assert_eq!(f.filter_clauses().get("active"), Some("true"));
/// assert_eq!(f.exclude_clauses().get("age__lt"), Some("18"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuerySetFilter {
    resolver: Resolver,
    filter_clauses: Clauses,
    exclude_clauses: Clauses,
}

impl QuerySetFilter {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            filter_clauses: Clauses::new(),
            exclude_clauses: Clauses::new(),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn filter_clauses(&self) -> &Clauses {
        &self.filter_clauses
    }

    pub fn exclude_clauses(&self) -> &Clauses {
        &self.exclude_clauses
    }

    pub fn add_filter(&mut self, clauses: Clauses) -> &mut Self {
        self.filter_clauses.extend(clauses);
        self
    }

    pub fn add_exclude(&mut self, clauses: Clauses) -> &mut Self {
        self.exclude_clauses.extend(clauses);
        self
    }

    /// Add clauses from a single combined source, routing keys that
    /// start with [`EXCLUDE_PREFIX`] to the exclude group.
    pub fn add_params<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in params {
            let key = key.as_ref();
            match key.strip_prefix(EXCLUDE_PREFIX) {
                Some(stripped) => self.exclude_clauses.insert(stripped, value),
                None => self.filter_clauses.insert(key, value),
            }
        }
        self
    }

    /// Add clauses from URL query parameters.
    ///
    /// Parameters with an empty value, and parameters named in
    /// `ignored`, are dropped; `ignored` is how an endpoint keeps its
    /// own parameters (paging, for example) out of the query.
    pub fn add_query_params<I, K, V>(&mut self, params: I, ignored: &[&str]) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut kept = Vec::new();
        for (key, value) in params {
            let (key, value): (&str, &str) = (key.as_ref(), value.as_ref());
            if value.is_empty() || ignored.contains(&key) {
                continue;
            }
            kept.push((key.to_string(), value.to_string()));
        }
        self.add_params(kept)
    }

    /// Resolve every clause in `clauses` against `schema`.
    ///
    /// Skipped clauses are absent from the result. Any error aborts
    /// the whole query.
    pub fn setup_query(
        &self,
        schema: &dyn Schema,
        clauses: &Clauses,
    ) -> Result<ResolvedQuery, QueryError> {
        let mut query = ResolvedQuery::new();
        for (key, raw) in clauses.iter() {
            if let Some((k, v)) = self.resolver.resolve(schema, key, raw)? {
                query.insert(k, v);
            }
        }
        Ok(query)
    }

    /// Apply the collected clauses to `queryset`.
    ///
    /// The exclude group is applied first, then the filter group, then
    /// `order_by` (see [`parse_order_by`]) and finally `limit`. A
    /// limit of zero means no limit.
    pub fn apply<Q: QuerySet>(
        &self,
        queryset: Q,
        order_by: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Q, QueryError> {
        let (exclude, filter) = {
            let schema = queryset.schema();
            (
                self.setup_query(schema, &self.exclude_clauses)?,
                self.setup_query(schema, &self.filter_clauses)?,
            )
        };
        debug!(
            "Applying {} exclude and {} filter lookups",
            exclude.len(),
            filter.len()
        );

        let mut queryset = queryset
            .exclude(&exclude)
            .and_then(|qs| qs.filter(&filter))
            .map_err(|e| QueryError::Engine(e.into()))?;

        if let Some(order_by) = order_by {
            let ordering = parse_order_by(order_by)?;
            if !ordering.is_empty() {
                queryset = queryset
                    .order_by(&ordering)
                    .map_err(|e| QueryError::Engine(e.into()))?;
            }
        }

        if let Some(limit) = limit.filter(|l| *l > 0) {
            queryset = queryset.limit(limit);
        }

        Ok(queryset)
    }
}
