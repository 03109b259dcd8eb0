//! # Load models and rows from JSON
//!
//! A fixture describes a set of models and the objects stored in them:
//!
//! ```json
//! {
//!   "models": [
//!     {"label": "auth.User", "fields": [
//!        {"name": "id", "type": "integer"},
//!        {"name": "username", "type": "text"}]},
//!     {"label": "people.Person", "fields": [
//!        {"name": "id", "type": "integer"},
//!        {"name": "birthday", "type": "datetime"},
//!        {"name": "user", "relation": "auth.User"}]}
//!   ],
//!   "objects": [
//!     {"model": "auth.User", "pk": 1, "fields": {"username": "bob"}},
//!     {"model": "people.Person", "pk": 1,
//!      "fields": {"birthday": "1990-01-01 00:00:00", "user": 1}}
//!   ]
//! }
//! ```
//!
//! Objects follow the layout of Django's `dumpdata`. Field values are
//! converted according to the declared field type; a relation holds
//! the primary key of the related object, or a list of them.
//!
//! ```rust
//! use chrono::FixedOffset;
//! use queryset_cmd::fixture::load_str;
//! use queryset_cmd::queryset::QuerySet;
//!
//! let db = load_str(r#"{
//!   "models": [{"label": "auth.User", "fields": [{"name": "username", "type": "text"}]}],
//!   "objects": [{"model": "auth.User", "pk": 1, "fields": {"username": "bob"}}]
//! }"#, &FixedOffset::east_opt(0).unwrap()).unwrap();
//! assert_eq!(db.all("auth.user").unwrap().count(), 1);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::FixedOffset;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::datetime::to_aware_datetime;
use crate::queryset::{Database, Row};
use crate::schema::{FieldType, ModelSchema, Registry};
use crate::value::Value;

/// Errors produced while loading a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("cannot read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed fixture: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no such model '{0}'")]
    UnknownModel(String),
    #[error("field '{field}' of {model} relates to unknown model '{target}'")]
    UnknownRelation {
        model: String,
        field: String,
        target: String,
    },
    #[error("no field '{field}' on {model}")]
    UnknownField { model: String, field: String },
    #[error("bad value {value} for {model}.{field}: {reason}")]
    BadValue {
        model: String,
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct FixtureField {
    name: String,
    #[serde(rename = "type")]
    field_type: Option<FieldType>,
    relation: Option<String>,
    attname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixtureModel {
    label: String,
    pk: Option<String>,
    #[serde(default)]
    fields: Vec<FixtureField>,
}

#[derive(Debug, Deserialize)]
struct FixtureObject {
    model: String,
    pk: serde_json::Value,
    #[serde(default)]
    fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    models: Vec<FixtureModel>,
    #[serde(default)]
    objects: Vec<FixtureObject>,
}

/// Load a fixture from a file. Naive datetimes are taken to be in `tz`.
pub fn load_path<P: AsRef<Path>>(path: P, tz: &FixedOffset) -> Result<Database, FixtureError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    debug!("Loading fixture {}", path.as_ref().display());
    load_str(&text, tz)
}

/// Load a fixture from a string. Naive datetimes are taken to be in `tz`.
pub fn load_str(text: &str, tz: &FixedOffset) -> Result<Database, FixtureError> {
    let fixture: Fixture = serde_json::from_str(text)?;

    let mut registry = Registry::new();
    for m in fixture.models {
        let pk = m.pk.unwrap_or_else(|| "id".to_string());
        let mut model = ModelSchema::new(m.label).with_pk(pk.clone());
        if !m.fields.iter().any(|f| f.name == pk) {
            model = model.push(&pk, &pk, Some(FieldType::Integer), None);
        }
        for f in m.fields {
            let attname = match (&f.attname, &f.relation) {
                (Some(attname), _) => attname.clone(),
                (None, Some(_)) => format!("{}_id", f.name),
                (None, None) => f.name.clone(),
            };
            model = model.push(&f.name, &attname, f.field_type, f.relation);
        }
        registry.register(model);
    }

    // Relations may point forwards, so check them once all are known.
    for label in registry.labels() {
        let model = registry
            .model(label)
            .ok_or_else(|| FixtureError::UnknownModel(label.to_string()))?;
        for def in model.fields() {
            if let Some(target) = &def.relation {
                if registry.model(target).is_none() {
                    return Err(FixtureError::UnknownRelation {
                        model: label.to_string(),
                        field: def.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    let mut rows = Vec::with_capacity(fixture.objects.len());
    for obj in fixture.objects {
        let model = registry
            .model(&obj.model)
            .ok_or_else(|| FixtureError::UnknownModel(obj.model.clone()))?;
        let pk_type = storage_type(&registry, model, model.pk());
        let mut row = Row::new(convert(model, model.pk(), &obj.pk, pk_type, tz)?);
        for (name, raw) in &obj.fields {
            let def = model
                .field_def(name)
                .ok_or_else(|| FixtureError::UnknownField {
                    model: model.label().to_string(),
                    field: name.clone(),
                })?;
            let field_type = storage_type(&registry, model, &def.name);
            row.set(&def.name, convert(model, &def.name, raw, field_type, tz)?);
        }
        rows.push((model.label().to_string(), row));
    }

    let mut db = Database::new(registry);
    for (label, row) in rows {
        db.insert(&label, row)
            .map_err(|_| FixtureError::UnknownModel(label.clone()))?;
    }
    Ok(db)
}

/// The type a column of `model` holds; for a relation, that of the
/// related primary key.
fn storage_type(registry: &Registry, model: &ModelSchema, name: &str) -> Option<FieldType> {
    let def = model.field_def(name)?;
    match &def.relation {
        Some(target) => {
            let related = registry.model(target)?;
            if related.label() == model.label() && related.pk() == name {
                return def.field_type;
            }
            storage_type(registry, related, related.pk())
        }
        None => def.field_type,
    }
}

fn convert(
    model: &ModelSchema,
    field: &str,
    raw: &serde_json::Value,
    field_type: Option<FieldType>,
    tz: &FixedOffset,
) -> Result<Value, FixtureError> {
    use serde_json::Value as Json;

    let bad = |reason: &str| FixtureError::BadValue {
        model: model.label().to_string(),
        field: field.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    Ok(match (field_type, raw) {
        (_, Json::Null) => Value::Null,
        (_, Json::Array(items)) => Value::List(
            items
                .iter()
                .map(|item| convert(model, field, item, field_type, tz))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        (Some(FieldType::DateTime), Json::String(s)) => {
            Value::DateTime(to_aware_datetime(s, tz).map_err(|e| bad(&e.to_string()))?)
        }
        (Some(FieldType::DateTime), _) => return Err(bad("expected a datetime string")),
        (Some(FieldType::Boolean), Json::Bool(b)) => Value::Bool(*b),
        (Some(FieldType::Boolean), _) => return Err(bad("expected a boolean")),
        (Some(FieldType::Integer), Json::Number(n)) => {
            Value::Int(n.as_i64().ok_or_else(|| bad("expected an integer"))?)
        }
        (Some(FieldType::Integer), _) => return Err(bad("expected an integer")),
        (Some(FieldType::Float), Json::Number(n)) => {
            Value::Float(n.as_f64().ok_or_else(|| bad("expected a number"))?)
        }
        (Some(FieldType::Float), _) => return Err(bad("expected a number")),
        (Some(FieldType::Text), Json::String(s)) => Value::Str(s.clone()),
        (Some(FieldType::Text), _) => return Err(bad("expected a string")),
        (None, Json::Bool(b)) => Value::Bool(*b),
        (None, Json::Number(n)) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().ok_or_else(|| bad("expected a number"))?),
        },
        (None, Json::String(s)) => Value::Str(s.clone()),
        (_, Json::Object(_)) => return Err(bad("nested objects are not supported")),
    })
}
