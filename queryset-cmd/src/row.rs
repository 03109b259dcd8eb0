/*
Rendering of stored rows for output. Datetimes are shown in the
configured local time zone, and relations as the related primary key.
 */

use std::fmt::Display;

use chrono::FixedOffset;
use serde_json::Number;

use crate::datetime::format_local;
use crate::queryset::Row;
use crate::schema::ModelSchema;
use crate::value::Value;

pub trait CellVisitor {
    fn visit_value(&mut self, name: &str, v: &Value);
}

/// Visit the primary key, then every field of `model` in declaration
/// order. Relation fields are visited under their name.
pub fn accept_cell_visitor<V: CellVisitor>(model: &ModelSchema, row: &Row, visitor: &mut V) {
    visitor.visit_value(model.pk(), row.pk());
    for def in model.fields() {
        if def.name != model.pk() {
            visitor.visit_value(&def.name, row.get(&def.name));
        }
    }
}

fn json_cell(v: &Value, tz: &FixedOffset) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number(Number::from(*i)),
        Value::Float(x) => Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::DateTime(dt) => serde_json::Value::String(format_local(dt, tz)),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(|x| json_cell(x, tz)).collect())
        }
    }
}

struct JsonVisitor<'a> {
    tz: &'a FixedOffset,
    value: serde_json::map::Map<String, serde_json::Value>,
}

impl<'a> CellVisitor for JsonVisitor<'a> {
    fn visit_value(&mut self, name: &str, v: &Value) {
        self.value.insert(name.to_string(), json_cell(v, self.tz));
    }
}

/// Encode `row` as a JSON object.
pub fn to_json(model: &ModelSchema, row: &Row, tz: &FixedOffset) -> serde_json::Value {
    let mut j = JsonVisitor {
        tz,
        value: serde_json::map::Map::new(),
    };
    accept_cell_visitor(model, row, &mut j);
    serde_json::Value::Object(j.value)
}

struct DictVisitor {
    values: Vec<(String, Value)>,
}

impl CellVisitor for DictVisitor {
    fn visit_value(&mut self, name: &str, v: &Value) {
        self.values.push((name.to_string(), v.clone()));
    }
}

/// The field values of `row`, in declaration order.
pub fn to_dict(model: &ModelSchema, row: &Row) -> Dict {
    let mut d = DictVisitor { values: Vec::new() };
    accept_cell_visitor(model, row, &mut d);
    Dict { values: d.values }
}

/// Field values of one row, displayed compactly as
/// `{'id': 1, 'name': 'Robert'}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dict {
    pub values: Vec<(String, Value)>,
}

impl Dict {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

fn write_cell(f: &mut std::fmt::Formatter<'_>, v: &Value) -> std::fmt::Result {
    match v {
        Value::Null => write!(f, "None"),
        Value::Bool(true) => write!(f, "True"),
        Value::Bool(false) => write!(f, "False"),
        Value::Str(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        Value::DateTime(dt) => write!(f, "'{}'", dt.to_rfc3339()),
        Value::List(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_cell(f, item)?;
            }
            write!(f, "]")
        }
        other => write!(f, "{}", other),
    }
}

impl Display for Dict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, v)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{}': ", name)?;
            write_cell(f, v)?;
        }
        write!(f, "}}")
    }
}

/// The short form of a row: `Person object (1)`.
pub fn display(model: &ModelSchema, row: &Row) -> String {
    format!("{} object ({})", model.object_name(), row.pk())
}
