//! # Describe the fields a query can refer to
//!
//! Resolving a clause means walking its field path through a
//! [`Schema`]: each segment names a [`Field`], and a field that is a
//! relation carries the [`Schema`] of the related entity so the walk
//! can continue there.
//!
//! There are two ways to provide a [`Schema`]. A Rust type can derive
//! [`Model`](macro@Model), which generates a static description from
//! the struct definition:
//!
//! ```rust
//! use queryset_cmd::schema::{FieldType, Model, Schema};
//!
//! #[derive(Model)]
//! struct User {
//!     id: i64,
//!     username: String,
//! }
//!
//! #[derive(Model)]
//! struct Person {
//!     id: i64,
//!     name: String,
//!     #[queryset(relation)]
//!     user: User,
//! }
//!
//! let meta = Person::get_meta();
//! let user = meta.get_field("user").unwrap();
//! assert_eq!(user.attname, "user_id");
//! assert_eq!(user.field_type, Some(FieldType::Integer));
//! let related = user.related.unwrap();
//! assert_eq!(related.get_field("username").unwrap().field_type, Some(FieldType::Text));
//! ```
//!
//! Alternatively a [`Registry`] of [`ModelSchema`] values can be built
//! at runtime, which is what the fixture loader does.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::Deserialize;
use strum::{AsRefStr, Display, EnumString};

/// The declared semantic type of a field, which drives coercion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    DateTime,
    Boolean,
    Integer,
    Float,
    Text,
}

/// One field of an entity, as seen by the resolver.
pub struct Field<'s> {
    /// The name used in queries.
    pub name: &'s str,
    /// The alternative column name, e.g. `user_id` for relation `user`.
    pub attname: &'s str,
    /// `None` when the field is untyped, in which case coercion falls
    /// back to a reference value supplied by the caller.
    pub field_type: Option<FieldType>,
    /// The schema of the related entity, if this field is a relation.
    pub related: Option<Box<dyn Schema + 's>>,
}

impl<'s> Field<'s> {
    pub fn new(name: &'s str, field_type: Option<FieldType>) -> Self {
        Self {
            name,
            attname: name,
            field_type,
            related: None,
        }
    }

    /// A relation field. Its own type is the type of the related
    /// entity's primary key, since that is what the column stores.
    pub fn relation(name: &'s str, attname: &'s str, related: Box<dyn Schema + 's>) -> Self {
        let field_type = related.primary_key().and_then(|pk| pk.field_type);
        Self {
            name,
            attname,
            field_type,
            related: Some(related),
        }
    }

    pub fn is_relation(&self) -> bool {
        self.related.is_some()
    }

    /// Whether `name` refers to this field, by name or by attname.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.attname == name
    }
}

impl<'s> Debug for Field<'s> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("attname", &self.attname)
            .field("field_type", &self.field_type)
            .field("related", &self.related.as_ref().map(|r| r.label().to_string()))
            .finish()
    }
}

/// Something that can describe the fields of an entity.
///
/// This is the capability the resolver consumes. It is implemented by
/// the [`Model`](macro@Model) derive macro, and by [`ModelRef`] for
/// runtime schemas.
pub trait Schema {
    /// A human readable name for the entity, e.g. `people.Person`.
    fn label(&self) -> &str;

    /// Look up a field by name or attname.
    fn get_field(&self, name: &str) -> Option<Field<'_>>;

    /// The name of the primary key field.
    fn pk_name(&self) -> &str {
        "id"
    }

    fn primary_key(&self) -> Option<Field<'_>> {
        self.get_field(self.pk_name())
    }
}

/// A type whose values are stored in fields of a known [`FieldType`].
///
/// This is used by the [`Model`](macro@Model) derive macro to type
/// each member of a struct.
pub trait Typed {
    const FIELD_TYPE: Option<FieldType>;
}

macro_rules! typed {
    ($field_type:expr => $($t:ty),*) => {
        $(
            impl Typed for $t {
                const FIELD_TYPE: Option<FieldType> = Some($field_type);
            }
        )*
    };
}

typed!(FieldType::Integer => i8, u8, i16, u16, i32, u32, i64, u64, isize, usize);
typed!(FieldType::Float => f32, f64);
typed!(FieldType::Boolean => bool);
typed!(FieldType::Text => String);
typed!(FieldType::DateTime => chrono::NaiveDateTime, chrono::NaiveDate);

impl<T: chrono::TimeZone> Typed for chrono::DateTime<T> {
    const FIELD_TYPE: Option<FieldType> = Some(FieldType::DateTime);
}

impl<T: Typed> Typed for Option<T> {
    const FIELD_TYPE: Option<FieldType> = T::FIELD_TYPE;
}

/// Something which can produce a description of its fields.
///
/// This is the derivable trait of this module. Relations to types
/// wrapped in [`Option`], [`Box`], [`Arc`] or [`Vec`] describe the
/// wrapped type.
pub trait Model {
    /// The type which describes our fields.
    type Meta: Schema + 'static;
    /// Produce an instance of our [`Meta`](Model::Meta) type.
    fn get_meta() -> Self::Meta;
}

impl<T: Model> Model for Option<T> {
    type Meta = T::Meta;
    fn get_meta() -> Self::Meta {
        T::get_meta()
    }
}

impl<T: Model> Model for Box<T> {
    type Meta = T::Meta;
    fn get_meta() -> Self::Meta {
        T::get_meta()
    }
}

impl<T: Model> Model for Arc<T> {
    type Meta = T::Meta;
    fn get_meta() -> Self::Meta {
        T::get_meta()
    }
}

impl<T: Model> Model for Vec<T> {
    type Meta = T::Meta;
    fn get_meta() -> Self::Meta {
        T::get_meta()
    }
}

/// The runtime description of one field of a [`ModelSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub attname: String,
    pub field_type: Option<FieldType>,
    /// Label of the related model, if this is a relation.
    pub relation: Option<String>,
}

/// The runtime description of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    label: String,
    pk: String,
    fields: Vec<FieldDef>,
}

impl ModelSchema {
    /// Start describing a model, whose primary key is `id`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pk: "id".to_string(),
            fields: Vec::new(),
        }
    }

    pub fn with_pk(mut self, pk: impl Into<String>) -> Self {
        self.pk = pk.into();
        self
    }

    /// Add a typed field.
    pub fn field(self, name: &str, field_type: FieldType) -> Self {
        self.push(name, name, Some(field_type), None)
    }

    /// Add a field with no declared type.
    pub fn untyped(self, name: &str) -> Self {
        self.push(name, name, None, None)
    }

    /// Add a relation to the model labelled `target`, stored in
    /// column `<name>_id`.
    pub fn relation(self, name: &str, target: &str) -> Self {
        let attname = format!("{}_id", name);
        self.push(name, &attname, None, Some(target.to_string()))
    }

    pub fn push(
        mut self,
        name: &str,
        attname: &str,
        field_type: Option<FieldType>,
        relation: Option<String>,
    ) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            attname: attname.to_string(),
            field_type,
            relation,
        });
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pk(&self) -> &str {
        &self.pk
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name == name || f.attname == name)
    }

    /// The short model name, e.g. `Person` for `people.Person`.
    pub fn object_name(&self) -> &str {
        self.label.rsplit('.').next().unwrap_or(&self.label)
    }
}

/// A collection of [`ModelSchema`] values which may refer to each
/// other through relations.
///
/// Labels are matched case insensitively.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    models: BTreeMap<String, ModelSchema>,
}

impl Registry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register(&mut self, model: ModelSchema) {
        self.models.insert(model.label.to_lowercase(), model);
    }

    pub fn model(&self, label: &str) -> Option<&ModelSchema> {
        self.models.get(&label.to_lowercase())
    }

    /// A [`Schema`] for the model labelled `label`.
    pub fn get(&self, label: &str) -> Option<ModelRef<'_>> {
        self.model(label).map(|model| ModelRef {
            registry: self,
            model,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.models.values().map(|m| m.label.as_str())
    }
}

/// A [`Schema`] view of one model in a [`Registry`].
#[derive(Clone, Copy)]
pub struct ModelRef<'r> {
    registry: &'r Registry,
    model: &'r ModelSchema,
}

impl<'r> ModelRef<'r> {
    pub fn model(&self) -> &'r ModelSchema {
        self.model
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }
}

impl<'r> Schema for ModelRef<'r> {
    fn label(&self) -> &str {
        &self.model.label
    }

    fn get_field(&self, name: &str) -> Option<Field<'_>> {
        let def = self.model.field_def(name)?;
        let related = def
            .relation
            .as_ref()
            .and_then(|target| self.registry.get(target));
        Some(match related {
            Some(related) => Field::relation(&def.name, &def.attname, Box::new(related)),
            None => Field {
                name: &def.name,
                attname: &def.attname,
                field_type: def.field_type,
                related: None,
            },
        })
    }

    fn pk_name(&self) -> &str {
        &self.model.pk
    }
}

pub use queryset_cmd_derive::Model;
