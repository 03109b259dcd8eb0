use chrono::{DateTime, Utc};
use queryset_cmd::filtering::{QueryError, Resolver};
use queryset_cmd::schema::{FieldType, Model, Schema};
use queryset_cmd::value::Value;

#[derive(Model)]
#[allow(dead_code)]
struct User {
    id: i64,
    username: String,
    is_active: bool,
}

#[derive(Model)]
#[queryset(label = "people.Person")]
#[allow(dead_code)]
struct Person {
    id: u32,
    #[queryset(rename = "name")]
    full_name: String,
    height: Option<f64>,
    birthday: Option<DateTime<Utc>>,
    #[queryset(relation)]
    user: Option<User>,
    #[queryset(relation)]
    friends: Vec<Person>,
    #[queryset(exclude)]
    password: String,
    #[queryset(untyped)]
    extra: String,
}

#[derive(Model)]
#[allow(dead_code)]
struct Item {
    #[queryset(primary_key)]
    code: String,
    #[queryset(relation)]
    owner: Box<Person>,
}

#[test]
fn test_fields() {
    let meta = Person::get_meta();
    assert_eq!(meta.label(), "people.Person");
    assert_eq!(meta.pk_name(), "id");

    assert_eq!(
        meta.get_field("id").unwrap().field_type,
        Some(FieldType::Integer)
    );
    assert_eq!(
        meta.get_field("name").unwrap().field_type,
        Some(FieldType::Text)
    );
    assert!(meta.get_field("full_name").is_none());
    assert_eq!(
        meta.get_field("height").unwrap().field_type,
        Some(FieldType::Float)
    );
    assert_eq!(
        meta.get_field("birthday").unwrap().field_type,
        Some(FieldType::DateTime)
    );
    assert!(meta.get_field("password").is_none());
    assert_eq!(meta.get_field("extra").unwrap().field_type, None);
}

#[test]
fn test_relations() {
    let meta = Person::get_meta();

    let user = meta.get_field("user").unwrap();
    assert!(user.is_relation());
    assert_eq!(user.attname, "user_id");
    assert_eq!(user.field_type, Some(FieldType::Integer));
    assert!(meta.get_field("user_id").unwrap().answers_to("user"));

    let related = user.related.unwrap();
    assert_eq!(related.label(), "User");
    assert_eq!(
        related.get_field("is_active").unwrap().field_type,
        Some(FieldType::Boolean)
    );

    let friends = meta.get_field("friends").unwrap();
    assert_eq!(friends.related.unwrap().label(), "people.Person");

    let item = Item::get_meta();
    assert_eq!(item.pk_name(), "code");
    assert_eq!(
        item.primary_key().unwrap().field_type,
        Some(FieldType::Text)
    );
    assert_eq!(
        item.get_field("owner_id").unwrap().field_type,
        Some(FieldType::Integer)
    );
}

#[test]
fn test_resolve() {
    let meta = Person::get_meta();
    let r = Resolver::new().strict(true);

    let (key, value) = r
        .resolve(&meta, "user__username__exact", "bob")
        .unwrap()
        .unwrap();
    assert_eq!(key, "user__username__exact");
    assert_eq!(value, Value::from("bob"));

    let (key, value) = r
        .resolve(&meta, "friends__friends__user__is_active", "True")
        .unwrap()
        .unwrap();
    assert_eq!(key, "friends__friends__user__is_active__exact");
    assert_eq!(value, Value::Bool(true));

    let (_, value) = r.resolve(&meta, "name__in", "a,b").unwrap().unwrap();
    assert_eq!(value, Value::List(vec![Value::from("a"), Value::from("b")]));

    assert!(matches!(
        r.resolve(&meta, "password", "secret"),
        Err(QueryError::UnknownField { .. })
    ));

    let item = Item::get_meta();
    assert!(matches!(
        r.resolve(&item, "owner__user__username__shoe_size", "9"),
        Err(QueryError::UnknownField { field, model }) if field == "shoe_size" && model == "User"
    ));
}
