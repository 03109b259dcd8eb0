use chrono::{FixedOffset, TimeZone};
use queryset_cmd::expression::parse;
use queryset_cmd::filtering::{QueryError, QuerySetFilter, Resolver};
use queryset_cmd::schema::{FieldType, Schema};
use queryset_cmd::value::Value;

use crate::{people, utc};

#[test]
fn test_default_operator() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();

    let (key, value) = Resolver::new()
        .resolve(&person, "name", "Robert")
        .unwrap()
        .unwrap();
    assert_eq!(key, "name__exact");
    assert_eq!(value, Value::Str("Robert".to_string()));

    // A trailing separator also means exact.
    let (key, _) = Resolver::new()
        .resolve(&person, "name__", "Robert")
        .unwrap()
        .unwrap();
    assert_eq!(key, "name__exact");
}

#[test]
fn test_numbers() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();
    let r = Resolver::new();

    let (key, value) = r.resolve(&person, "age__gte", "-3").unwrap().unwrap();
    assert_eq!(key, "age__gte");
    assert_eq!(value, Value::Int(-3));

    let (_, value) = r.resolve(&person, "height__lt", "1.7").unwrap().unwrap();
    assert_eq!(value, Value::Float(1.7));

    let (_, value) = r.resolve(&person, "height__lt", "2").unwrap().unwrap();
    assert_eq!(value, Value::Float(2.0));

    assert!(matches!(
        r.resolve(&person, "age", "thirty"),
        Err(QueryError::InvalidNumericLiteral(_))
    ));
    assert!(matches!(
        r.resolve(&person, "age", "3.5"),
        Err(QueryError::InvalidNumericLiteral(_))
    ));
    assert!(matches!(
        r.resolve(&person, "height", "1e3"),
        Err(QueryError::InvalidNumericLiteral(_))
    ));
}

#[test]
fn test_in() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();
    let r = Resolver::new();

    let (key, value) = r.resolve(&person, "id__in", "1,2,3").unwrap().unwrap();
    assert_eq!(key, "id__in");
    assert_eq!(
        value,
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    let (_, value) = r
        .resolve(&person, "name__in", r#"["Robert", "Dave"]"#)
        .unwrap()
        .unwrap();
    assert_eq!(
        value,
        Value::List(vec![Value::from("Robert"), Value::from("Dave")])
    );

    let (_, value) = r.resolve(&person, "id__in", "[1, null]").unwrap().unwrap();
    assert_eq!(value, Value::List(vec![Value::Int(1), Value::Null]));

    // Numbers may be padded; text is taken as written.
    let (_, value) = r.resolve(&person, "id__in", "1, 2 ,3").unwrap().unwrap();
    assert_eq!(
        value,
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    let (_, value) = r.resolve(&person, "name__in", "Robert, Dave").unwrap().unwrap();
    assert_eq!(
        value,
        Value::List(vec![Value::from("Robert"), Value::from(" Dave")])
    );
    let (_, value) = r
        .resolve(&person, "birthday__range", "1980-01-01, 1980-12-31")
        .unwrap()
        .unwrap();
    assert!(matches!(value, Value::List(ref v) if v.len() == 2));
}

#[test]
fn test_range() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();
    let r = Resolver::new();

    let (key, value) = r
        .resolve(&person, "birthday__range", "1980-01-01,1980-12-31")
        .unwrap()
        .unwrap();
    assert_eq!(key, "birthday__range");
    let low = utc().with_ymd_and_hms(1980, 1, 1, 0, 0, 0).unwrap();
    let high = utc().with_ymd_and_hms(1980, 12, 31, 0, 0, 0).unwrap();
    assert_eq!(
        value,
        Value::List(vec![Value::DateTime(low), Value::DateTime(high)])
    );

    assert!(matches!(
        r.resolve(&person, "birthday__range", "1980-01-01"),
        Err(QueryError::InvalidRangeArity(1))
    ));
    assert!(matches!(
        r.resolve(&person, "age__range", "1,2,3"),
        Err(QueryError::InvalidRangeArity(3))
    ));
}

#[test]
fn test_unknown_field() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();

    let lenient = Resolver::new();
    assert!(lenient.resolve(&person, "shoe_size", "9").unwrap().is_none());
    assert!(lenient
        .resolve(&person, "nonexistent__exact", "x")
        .unwrap()
        .is_none());
    assert!(lenient
        .resolve(&person, "user__shoe_size", "9")
        .unwrap()
        .is_none());

    let strict = Resolver::new().strict(true);
    match strict.resolve(&person, "shoe_size", "9") {
        Err(QueryError::UnknownField { field, model }) => {
            assert_eq!(field, "shoe_size");
            assert_eq!(model, "people.Person");
        }
        other => panic!("unexpected {:?}", other),
    }
    match strict.resolve(&person, "user__shoe_size__gt", "9") {
        Err(QueryError::UnknownField { field, model }) => {
            assert_eq!(field, "shoe_size");
            assert_eq!(model, "auth.User");
        }
        other => panic!("unexpected {:?}", other),
    }

    // Only relations can be traversed.
    assert!(matches!(
        strict.resolve(&person, "name__first", "R"),
        Err(QueryError::UnknownField { .. })
    ));
}

#[test]
fn test_booleans() {
    let db = people();
    let user = db.registry().get("auth.User").unwrap();
    let r = Resolver::new();

    let (key, value) = r.resolve(&user, "is_active", "true").unwrap().unwrap();
    assert_eq!(key, "is_active__exact");
    assert_eq!(value, Value::Bool(true));

    let (_, value) = r.resolve(&user, "is_active", "False").unwrap().unwrap();
    assert_eq!(value, Value::Bool(false));

    for bad in ["TRUE", "1", "yes", ""] {
        assert!(matches!(
            r.resolve(&user, "is_active", bad),
            Err(QueryError::InvalidBooleanLiteral(_))
        ));
    }

    assert!(matches!(
        r.resolve(&user, "is_active__in", "true,false"),
        Err(QueryError::BooleanNotIterable(_))
    ));
}

#[test]
fn test_isnull() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();
    let r = Resolver::new();

    let (key, value) = r.resolve(&person, "birthday__isnull", "True").unwrap().unwrap();
    assert_eq!(key, "birthday__isnull");
    assert_eq!(value, Value::Bool(true));

    assert!(matches!(
        r.resolve(&person, "birthday__isnull", "1990-01-01"),
        Err(QueryError::InvalidBooleanLiteral(_))
    ));
}

#[test]
fn test_null_literal() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();

    let (_, value) = Resolver::new()
        .resolve(&person, "age", "null")
        .unwrap()
        .unwrap();
    assert_eq!(value, Value::Null);
}

#[test]
fn test_relations() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();
    let r = Resolver::new();

    let (key, value) = r
        .resolve(&person, "user__username__exact", "bob")
        .unwrap()
        .unwrap();
    assert_eq!(key, "user__username__exact");
    assert_eq!(value, Value::from("bob"));

    let (key, value) = r
        .resolve(&person, "user__is_active", "false")
        .unwrap()
        .unwrap();
    assert_eq!(key, "user__is_active__exact");
    assert_eq!(value, Value::Bool(false));

    // The relation itself holds the related primary key.
    let (key, value) = r.resolve(&person, "user", "2").unwrap().unwrap();
    assert_eq!(key, "user__exact");
    assert_eq!(value, Value::Int(2));

    let (key, value) = r.resolve(&person, "user_id__in", "1,3").unwrap().unwrap();
    assert_eq!(key, "user_id__in");
    assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(3)]));

    let (key, value) = r
        .resolve(&person, "friends__friends__age__gt", "20")
        .unwrap()
        .unwrap();
    assert_eq!(key, "friends__friends__age__gt");
    assert_eq!(value, Value::Int(20));
}

#[test]
fn test_datetimes() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();

    let tz = FixedOffset::east_opt(8 * 3600).unwrap();
    let r = Resolver::new().timezone(tz);

    let (_, value) = r
        .resolve(&person, "birthday__gt", "2022-01-10 09:00:00")
        .unwrap()
        .unwrap();
    assert_eq!(
        value,
        Value::DateTime(tz.with_ymd_and_hms(2022, 1, 10, 9, 0, 0).unwrap())
    );

    // An explicit offset wins over the resolver's zone.
    let (_, value) = r
        .resolve(&person, "birthday__gt", "2022-01-10T09:00:00Z")
        .unwrap()
        .unwrap();
    assert_eq!(
        value,
        Value::DateTime(utc().with_ymd_and_hms(2022, 1, 10, 9, 0, 0).unwrap())
    );

    let (_, value) = r
        .resolve(&person, "birthday__gt", "2022-01-10T09:00:00.250+0100")
        .unwrap()
        .unwrap();
    match value {
        Value::DateTime(dt) => {
            assert_eq!(dt.offset().local_minus_utc(), 3600);
            assert_eq!(dt.timestamp_subsec_millis(), 250);
        }
        other => panic!("unexpected {:?}", other),
    }

    let (_, value) = r
        .resolve(&person, "birthday__gt", "2022-01-10 09:00:00-05")
        .unwrap()
        .unwrap();
    match value {
        Value::DateTime(dt) => assert_eq!(dt.offset().local_minus_utc(), -5 * 3600),
        other => panic!("unexpected {:?}", other),
    }

    for bad in [
        "yesterday",
        "2022-13-01",
        "2022-01-10 25:00:00",
        "2022-01-10+8",
        "2022-01-10T09:00:00+0100 tomorrow",
        // Arabic-Indic digits are not decimal digits here.
        "2022-01-10T\u{0661}\u{0662}:30:00",
        "2022-01-10T12:30:00.\u{0665}",
        "\u{0662}022-01-10",
    ] {
        assert!(matches!(
            r.resolve(&person, "birthday", bad),
            Err(QueryError::InvalidDateLiteral(_))
        ));
    }
}

#[test]
fn test_untyped() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();
    let r = Resolver::new();

    let (_, value) = r.resolve(&person, "nickname", "42").unwrap().unwrap();
    assert_eq!(value, Value::from("42"));

    let reference = Value::Int(0);
    let (_, value) = r
        .resolve_with_reference(&person, "nickname", "42", Some(&reference))
        .unwrap()
        .unwrap();
    assert_eq!(value, Value::Int(42));

    // A declared type takes priority over the reference.
    let reference = Value::Bool(false);
    let (_, value) = r
        .resolve_with_reference(&person, "age", "42", Some(&reference))
        .unwrap()
        .unwrap();
    assert_eq!(value, Value::Int(42));
}

#[test_log::test]
fn test_setup_query() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();

    let f = QuerySetFilter::new(Resolver::new());
    let q = f
        .setup_query(
            &person,
            &parse("name__icontains=rob,shoe_size=9,age__in=30,41").unwrap(),
        )
        .unwrap();
    assert_eq!(q.len(), 2);
    assert_eq!(q.get("name__icontains"), Some(&Value::from("rob")));
    assert_eq!(
        q.get("age__in"),
        Some(&Value::List(vec![Value::Int(30), Value::Int(41)]))
    );

    let f = QuerySetFilter::new(Resolver::new().strict(true));
    assert!(f
        .setup_query(&person, &parse("name__icontains=rob,shoe_size=9").unwrap())
        .is_err());

    // Coercion failures abort even a lenient query.
    let f = QuerySetFilter::new(Resolver::new());
    assert!(f
        .setup_query(&person, &parse("name=rob,age=old").unwrap())
        .is_err());
}

#[test]
fn test_query_params() {
    let mut f = QuerySetFilter::new(Resolver::new());
    f.add_query_params(
        vec![
            ("name__icontains", "rob"),
            ("page", "2"),
            ("age", ""),
            ("exclude__user__username", "carol"),
        ],
        &["page"],
    );
    assert_eq!(f.filter_clauses().len(), 1);
    assert_eq!(f.filter_clauses().get("name__icontains"), Some("rob"));
    assert_eq!(f.exclude_clauses().len(), 1);
    assert_eq!(f.exclude_clauses().get("user__username"), Some("carol"));
}

#[test]
fn test_field_types() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();

    assert_eq!(
        person.get_field("birthday").unwrap().field_type,
        Some(FieldType::DateTime)
    );
    assert_eq!(person.get_field("nickname").unwrap().field_type, None);
    let user = person.get_field("user_id").unwrap();
    assert!(user.is_relation());
    assert_eq!(user.name, "user");
    assert_eq!(user.field_type, Some(FieldType::Integer));
}

#[test]
fn test_timezones() {
    use queryset_cmd::datetime::parse_timezone;

    assert_eq!(parse_timezone("UTC").unwrap(), utc());
    assert_eq!(parse_timezone("Z").unwrap(), utc());
    assert_eq!(
        parse_timezone("+08:00").unwrap(),
        FixedOffset::east_opt(8 * 3600).unwrap()
    );
    assert_eq!(
        parse_timezone("-0530").unwrap(),
        FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap()
    );
    for bad in ["Europe/London", "+8:00", "+08:00:00x", ""] {
        assert!(matches!(
            parse_timezone(bad),
            Err(QueryError::InvalidTimezone(_))
        ));
    }
}
