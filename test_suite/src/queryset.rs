use queryset_cmd::expression::parse;
use queryset_cmd::filtering::{QueryError, QuerySetFilter, ResolvedQuery, Resolver};
use queryset_cmd::ordering::OrderBy;
use queryset_cmd::queryset::{MemoryError, QuerySet};
use queryset_cmd::value::Value;

use crate::{people, pks};

fn filtered(expr: &str) -> Vec<i64> {
    let db = people();
    let mut f = QuerySetFilter::new(Resolver::new().strict(true));
    f.add_filter(parse(expr).unwrap());
    let qs = f
        .apply(db.all("people.Person").unwrap(), None, None)
        .unwrap();
    pks(&qs)
}

fn ordered(order_by: &str) -> Vec<i64> {
    let db = people();
    let f = QuerySetFilter::new(Resolver::new());
    let qs = f
        .apply(db.all("people.Person").unwrap(), Some(order_by), None)
        .unwrap();
    pks(&qs)
}

#[test]
fn test_strings() {
    assert_eq!(filtered("name=Alice"), vec![2]);
    assert_eq!(filtered("name=alice"), Vec::<i64>::new());
    assert_eq!(filtered("name__iexact=alice"), vec![2]);
    assert_eq!(filtered("name__contains=Robert"), vec![1, 3]);
    assert_eq!(filtered("name__contains=ROB"), Vec::<i64>::new());
    assert_eq!(filtered("name__icontains=ROB"), vec![1, 3]);
    assert_eq!(filtered("name__in=Dave,Alice"), vec![2, 4]);
}

#[test]
fn test_numbers() {
    assert_eq!(filtered("age=30"), vec![1, 4]);
    assert_eq!(filtered("age__gt=29"), vec![1, 3, 4]);
    assert_eq!(filtered("age__gte=30"), vec![1, 3, 4]);
    assert_eq!(filtered("age__lt=30"), vec![2]);
    assert_eq!(filtered("age__lte=30"), vec![1, 2, 4]);
    assert_eq!(filtered("age__range=25,30"), vec![1, 2, 4]);
    assert_eq!(filtered("id__in=1,3,99"), vec![1, 3]);

    assert_eq!(filtered("height__lt=1.7"), vec![2]);
    assert_eq!(filtered("height__gte=1.75"), vec![1, 4]);
    assert_eq!(filtered("height__lt=2"), vec![1, 2, 4]);
}

#[test]
fn test_combined() {
    assert_eq!(filtered("age=30,name__contains=Rob"), vec![1]);
    assert_eq!(filtered("age__gte=25,height__lt=1.8"), vec![2, 4]);
}

#[test]
fn test_nulls() {
    assert_eq!(filtered("height=null"), vec![3]);
    assert_eq!(filtered("age=null"), Vec::<i64>::new());
    assert_eq!(filtered("birthday__isnull=true"), vec![4]);
    assert_eq!(filtered("birthday__isnull=false"), vec![1, 2, 3]);
    assert_eq!(filtered("nickname=bobby"), vec![1]);
    assert_eq!(filtered("nickname__isnull=True"), vec![2, 3, 4]);
}

#[test]
fn test_datetimes() {
    assert_eq!(
        filtered("birthday__range=1980-01-01,1990-12-31"),
        vec![1, 3]
    );
    assert_eq!(filtered("birthday__gt=1990-05-01T10:00:00Z"), vec![2]);
    assert_eq!(filtered("birthday__gte=1990-05-01T10:00:00Z"), vec![1, 2]);
    // 10:00 UTC is 12:00 at +02:00.
    assert_eq!(filtered("birthday=1990-05-01T12:00:00+02:00"), vec![1]);
}

#[test]
fn test_relations() {
    assert_eq!(filtered("user__username=bob"), vec![1]);
    assert_eq!(filtered("user__username__exact=bob"), vec![1]);
    assert_eq!(filtered("user__is_active=true"), vec![1, 2]);
    assert_eq!(filtered("user__is_active=false"), vec![4]);
    assert_eq!(filtered("user__isnull=true"), vec![3]);
    assert_eq!(filtered("user__username__isnull=true"), vec![3]);
    assert_eq!(filtered("user=2"), vec![2]);
    assert_eq!(filtered("user_id__in=1,3"), vec![1, 4]);
}

#[test]
fn test_many_relations() {
    assert_eq!(filtered("friends__name=Alice"), vec![1, 4]);
    assert_eq!(filtered("friends__isnull=true"), vec![3]);
    assert_eq!(filtered("friends__friends__name=Roberta"), vec![2, 4]);
    assert_eq!(filtered("friends__friends__name=Dave"), Vec::<i64>::new());
    assert_eq!(filtered("friends__in=3"), vec![1]);
}

#[test]
fn test_exclude() {
    let db = people();

    let mut f = QuerySetFilter::new(Resolver::new());
    f.add_exclude(parse("age=30").unwrap());
    let qs = f.apply(db.all("people.Person").unwrap(), None, None).unwrap();
    assert_eq!(pks(&qs), vec![2, 3]);

    // Only rows matching every clause are excluded.
    let mut f = QuerySetFilter::new(Resolver::new());
    f.add_exclude(parse("age=30,name=Dave").unwrap());
    let qs = f.apply(db.all("people.Person").unwrap(), None, None).unwrap();
    assert_eq!(pks(&qs), vec![1, 2, 3]);

    let qs = db
        .all("people.Person")
        .unwrap()
        .exclude(&ResolvedQuery::new())
        .unwrap();
    assert_eq!(pks(&qs), vec![1, 2, 3, 4]);
}

#[test_log::test]
fn test_apply() {
    let db = people();

    let mut f = QuerySetFilter::new(Resolver::new());
    f.add_params(vec![
        ("age__gte", "25"),
        ("exclude__name", "Dave"),
        ("shoe_size", "9"),
    ]);
    let qs = f
        .apply(db.all("people.Person").unwrap(), Some("-age"), None)
        .unwrap();
    assert_eq!(pks(&qs), vec![3, 1, 2]);
    assert_eq!(qs.count(), 3);

    let qs = f
        .apply(db.all("people.Person").unwrap(), Some("-age"), Some(2))
        .unwrap();
    assert_eq!(pks(&qs), vec![3, 1]);

    // A zero limit is no limit.
    let qs = f
        .apply(db.all("people.Person").unwrap(), Some("-age"), Some(0))
        .unwrap();
    assert_eq!(qs.count(), 3);
}

#[test]
fn test_strict_apply() {
    let db = people();

    let mut f = QuerySetFilter::new(Resolver::new().strict(true));
    f.add_filter(parse("age__gte=25,shoe_size=9").unwrap());
    assert!(matches!(
        f.apply(db.all("people.Person").unwrap(), None, None),
        Err(QueryError::UnknownField { .. })
    ));

    let mut f = QuerySetFilter::new(Resolver::new().strict(true));
    f.add_exclude(parse("shoe_size=9").unwrap());
    assert!(f.apply(db.all("people.Person").unwrap(), None, None).is_err());
}

#[test]
fn test_idempotent() {
    let db = people();
    let person = db.registry().get("people.Person").unwrap();

    let f = QuerySetFilter::new(Resolver::new());
    let query = f
        .setup_query(&person, &parse("age__gte=30,friends__name=Alice").unwrap())
        .unwrap();

    let once = db.all("people.Person").unwrap().filter(&query).unwrap();
    let twice = once.clone().filter(&query).unwrap();
    let again = db.all("people.Person").unwrap().filter(&query).unwrap();
    assert_eq!(pks(&once), vec![1, 4]);
    assert_eq!(pks(&once), pks(&twice));
    assert_eq!(pks(&once), pks(&again));

    // The database is untouched.
    assert_eq!(db.all("people.Person").unwrap().count(), 4);
}

#[test]
fn test_ordering() {
    assert_eq!(ordered("id"), vec![1, 2, 3, 4]);
    assert_eq!(ordered("-id"), vec![4, 3, 2, 1]);
    assert_eq!(ordered("age,-name"), vec![2, 1, 4, 3]);
    assert_eq!(ordered("age,name"), vec![2, 4, 1, 3]);
    assert_eq!(ordered(r#"["-age", "name"]"#), vec![3, 4, 1, 2]);
    // Nulls sort first.
    assert_eq!(ordered("height"), vec![3, 2, 4, 1]);
    assert_eq!(ordered("-height"), vec![1, 4, 2, 3]);
    assert_eq!(ordered("birthday"), vec![4, 3, 1, 2]);
    assert_eq!(ordered("user__username"), vec![3, 2, 1, 4]);
    assert_eq!(ordered(""), vec![1, 2, 3, 4]);
}

#[test]
fn test_bad_ordering() {
    let db = people();
    let f = QuerySetFilter::new(Resolver::new());

    assert!(matches!(
        f.apply(db.all("people.Person").unwrap(), Some("shoe_size"), None),
        Err(QueryError::Engine(_))
    ));
    assert!(matches!(
        f.apply(db.all("people.Person").unwrap(), Some("-"), None),
        Err(QueryError::InvalidOrdering(_))
    ));

    let res = db
        .all("people.Person")
        .unwrap()
        .order_by(&[OrderBy::ascending("user__shoe_size")]);
    match res {
        Err(MemoryError::NoField { field, model }) => {
            assert_eq!(field, "shoe_size");
            assert_eq!(model, "auth.User");
        }
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("ordering by an unknown field succeeded"),
    }
}

#[test]
fn test_models() {
    let db = people();
    assert_eq!(db.all("PEOPLE.person").unwrap().count(), 4);
    assert_eq!(db.all("auth.User").unwrap().count(), 3);
    assert!(matches!(
        db.all("people.Pet"),
        Err(MemoryError::NoModel(_))
    ));
}

#[test]
fn test_value_at() {
    let db = people();
    let model = db.registry().model("people.Person").unwrap();
    let robert = db.get(model, &Value::Int(1)).unwrap();

    assert_eq!(
        db.value_at(model, robert, &["user", "username"]).unwrap(),
        Value::from("bob")
    );
    assert_eq!(
        db.value_at(model, robert, &["friends", "name"]).unwrap(),
        Value::List(vec![Value::from("Alice"), Value::from("Roberta")])
    );
    assert_eq!(db.value_at(model, robert, &["user_id"]).unwrap(), Value::Int(1));
    assert!(db.value_at(model, robert, &["name", "first"]).is_err());
}
