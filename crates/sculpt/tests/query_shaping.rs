//! End-to-end tests: queries shaped by the rewriter and run in memory.

use std::sync::Arc;

use sculpt::{
    Criteria, DataType, Dir, Entity, MemoryEngine, Method, Number, Query, QueryRewriter, Reflect,
    Row, SculptError, ShapeRegistry, Value,
};

#[derive(Debug, Clone, Reflect)]
struct Address {
    city: String,
    street: Option<String>,
}

#[derive(Debug, Clone, Reflect)]
struct Person {
    id: u32,
    name: String,
    age: Option<i32>,
    extra: String,
    address: Address,
}

fn person(id: u32, name: &str, age: Option<i32>, city: &str) -> Person {
    Person {
        id,
        name: name.into(),
        age,
        extra: "x".into(),
        address: Address {
            city: city.into(),
            street: None,
        },
    }
}

fn fixture() -> Vec<Person> {
    vec![
        person(1, "Ada", Some(36), "London"),
        person(2, "Grace", Some(45), "Arlington"),
        person(3, "Alan", Some(41), "London"),
        person(4, "Edsger", None, "Nuenen"),
        person(5, "Barbara", Some(36), "Arlington"),
        person(6, "Linus", None, "London"),
    ]
}

fn rewriter() -> QueryRewriter {
    QueryRewriter::new(Arc::new(ShapeRegistry::new()))
}

fn ids(rows: &[Row<'_>]) -> Vec<u32> {
    rows.iter()
        .map(|row| match row.get("id") {
            Some(Value::Number(Number::U64(id))) => id as u32,
            other => panic!("unexpected id value: {:?}", other),
        })
        .collect()
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn order_by_nested_member_descending_is_stable() {
    let people = fixture();
    let query = rewriter()
        .apply_order(&Query::of::<Person>(), "address.city", true)
        .unwrap();

    let rows = MemoryEngine::new(&people).run(&query).unwrap();

    // Nuenen > London > Arlington, ties keep fixture order.
    assert_eq!(ids(&rows), [4, 1, 3, 6, 2, 5]);
}

#[test]
fn order_by_ascending_is_stable() {
    let people = fixture();
    let query = rewriter()
        .apply_order(&Query::of::<Person>(), "address.city", false)
        .unwrap();

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(ids(&rows), [2, 5, 1, 3, 6, 4]);
}

#[test]
fn nulls_sort_last_in_both_directions() {
    let people = fixture();
    let r = rewriter();

    let asc = r.apply_order(&Query::of::<Person>(), "age", false).unwrap();
    let rows = MemoryEngine::new(&people).run(&asc).unwrap();
    assert_eq!(ids(&rows), [1, 5, 3, 2, 4, 6]);

    let desc = r.apply_order(&Query::of::<Person>(), "age", true).unwrap();
    let rows = MemoryEngine::new(&people).run(&desc).unwrap();
    assert_eq!(ids(&rows), [2, 3, 1, 5, 4, 6]);
}

#[test]
fn then_order_breaks_ties() {
    let people = fixture();
    let r = rewriter();
    let query = r
        .apply_order(&Query::of::<Person>(), "address.city", false)
        .unwrap();
    let query = r.apply_then_order(&query, "name", true).unwrap();

    assert_eq!(
        query.to_string(),
        "Person.OrderBy(m => m.address.city).ThenByDescending(m => m.name)"
    );

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    // Arlington: Grace, Barbara; London: Linus, Alan, Ada; Nuenen: Edsger.
    assert_eq!(ids(&rows), [2, 5, 6, 3, 1, 4]);
}

#[test]
fn a_later_order_replaces_an_earlier_one() {
    let people = fixture();
    let r = rewriter();
    let query = r.apply_order(&Query::of::<Person>(), "name", false).unwrap();
    let query = r.apply_order(&query, "id", true).unwrap();

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(ids(&rows), [6, 5, 4, 3, 2, 1]);
}

#[derive(Debug, Clone, Reflect)]
struct Reading {
    v: f64,
}

#[test]
fn nan_keys_sort_last_and_leave_the_rest_ordered() {
    let readings: Vec<Reading> = (0..200)
        .map(|i| Reading {
            v: if i % 3 == 0 {
                f64::NAN
            } else {
                ((i * 37) % 101) as f64
            },
        })
        .collect();

    for descending in [false, true] {
        let query = rewriter()
            .apply_order(&Query::of::<Reading>(), "v", descending)
            .unwrap();
        let rows = MemoryEngine::new(&readings).run(&query).unwrap();
        let values: Vec<f64> = rows
            .iter()
            .map(|row| match row.get("v") {
                Some(Value::Number(Number::F64(v))) => v,
                other => panic!("unexpected value: {:?}", other),
            })
            .collect();

        let (numbers, nans) = values.split_at(values.iter().take_while(|v| !v.is_nan()).count());
        assert_eq!(nans.len(), 67);
        assert!(nans.iter().all(|v| v.is_nan()));
        assert!(numbers.windows(2).all(|w| if descending {
            w[0] >= w[1]
        } else {
            w[0] <= w[1]
        }));
    }
}

#[test]
fn then_order_needs_a_primary_ordering() {
    let err = rewriter()
        .apply_then_order(&Query::of::<Person>(), "name", false)
        .unwrap_err();
    assert!(matches!(err, SculptError::InvalidArgument { .. }));
}

#[test]
fn ordering_by_unknown_member_fails() {
    let err = rewriter()
        .apply_order(&Query::of::<Person>(), "address.country", false)
        .unwrap_err();
    assert_eq!(
        err,
        SculptError::MemberNotFound {
            type_name: "Address".into(),
            member: "country".into(),
        }
    );
}

#[test]
fn ordering_by_a_record_member_fails() {
    let err = rewriter()
        .apply_order(&Query::of::<Person>(), "address", false)
        .unwrap_err();
    assert!(matches!(err, SculptError::TypeMismatch { .. }));
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn projection_exposes_only_requested_members() {
    let people = vec![person(1, "A", Some(3), "London")];
    let query = rewriter()
        .apply_projection(&Query::of::<Person>(), &["name", "age"])
        .unwrap();

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(rows.len(), 1);

    let row = rows[0].as_projected().unwrap();
    assert_eq!(row.get("name"), Some(Value::String("A")));
    assert_eq!(row.get("age"), Some(Value::Number(Number::I64(3))));
    assert_eq!(row.get("extra"), None);
    assert_eq!(row.record_type().members().len(), 2);
}

#[test]
fn projection_types_are_shared_across_name_orders() {
    let r = rewriter();
    let a = r
        .apply_projection(&Query::of::<Person>(), &["name", "age"])
        .unwrap();
    let b = r
        .apply_projection(&Query::of::<Person>(), &["age", "name"])
        .unwrap();

    assert_eq!(a.element_type(), b.element_type());
    assert_eq!(r.registry().len(), 1);
}

#[test]
fn projection_keeps_nullable_types_and_nulls() {
    let people = fixture();
    let query = rewriter()
        .apply_projection(&Query::of::<Person>(), &["age"])
        .unwrap();

    let age = query.element_type().member("age").unwrap();
    assert_eq!(age.data_type(), &DataType::optional(DataType::Int));

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(rows[3].get("age"), Some(Value::Null));
}

#[test]
fn projection_rejects_bad_field_lists() {
    let r = rewriter();
    let query = Query::of::<Person>();

    assert!(matches!(
        r.apply_projection::<&str>(&query, &[]),
        Err(SculptError::InvalidArgument { .. })
    ));
    assert!(matches!(
        r.apply_projection(&query, &["name", "age", "name"]),
        Err(SculptError::InvalidArgument { name: "field_names", .. })
    ));
    assert!(matches!(
        r.apply_projection(&query, &["nickname"]),
        Err(SculptError::MemberNotFound { .. })
    ));
    assert!(matches!(
        r.apply_projection(&query, &["address.city"]),
        Err(SculptError::UnsupportedShape { .. })
    ));
    assert!(matches!(
        r.apply_projection(&query, &["address"]),
        Err(SculptError::UnsupportedShape { .. })
    ));
    assert!(r.registry().is_empty());
}

#[test]
fn ordering_after_projection_reads_the_projected_members() {
    let people = fixture();
    let r = rewriter();
    let query = r
        .apply_projection(&Query::of::<Person>(), &["id", "name"])
        .unwrap();
    let query = r.apply_order(&query, "name", false).unwrap();

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(ids(&rows), [1, 3, 5, 4, 2, 6]);
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn filter_matches_every_criteria_pair() {
    let people = fixture();
    let criteria = Criteria::new()
        .with("address.city", "London")
        .with("age", 36);
    let query = rewriter()
        .apply_filter(&Query::of::<Person>(), &criteria)
        .unwrap();

    assert_eq!(
        query.to_string(),
        "Person.Where(m => ((m.address.city == \"London\") AndAlso (m.age == Convert(36, int?))))"
    );

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(ids(&rows), [1]);
}

#[test]
fn filter_on_null_matches_unset_members() {
    let people = fixture();
    let criteria = Criteria::new().with("age", None::<i32>);
    let query = rewriter()
        .apply_filter(&Query::of::<Person>(), &criteria)
        .unwrap();

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(ids(&rows), [4, 6]);
}

#[test]
fn empty_criteria_are_rejected() {
    let err = rewriter()
        .apply_filter(&Query::of::<Person>(), &Criteria::new())
        .unwrap_err();
    assert_eq!(err, SculptError::EmptyInput);
}

#[test]
fn filter_order_and_projection_compose() {
    let people = fixture();
    let r = rewriter();
    let query = Query::of::<Person>();
    let query = r
        .apply_filter(&query, &Criteria::new().with("address.street", None::<String>))
        .unwrap();
    let query = r.apply_order(&query, "age", true).unwrap();
    let query = r.apply_projection(&query, &["id", "age"]).unwrap();

    let methods: Vec<_> = query.steps().iter().map(|s| s.method).collect();
    assert_eq!(
        methods,
        [Method::Where, Method::OrderByDescending, Method::Select]
    );

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(ids(&rows), [2, 3, 1, 5, 4, 6]);
    assert!(rows.iter().all(|row| row.get("name").is_none()));
}

// ============================================================================
// Engine checks
// ============================================================================

#[test]
fn engine_rejects_queries_over_other_types() {
    let addresses = vec![Address {
        city: "Lisbon".into(),
        street: None,
    }];
    let err = MemoryEngine::new(&addresses)
        .run(&Query::of::<Person>())
        .unwrap_err();
    assert!(matches!(err, SculptError::TypeMismatch { .. }));
}

#[test]
fn unshaped_query_returns_source_rows() {
    let people = fixture();
    let rows = MemoryEngine::new(&people).run(&Query::of::<Person>()).unwrap();
    assert_eq!(ids(&rows), [1, 2, 3, 4, 5, 6]);
    assert!(rows[0].as_source().is_some());
    assert_eq!(rows[0].record_type(), Person::type_info());
}

#[test]
fn explicit_order_matches_rewriter_order() {
    let people = fixture();
    let key = sculpt::member_access_lambda(
        &Person::type_info(),
        &sculpt::PropertyPath::parse("name").unwrap(),
        "p",
    )
    .unwrap();
    let query = Query::of::<Person>().order_by(key, Dir::Asc).unwrap();

    let rows = MemoryEngine::new(&people).run(&query).unwrap();
    assert_eq!(ids(&rows), [1, 3, 5, 4, 2, 6]);
}
