//! Property-based tests for sculpt using proptest.

use std::sync::Arc;

use proptest::prelude::*;
use sculpt::{
    combine_and, combine_lambdas, compare_values, CompiledPredicate, Criteria, DataType, Lambda,
    MemoryEngine, Number, PredicateBuilder, ProjectionSpec, Query, QueryRewriter, Reflect,
    ShapeRegistry, Value,
};

// ============================================================================
// Test helpers
// ============================================================================

#[derive(Debug, Clone, Reflect)]
struct Item {
    id: u32,
    name: String,
    value: i64,
    rank: Option<i32>,
    active: bool,
}

fn item_strategy() -> impl Strategy<Value = Item> {
    (
        "[a-c]{1,2}",
        -5i64..5,
        prop::option::of(-3i32..3),
        any::<bool>(),
    )
        .prop_map(|(name, value, rank, active)| Item {
            id: 0,
            name,
            value,
            rank,
            active,
        })
}

// Items get their position as id, so stability can be checked.
fn items_strategy() -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec(item_strategy(), 0..40).prop_map(|mut items| {
        for (i, item) in items.iter_mut().enumerate() {
            item.id = i as u32;
        }
        items
    })
}

fn holds(lambda: &Lambda, item: &Item) -> bool {
    CompiledPredicate::new(lambda.clone())
        .unwrap()
        .matches(item)
        .unwrap()
}

fn rewriter() -> QueryRewriter {
    QueryRewriter::new(Arc::new(ShapeRegistry::new()))
}

fn scalar_type() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::Bool),
        Just(DataType::Int),
        Just(DataType::UInt),
        Just(DataType::Float),
        Just(DataType::String),
        Just(DataType::Timestamp),
    ]
    .prop_flat_map(|ty| {
        prop_oneof![Just(ty.clone()), Just(DataType::optional(ty))]
    })
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Filtering never returns more items than the input.
    #[test]
    fn filter_never_grows_collection(
        items in items_strategy(),
        name in "[a-c]{1,2}",
        active in any::<bool>(),
    ) {
        let criteria = Criteria::new().with("name", name.as_str()).with("active", active);
        let query = rewriter().apply_filter(&Query::of::<Item>(), &criteria).unwrap();
        let rows = MemoryEngine::new(&items).run(&query).unwrap();

        prop_assert!(rows.len() <= items.len());
        let expected = items.iter().filter(|i| i.name == name && i.active == active).count();
        prop_assert_eq!(rows.len(), expected);
    }

    /// A conjunction of equalities built from an item's own values matches it.
    #[test]
    fn conjunction_matches_its_template(item in item_strategy(), other in item_strategy()) {
        let builder = PredicateBuilder::for_entity::<Item>();
        let nodes = builder
            .equalities_from_source(&item, &["name", "value", "rank", "active"])
            .unwrap();
        let lambda = builder.lambda(combine_and(nodes).unwrap());

        prop_assert!(holds(&lambda, &item));
        let same = item.name == other.name
            && item.value == other.value
            && item.rank == other.rank
            && item.active == other.active;
        prop_assert_eq!(holds(&lambda, &other), same);
    }

    /// Nullable-vs-plain comparisons evaluate like same-type comparisons.
    #[test]
    fn lifted_comparison_matches_direct(item in item_strategy(), target in -3i32..3) {
        let builder = PredicateBuilder::for_entity::<Item>();
        let lifted = builder.lambda(builder.equal("rank", target).unwrap());
        let direct = builder.lambda(builder.equal("rank", Some(target)).unwrap());
        prop_assert_eq!(holds(&lifted, &item), holds(&direct, &item));
        prop_assert_eq!(holds(&lifted, &item), item.rank == Some(target));
    }

    /// Merged lambdas hold exactly when every input holds.
    #[test]
    fn combined_lambdas_equal_conjunction(
        item in item_strategy(),
        name in "[a-c]{1,2}",
        value in -5i64..5,
    ) {
        // Separate builders allocate separate parameters.
        let left = PredicateBuilder::for_entity::<Item>();
        let left = left.lambda(left.equal("name", name.as_str()).unwrap());
        let right = PredicateBuilder::for_entity::<Item>();
        let right = right.lambda(right.equal("value", value).unwrap());
        prop_assert_ne!(left.parameter(), right.parameter());

        let merged = combine_lambdas(&[left.clone(), right.clone()]).unwrap();
        prop_assert_eq!(
            holds(&merged, &item),
            holds(&left, &item) && holds(&right, &item)
        );
    }

    /// Ordering sorts by key and keeps input order among equal keys.
    #[test]
    fn order_is_sorted_and_stable(items in items_strategy(), descending in any::<bool>()) {
        let query = rewriter().apply_order(&Query::of::<Item>(), "rank", descending).unwrap();
        let rows = MemoryEngine::new(&items).run(&query).unwrap();
        prop_assert_eq!(rows.len(), items.len());

        let keyed: Vec<(Value<'_>, u32)> = rows
            .iter()
            .map(|row| {
                let id = match row.get("id") {
                    Some(Value::Number(Number::U64(id))) => id as u32,
                    _ => u32::MAX,
                };
                (row.get("rank").unwrap_or(Value::Null), id)
            })
            .collect();

        for pair in keyed.windows(2) {
            let ((a, a_id), (b, b_id)) = (&pair[0], &pair[1]);
            match (a.is_null(), b.is_null()) {
                (true, false) => prop_assert!(false, "null sorted before a value"),
                (true, true) => prop_assert!(a_id < b_id),
                (false, true) => {}
                (false, false) => {
                    let ord = compare_values(a, b).unwrap();
                    let ord = if descending { ord.reverse() } else { ord };
                    prop_assert!(ord.is_le());
                    if ord.is_eq() {
                        prop_assert!(a_id < b_id);
                    }
                }
            }
        }
    }

    /// Projection keeps every row and only the requested members.
    #[test]
    fn projection_preserves_rows(items in items_strategy()) {
        let query = rewriter()
            .apply_projection(&Query::of::<Item>(), &["value", "name"])
            .unwrap();
        let rows = MemoryEngine::new(&items).run(&query).unwrap();

        prop_assert_eq!(rows.len(), items.len());
        for (row, item) in rows.iter().zip(&items) {
            prop_assert_eq!(row.get("name"), Some(Value::String(&item.name)));
            prop_assert_eq!(row.get("value"), Some(Value::Number(Number::I64(item.value))));
            prop_assert!(row.get("rank").is_none());
        }
    }

    /// The same pairs in any order produce the same type.
    #[test]
    fn shape_identity_ignores_order(
        types in prop::collection::vec(scalar_type(), 1..6),
        seed in any::<u64>(),
    ) {
        let pairs: Vec<(String, DataType)> = types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| (format!("f{}", i), ty))
            .collect();
        let mut shuffled = pairs.clone();
        shuffled.rotate_left((seed as usize) % pairs.len());
        shuffled.reverse();

        let registry = ShapeRegistry::new();
        let a = registry.get_or_create(&ProjectionSpec::from_pairs(pairs).unwrap()).unwrap();
        let b = registry.get_or_create(&ProjectionSpec::from_pairs(shuffled).unwrap()).unwrap();
        prop_assert!(Arc::ptr_eq(&a, &b));
        prop_assert_eq!(registry.len(), 1);
    }
}
