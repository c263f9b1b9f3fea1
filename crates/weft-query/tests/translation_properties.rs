//! End-to-end behaviour of Bag validation and translation.

use proptest::prelude::*;
use serde_json::{json, Value};
use weft_query::{
    Bag, Batch, Comparator, Conjunction, Constraint, CypherProcessor, EdgeRecord, FieldRef,
    OrientDbProcessor, Processor, Record, StatementKind, VertexRecord,
};

fn retrieve(constraints: Vec<Constraint>) -> Bag {
    Bag {
        retrieve: Some(vec![]),
        constraints,
        ..Default::default()
    }
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn bag_without_operation_is_rejected() {
    let bags = [
        Bag::new(),
        Bag {
            limit: Some(1),
            delete: false,
            constraints: vec![Constraint::new("a", Comparator::Equal, 1, Conjunction::And)],
            ..Default::default()
        },
    ];

    for bag in bags {
        let err = bag.validate().unwrap_err();
        assert!(err.mentions("must perform at least one operation"));
        assert_eq!(bag.violations(), err.violations);
    }
}

#[test]
fn edge_completeness() {
    let incomplete = [
        EdgeRecord::new("knows").from("#1:1"),
        EdgeRecord::new("knows").to("#1:1"),
        EdgeRecord::new("knows"),
    ];
    for edge in incomplete {
        let bag = Bag {
            create: Some(vec![edge.into()]),
            ..Default::default()
        };
        assert!(bag
            .validate()
            .unwrap_err()
            .mentions("edge must define both its out vertex and its in vertex"));
    }

    let complete = Bag {
        create: Some(vec![EdgeRecord::new("knows").from("#1:1").to("#1:2").into()]),
        ..Default::default()
    };
    assert!(complete.validate().is_ok());
}

// ============================================================================
// Predicates
// ============================================================================

#[test]
fn element_type_never_becomes_a_predicate() {
    let bag = retrieve(vec![
        Constraint::new(FieldRef::Type, Comparator::Equal, "VERTEX", Conjunction::And),
        Constraint::new("name", Comparator::Equal, "josh", Conjunction::And),
    ]);

    let orient = OrientDbProcessor::new().process(&bag).unwrap();
    assert_eq!(orient.script(), "SELECT FROM V WHERE name = 'josh'");

    let cypher = CypherProcessor::new().process(&bag).unwrap();
    assert_eq!(cypher.script(), "MATCH (n) WHERE n.name = 'josh' RETURN n");
}

#[test]
fn conjunctions_join_typed_values() {
    let bag = retrieve(vec![
        Constraint::new("one", Comparator::Equal, "one", Conjunction::And),
        Constraint::new("two", Comparator::Gt, 2, Conjunction::And),
        Constraint::new("three", Comparator::Lt, json!(314.0 / 100.0), Conjunction::Or),
        Constraint::new("four", Comparator::Equal, true, Conjunction::And),
    ]);

    let command = OrientDbProcessor::new().process(&bag).unwrap();
    assert!(command
        .script()
        .ends_with("WHERE one = 'one' AND two > 2 OR three < 3.14 AND four = true"));
}

#[test]
fn untyped_parts_parse_like_typed_constraints() {
    let parts = [json!("ELEMENT_LABEL"), json!("=="), json!("person"), json!("AND")];
    let constraint = Constraint::try_from(&parts[..]).unwrap();
    assert_eq!(
        constraint,
        Constraint::new(FieldRef::Label, Comparator::Equal, "person", Conjunction::And)
    );
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn multi_row_insert_unifies_keys() {
    let bag = Bag {
        create: Some(vec![
            VertexRecord::new("item").with("a", 1).with("b", 2).into(),
            VertexRecord::new("item").with("a", 3).with("c", 4).into(),
        ]),
        ..Default::default()
    };

    let command = OrientDbProcessor::new().process(&bag).unwrap();
    assert_eq!(
        command.script(),
        "INSERT INTO item (a, b, c) VALUES (1, 2, null), (3, null, 4)"
    );
}

#[test]
fn embedded_endpoint_is_inlined_in_place() {
    let target = retrieve(vec![
        Constraint::new(FieldRef::Label, Comparator::Equal, "person", Conjunction::And),
        Constraint::new("name", Comparator::Equal, "peter", Conjunction::And),
    ]);
    let processor = OrientDbProcessor::new();

    let edge = |record: EdgeRecord| Bag {
        create: Some(vec![record.with("weight", 0.5).into()]),
        ..Default::default()
    };
    let literal = processor
        .process(&edge(EdgeRecord::new("knows").from("#9:1").to("#9:2")))
        .unwrap();
    let embedded = processor
        .process(&edge(EdgeRecord::new("knows").from("#9:1").to(target.clone())))
        .unwrap();

    let nested = processor.process(&target).unwrap();
    let expected = literal
        .script()
        .replace("#9:2", &format!("({})", nested.script()));
    assert_eq!(embedded.script(), expected);
}

// ============================================================================
// Batch
// ============================================================================

#[test]
fn batch_variables_follow_binding_order() {
    let mut batch = Batch::new();
    batch.begin().unwrap();

    let names: Vec<String> = [
        StatementKind::Create,
        StatementKind::Select,
        StatementKind::Create,
    ]
    .into_iter()
    .map(|kind| batch.add_statement("CREATE VERTEX V", kind).unwrap())
    .collect();

    assert_eq!(names, ["c1", "s2", "c3"]);
    assert!(batch.end().unwrap().ends_with("return [$c1, $s2, $c3]"));
}

// ============================================================================
// Determinism
// ============================================================================

fn comparator() -> impl Strategy<Value = Comparator> {
    prop::sample::select(Comparator::ALL.to_vec())
}

fn conjunction() -> impl Strategy<Value = Conjunction> {
    prop::sample::select(vec![Conjunction::And, Conjunction::Or, Conjunction::Not])
}

fn literal() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z' ]{0,8}".prop_map(Value::from),
    ]
}

fn constraint() -> impl Strategy<Value = Constraint> {
    ("[a-z]{1,6}", comparator(), literal(), conjunction()).prop_map(
        |(field, comparator, value, conjunction)| {
            Constraint::new(field, comparator, value, conjunction)
        },
    )
}

fn record() -> impl Strategy<Value = Record> {
    (
        prop::option::of("[a-z]{1,5}"),
        prop::collection::vec(("[a-z]{1,4}", literal()), 0..4),
    )
        .prop_map(|(label, properties)| {
            let mut vertex = match label {
                Some(label) => VertexRecord::new(label),
                None => VertexRecord::unlabeled(),
            };
            for (key, value) in properties {
                vertex = vertex.with(key, value);
            }
            vertex.into()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn retrieve_translation_is_deterministic(
        constraints in prop::collection::vec(constraint(), 0..6),
        limit in prop::option::of(1usize..50),
    ) {
        let bag = Bag { limit, ..retrieve(constraints) };
        for processor in [&OrientDbProcessor::new() as &dyn Processor, &CypherProcessor::new()] {
            let first = processor.process(&bag).unwrap();
            let second = processor.process(&bag).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn create_translation_is_deterministic(records in prop::collection::vec(record(), 1..5)) {
        let bag = Bag { create: Some(records), ..Default::default() };
        let processor = OrientDbProcessor::new();
        prop_assert_eq!(processor.process(&bag).unwrap(), processor.process(&bag).unwrap());
    }

    #[test]
    fn where_clause_has_one_conjunction_per_join(
        constraints in prop::collection::vec(constraint(), 1..6),
    ) {
        let bag = retrieve(
            constraints
                .into_iter()
                .map(|c| Constraint { value: json!(1).into(), ..c })
                .collect(),
        );
        let script = OrientDbProcessor::new().process(&bag).unwrap().into_script();
        let clause = script.split_once(" WHERE ").map(|(_, w)| w.to_string()).unwrap_or_default();

        let joins = clause.matches(" AND ").count() + clause.matches(" OR ").count();
        prop_assert_eq!(joins, bag.constraints.len() - 1);
        prop_assert!(!clause.starts_with("AND") && !clause.starts_with("OR"));
    }
}
