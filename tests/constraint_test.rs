//! Integration tests for constraints, feature models and their hierarchy lookups.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;

use rstest::{fixture, rstest};

use fmanalysis::domain::{
    Constraint, Described, DomainError, FeatureData, FeatureLookup, FeatureModel, FeatureTree,
    FeatureTreeBuilder, FormulaOwner, Node, Properties, Tagged,
};
use fmanalysis::util::testing::init_test_setup;

#[fixture]
fn car() -> FeatureTree {
    init_test_setup();
    FeatureTreeBuilder::new()
        .root(FeatureData::new("Car"))
        .child("Car", FeatureData::new("Engine"))
        .child("Engine", FeatureData::new("Electric"))
        .child("Engine", FeatureData::new("Combustion"))
        .child("Car", FeatureData::new("Internal").hidden())
        .child("Internal", FeatureData::new("Telemetry"))
        .child("Car", FeatureData::new("X").hidden())
        .build()
        .unwrap()
}

fn tags(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// ============================================================
// Hidden feature detection
// ============================================================

#[rstest]
#[case::hidden_feature(Node::and([Node::var("Electric"), Node::var("X")]), true)]
#[case::below_hidden_parent(Node::implies(Node::var("Telemetry"), Node::var("Engine")), true)]
#[case::visible_only(Node::or([Node::var("Electric"), Node::var("Combustion")]), false)]
#[case::no_terminals_besides_constants(Node::not(Node::constant(false)), false)]
fn given_constraint_when_checking_hidden_references_then_ancestors_count(
    car: FeatureTree,
    #[case] formula: Node,
    #[case] expected: bool,
) {
    let constraint = Constraint::new(Arc::new(car), formula).unwrap();
    assert_eq!(constraint.has_referenced_hidden_feature(), expected);
}

#[rstest]
fn given_tree_replaced_when_reading_features_then_new_tree_is_reflected(car: FeatureTree) {
    let constraint = Constraint::new(Arc::new(car), Node::var("X")).unwrap();
    assert!(constraint.has_referenced_hidden_feature());

    constraint
        .set_tree(Node::implies(Node::var("Electric"), Node::not(Node::var("Combustion"))))
        .unwrap();
    assert!(!constraint.has_referenced_hidden_feature());
    assert_eq!(
        constraint.referenced_feature_names(),
        vec!["Electric", "Combustion"]
    );
}

#[rstest]
fn given_concurrent_tree_swaps_when_reading_then_features_match_a_whole_tree(car: FeatureTree) {
    let context: Arc<dyn FeatureLookup> = Arc::new(car);
    let visible = Node::and([Node::var("Electric"), Node::var("Combustion")]);
    let hidden = Node::or([Node::var("X"), Node::var("Telemetry"), Node::var("Engine")]);
    let constraint = Arc::new(Constraint::new(Arc::clone(&context), visible.clone()).unwrap());

    let reader = {
        let constraint = Arc::clone(&constraint);
        thread::spawn(move || {
            for _ in 0..2_000 {
                let names = constraint.referenced_feature_names();
                assert!(
                    names == ["Electric", "Combustion"] || names == ["X", "Telemetry", "Engine"],
                    "mixed snapshot: {names:?}"
                );
            }
        })
    };
    for i in 0..2_000 {
        let next = if i % 2 == 0 { hidden.clone() } else { visible.clone() };
        constraint.set_tree(next).unwrap();
    }
    reader.join().unwrap();
}

// ============================================================
// Cloning
// ============================================================

#[rstest]
fn given_clone_when_description_changed_then_source_keeps_its_own(car: FeatureTree) {
    let context: Arc<dyn FeatureLookup> = Arc::new(car);
    let source = Constraint::new(Arc::clone(&context), Node::var("Engine")).unwrap();
    source.set_description("engine required".to_string());
    source.set_tags(tags(&["safety"]));
    source.set_implicit(true);
    source.set_properties(BTreeMap::from([("reviewed".to_string(), "yes".to_string())]));

    let clone = source.clone_into(Arc::clone(&context)).unwrap();
    assert_eq!(clone.property("reviewed").as_deref(), Some("yes"));
    clone.set_description("edited".to_string());
    clone.set_tags(tags(&["other"]));
    clone.set_properties(BTreeMap::new());

    assert_eq!(source.description(), "engine required");
    assert_eq!(*source.tags(), tags(&["safety"]));
    assert_eq!(source.property("reviewed").as_deref(), Some("yes"));
    assert!(clone.properties().is_empty());
    assert!(clone.is_implicit());
}

#[rstest]
fn given_models_when_cloning_constraints_then_features_resolve_in_target(car: FeatureTree) {
    let mut source = FeatureModel::new(car);
    source
        .add_constraint(Node::implies(Node::var("Electric"), Node::not(Node::var("Combustion"))))
        .unwrap();

    let target_tree = FeatureTreeBuilder::new()
        .root(FeatureData::new("Vehicle"))
        .child("Vehicle", FeatureData::new("Combustion"))
        .child("Vehicle", FeatureData::new("Electric"))
        .build()
        .unwrap();
    let mut target = FeatureModel::new(target_tree);
    assert_eq!(target.clone_constraints_from(&source), Ok(1));

    let copied = &target.constraints()[0];
    let ids = copied.referenced_features();
    assert_eq!(target.tree().name(ids[0]), Some("Electric"));
    assert_eq!(target.tree().feature("Electric"), Some(ids[0]));
    assert_eq!(*copied.tree(), *source.constraints()[0].tree());
}

#[rstest]
fn given_target_missing_a_feature_when_cloning_constraints_then_nothing_copied(car: FeatureTree) {
    let mut source = FeatureModel::new(car);
    source.add_constraint(Node::var("Electric")).unwrap();
    source.add_constraint(Node::var("Telemetry")).unwrap();

    let target_tree = FeatureTreeBuilder::new()
        .root(FeatureData::new("Electric"))
        .build()
        .unwrap();
    let mut target = FeatureModel::new(target_tree);

    assert_eq!(
        target.clone_constraints_from(&source),
        Err(DomainError::UnknownFeature("Telemetry".to_string()))
    );
    assert!(target.constraints().is_empty());
}

// ============================================================
// Feature model
// ============================================================

#[rstest]
fn given_model_when_collecting_formulas_then_one_per_constraint_in_order(car: FeatureTree) {
    let mut model = FeatureModel::new(car);
    model.add_constraint(Node::var("Engine")).unwrap();
    model
        .add_constraint(Node::or([Node::var("Electric"), Node::var("Combustion")]))
        .unwrap();

    let removed = model.remove_constraint(0).unwrap();
    assert_eq!(*removed.tree(), Node::var("Engine"));
    assert_eq!(
        model.formulas(),
        vec![Node::or([Node::var("Electric"), Node::var("Combustion")])]
    );
}

#[rstest]
fn given_hierarchy_declarations_with_cycle_when_building_then_error() {
    let result = FeatureTreeBuilder::new()
        .root(FeatureData::new("Root"))
        .child("B", FeatureData::new("A"))
        .child("A", FeatureData::new("B"))
        .build();
    assert!(matches!(result, Err(DomainError::CycleDetected(_))));
}
