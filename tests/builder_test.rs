//! Tests for FeatureTreeBuilder and the resulting hierarchy

use fmanalysis::domain::{DomainError, FeatureData, FeatureTreeBuilder, TreeDisplay};

// ============================================================
// Valid hierarchies
// ============================================================

#[test]
fn given_nested_declarations_when_building_then_iteration_orders_are_consistent() {
    // Arrange
    let builder = FeatureTreeBuilder::new()
        .root(FeatureData::new("Editor").abstract_())
        .child("Editor", FeatureData::new("Syntax"))
        .child("Syntax", FeatureData::new("Rust"))
        .child("Syntax", FeatureData::new("Toml"))
        .child("Editor", FeatureData::new("Plugins"));

    // Act
    let tree = builder.build().unwrap();

    // Assert
    let pre: Vec<_> = tree.iter().map(|(_, n)| n.data.name.as_str()).collect();
    let post: Vec<_> = tree.iter_postorder().map(|(_, n)| n.data.name.as_str()).collect();
    assert_eq!(pre, ["Editor", "Syntax", "Rust", "Toml", "Plugins"]);
    assert_eq!(post, ["Rust", "Toml", "Syntax", "Plugins", "Editor"]);
    assert_eq!(tree.depth(), 3);
    assert_eq!(tree.leaf_features(), ["Rust", "Toml", "Plugins"]);
}

#[test]
fn given_built_tree_when_rendered_then_shows_flags() {
    // Arrange
    let tree = FeatureTreeBuilder::new()
        .root(FeatureData::new("Editor").abstract_())
        .child("Editor", FeatureData::new("Telemetry").hidden())
        .build()
        .unwrap();

    // Act
    let rendered = tree.to_tree_string().to_string();

    // Assert
    assert!(rendered.starts_with("Editor [abstract]\n"));
    assert!(rendered.contains("Telemetry [hidden]"));
}

// ============================================================
// Invalid hierarchies
// ============================================================

#[test]
fn given_two_roots_when_building_then_errors() {
    let result = FeatureTreeBuilder::new()
        .root(FeatureData::new("A"))
        .root(FeatureData::new("B"))
        .build();

    assert_eq!(
        result.unwrap_err(),
        DomainError::MultipleRoots {
            first: "A".into(),
            second: "B".into()
        }
    );
}

#[test]
fn given_unknown_parent_when_building_then_errors() {
    let result = FeatureTreeBuilder::new()
        .root(FeatureData::new("Root"))
        .child("Missing", FeatureData::new("Orphan"))
        .build();

    assert!(matches!(
        result,
        Err(DomainError::UnknownParent { feature, parent })
            if feature == "Orphan" && parent == "Missing"
    ));
}

#[test]
fn given_duplicate_name_when_building_then_errors() {
    let result = FeatureTreeBuilder::new()
        .root(FeatureData::new("Root"))
        .child("Root", FeatureData::new("Root"))
        .build();

    assert_eq!(result.unwrap_err(), DomainError::DuplicateFeature("Root".into()));
}

#[test]
fn given_no_declarations_when_building_then_missing_root() {
    assert_eq!(
        FeatureTreeBuilder::new().build().unwrap_err(),
        DomainError::MissingRoot
    );
}
