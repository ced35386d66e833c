//! Cross-tree constraints and their derived views.
//!
//! A [`Constraint`] keeps its formula and the features the formula references
//! in one snapshot, so a reader never sees a new tree with a stale feature
//! list or the other way round. Tags and description live behind their own
//! locks; updating one never blocks readers of another.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::analysis::outcome::Outcome;
use crate::analysis::traverse::traverse;
use crate::analysis::visitors::VariableCollector;
use crate::domain::arena::FeatureId;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::formula::Node;
use crate::domain::model::FeatureLookup;

/// Owns a replaceable set of string tags.
pub trait Tagged {
    /// Snapshot of the current tags.
    fn tags(&self) -> Arc<BTreeSet<String>>;

    /// Replace all tags at once.
    fn set_tags(&self, tags: BTreeSet<String>);
}

/// Owns a free-text description.
pub trait Described {
    fn description(&self) -> String;

    fn set_description(&self, description: String);
}

/// Owns free-form key/value properties.
pub trait Properties {
    /// Snapshot of the current properties.
    fn properties(&self) -> Arc<BTreeMap<String, String>>;

    /// Replace all properties at once.
    fn set_properties(&self, properties: BTreeMap<String, String>);

    fn property(&self, key: &str) -> Option<String> {
        self.properties().get(key).cloned()
    }
}

/// Owns a propositional formula.
pub trait FormulaOwner {
    fn tree(&self) -> Arc<Node>;

    fn set_tree(&self, tree: Node) -> DomainResult<()>;
}

struct Formula {
    tree: Arc<Node>,
    features: Arc<[FeatureId]>,
}

impl Formula {
    /// Resolve every distinct variable of `tree` against `context`.
    fn resolve(context: &dyn FeatureLookup, tree: Node) -> DomainResult<Self> {
        let names = match traverse(&tree, &mut VariableCollector::new()) {
            Outcome::Value(names) => names,
            Outcome::Empty => return Err(DomainError::UnresolvedFormula("empty".to_string())),
            Outcome::Failure(cause) => {
                return Err(DomainError::UnresolvedFormula(cause.to_string()));
            }
        };
        let features = names
            .iter()
            .map(|name| {
                context
                    .feature(name)
                    .ok_or_else(|| DomainError::UnknownFeature(name.clone()))
            })
            .collect::<DomainResult<Arc<[FeatureId]>>>()?;
        Ok(Self {
            tree: Arc::new(tree),
            features,
        })
    }
}

/// A propositional condition over the features of one model.
pub struct Constraint {
    context: Arc<dyn FeatureLookup>,
    formula: RwLock<Formula>,
    tags: RwLock<Arc<BTreeSet<String>>>,
    properties: RwLock<Arc<BTreeMap<String, String>>>,
    description: RwLock<String>,
    selected: AtomicBool,
    implicit: AtomicBool,
}

impl Constraint {
    /// Create a constraint over `tree`, bound to the features of `context`.
    ///
    /// Fails if a variable does not name a feature of `context`.
    pub fn new(context: Arc<dyn FeatureLookup>, tree: Node) -> DomainResult<Self> {
        let formula = Formula::resolve(context.as_ref(), tree)?;
        Ok(Self {
            context,
            formula: RwLock::new(formula),
            tags: RwLock::new(Arc::new(BTreeSet::new())),
            properties: RwLock::new(Arc::new(BTreeMap::new())),
            description: RwLock::new(String::new()),
            selected: AtomicBool::new(false),
            implicit: AtomicBool::new(false),
        })
    }

    /// Distinct features of the current tree, in order of first appearance.
    pub fn referenced_features(&self) -> Arc<[FeatureId]> {
        Arc::clone(&self.formula.read().features)
    }

    pub fn referenced_feature_names(&self) -> Vec<String> {
        self.referenced_features()
            .iter()
            .filter_map(|&id| self.context.name(id).map(str::to_string))
            .collect()
    }

    /// Whether a referenced feature or one of its ancestors is hidden.
    pub fn has_referenced_hidden_feature(&self) -> bool {
        self.referenced_features()
            .iter()
            .any(|&id| self.context.is_hidden_or_has_hidden_ancestor(id))
    }

    pub fn context(&self) -> &Arc<dyn FeatureLookup> {
        &self.context
    }

    pub fn is_selected(&self) -> bool {
        self.selected.load(Ordering::Acquire)
    }

    pub fn set_selected(&self, selected: bool) {
        self.selected.store(selected, Ordering::Release);
    }

    /// Implicit constraints are derived from the hierarchy, not user-written.
    pub fn is_implicit(&self) -> bool {
        self.implicit.load(Ordering::Acquire)
    }

    pub fn set_implicit(&self, implicit: bool) {
        self.implicit.store(implicit, Ordering::Release);
    }

    /// Deep copy bound to `target`.
    ///
    /// The copy shares no tree nodes with `self`; its features are resolved
    /// again against `target`, which must know every referenced name.
    #[instrument(level = "debug", skip_all)]
    pub fn clone_into(&self, target: Arc<dyn FeatureLookup>) -> DomainResult<Constraint> {
        let tree = Node::clone(&self.tree());
        let clone = Constraint::new(target, tree)?;
        clone.set_tags(BTreeSet::clone(&self.tags()));
        clone.set_properties(BTreeMap::clone(&self.properties()));
        clone.set_description(self.description());
        clone.set_selected(self.is_selected());
        clone.set_implicit(self.is_implicit());
        Ok(clone)
    }
}

impl FormulaOwner for Constraint {
    fn tree(&self) -> Arc<Node> {
        Arc::clone(&self.formula.read().tree)
    }

    /// Replace the formula. On an unknown variable the constraint keeps its
    /// previous tree and features.
    #[instrument(level = "debug", skip_all)]
    fn set_tree(&self, tree: Node) -> DomainResult<()> {
        let formula = Formula::resolve(self.context.as_ref(), tree)?;
        debug!("set_tree: {} referenced features", formula.features.len());
        *self.formula.write() = formula;
        Ok(())
    }
}

impl Tagged for Constraint {
    fn tags(&self) -> Arc<BTreeSet<String>> {
        Arc::clone(&*self.tags.read())
    }

    fn set_tags(&self, tags: BTreeSet<String>) {
        *self.tags.write() = Arc::new(tags);
    }
}

impl Properties for Constraint {
    fn properties(&self) -> Arc<BTreeMap<String, String>> {
        Arc::clone(&*self.properties.read())
    }

    fn set_properties(&self, properties: BTreeMap<String, String>) {
        *self.properties.write() = Arc::new(properties);
    }
}

impl Described for Constraint {
    fn description(&self) -> String {
        self.description.read().clone()
    }

    fn set_description(&self, description: String) {
        *self.description.write() = description;
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("tree", &self.tree())
            .field("features", &self.referenced_feature_names())
            .field("tags", &self.tags())
            .field("properties", &self.properties())
            .field("description", &self.description())
            .field("selected", &self.is_selected())
            .field("implicit", &self.is_implicit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;
    use std::thread;

    use super::*;
    use crate::domain::arena::{FeatureData, FeatureTree};
    use crate::domain::builder::FeatureTreeBuilder;

    fn context() -> Arc<dyn FeatureLookup> {
        let tree: FeatureTree = FeatureTreeBuilder::new()
            .root(FeatureData::new("Root"))
            .child("Root", FeatureData::new("A"))
            .child("Root", FeatureData::new("B"))
            .child("Root", FeatureData::new("Hidden").hidden())
            .child("Hidden", FeatureData::new("X"))
            .build()
            .unwrap();
        Arc::new(tree)
    }

    fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn assert_disjoint(a: &Node, b: &Node) {
        let mut pairs = vec![(a, b)];
        while let Some((a, b)) = pairs.pop() {
            assert!(!ptr::eq(a, b));
            pairs.extend(a.children().iter().zip(b.children()));
        }
    }

    #[test]
    fn given_repeated_variables_when_created_then_features_are_distinct_in_order() {
        let constraint = Constraint::new(
            context(),
            Node::or([Node::var("B"), Node::and([Node::var("A"), Node::var("B")])]),
        )
        .unwrap();
        assert_eq!(constraint.referenced_feature_names(), vec!["B", "A"]);
    }

    #[test]
    fn given_new_tree_when_set_then_features_follow_the_tree() {
        let constraint = Constraint::new(context(), Node::var("A")).unwrap();
        constraint
            .set_tree(Node::implies(Node::var("B"), Node::var("X")))
            .unwrap();
        assert_eq!(constraint.referenced_feature_names(), vec!["B", "X"]);
        assert_eq!(
            *constraint.tree(),
            Node::implies(Node::var("B"), Node::var("X"))
        );
    }

    #[test]
    fn given_unknown_variable_when_setting_tree_then_error_and_unchanged() {
        let constraint = Constraint::new(context(), Node::var("A")).unwrap();
        let result = constraint.set_tree(Node::and([Node::var("B"), Node::var("Nope")]));

        assert_eq!(result, Err(DomainError::UnknownFeature("Nope".into())));
        assert_eq!(*constraint.tree(), Node::var("A"));
        assert_eq!(constraint.referenced_feature_names(), vec!["A"]);
    }

    #[test]
    fn given_constant_tree_when_checking_hidden_then_false() {
        let constraint = Constraint::new(context(), Node::constant(true)).unwrap();
        assert!(constraint.referenced_features().is_empty());
        assert!(!constraint.has_referenced_hidden_feature());
    }

    #[test]
    fn given_feature_below_hidden_parent_when_checking_hidden_then_true() {
        let constraint = Constraint::new(context(), Node::var("A")).unwrap();
        assert!(!constraint.has_referenced_hidden_feature());

        constraint
            .set_tree(Node::or([Node::var("A"), Node::var("X")]))
            .unwrap();
        assert!(constraint.has_referenced_hidden_feature());
    }

    #[test]
    fn given_tags_when_replaced_then_no_merge() {
        let constraint = Constraint::new(context(), Node::var("A")).unwrap();
        constraint.set_tags(tags(&["a", "b"]));
        constraint.set_tags(tags(&["c"]));
        assert_eq!(*constraint.tags(), tags(&["c"]));
    }

    #[test]
    fn given_concurrent_readers_when_tags_replaced_then_only_whole_sets_observed() {
        let old = tags(&["a", "b", "c"]);
        let new = tags(&["x", "y"]);
        let constraint = Arc::new(Constraint::new(context(), Node::var("A")).unwrap());
        constraint.set_tags(old.clone());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let constraint = Arc::clone(&constraint);
                let (old, new) = (old.clone(), new.clone());
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        let seen = constraint.tags();
                        assert!(*seen == old || *seen == new);
                    }
                })
            })
            .collect();
        for i in 0..1_000 {
            constraint.set_tags(if i % 2 == 0 { new.clone() } else { old.clone() });
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn given_clone_when_description_changed_then_source_unchanged() {
        let source =
            Constraint::new(context(), Node::and([Node::var("A"), Node::var("B")])).unwrap();
        source.set_description("original".into());
        source.set_tags(tags(&["t"]));
        source.set_selected(true);

        let clone = source.clone_into(context()).unwrap();
        assert_eq!(clone.description(), "original");
        assert_eq!(*clone.tags(), tags(&["t"]));
        assert!(clone.is_selected());
        assert!(!clone.is_implicit());

        clone.set_description("changed".into());
        assert_eq!(source.description(), "original");
    }

    #[test]
    fn given_properties_when_replaced_then_previous_keys_are_gone() {
        let constraint = Constraint::new(context(), Node::var("A")).unwrap();
        assert!(constraint.properties().is_empty());

        constraint.set_properties(BTreeMap::from([
            ("origin".to_string(), "import".to_string()),
            ("line".to_string(), "12".to_string()),
        ]));
        let before = constraint.properties();
        constraint.set_properties(BTreeMap::from([("origin".to_string(), "manual".to_string())]));

        assert_eq!(before.len(), 2);
        assert_eq!(constraint.property("origin").as_deref(), Some("manual"));
        assert_eq!(constraint.property("line"), None);
    }

    #[test]
    fn given_clone_when_properties_changed_then_source_unchanged() {
        let source = Constraint::new(context(), Node::var("B")).unwrap();
        source.set_properties(BTreeMap::from([("origin".to_string(), "import".to_string())]));

        let clone = source.clone_into(context()).unwrap();
        assert_eq!(clone.property("origin").as_deref(), Some("import"));

        clone.set_properties(BTreeMap::from([("origin".to_string(), "edited".to_string())]));
        assert_eq!(source.property("origin").as_deref(), Some("import"));
        assert_eq!(*source.properties(), BTreeMap::from([("origin".into(), "import".into())]));
    }

    #[test]
    fn given_deep_formula_when_cloned_compared_and_dropped_then_no_stack_overflow() {
        let mut formula = Node::var("A");
        for _ in 0..100_000 {
            formula = Node::not(formula);
        }
        let source = Constraint::new(context(), formula).unwrap();
        assert_eq!(source.referenced_feature_names(), vec!["A"]);

        let clone = source.clone_into(context()).unwrap();
        assert_eq!(*clone.tree(), *source.tree());
        assert_eq!(clone.referenced_feature_names(), vec!["A"]);

        clone.set_tree(Node::var("B")).unwrap();
        assert_ne!(*clone.tree(), *source.tree());
        drop(clone);
        drop(source);
    }

    #[test]
    fn given_clone_when_inspecting_tree_then_equal_but_node_disjoint() {
        let source = Constraint::new(
            context(),
            Node::implies(Node::or([Node::var("A"), Node::var("B")]), Node::var("X")),
        )
        .unwrap();
        let clone = source.clone_into(context()).unwrap();

        assert_eq!(*clone.tree(), *source.tree());
        assert_disjoint(&source.tree(), &clone.tree());

        clone.set_tree(Node::var("A")).unwrap();
        assert_eq!(source.referenced_feature_names(), vec!["A", "B", "X"]);
    }

    #[test]
    fn given_target_without_feature_when_cloning_then_error() {
        let source = Constraint::new(context(), Node::var("X")).unwrap();
        let target: Arc<dyn FeatureLookup> = Arc::new(
            FeatureTreeBuilder::new()
                .root(FeatureData::new("Root"))
                .build()
                .unwrap(),
        );
        assert!(matches!(
            source.clone_into(target),
            Err(DomainError::UnknownFeature(name)) if name == "X"
        ));
    }
}
