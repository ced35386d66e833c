//! Reusable formula visitors.

use std::collections::{BTreeMap, HashSet};

use crate::analysis::outcome::Outcome;
use crate::analysis::traverse::{current_node, TraversalAction, TreeVisitor};
use crate::domain::formula::{Connective, Node, NodeKind};

/// Counts terminal nodes (variables and constants).
#[derive(Debug, Default)]
pub struct TerminalCounter {
    count: usize,
}

impl TerminalCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TreeVisitor for TerminalCounter {
    type Output = usize;

    fn first_visit(&mut self, path: &[&Node]) -> TraversalAction {
        if current_node(path).is_some_and(Node::is_terminal) {
            self.count += 1;
        }
        TraversalAction::Continue
    }

    fn result(&self) -> Outcome<usize> {
        Outcome::Value(self.count)
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// Collects distinct variable names in order of first appearance.
///
/// A formula without variables yields an empty list, not `Empty`.
#[derive(Debug, Default)]
pub struct VariableCollector {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl VariableCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TreeVisitor for VariableCollector {
    type Output = Vec<String>;

    fn first_visit(&mut self, path: &[&Node]) -> TraversalAction {
        if let Some(name) = current_node(path).and_then(Node::variable_name) {
            if self.seen.insert(name.to_string()) {
                self.names.push(name.to_string());
            }
        }
        TraversalAction::Continue
    }

    fn result(&self) -> Outcome<Vec<String>> {
        Outcome::Value(self.names.clone())
    }

    fn reset(&mut self) {
        self.names.clear();
        self.seen.clear();
    }
}

/// Length of the longest root-to-leaf path.
#[derive(Debug, Default)]
pub struct DepthCalculator {
    max_depth: usize,
}

impl TreeVisitor for DepthCalculator {
    type Output = usize;

    fn first_visit(&mut self, path: &[&Node]) -> TraversalAction {
        self.max_depth = self.max_depth.max(path.len());
        TraversalAction::Continue
    }

    fn result(&self) -> Outcome<usize> {
        Outcome::Value(self.max_depth)
    }

    fn reset(&mut self) {
        self.max_depth = 0;
    }
}

/// Counts connectives by operator name.
///
/// Yields `Empty` when no connective was seen (e.g. a formula that is a single variable).
#[derive(Debug, Default)]
pub struct ConnectiveCounter {
    counts: BTreeMap<&'static str, usize>,
}

impl TreeVisitor for ConnectiveCounter {
    type Output = BTreeMap<&'static str, usize>;

    fn first_visit(&mut self, path: &[&Node]) -> TraversalAction {
        if let Some(NodeKind::Connective(connective)) = current_node(path).map(Node::kind) {
            *self.counts.entry(connective.name()).or_default() += 1;
        }
        TraversalAction::Continue
    }

    fn result(&self) -> Outcome<Self::Output> {
        if self.counts.is_empty() {
            Outcome::Empty
        } else {
            Outcome::Value(self.counts.clone())
        }
    }

    fn reset(&mut self) {
        self.counts.clear();
    }
}

/// Searches for one variable and stops the walk at the first hit.
#[derive(Debug)]
pub struct VariableSearch {
    name: String,
    found: bool,
}

impl VariableSearch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            found: false,
        }
    }
}

impl TreeVisitor for VariableSearch {
    type Output = bool;

    fn first_visit(&mut self, path: &[&Node]) -> TraversalAction {
        if current_node(path).and_then(Node::variable_name) == Some(self.name.as_str()) {
            self.found = true;
            return TraversalAction::Abort;
        }
        TraversalAction::Continue
    }

    fn result(&self) -> Outcome<bool> {
        Outcome::Value(self.found)
    }

    fn reset(&mut self) {
        self.found = false;
    }
}

/// Fails on connectives whose arity or bounds cannot hold.
///
/// `Not` takes one operand, `Implies`/`BiImplies` two, `Between(lo, hi)` needs
/// `lo <= hi`, and no bound may exceed the operand count.
#[derive(Debug, Default)]
pub struct StructureValidator;

impl StructureValidator {
    fn is_well_formed(connective: Connective, arity: usize) -> bool {
        match connective {
            Connective::Not => arity == 1,
            Connective::Implies | Connective::BiImplies => arity == 2,
            Connective::And | Connective::Or => true,
            Connective::AtLeast(k) | Connective::AtMost(k) | Connective::Choose(k) => k <= arity,
            Connective::Between(lo, hi) => lo <= hi && hi <= arity,
        }
    }
}

impl TreeVisitor for StructureValidator {
    type Output = ();

    fn first_visit(&mut self, path: &[&Node]) -> TraversalAction {
        match current_node(path) {
            Some(node) => match node.kind() {
                NodeKind::Connective(c) if !Self::is_well_formed(*c, node.children().len()) => {
                    TraversalAction::Fail
                }
                // Terminals have no children to check
                NodeKind::Terminal(_) => TraversalAction::SkipChildren,
                NodeKind::Connective(_) => TraversalAction::Continue,
            },
            None => TraversalAction::Continue,
        }
    }

    fn result(&self) -> Outcome<()> {
        Outcome::Value(())
    }

    fn reset(&mut self) {}
}
