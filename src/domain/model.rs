use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::arena::{FeatureId, FeatureTree};
use crate::domain::constraint::{Constraint, FormulaOwner};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::formula::Node;

/// Read access to a feature hierarchy, as needed by constraints.
pub trait FeatureLookup: Send + Sync {
    fn feature(&self, name: &str) -> Option<FeatureId>;

    fn name(&self, id: FeatureId) -> Option<&str>;

    fn is_hidden(&self, id: FeatureId) -> bool;

    fn parent(&self, id: FeatureId) -> Option<FeatureId>;

    /// Parent chain of `id`, nearest first, excluding `id` itself.
    fn ancestors(&self, id: FeatureId) -> Vec<FeatureId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent(parent);
        }
        chain
    }

    fn is_hidden_or_has_hidden_ancestor(&self, id: FeatureId) -> bool {
        self.is_hidden(id) || self.ancestors(id).into_iter().any(|a| self.is_hidden(a))
    }
}

impl FeatureLookup for FeatureTree {
    fn feature(&self, name: &str) -> Option<FeatureId> {
        self.find(name)
    }

    fn name(&self, id: FeatureId) -> Option<&str> {
        self.get(id).map(|node| node.data.name.as_str())
    }

    fn is_hidden(&self, id: FeatureId) -> bool {
        self.get(id).is_some_and(|node| node.data.hidden)
    }

    fn parent(&self, id: FeatureId) -> Option<FeatureId> {
        self.get(id).and_then(|node| node.parent)
    }
}

/// A feature hierarchy together with the constraints over its features.
///
/// The hierarchy is shared with every constraint of the model, so it is
/// immutable once the model exists.
#[derive(Debug)]
pub struct FeatureModel {
    tree: Arc<FeatureTree>,
    constraints: Vec<Constraint>,
}

impl FeatureModel {
    pub fn new(tree: FeatureTree) -> Self {
        Self {
            tree: Arc::new(tree),
            constraints: Vec::new(),
        }
    }

    pub fn tree(&self) -> &Arc<FeatureTree> {
        &self.tree
    }

    /// Attach a new constraint; every variable must name a feature of this model.
    #[instrument(level = "debug", skip(self))]
    pub fn add_constraint(&mut self, formula: Node) -> DomainResult<&Constraint> {
        let constraint = Constraint::new(self.context(), formula)?;
        self.constraints.push(constraint);
        Ok(&self.constraints[self.constraints.len() - 1])
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, index: usize) -> Option<&Constraint> {
        self.constraints.get(index)
    }

    pub fn remove_constraint(&mut self, index: usize) -> DomainResult<Constraint> {
        if index >= self.constraints.len() {
            return Err(DomainError::ConstraintNotFound(index));
        }
        Ok(self.constraints.remove(index))
    }

    /// Copy all constraints of `other` into this model.
    ///
    /// Either all constraints are copied or, on the first unresolvable
    /// feature, none are.
    #[instrument(level = "debug", skip_all)]
    pub fn clone_constraints_from(&mut self, other: &FeatureModel) -> DomainResult<usize> {
        let context = self.context();
        let copies = other
            .constraints
            .iter()
            .map(|c| c.clone_into(Arc::clone(&context)))
            .collect::<DomainResult<Vec<_>>>()?;
        let copied = copies.len();
        self.constraints.extend(copies);
        debug!("clone_constraints_from: copied {} constraints", copied);
        Ok(copied)
    }

    /// Snapshot of all constraint formulas, e.g. as input for metrics.
    pub fn formulas(&self) -> Vec<Node> {
        self.constraints.iter().map(|c| Node::clone(&c.tree())).collect()
    }

    fn context(&self) -> Arc<dyn FeatureLookup> {
        Arc::clone(&self.tree) as Arc<dyn FeatureLookup>
    }
}
