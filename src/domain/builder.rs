//! Feature tree builder: turns flat `(name, parent)` declarations into a hierarchy.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::arena::{FeatureData, FeatureTree};
use crate::domain::error::{DomainError, DomainResult};

/// Collects feature declarations in any order and builds a [`FeatureTree`].
#[derive(Debug, Default)]
pub struct FeatureTreeBuilder {
    declarations: Vec<(FeatureData, Option<String>)>,
}

impl FeatureTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the root feature.
    pub fn root(mut self, data: FeatureData) -> Self {
        self.declarations.push((data, None));
        self
    }

    /// Declare a feature below `parent` (by name). Declaration order is free.
    pub fn child(mut self, parent: impl Into<String>, data: FeatureData) -> Self {
        self.declarations.push((data, Some(parent.into())));
        self
    }

    pub fn build(self) -> DomainResult<FeatureTree> {
        let mut seen = HashSet::new();
        let mut root: Option<&FeatureData> = None;
        let mut children: HashMap<&str, Vec<&FeatureData>> = HashMap::new();

        for (data, parent) in &self.declarations {
            if !seen.insert(data.name.as_str()) {
                return Err(DomainError::DuplicateFeature(data.name.clone()));
            }
            match parent {
                None => {
                    if let Some(existing) = root {
                        return Err(DomainError::MultipleRoots {
                            first: existing.name.clone(),
                            second: data.name.clone(),
                        });
                    }
                    root = Some(data);
                }
                Some(parent) => children.entry(parent.as_str()).or_default().push(data),
            }
        }

        for (data, parent) in &self.declarations {
            if let Some(parent) = parent {
                if !seen.contains(parent.as_str()) {
                    return Err(DomainError::UnknownParent {
                        feature: data.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let root = match root {
            Some(root) => root,
            // Every declaration has a parent, so the parent links form a cycle
            None if !self.declarations.is_empty() => {
                return Err(DomainError::CycleDetected(self.declarations[0].0.name.clone()));
            }
            None => return Err(DomainError::MissingRoot),
        };

        let mut tree = FeatureTree::new();
        let mut stack = vec![(root, None)];
        while let Some((data, parent_id)) = stack.pop() {
            let id = tree.insert_feature(data.clone(), parent_id)?;
            if let Some(kids) = children.get(data.name.as_str()) {
                // Reverse so that children keep declaration order
                for child in kids.iter().rev() {
                    stack.push((*child, Some(id)));
                }
            }
        }

        // Declarations not reachable from the root sit on a parent cycle
        if tree.len() != self.declarations.len() {
            let unreachable = self
                .declarations
                .iter()
                .find(|(data, _)| tree.find(&data.name).is_none())
                .map(|(data, _)| data.name.clone())
                .unwrap_or_default();
            return Err(DomainError::CycleDetected(unreachable));
        }

        debug!("build: {} features, depth {}", tree.len(), tree.depth());
        Ok(tree)
    }
}
