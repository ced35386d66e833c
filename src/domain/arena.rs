use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};

/// Handle to a feature stored in a [`FeatureTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureId(Index);

/// Data payload for feature nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureData {
    /// Unique feature name, referenced by formula variables
    pub name: String,
    /// Hidden features are not shown to configurators
    pub hidden: bool,
    /// Abstract features carry no implementation artifacts
    pub abstract_: bool,
}

impl FeatureData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            abstract_: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.abstract_ = true;
        self
    }
}

impl fmt::Display for FeatureData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.hidden {
            write!(f, " [hidden]")?;
        }
        if self.abstract_ {
            write!(f, " [abstract]")?;
        }
        Ok(())
    }
}

/// Feature node in the arena-based hierarchy.
#[derive(Debug)]
pub struct FeatureNode {
    pub data: FeatureData,
    /// Parent feature, None for the root
    pub parent: Option<FeatureId>,
    pub children: Vec<FeatureId>,
}

/// Arena-based feature hierarchy.
///
/// Uses generational arena for memory-safe node references and O(1) lookups,
/// plus a name index for resolving formula variables.
#[derive(Debug, Default)]
pub struct FeatureTree {
    arena: Arena<FeatureNode>,
    root: Option<FeatureId>,
    by_name: HashMap<String, FeatureId>,
}

impl FeatureTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature below `parent`, or as root when `parent` is None.
    ///
    /// Names are unique and only one root is allowed.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_feature(
        &mut self,
        data: FeatureData,
        parent: Option<FeatureId>,
    ) -> DomainResult<FeatureId> {
        if self.by_name.contains_key(&data.name) {
            return Err(DomainError::DuplicateFeature(data.name));
        }
        match (parent, self.root) {
            (None, Some(existing)) => {
                return Err(DomainError::MultipleRoots {
                    first: self.name_of(existing).to_string(),
                    second: data.name,
                });
            }
            (Some(parent_id), _) if self.arena.get(parent_id.0).is_none() => {
                return Err(DomainError::UnknownParent {
                    feature: data.name,
                    parent: format!("{:?}", parent_id),
                });
            }
            _ => {}
        }

        let name = data.name.clone();
        let id = FeatureId(self.arena.insert(FeatureNode {
            data,
            parent,
            children: Vec::new(),
        }));

        if let Some(parent_id) = parent {
            if let Some(parent) = self.arena.get_mut(parent_id.0) {
                parent.children.push(id);
            }
        } else {
            self.root = Some(id);
        }
        self.by_name.insert(name, id);

        Ok(id)
    }

    pub fn get(&self, id: FeatureId) -> Option<&FeatureNode> {
        self.arena.get(id.0)
    }

    /// Returns false if `id` no longer refers to a feature.
    pub fn set_hidden(&mut self, id: FeatureId, hidden: bool) -> bool {
        match self.arena.get_mut(id.0) {
            Some(node) => {
                node.data.hidden = hidden;
                true
            }
            None => false,
        }
    }

    pub fn find(&self, name: &str) -> Option<FeatureId> {
        self.by_name.get(name).copied()
    }

    fn name_of(&self, id: FeatureId) -> &str {
        self.get(id).map(|n| n.data.name.as_str()).unwrap_or("<removed>")
    }

    pub fn root(&self) -> Option<FeatureId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> FeatureIterator<'_> {
        FeatureIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut max_depth = 0;
        let mut stack = vec![(root, 1)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.get(id) {
                stack.extend(node.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        max_depth
    }

    /// Names of all features without children, in pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_features(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| node.data.name.clone())
            .collect()
    }
}

pub struct FeatureIterator<'a> {
    tree: &'a FeatureTree,
    stack: Vec<FeatureId>,
}

impl<'a> FeatureIterator<'a> {
    fn new(tree: &'a FeatureTree) -> Self {
        Self {
            tree,
            stack: tree.root().into_iter().collect(),
        }
    }
}

impl<'a> Iterator for FeatureIterator<'a> {
    type Item = (FeatureId, &'a FeatureNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev().copied());
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a FeatureTree,
    stack: Vec<(FeatureId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a FeatureTree) -> Self {
        Self {
            tree,
            stack: tree.root().map(|root| (root, false)).into_iter().collect(),
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (FeatureId, &'a FeatureNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                for &child in node.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}
