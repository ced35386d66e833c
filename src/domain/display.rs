use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::{FeatureId, FeatureTree};
use crate::domain::formula::{Node, NodeKind, Terminal};

/// Renders a hierarchy as an indented text tree.
pub trait TreeDisplay {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeDisplay for FeatureTree {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build(tree: &FeatureTree, id: FeatureId, parent: &mut Tree<String>) {
            if let Some(node) = tree.get(id) {
                for &child_id in &node.children {
                    if let Some(child) = tree.get(child_id) {
                        let mut child_tree = Tree::new(child.data.to_string());
                        build(tree, child_id, &mut child_tree);
                        parent.push(child_tree);
                    }
                }
            }
        }

        match self.root().and_then(|id| self.get(id).map(|node| (id, node))) {
            Some((root_id, root)) => {
                let mut rendered = Tree::new(root.data.to_string());
                build(self, root_id, &mut rendered);
                rendered
            }
            None => Tree::new("Empty tree".to_string()),
        }
    }
}

impl TreeDisplay for Node {
    fn to_tree_string(&self) -> Tree<String> {
        fn label(node: &Node) -> String {
            match node.kind() {
                NodeKind::Connective(connective) => connective.to_string(),
                NodeKind::Terminal(Terminal::Variable(name)) => name.clone(),
                NodeKind::Terminal(Terminal::Constant(value)) => value.to_string(),
            }
        }

        let mut frames: Vec<(&Node, Tree<String>)> = Vec::new();
        let mut source = self;
        let mut rendered = Tree::new(label(self));
        loop {
            if let Some(child) = source.children().get(rendered.leaves.len()) {
                frames.push((source, rendered));
                source = child;
                rendered = Tree::new(label(child));
                continue;
            }
            match frames.pop() {
                Some((parent, mut parent_tree)) => {
                    parent_tree.push(rendered);
                    source = parent;
                    rendered = parent_tree;
                }
                None => return rendered,
            }
        }
    }
}
