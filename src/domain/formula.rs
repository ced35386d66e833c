//! Propositional formulas as ownership trees.
//!
//! Every [`Node`] exclusively owns its children, so a formula is always a tree
//! and `clone()` yields a structurally equal copy that shares no nodes with
//! the source.
//!
//! Clone, equality, hashing, formatting and drop walk the tree with an
//! explicit stack, so formula depth is bounded by memory, not by the call
//! stack.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

/// Leaf payload: something that is not a connective.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// Reference to a feature by name
    Variable(String),
    /// `true` / `false`
    Constant(bool),
}

/// Logical connectives. Cardinality connectives carry their bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Connective {
    Not,
    And,
    Or,
    Implies,
    BiImplies,
    AtLeast(usize),
    AtMost(usize),
    Between(usize, usize),
    Choose(usize),
}

impl Connective {
    /// Operator name without its bounds, used to bucket distributions.
    pub fn name(&self) -> &'static str {
        match self {
            Connective::Not => "not",
            Connective::And => "and",
            Connective::Or => "or",
            Connective::Implies => "implies",
            Connective::BiImplies => "biimplies",
            Connective::AtLeast(_) => "atleast",
            Connective::AtMost(_) => "atmost",
            Connective::Between(_, _) => "between",
            Connective::Choose(_) => "choose",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::AtLeast(k) | Connective::AtMost(k) | Connective::Choose(k) => {
                write!(f, "{}({})", self.name(), k)
            }
            Connective::Between(lo, hi) => write!(f, "{}({},{})", self.name(), lo, hi),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Node payload: either a connective or a terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Connective(Connective),
    Terminal(Terminal),
}

/// Formula node with exclusively owned, ordered children.
pub struct Node {
    kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    fn connective(connective: Connective, children: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::Connective(connective),
            children,
        }
    }

    fn terminal(terminal: Terminal) -> Self {
        Self {
            kind: NodeKind::Terminal(terminal),
            children: Vec::new(),
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::terminal(Terminal::Variable(name.into()))
    }

    pub fn constant(value: bool) -> Self {
        Self::terminal(Terminal::Constant(value))
    }

    pub fn not(operand: Node) -> Self {
        Self::connective(Connective::Not, vec![operand])
    }

    pub fn and(operands: impl IntoIterator<Item = Node>) -> Self {
        Self::connective(Connective::And, operands.into_iter().collect())
    }

    pub fn or(operands: impl IntoIterator<Item = Node>) -> Self {
        Self::connective(Connective::Or, operands.into_iter().collect())
    }

    pub fn implies(premise: Node, conclusion: Node) -> Self {
        Self::connective(Connective::Implies, vec![premise, conclusion])
    }

    pub fn bi_implies(left: Node, right: Node) -> Self {
        Self::connective(Connective::BiImplies, vec![left, right])
    }

    pub fn at_least(k: usize, operands: impl IntoIterator<Item = Node>) -> Self {
        Self::connective(Connective::AtLeast(k), operands.into_iter().collect())
    }

    pub fn at_most(k: usize, operands: impl IntoIterator<Item = Node>) -> Self {
        Self::connective(Connective::AtMost(k), operands.into_iter().collect())
    }

    pub fn between(lo: usize, hi: usize, operands: impl IntoIterator<Item = Node>) -> Self {
        Self::connective(Connective::Between(lo, hi), operands.into_iter().collect())
    }

    pub fn choose(k: usize, operands: impl IntoIterator<Item = Node>) -> Self {
        Self::connective(Connective::Choose(k), operands.into_iter().collect())
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal(_))
    }

    /// Name of the referenced feature if this is a variable terminal.
    pub fn variable_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Terminal(Terminal::Variable(name)) => Some(name),
            _ => None,
        }
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        // Parents whose children are still being copied, with the copies so far.
        let mut frames: Vec<(&Node, Vec<Node>)> = Vec::new();
        let mut source = self;
        let mut copies = Vec::with_capacity(self.children.len());
        loop {
            if let Some(child) = source.children.get(copies.len()) {
                frames.push((source, copies));
                source = child;
                copies = Vec::with_capacity(child.children.len());
                continue;
            }
            let copy = Node {
                kind: source.kind.clone(),
                children: copies,
            };
            match frames.pop() {
                Some((parent, mut siblings)) => {
                    siblings.push(copy);
                    source = parent;
                    copies = siblings;
                }
                None => return copy,
            }
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.kind != b.kind || a.children.len() != b.children.len() {
                return false;
            }
            pending.extend(a.children.iter().zip(&b.children));
        }
        true
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Pre-order kinds plus arities identify the shape.
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            node.kind.hash(state);
            node.children.len().hash(state);
            pending.extend(node.children.iter().rev());
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Prefix notation, e.g. `implies(or(A, B), C)`.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Step<'a> {
            Enter(&'a Node),
            Text(&'static str),
        }

        let mut pending = vec![Step::Enter(self)];
        while let Some(step) = pending.pop() {
            let node = match step {
                Step::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Step::Enter(node) => node,
            };
            match &node.kind {
                NodeKind::Terminal(Terminal::Variable(name)) => f.write_str(name)?,
                NodeKind::Terminal(Terminal::Constant(value)) => write!(f, "{value}")?,
                NodeKind::Connective(connective) => {
                    write!(f, "{connective}(")?;
                    pending.push(Step::Text(")"));
                    for (i, child) in node.children.iter().enumerate().rev() {
                        pending.push(Step::Enter(child));
                        if i > 0 {
                            pending.push(Step::Text(", "));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
