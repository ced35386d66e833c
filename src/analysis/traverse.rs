//! Depth-first traversal of formula trees driving a pluggable visitor.
//!
//! The walk uses an explicit stack instead of recursion, so deeply nested
//! formulas cannot overflow the call stack. The path handed to the visitor
//! always runs from the root to the current node (inclusive).

use tracing::{debug, instrument, trace};

use crate::analysis::error::AnalysisError;
use crate::analysis::outcome::Outcome;
use crate::domain::formula::Node;

/// What the traversal does after a visitor callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalAction {
    /// Descend into the children of the current node
    Continue,
    /// Do not descend, continue with the next sibling
    SkipChildren,
    /// Abort and report a failure
    Fail,
    /// Stop early; the visitor's partial result stands
    Abort,
}

/// Stateful analysis driven by [`traverse`].
///
/// Visitors are reusable: [`TreeVisitor::reset`] returns one to its freshly
/// constructed state.
pub trait TreeVisitor {
    type Output;

    /// Called before the children of `path.last()` are visited.
    fn first_visit(&mut self, path: &[&Node]) -> TraversalAction;

    /// Called after all children of `path.last()` were visited.
    /// `SkipChildren` is treated as `Continue` here.
    fn last_visit(&mut self, _path: &[&Node]) -> TraversalAction {
        TraversalAction::Continue
    }

    /// Accumulated result; visitors decide themselves when it is `Empty`.
    fn result(&self) -> Outcome<Self::Output>;

    fn reset(&mut self);
}

/// The node a callback is invoked for.
pub fn current_node<'a>(path: &[&'a Node]) -> Option<&'a Node> {
    path.last().copied()
}

/// The parent of the node a callback is invoked for.
pub fn parent_node<'a>(path: &[&'a Node]) -> Option<&'a Node> {
    path.len().checked_sub(2).map(|i| path[i])
}

/// Walk `root` depth first, resetting `visitor` beforehand.
#[instrument(level = "trace", skip_all)]
pub fn traverse<V>(root: &Node, visitor: &mut V) -> Outcome<V::Output>
where
    V: TreeVisitor + ?Sized,
{
    traverse_all(std::iter::once(root), visitor)
}

/// Walk several trees with one visitor, accumulating across all of them.
///
/// The visitor is reset once before the first tree. A `Fail` in any tree
/// fails the whole walk, an `Abort` ends it.
#[instrument(level = "trace", skip_all)]
pub fn traverse_all<'a, V, I>(roots: I, visitor: &mut V) -> Outcome<V::Output>
where
    V: TreeVisitor + ?Sized,
    I: IntoIterator<Item = &'a Node>,
{
    visitor.reset();
    for root in roots {
        match walk(root, visitor) {
            Ok(Walk::Completed) => {}
            Ok(Walk::Aborted) => break,
            Err(error) => return Outcome::Failure(error),
        }
    }
    visitor.result()
}

enum Walk {
    Completed,
    Aborted,
}

enum Step<'a> {
    Enter(&'a Node),
    Exit,
}

fn walk<V>(root: &Node, visitor: &mut V) -> Result<Walk, AnalysisError>
where
    V: TreeVisitor + ?Sized,
{
    let mut path: Vec<&Node> = Vec::new();
    let mut stack = vec![Step::Enter(root)];

    while let Some(step) = stack.pop() {
        let action = match step {
            Step::Enter(node) => {
                path.push(node);
                let action = visitor.first_visit(&path);
                stack.push(Step::Exit);
                if action == TraversalAction::Continue {
                    // Push children in reverse order for left-to-right traversal
                    stack.extend(node.children().iter().rev().map(Step::Enter));
                }
                action
            }
            Step::Exit => {
                let action = visitor.last_visit(&path);
                if !matches!(action, TraversalAction::Fail | TraversalAction::Abort) {
                    path.pop();
                }
                action
            }
        };

        match action {
            TraversalAction::Continue | TraversalAction::SkipChildren => {}
            TraversalAction::Fail => {
                let node = path
                    .last()
                    .map(|n| format!("{:?}", n.kind()))
                    .unwrap_or_default();
                debug!("walk: visitor failed at depth {}", path.len());
                return Err(AnalysisError::TraversalFailed {
                    depth: path.len(),
                    node,
                });
            }
            TraversalAction::Abort => {
                trace!("walk: visitor aborted at depth {}", path.len());
                return Ok(Walk::Aborted);
            }
        }
    }

    Ok(Walk::Completed)
}
