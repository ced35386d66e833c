//! Lazy, memoized computation graph.
//!
//! An [`Analysis`] declares its inputs as a tuple of [`Source`]s and receives
//! the resolved values as a tuple of `Arc`s of the same types, so the argument
//! list is checked at compile time. Wrapping it in a [`Computation`] fixes the
//! dependencies and derives the node's identity ([`NodeKey`]) from its kind,
//! its parameters and the identities of its inputs. A [`Session`] evaluates
//! each identity at most once.

mod evaluator;
mod progress;
mod session;

pub use evaluator::Evaluator;
pub use progress::{
    CancelToken, Progress, ProgressReport, ProgressSink, RecordingProgress, SilentProgress,
    TracingProgress,
};
pub use session::Session;

use std::any::TypeId;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::analysis::outcome::Outcome;

/// Identity of a node or constant, stable for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A unit of work in the graph.
pub trait Analysis: Send + Sync + 'static {
    type Output: Send + Sync + 'static;
    type Dependencies: Dependencies;

    /// Name used for logging, progress and diagnostics.
    const KIND: &'static str;

    fn dependencies(&self) -> &Self::Dependencies;

    /// Feed everything besides the dependencies that changes the result.
    fn parameters<H: Hasher>(&self, _state: &mut H) {}

    fn compute(
        &self,
        inputs: <Self::Dependencies as Dependencies>::Values,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> Outcome<Self::Output>;
}

/// Positional, typed dependency list of an [`Analysis`].
pub trait Dependencies: Send + Sync + 'static {
    /// Resolved values handed to `compute`.
    type Values;

    fn identify<H: Hasher>(&self, state: &mut H);

    /// Resolve in positional order; the first `Empty` or `Failure` wins.
    fn resolve(&self, session: &Session) -> Outcome<Self::Values>;
}

impl Dependencies for () {
    type Values = ();

    fn identify<H: Hasher>(&self, _state: &mut H) {}

    fn resolve(&self, _session: &Session) -> Outcome<()> {
        Outcome::Value(())
    }
}

macro_rules! impl_dependencies {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Send + Sync + 'static),+> Dependencies for ($(Source<$name>,)+) {
            type Values = ($(Arc<$name>,)+);

            fn identify<H: Hasher>(&self, state: &mut H) {
                $( self.$idx.key().hash(state); )+
            }

            fn resolve(&self, session: &Session) -> Outcome<Self::Values> {
                Outcome::Value(($(
                    match self.$idx.resolve(session) {
                        Outcome::Value(value) => value,
                        Outcome::Empty => return Outcome::Empty,
                        Outcome::Failure(error) => return Outcome::Failure(error),
                    },
                )+))
            }
        }
    };
}

impl_dependencies!(A: 0);
impl_dependencies!(A: 0, B: 1);
impl_dependencies!(A: 0, B: 1, C: 2);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3);

/// Immutable leaf value, identified by its content.
pub struct Constant<T> {
    value: Arc<T>,
    key: NodeKey,
}

impl<T: Hash + Send + Sync + 'static> Constant<T> {
    pub fn new(value: T) -> Self {
        let mut hasher = DefaultHasher::new();
        "constant".hash(&mut hasher);
        TypeId::of::<T>().hash(&mut hasher);
        value.hash(&mut hasher);
        Self {
            value: Arc::new(value),
            key: NodeKey(hasher.finish()),
        }
    }
}

impl<T> Constant<T> {
    pub fn value(&self) -> &Arc<T> {
        &self.value
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }
}

impl<T> Clone for Constant<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            key: self.key,
        }
    }
}

/// Where a dependency comes from.
pub enum Source<T> {
    Constant(Constant<T>),
    Node(Computation<T>),
}

impl<T: Hash + Send + Sync + 'static> Source<T> {
    pub fn constant(value: T) -> Self {
        Source::Constant(Constant::new(value))
    }
}

impl<T: Send + Sync + 'static> Source<T> {
    pub fn key(&self) -> NodeKey {
        match self {
            Source::Constant(constant) => constant.key(),
            Source::Node(node) => node.key(),
        }
    }

    fn resolve(&self, session: &Session) -> Outcome<Arc<T>> {
        match self {
            Source::Constant(constant) => Outcome::Value(Arc::clone(constant.value())),
            Source::Node(node) => session.evaluate(node),
        }
    }
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        match self {
            Source::Constant(constant) => Source::Constant(constant.clone()),
            Source::Node(node) => Source::Node(node.clone()),
        }
    }
}

impl<T> From<Computation<T>> for Source<T> {
    fn from(node: Computation<T>) -> Self {
        Source::Node(node)
    }
}

impl<T> From<&Computation<T>> for Source<T> {
    fn from(node: &Computation<T>) -> Self {
        Source::Node(node.clone())
    }
}

impl<T> From<Constant<T>> for Source<T> {
    fn from(constant: Constant<T>) -> Self {
        Source::Constant(constant)
    }
}

/// Type-erased view of a bound analysis producing `T`.
trait Evaluate<T>: Send + Sync {
    fn key(&self) -> NodeKey;
    fn kind(&self) -> &'static str;
    fn run(&self, session: &Session) -> Outcome<Arc<T>>;
}

struct Bound<A> {
    analysis: A,
    key: NodeKey,
}

impl<A: Analysis> Evaluate<A::Output> for Bound<A> {
    fn key(&self) -> NodeKey {
        self.key
    }

    fn kind(&self) -> &'static str {
        A::KIND
    }

    fn run(&self, session: &Session) -> Outcome<Arc<A::Output>> {
        let inputs = match self.analysis.dependencies().resolve(session) {
            Outcome::Value(inputs) => inputs,
            Outcome::Empty => {
                debug!("run: {} skipped, a dependency is empty", A::KIND);
                return Outcome::Empty;
            }
            Outcome::Failure(error) => {
                debug!("run: {} skipped, a dependency failed: {}", A::KIND, error);
                return Outcome::Failure(error);
            }
        };
        if session.cancel_token().is_cancelled() {
            return Outcome::cancelled();
        }

        session.record_compute(A::KIND);
        let progress = session.progress_for(A::KIND);
        self.analysis
            .compute(inputs, &progress, session.cancel_token())
            .map(Arc::new)
    }
}

/// Handle to a node of the graph. Cloning shares the node.
pub struct Computation<T> {
    node: Arc<dyn Evaluate<T>>,
}

impl<T: Send + Sync + 'static> Computation<T> {
    /// Bind `analysis` to its dependencies and derive its identity.
    pub fn new<A>(analysis: A) -> Self
    where
        A: Analysis<Output = T>,
    {
        let mut hasher = DefaultHasher::new();
        A::KIND.hash(&mut hasher);
        TypeId::of::<A>().hash(&mut hasher);
        analysis.parameters(&mut hasher);
        analysis.dependencies().identify(&mut hasher);
        let key = NodeKey(hasher.finish());

        Self {
            node: Arc::new(Bound { analysis, key }),
        }
    }

    /// Evaluate in a fresh, sequential session.
    pub fn evaluate(&self) -> Outcome<Arc<T>> {
        Session::new().evaluate(self)
    }
}

impl<T> Computation<T> {
    pub fn key(&self) -> NodeKey {
        self.node.key()
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    fn run(&self, session: &Session) -> Outcome<Arc<T>> {
        self.node.run(session)
    }
}

impl<T> Clone for Computation<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for Computation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("kind", &self.kind())
            .field("key", &self.key())
            .finish()
    }
}
