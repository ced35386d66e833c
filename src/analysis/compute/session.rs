use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{instrument, trace};

use super::progress::{CancelToken, Progress, ProgressSink, TracingProgress};
use super::{Computation, NodeKey};
use crate::analysis::error::AnalysisError;
use crate::analysis::outcome::Outcome;

type Erased = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceLock<Outcome<Erased>>>;

/// One evaluation of a computation graph.
///
/// Every node identity is computed at most once per session. Concurrent
/// callers asking for the same node block until the first caller has
/// finished and then share its outcome.
pub struct Session {
    cache: Mutex<HashMap<NodeKey, Slot>>,
    computed: Mutex<HashMap<&'static str, usize>>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelToken,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with(Arc::new(TracingProgress), CancelToken::new())
    }

    pub fn with(progress: Arc<dyn ProgressSink>, cancel: CancelToken) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            computed: Mutex::new(HashMap::new()),
            progress,
            cancel,
        }
    }

    /// Evaluate `node`, reusing the cached outcome if this session has one.
    #[instrument(level = "trace", skip_all, fields(kind = node.kind(), key = %node.key()))]
    pub fn evaluate<T>(&self, node: &Computation<T>) -> Outcome<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let slot = {
            let mut cache = self.cache.lock();
            Arc::clone(cache.entry(node.key()).or_default())
        };

        let erased = slot.get_or_init(|| {
            trace!("evaluate: computing {}", node.kind());
            node.run(self).map(|value| -> Erased { value })
        });

        erased.clone().and_then(|value| match value.downcast::<T>() {
            Ok(value) => Outcome::Value(value),
            Err(_) => Outcome::Failure(AnalysisError::TypeMismatch { kind: node.kind() }),
        })
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Request cancellation of everything still running in this session.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// How often nodes of `kind` actually ran `compute` in this session.
    pub fn compute_count(&self, kind: &str) -> usize {
        self.computed.lock().get(kind).copied().unwrap_or(0)
    }

    /// Number of distinct node identities resolved so far.
    pub fn cached_nodes(&self) -> usize {
        self.cache.lock().len()
    }

    pub(super) fn record_compute(&self, kind: &'static str) {
        *self.computed.lock().entry(kind).or_default() += 1;
    }

    pub(super) fn progress_for(&self, kind: &'static str) -> Progress {
        Progress::new(kind, Arc::clone(&self.progress))
    }
}
