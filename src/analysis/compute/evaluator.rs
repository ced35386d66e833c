use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, instrument};

use super::progress::{CancelToken, ProgressSink, SilentProgress, TracingProgress};
use super::{Computation, Session};
use crate::analysis::outcome::Outcome;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;

/// Creates evaluation sessions and runs independent roots on a worker pool.
pub struct Evaluator {
    pool: Option<ThreadPool>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelToken,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::sequential()
    }
}

impl Evaluator {
    /// Evaluate everything on the calling thread.
    pub fn sequential() -> Self {
        Self {
            pool: None,
            progress: Arc::new(TracingProgress),
            cancel: CancelToken::new(),
        }
    }

    /// Evaluate independent roots on a dedicated pool of `workers` threads.
    pub fn parallel(workers: usize) -> ApplicationResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fmanalysis-worker-{i}"))
            .build()
            .map_err(|e| ApplicationError::WorkerPool {
                context: format!("build pool with {workers} threads"),
                source: Box::new(e),
            })?;
        Ok(Self {
            pool: Some(pool),
            ..Self::sequential()
        })
    }

    pub fn from_settings(settings: &Settings) -> ApplicationResult<Self> {
        let evaluator = match settings.effective_workers() {
            Some(workers) => Self::parallel(workers)?,
            None => Self::sequential(),
        };
        debug!(
            "from_settings: parallel={}, workers={:?}",
            settings.evaluation.parallel,
            evaluator.workers()
        );
        if settings.progress.enabled {
            Ok(evaluator)
        } else {
            Ok(evaluator.with_progress(Arc::new(SilentProgress)))
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Worker threads, None when sequential.
    pub fn workers(&self) -> Option<usize> {
        self.pool.as_ref().map(ThreadPool::current_num_threads)
    }

    pub fn session(&self) -> Session {
        Session::with(Arc::clone(&self.progress), self.cancel.clone())
    }

    pub fn evaluate<T>(&self, node: &Computation<T>) -> Outcome<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.session().evaluate(node)
    }

    /// Evaluate several roots in one session, sharing common sub-computations.
    #[instrument(level = "debug", skip_all, fields(roots = nodes.len()))]
    pub fn evaluate_all<T>(
        &self,
        session: &Session,
        nodes: &[Computation<T>],
    ) -> Vec<Outcome<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        match &self.pool {
            Some(pool) => pool.install(|| nodes.par_iter().map(|n| session.evaluate(n)).collect()),
            None => nodes.iter().map(|n| session.evaluate(n)).collect(),
        }
    }

    /// Evaluate two roots of different types in one session.
    pub fn evaluate_both<A, B>(
        &self,
        session: &Session,
        a: &Computation<A>,
        b: &Computation<B>,
    ) -> (Outcome<Arc<A>>, Outcome<Arc<B>>)
    where
        A: Send + Sync + 'static,
        B: Send + Sync + 'static,
    {
        match &self.pool {
            Some(pool) => {
                pool.install(|| rayon::join(|| session.evaluate(a), || session.evaluate(b)))
            }
            None => (session.evaluate(a), session.evaluate(b)),
        }
    }
}
