//! Async remote level loading with bounded concurrency

use std::collections::HashSet;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::core::Result;
use crate::sequence::LevelDescriptor;
use super::source::LevelSource;

/// Request to fetch a remote level
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Index of the level in the generator's collection
    pub level: usize,
    /// Name handed to the level source
    pub name: String,
}

/// Result of a level load operation
#[derive(Debug)]
pub enum LoadResult {
    Loaded(usize, LevelDescriptor),
    /// The source has no level with that name
    NotFound(usize, String),
    Error(usize, String),
}

impl LoadResult {
    pub fn level(&self) -> usize {
        match self {
            LoadResult::Loaded(level, _) | LoadResult::NotFound(level, _) | LoadResult::Error(level, _) => *level,
        }
    }
}

/// Concurrent level loader with async I/O
pub struct LevelLoader {
    /// Channel for sending load requests to worker tasks
    request_tx: mpsc::UnboundedSender<LoadRequest>,
    /// Channel for receiving load results
    result_rx: mpsc::UnboundedReceiver<LoadResult>,
    /// Levels currently being loaded
    pending: HashSet<usize>,
    runtime: Option<Runtime>,
}

impl LevelLoader {
    /// Create a loader with its own runtime
    pub fn new(source: Arc<dyn LevelSource>, max_concurrent: usize) -> Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<LoadRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<LoadResult>();

        let runtime = Runtime::new()?;
        runtime.spawn(async move {
            Self::worker_loop(source, max_concurrent.max(1), &mut request_rx, result_tx).await;
        });

        Ok(Self {
            request_tx,
            result_rx,
            pending: HashSet::new(),
            runtime: Some(runtime),
        })
    }

    /// Create a loader on the current tokio runtime
    ///
    /// Panics if called outside a tokio runtime context.
    pub fn new_with_current_runtime(source: Arc<dyn LevelSource>, max_concurrent: usize) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<LoadRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<LoadResult>();

        tokio::spawn(async move {
            Self::worker_loop(source, max_concurrent.max(1), &mut request_rx, result_tx).await;
        });

        Self {
            request_tx,
            result_rx,
            pending: HashSet::new(),
            runtime: None,
        }
    }

    async fn worker_loop(
        source: Arc<dyn LevelSource>,
        max_concurrent: usize,
        request_rx: &mut mpsc::UnboundedReceiver<LoadRequest>,
        result_tx: mpsc::UnboundedSender<LoadResult>,
    ) {
        use tokio::task::JoinSet;

        let mut active_tasks = JoinSet::new();
        let mut queued: Vec<LoadRequest> = Vec::new();

        loop {
            tokio::select! {
                Some(request) = request_rx.recv() => {
                    queued.push(request);
                }

                Some(result) = active_tasks.join_next(), if !active_tasks.is_empty() => {
                    match result {
                        Ok(load_result) => {
                            let _ = result_tx.send(load_result);
                        }
                        Err(e) => {
                            log::error!("Level loader task panicked: {}", e);
                        }
                    }
                }

                else => {
                    if queued.is_empty() && active_tasks.is_empty() {
                        break;
                    }
                }
            }

            // First come, first served
            while active_tasks.len() < max_concurrent && !queued.is_empty() {
                let request = queued.remove(0);
                let source = source.clone();
                active_tasks.spawn(async move { Self::load_level_task(source, request).await });
            }
        }
    }

    async fn load_level_task(source: Arc<dyn LevelSource>, request: LoadRequest) -> LoadResult {
        match source.load(&request.name).await {
            Ok(Some(descriptor)) => LoadResult::Loaded(request.level, descriptor),
            Ok(None) => LoadResult::NotFound(request.level, request.name),
            Err(e) => LoadResult::Error(request.level, e.to_string()),
        }
    }

    /// Request a level to be loaded
    ///
    /// Returns `false` if the level is already pending or the worker is gone.
    pub fn request(&mut self, level: usize, name: &str) -> bool {
        if self.pending.contains(&level) {
            return false;
        }
        let request = LoadRequest { level, name: name.to_string() };
        if self.request_tx.send(request).is_err() {
            log::error!("Level loader worker stopped; cannot load {}", name);
            return false;
        }
        self.pending.insert(level);
        true
    }

    /// Drain completed loads without blocking
    pub fn poll_results(&mut self) -> Vec<LoadResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            self.pending.remove(&result.level());
            results.push(result);
        }
        results
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, level: usize) -> bool {
        self.pending.contains(&level)
    }

    /// Forget a pending request; a late result should be ignored by the caller
    pub fn cancel(&mut self, level: usize) {
        self.pending.remove(&level);
    }
}

impl Drop for LevelLoader {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
