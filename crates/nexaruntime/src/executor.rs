use futures::stream::{FuturesUnordered, StreamExt};
use nexacore::{FlowError, ModuleGraph, ModuleId};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Dispatches modules of a dependency graph onto a bounded set of tasks.
///
/// A module becomes ready once every connection feeding it has been
/// satisfied by a finished producer. With `max_parallel == 1` the dispatch
/// order is exactly the graph's topological order.
pub struct DagExecutor {
    max_parallel: usize,
}

impl DagExecutor {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Run every module of `graph`, calling `launch` once per module when it
    /// becomes ready. Returns module ids in completion order.
    ///
    /// The first failure stops dispatch and cancels the token handed to
    /// every module still running; that failure is returned.
    pub async fn execute<F, Fut>(
        &self,
        graph: &ModuleGraph,
        mut launch: F,
    ) -> Result<Vec<ModuleId>, FlowError>
    where
        F: FnMut(&str, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), FlowError>> + Send + 'static,
    {
        // Cycles are rejected before anything runs
        graph.topological_order()?;
        if graph.is_empty() {
            return Ok(Vec::new());
        }

        let mut pending: HashMap<ModuleId, usize> = graph
            .module_ids()
            .map(|id| (id.to_string(), graph.dependency_count(id)))
            .collect();
        let mut ready: VecDeque<ModuleId> = graph
            .module_ids()
            .filter(|id| pending.get(*id) == Some(&0))
            .map(str::to_string)
            .collect();

        let cancel = CancellationToken::new();
        let mut running = FuturesUnordered::new();
        let mut completed = Vec::with_capacity(graph.len());

        loop {
            while running.len() < self.max_parallel {
                let Some(module_id) = ready.pop_front() else {
                    break;
                };
                tracing::debug!("Dispatching module {}", module_id);
                let task = launch(&module_id, cancel.child_token());
                running.push(tokio::spawn(async move { (module_id, task.await) }));
            }

            let Some(joined) = running.next().await else {
                break;
            };

            let outcome = match joined {
                Ok((module_id, Ok(()))) => Ok(module_id),
                Ok((_, Err(e))) => Err(e),
                Err(e) => Err(FlowError::Execution(format!("Task join error: {}", e))),
            };

            match outcome {
                Ok(module_id) => {
                    for dependent in graph.dependents(&module_id) {
                        if let Some(count) = pending.get_mut(dependent) {
                            *count -= 1;
                            if *count == 0 {
                                ready.push_back(dependent.to_string());
                            }
                        }
                    }
                    completed.push(module_id);
                }
                Err(e) => {
                    cancel.cancel();
                    // Let cancelled modules wind down before reporting
                    while running.next().await.is_some() {}
                    return Err(e);
                }
            }
        }

        Ok(completed)
    }
}
