use std::cmp::Ordering;
use std::future::Future;

use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, error, warn};

use crate::observability::metrics::get_metrics;
use crate::resilience::error::{AggregateError, TaskFailure, UpstreamFetchError};

/// One independent unit of upstream work, identified by a source name or symbol.
/// A task yields zero or more values.
pub struct FetchTask<'a, T> {
    pub id: String,
    operation: BoxFuture<'a, Result<Vec<T>, UpstreamFetchError>>,
}

impl<'a, T: Send + 'a> FetchTask<'a, T> {
    pub fn new<F>(id: impl Into<String>, operation: F) -> Self
    where
        F: Future<Output = Result<Vec<T>, UpstreamFetchError>> + Send + 'a,
    {
        Self {
            id: id.into(),
            operation: operation.boxed(),
        }
    }

    /// Task producing exactly one value on success.
    pub fn single<F>(id: impl Into<String>, operation: F) -> Self
    where
        F: Future<Output = Result<T, UpstreamFetchError>> + Send + 'a,
    {
        Self::new(id, operation.map(|outcome| outcome.map(|value| vec![value])))
    }
}

/// Merged outcome of one fan-out call.
///
/// `succeeded.len() + failures.len()` always equals the number of tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult<T> {
    /// sorted by the caller's comparator, then truncated
    pub items: Vec<T>,
    /// number of items before truncation
    pub total_items: usize,
    /// ids of tasks that succeeded, sorted
    pub succeeded: Vec<String>,
    /// failed tasks sorted by id
    pub failures: Vec<TaskFailure>,
}

impl<T> AggregateResult<T> {
    pub fn task_count(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

struct Slot<T> {
    id: String,
    position: usize,
    seq: usize,
    value: T,
}

/// Runs fetch tasks concurrently and merges what succeeded.
#[derive(Debug, Clone)]
pub struct FanOutAggregator {
    name: String,
    max_items: Option<usize>,
}

impl FanOutAggregator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_items: None,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Start every task at once, wait for all of them, then sort the successes.
    ///
    /// Ties under `compare` fall back to task id, task position and the order
    /// inside the task's own output, so completion order never leaks into the
    /// result. Fails only when the task list is non-empty and nothing succeeded.
    pub async fn run<'a, T, C>(
        &self,
        tasks: Vec<FetchTask<'a, T>>,
        compare: C,
    ) -> Result<AggregateResult<T>, AggregateError>
    where
        T: Send + 'a,
        C: Fn(&T, &T) -> Ordering,
    {
        let task_count = tasks.len();
        debug!(aggregation = %self.name, tasks = task_count, "fan-out start");

        let outcomes = join_all(tasks.into_iter().enumerate().map(|(position, task)| async move {
            let FetchTask { id, operation } = task;
            let outcome = operation.await;
            (position, id, outcome)
        }))
        .await;

        let mut slots: Vec<Slot<T>> = Vec::new();
        let mut succeeded: Vec<String> = Vec::with_capacity(task_count);
        let mut failures: Vec<TaskFailure> = Vec::new();

        for (position, id, outcome) in outcomes {
            match outcome {
                Ok(values) => {
                    slots.extend(values.into_iter().enumerate().map(|(seq, value)| Slot {
                        id: id.clone(),
                        position,
                        seq,
                        value,
                    }));
                    succeeded.push(id);
                }
                Err(error) => {
                    debug!(aggregation = %self.name, task = %id, error = %error, "fetch task failed");
                    failures.push(TaskFailure { id, error });
                }
            }
        }

        succeeded.sort();
        failures.sort_by(|a, b| a.id.cmp(&b.id));

        let metrics = get_metrics().await;
        if task_count > 0 && succeeded.is_empty() {
            metrics
                .aggregation_total_failures
                .with_label_values(&[self.name.as_str()])
                .inc();
            let aggregate = AggregateError { failures };
            error!(aggregation = %self.name, "{}", aggregate);
            return Err(aggregate);
        }

        if !failures.is_empty() {
            metrics
                .aggregation_partial_failures
                .with_label_values(&[self.name.as_str()])
                .inc();
            let failed: Vec<String> = failures.iter().map(|failure| failure.to_string()).collect();
            warn!(
                aggregation = %self.name,
                failed = ?failed,
                succeeded = succeeded.len(),
                "partial fan-out result"
            );
        }

        slots.sort_by(|a, b| {
            compare(&a.value, &b.value)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.position.cmp(&b.position))
                .then_with(|| a.seq.cmp(&b.seq))
        });

        let total_items = slots.len();
        let items = slots
            .into_iter()
            .take(self.max_items.unwrap_or(usize::MAX))
            .map(|slot| slot.value)
            .collect();

        Ok(AggregateResult {
            items,
            total_items,
            succeeded,
            failures,
        })
    }
}
