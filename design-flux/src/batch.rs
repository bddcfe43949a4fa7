//! Concurrent execution of independent units with per-unit failure containment

use anyhow::{anyhow, Result};
use futures::{future::join_all, stream::FuturesUnordered, Future, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use design_flux_sdk::{log_batch_complete, log_batch_start};

/// Context provided to each unit
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    /// Stage number (for logging)
    pub stage: usize,
    /// Unit number (1-indexed for display)
    pub task_number: usize,
    /// Total number of units in this call
    pub total_tasks: usize,
}

/// Run every item concurrently, at most `concurrency` at a time
///
/// Unlike a fail-fast batch, a failing unit does not stop its siblings:
/// every item gets an entry in the returned vector, in input order.
pub async fn execute_contained<T, F, Fut, R>(
    stage: usize,
    items: Vec<T>,
    concurrency: usize,
    task_executor: F,
) -> Vec<Result<R>>
where
    F: Fn(T, TaskContext) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let executor = &task_executor;
    let mut tasks = FuturesUnordered::new();

    for (idx, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let ctx = TaskContext {
            stage,
            task_number: idx + 1,
            total_tasks: total,
        };

        tasks.push(async move {
            let result = match sem.acquire().await {
                Ok(_permit) => executor(item, ctx).await,
                Err(_) => Err(anyhow!("Semaphore closed")),
            };
            (idx, result)
        });
    }

    let mut indexed = Vec::with_capacity(total);
    while let Some(entry) = tasks.next().await {
        indexed.push(entry);
    }
    indexed.sort_by_key(|(idx, _)| *idx);
    indexed.into_iter().map(|(_, result)| result).collect()
}

/// Run items in fixed-size waves, pausing between waves
///
/// Each wave runs fully concurrently; the next wave starts only after the
/// previous one has settled. Failures stay inside their own slot.
pub async fn execute_waves<T, F, Fut, R>(
    stage: usize,
    items: Vec<T>,
    wave_size: usize,
    pause: Duration,
    task_executor: F,
) -> Vec<Result<R>>
where
    F: Fn(T, TaskContext) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let total = items.len();
    let wave_size = wave_size.max(1);
    let total_waves = total.div_ceil(wave_size);
    let mut results = Vec::with_capacity(total);
    let mut pending = items.into_iter().enumerate().peekable();
    let mut wave_number = 0;

    while pending.peek().is_some() {
        wave_number += 1;
        let wave: Vec<(usize, T)> = pending.by_ref().take(wave_size).collect();
        log_batch_start!(wave_number, total_waves, wave.len());

        let futures = wave.into_iter().map(|(idx, item)| {
            let ctx = TaskContext {
                stage,
                task_number: idx + 1,
                total_tasks: total,
            };
            task_executor(item, ctx)
        });
        results.extend(join_all(futures).await);

        log_batch_complete!(wave_number);

        if pending.peek().is_some() && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    results
}
