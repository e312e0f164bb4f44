//! Sequential batches of concurrent calls.
//!
//! Items are split into consecutive groups of `batch_size`. All items of a
//! group run concurrently as tokio tasks; the next group starts only once
//! every task of the current one has settled. Failures are recorded per
//! item and never stop the run.

use log::{info, warn};
use std::fmt;
use std::future::Future;
use tokio::task::{JoinError, JoinHandle};

use crate::SscError;

/// Outcome of one item.
#[derive(Debug)]
pub struct BatchRecord<T, R, E> {
    pub item: T,
    pub outcome: Result<R, E>,
}

impl<T, R, E> BatchRecord<T, R, E> {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Records of one batch, split by outcome.
///
/// Both lists keep submission order.
#[derive(Debug)]
pub struct BatchReport<T, R, E> {
    /// Zero-based batch number
    pub index: usize,
    pub ok: Vec<BatchRecord<T, R, E>>,
    pub error: Vec<BatchRecord<T, R, E>>,
}

impl<T, R, E> BatchReport<T, R, E> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.ok.len().saturating_add(self.error.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ok.is_empty() && self.error.is_empty()
    }
}

/// One report per batch, in batch order.
#[derive(Debug)]
pub struct BatchSummary<T, R, E> {
    pub batches: Vec<BatchReport<T, R, E>>,
}

impl<T, R, E> BatchSummary<T, R, E> {
    #[must_use]
    pub fn ok_count(&self) -> usize {
        self.batches.iter().map(|b| b.ok.len()).sum()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.batches.iter().map(|b| b.error.len()).sum()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.batches.iter().map(BatchReport::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Run `operation` over `items` in sequential batches of concurrent tasks.
///
/// Every item produces exactly one [`BatchRecord`]. A task that panics or is
/// aborted is recorded as an error for its item via `E: From<JoinError>`.
///
/// # Arguments
///
/// * `items` - Work items, processed in order
/// * `batch_size` - Maximum number of concurrent operations
/// * `operation` - Called once per item; the returned future is spawned
///
/// # Errors
///
/// Returns [`SscError::Config`] when `batch_size` is zero. Nothing is
/// invoked in that case.
pub async fn run_batches<T, R, E, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    operation: F,
) -> Result<BatchSummary<T, R, E>, SscError>
where
    T: Clone,
    R: Send + 'static,
    E: From<JoinError> + fmt::Display + Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    if batch_size == 0 {
        return Err(SscError::Config(
            "batch size must be at least 1".to_string(),
        ));
    }

    let total_batches = items.len().div_ceil(batch_size);
    let mut summary = BatchSummary {
        batches: Vec::with_capacity(total_batches),
    };
    let mut remaining = items.into_iter();

    for index in 0..total_batches {
        let group: Vec<T> = remaining.by_ref().take(batch_size).collect();
        info!(
            "🚀 Starting batch {}/{total_batches} ({} items)",
            index.saturating_add(1),
            group.len()
        );

        let handles: Vec<(T, JoinHandle<Result<R, E>>)> = group
            .into_iter()
            .map(|item| {
                let task = tokio::spawn(operation(item.clone()));
                (item, task)
            })
            .collect();

        let mut report = BatchReport {
            index,
            ok: Vec::new(),
            error: Vec::new(),
        };
        for (item, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    warn!(
                        "Task of batch {} did not complete: {join_error}",
                        index.saturating_add(1)
                    );
                    Err(E::from(join_error))
                }
            };
            let record = BatchRecord { item, outcome };
            if record.is_ok() {
                report.ok.push(record);
            } else {
                report.error.push(record);
            }
        }

        info!(
            "📋 Batch {}/{total_batches} done: {} succeeded, {} failed",
            index.saturating_add(1),
            report.ok.len(),
            report.error.len()
        );
        for record in &report.error {
            if let Err(e) = &record.outcome {
                warn!("Batch {} item failed: {e}", index.saturating_add(1));
            }
        }
        summary.batches.push(report);
    }

    Ok(summary)
}
