//! Fixed-interval polling of server-side jobs and reports.
//!
//! There is no attempt limit. Callers that need a deadline wrap the future
//! in [`tokio::time::timeout`].

use log::{debug, error, info, warn};
use std::future::Future;
use std::time::Duration;

use crate::SscError;

/// Where a polled entity is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Still queued or running
    Pending,
    /// Finished successfully
    Succeeded,
    /// Finished with an error or was cancelled
    Failed,
    /// State not known to this client, polled again
    Unknown,
}

/// An entity whose state can be polled.
pub trait Pollable {
    fn phase(&self) -> Phase;

    /// Server-side state name, used in logs and errors.
    fn state_label(&self) -> String;
}

/// Poll `fetch_status` every `interval` until the entity reaches a terminal
/// state.
///
/// # Arguments
///
/// * `job_id` - Identifier used in log lines and in the failure error
/// * `fetch_status` - Fetches the current entity
/// * `interval` - Delay between fetches
///
/// # Returns
///
/// The entity as last fetched, in a success state.
///
/// # Errors
///
/// Returns [`SscError::JobFailed`] naming the terminal state when the
/// entity fails or is cancelled. Errors from `fetch_status` are returned
/// immediately.
pub async fn poll_until_terminal<T, F, Fut>(
    job_id: &str,
    mut fetch_status: F,
    interval: Duration,
) -> Result<T, SscError>
where
    T: Pollable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SscError>>,
{
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);

        let entity = fetch_status().await?;
        let state = entity.state_label();
        debug!("{job_id} state: {state} (check {attempts})");

        match entity.phase() {
            Phase::Succeeded => {
                info!("✅ {job_id} finished with state {state} after {attempts} checks");
                return Ok(entity);
            }
            Phase::Failed => {
                error!("❌ {job_id} ended with state {state}");
                return Err(SscError::JobFailed {
                    job_id: job_id.to_string(),
                    state,
                });
            }
            Phase::Unknown => {
                warn!("{job_id} reported unrecognised state {state}, polling again");
            }
            Phase::Pending => {}
        }

        debug!("{job_id} not finished, waiting {}ms...", interval.as_millis());
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    struct Status(&'static str);

    impl Pollable for Status {
        fn phase(&self) -> Phase {
            match self.0 {
                "RUNNING" => Phase::Pending,
                "FINISHED" => Phase::Succeeded,
                "FAILED" | "CANCELLED" => Phase::Failed,
                _ => Phase::Unknown,
            }
        }

        fn state_label(&self) -> String {
            self.0.to_string()
        }
    }

    fn scripted(
        states: &[&'static str],
    ) -> (
        Arc<Mutex<u32>>,
        impl FnMut() -> std::future::Ready<Result<Status, SscError>>,
    ) {
        let queue = Arc::new(Mutex::new(states.iter().copied().collect::<VecDeque<_>>()));
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        let fetch = move || {
            *counter.lock().unwrap() += 1;
            let next = queue.lock().unwrap().pop_front().unwrap_or("RUNNING");
            std::future::ready(Ok(Status(next)))
        };
        (calls, fetch)
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_finished() {
        let interval = Duration::from_secs(2);
        let (calls, fetch) = scripted(&["RUNNING", "RUNNING", "FINISHED"]);
        let started = tokio::time::Instant::now();

        let result = poll_until_terminal("JOB_ARTIFACTUPLOAD1", fetch, interval).await;

        assert_eq!(result.unwrap(), Status("FINISHED"));
        assert_eq!(*calls.lock().unwrap(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= interval * 2, "slept {elapsed:?}");
        assert!(elapsed < interval * 3, "slept {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_cancelled_is_failure() {
        let (calls, fetch) = scripted(&["RUNNING", "CANCELLED", "FINISHED"]);

        let result = poll_until_terminal("job-7", fetch, Duration::from_secs(1)).await;

        match result {
            Err(SscError::JobFailed { job_id, state }) => {
                assert_eq!(job_id, "job-7");
                assert_eq!(state, "CANCELLED");
            }
            other => panic!("expected JobFailed, got {other:?}"),
        }
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_state_keeps_polling() {
        let (calls, fetch) = scripted(&["DEFERRED", "FINISHED"]);

        let result = poll_until_terminal("job-8", fetch, Duration::from_millis(500)).await;

        assert!(result.is_ok());
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_propagates() {
        let mut calls = 0u32;
        let fetch = || {
            calls += 1;
            std::future::ready(Err::<Status, _>(SscError::NotFound("job".to_string())))
        };

        let result = poll_until_terminal("job-9", fetch, Duration::from_secs(1)).await;

        assert!(matches!(result, Err(SscError::NotFound(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_owned_timeout() {
        let (_calls, fetch) = scripted(&[]);

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            poll_until_terminal("job-10", fetch, Duration::from_secs(2)),
        )
        .await;

        assert!(result.is_err(), "never-finishing job must hit the timeout");
    }
}
