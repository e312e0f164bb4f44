//! Server-side jobs (artifact processing, state copies, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::poll::{Phase, Pollable, poll_until_terminal};
use crate::validation::{MAX_SEGMENT_LEN, validate_url_segment};
use crate::{SscClient, SscError};

/// Job states reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Running,
    Waiting,
    WaitingForWorker,
    Prepared,
    Scheduled,
    Processing,
    Finished,
    Complete,
    Failed,
    Cancelled,
    Error,
    Other(String),
}

impl JobState {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Running => "RUNNING",
            JobState::Waiting => "WAITING",
            JobState::WaitingForWorker => "WAITING_FOR_WORKER",
            JobState::Prepared => "PREPARED",
            JobState::Scheduled => "SCHEDULED",
            JobState::Processing => "PROCESSING",
            JobState::Finished => "FINISHED",
            JobState::Complete => "COMPLETE",
            JobState::Failed => "FAILED",
            JobState::Cancelled => "CANCELLED",
            JobState::Error => "ERROR",
            JobState::Other(state) => state,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            JobState::Running
            | JobState::Waiting
            | JobState::WaitingForWorker
            | JobState::Prepared
            | JobState::Scheduled
            | JobState::Processing => Phase::Pending,
            JobState::Finished | JobState::Complete => Phase::Succeeded,
            JobState::Failed | JobState::Cancelled | JobState::Error => Phase::Failed,
            JobState::Other(_) => Phase::Unknown,
        }
    }
}

impl From<String> for JobState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "RUNNING" => JobState::Running,
            "WAITING" => JobState::Waiting,
            "WAITING_FOR_WORKER" => JobState::WaitingForWorker,
            "PREPARED" => JobState::Prepared,
            "SCHEDULED" => JobState::Scheduled,
            "PROCESSING" => JobState::Processing,
            "FINISHED" => JobState::Finished,
            "COMPLETE" => JobState::Complete,
            "FAILED" => JobState::Failed,
            "CANCELLED" => JobState::Cancelled,
            "ERROR" => JobState::Error,
            _ => JobState::Other(state),
        }
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters attached to a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobData {
    #[serde(rename = "PARAM_ARTIFACT_ID")]
    pub artifact_id: Option<Value>,
    #[serde(rename = "PARAM_PROJECT_VERSION_ID")]
    pub project_version_id: Option<Value>,
}

/// A server-side job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_name: Option<String>,
    pub state: JobState,
    pub project_version_id: Option<u64>,
    pub job_data: Option<JobData>,
}

impl Job {
    /// Artifact produced by an upload job, when known.
    ///
    /// The server sends the id either as a number or as a string.
    #[must_use]
    pub fn artifact_id(&self) -> Option<String> {
        match self.job_data.as_ref()?.artifact_id.as_ref()? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

impl Pollable for Job {
    fn phase(&self) -> Phase {
        self.state.phase()
    }

    fn state_label(&self) -> String {
        self.state.to_string()
    }
}

/// Job API operations.
#[derive(Clone, Copy)]
pub struct JobApi<'a> {
    client: &'a SscClient,
}

impl<'a> JobApi<'a> {
    #[must_use]
    pub fn new(client: &'a SscClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns an error if the job name is not a valid path segment or the
    /// request fails.
    pub async fn get_job(&self, job_name: &str) -> Result<Job, SscError> {
        let job_name = validate_url_segment(job_name, MAX_SEGMENT_LEN)?;
        self.client
            .get_data(&format!("/jobs/{}", urlencoding::encode(job_name)), &[])
            .await
    }

    /// Poll a job until it finishes.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::JobFailed`] if the job fails or is cancelled.
    pub async fn wait_for_job(&self, job_name: &str, interval: Duration) -> Result<Job, SscError> {
        poll_until_terminal(job_name, || self.get_job(job_name), interval).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_phases() {
        assert_eq!(JobState::from("RUNNING".to_string()).phase(), Phase::Pending);
        assert_eq!(
            JobState::from("WAITING_FOR_WORKER".to_string()).phase(),
            Phase::Pending
        );
        assert_eq!(JobState::from("PREPARED".to_string()).phase(), Phase::Pending);
        assert_eq!(JobState::from("FINISHED".to_string()).phase(), Phase::Succeeded);
        assert_eq!(JobState::from("CANCELLED".to_string()).phase(), Phase::Failed);
        assert_eq!(JobState::from("ERROR".to_string()).phase(), Phase::Failed);
        assert_eq!(JobState::from("DEFERRED".to_string()).phase(), Phase::Unknown);
    }

    #[test]
    fn test_job_parsing() {
        let job: Job = serde_json::from_str(
            r#"{"jobName": "JOB_ARTIFACTUPLOAD42", "state": "FINISHED",
                "projectVersionId": 3, "jobData": {"PARAM_ARTIFACT_ID": 17}}"#,
        )
        .unwrap();
        assert_eq!(job.state, JobState::Finished);
        assert_eq!(job.artifact_id().as_deref(), Some("17"));

        let job: Job = serde_json::from_str(
            r#"{"state": "SOMETHING_NEW", "jobData": {"PARAM_ARTIFACT_ID": "18"}}"#,
        )
        .unwrap();
        assert_eq!(job.state, JobState::Other("SOMETHING_NEW".to_string()));
        assert_eq!(job.state.to_string(), "SOMETHING_NEW");
        assert_eq!(job.artifact_id().as_deref(), Some("18"));
    }
}
