//! # SSC API Client Library
//!
//! A Rust client library for the Fortify Software Security Center (SSC) REST
//! API, built for integration harnesses and batch automation.
//!
//! ## Features
//!
//! - 🔐 **Token lifecycle** - Session token bootstrap, purpose-scoped tokens and cleanup
//! - 📦 **Project versions** - Create, copy, commit, attributes, Audit Assistant actions
//! - 👤 **Identity** - Local users and access assignment
//! - 🐞 **Issues and custom tags** - Paginated issue listing and tag management
//! - 📊 **Reports** - Report definition lookup, parameter composition, saved reports
//! - 📤 **File transfer** - FPR upload with job tracking, artifact and report download
//! - 🔁 **Orchestration** - Sequential batches of concurrent calls, step chains, status polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use ssc_platform::{SscClient, SscConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SscConfig::new("https://ssc.example.com/ssc", "admin", "password");
//!     let mut client = SscClient::new(config)?;
//!
//!     // Fetches the session token and checks it against the server
//!     client.initialize().await?;
//!
//!     let job = client.job_api().get_job("JOB_ARTIFACTUPLOAD42").await?;
//!     println!("job state: {}", job.state);
//!
//!     client.clear_tokens().await?;
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod configuration;
pub mod identity;
pub mod issue;
pub mod job;
pub mod poll;
pub mod project;
pub mod reporting;
pub mod token;
pub mod transfer;
pub mod validation;
pub mod workflow;

use secrecy::SecretString;
use std::path::PathBuf;

// Re-export common types for convenience
pub use batch::{BatchRecord, BatchReport, BatchSummary, run_batches};
pub use client::{ApiEnvelope, SscClient};
pub use configuration::{ConfigurationApi, ConfigurationGroup, ConfigurationProperty, Feature};
pub use identity::{
    AssignVersionsRequest, AuthEntity, AuthEntityRef, CreateLocalUserRequest, IdentityApi,
    LocalUser, RoleRef,
};
pub use issue::{CustomTag, Issue, IssueApi, IssuePage, IssueQuery};
pub use job::{Job, JobApi, JobState};
pub use poll::{Phase, Pollable, poll_until_terminal};
pub use project::{
    ActionResponse, AttributeDefinition, AttributeValue, CreateProjectVersionRequest, Project,
    ProjectVersion, ProjectVersionApi, VersionAttribute,
};
pub use reporting::{
    InputReportParameter, ReportDefinition, ReportFormat, ReportParameter, ReportParameterType,
    ReportStatus, ReportingApi, SavedReport, SavedReportRequest, compose_report_parameters,
};
pub use token::{GeneratedToken, TokenKind};
pub use transfer::TransferApi;
pub use validation::ValidationError;
pub use workflow::{
    CopyVersionOptions, CreateVersionOptions, ReportOptions, SscWorkflow, Workflow,
};

/// Error type for SSC client operations.
#[derive(Debug, thiserror::Error)]
pub enum SscError {
    /// Configuration is missing or invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Credentials rejected or session verification failed
    #[error("Authentication error: {0}")]
    Auth(String),
    /// A purpose-scoped token could not be obtained or revoked
    #[error("Token error: {0}")]
    Token(String),
    /// A session-bound call was made before `initialize()`
    #[error("Client is not initialized, call initialize() first")]
    NotInitialized,
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    /// Server answered with a body we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// JSON serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Upload was not acknowledged by the server
    #[error("Upload failed: {message}")]
    Upload { message: String, body: String },
    /// Download could not be completed
    #[error("Download to {} failed: {message}", .path.display())]
    Download { path: PathBuf, message: String },
    /// A polled job or report ended in a failure state
    #[error("Job {job_id} ended in state {state}")]
    JobFailed { job_id: String, state: String },
    /// When an item is not found
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Input rejected before a request was built
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Local file system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A spawned task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(String),
}

impl SscError {
    /// HTTP status associated with this error, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            SscError::Api { status, .. } => Some(*status),
            SscError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for SscError {
    fn from(error: tokio::task::JoinError) -> Self {
        SscError::Task(error.to_string())
    }
}

/// Default directory for downloaded artifacts and reports
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

const API_PATH: &str = "/api/v1";
const UPLOAD_PATH: &str = "/upload/resultFileUpload.html";
const ARTIFACT_DOWNLOAD_PATH: &str = "/download/artifactDownload.html";
const REPORT_DOWNLOAD_PATH: &str = "/transfer/reportDownload.html";

/// Configuration for the SSC API client.
///
/// All endpoint URLs are derived from the server base URL, which includes
/// the context path (for example `https://ssc.example.com/ssc`).
#[derive(Debug, Clone)]
pub struct SscConfig {
    /// Server base URL without trailing slash
    pub base_url: String,
    /// REST API base URL (`<base>/api/v1`)
    pub api_base_url: String,
    /// Result file upload endpoint
    pub upload_url: String,
    /// Artifact download endpoint
    pub artifact_download_url: String,
    /// Report download endpoint
    pub report_download_url: String,
    /// Account used for basic-auth token operations
    pub username: String,
    /// Password for `username`
    pub password: SecretString,
    /// Whether to validate TLS certificates (default: true)
    pub validate_certificates: bool,
    /// Skip Audit Assistant operations (training, prediction)
    pub skip_audit_assistant: bool,
    /// Directory downloads are written into, created on first use
    pub download_dir: PathBuf,
}

impl SscConfig {
    /// Create a new configuration.
    ///
    /// # Arguments
    ///
    /// * `base_url` - SSC base URL including context path
    /// * `username` - SSC account name
    /// * `password` - SSC account password
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            api_base_url: format!("{base_url}{API_PATH}"),
            upload_url: format!("{base_url}{UPLOAD_PATH}"),
            artifact_download_url: format!("{base_url}{ARTIFACT_DOWNLOAD_PATH}"),
            report_download_url: format!("{base_url}{REPORT_DOWNLOAD_PATH}"),
            base_url,
            username: username.into(),
            password: SecretString::from(password.into()),
            validate_certificates: true,
            skip_audit_assistant: false,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        }
    }

    /// Build a configuration from process environment variables.
    ///
    /// Reads `SSC_URL`, `SSC_USERNAME`, `SSC_PASSWORD` (required) and
    /// `SSC_SKIP_AUDIT_ASSISTANT`, `DisableSSLSecurity`, `SSC_DOWNLOAD_DIR`
    /// (optional).
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Config`] when a required variable is missing or
    /// the URL is malformed.
    pub fn from_env() -> Result<Self, SscError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SscConfig::from_env`] with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Config`] when a required variable is missing or
    /// the URL is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SscError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| SscError::Config(format!("{key} environment variable required")))
        };

        let mut config = Self::new(
            required("SSC_URL")?,
            required("SSC_USERNAME")?,
            required("SSC_PASSWORD")?,
        );

        if lookup("DisableSSLSecurity").is_some() {
            config = config.with_certificate_validation_disabled();
        }
        if let Some(flag) = lookup("SSC_SKIP_AUDIT_ASSISTANT") {
            config = config.with_audit_assistant_skipped(is_truthy(&flag));
        }
        if let Some(dir) = lookup("SSC_DOWNLOAD_DIR").filter(|d| !d.trim().is_empty()) {
            config = config.with_download_dir(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the base URL is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Config`] describing the problem.
    pub fn validate(&self) -> Result<(), SscError> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| SscError::Config(format!("Invalid SSC URL '{}': {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(SscError::Config(format!(
                "Unsupported URL scheme '{other}' in SSC URL"
            ))),
        }
    }

    /// Disable certificate validation for development environments.
    ///
    /// WARNING: This should only be used against servers with self-signed
    /// certificates. Never use this in production.
    pub fn with_certificate_validation_disabled(mut self) -> Self {
        self.validate_certificates = false;
        self
    }

    /// Toggle the Audit Assistant skip flag.
    pub fn with_audit_assistant_skipped(mut self, skip: bool) -> Self {
        self.skip_audit_assistant = skip;
        self
    }

    /// Set the directory downloads are written into.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl SscClient {
    /// Get a project version API instance.
    pub fn project_version_api(&self) -> ProjectVersionApi<'_> {
        ProjectVersionApi::new(self)
    }

    /// Get an identity API instance.
    pub fn identity_api(&self) -> IdentityApi<'_> {
        IdentityApi::new(self)
    }

    /// Get an issue and custom tag API instance.
    pub fn issue_api(&self) -> IssueApi<'_> {
        IssueApi::new(self)
    }

    /// Get a reporting API instance.
    pub fn reporting_api(&self) -> ReportingApi<'_> {
        ReportingApi::new(self)
    }

    /// Get a job API instance.
    pub fn job_api(&self) -> JobApi<'_> {
        JobApi::new(self)
    }

    /// Get a configuration API instance.
    pub fn configuration_api(&self) -> ConfigurationApi<'_> {
        ConfigurationApi::new(self)
    }

    /// Get a file transfer API instance.
    /// Uses the legacy upload/download servlets rather than `/api/v1`.
    pub fn transfer_api(&self) -> TransferApi<'_> {
        TransferApi::new(self)
    }

    /// Get a workflow helper instance.
    /// Provides high-level operations that combine multiple API calls.
    pub fn workflow(&self) -> SscWorkflow<'_> {
        SscWorkflow::new(self)
    }
}
