//! CLI argument parsing for sscbatch
use crate::actions::BatchAction;
use clap::{Parser, Subcommand};
use ssc_platform::{ReportFormat, TokenKind};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sscbatch",
    version,
    about = "Batch and workflow harness for Fortify Software Security Center",
    long_about = "Runs REST operations against SSC, either one workflow at a time or as sequential batches of parallel calls over a CSV list of version ids",
    after_help = "ENVIRONMENT:
  SSC_URL                   SSC base URL including context path (https://host:8443/ssc)
  SSC_USERNAME              Account used for token operations
  SSC_PASSWORD              Password of that account
  SSC_SKIP_AUDIT_ASSISTANT  Skip Audit Assistant operations (true/false)
  DisableSSLSecurity        Accept invalid certificates when set
  SSC_DOWNLOAD_DIR          Directory for downloaded files (default: downloads)

A .env file in the working directory is loaded first.

EXAMPLES:
  # Train Audit Assistant on every version listed in the CSV, 4 at a time
  sscbatch --batch-size 4 batch send-for-training

  # Upload results and wait for processing
  sscbatch upload --version-id 2 --file scan.fpr"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Number of calls run in parallel within one batch
    #[arg(
        long,
        env = "SSC_BATCH_SIZE",
        default_value = "2",
        global = true,
        value_parser = validate_batch_size
    )]
    pub batch_size: usize,

    /// CSV file with the version ids of batch runs
    #[arg(long, env = "SSC_VERSION_CSV", default_value = "aa-version-sample.csv", global = true)]
    pub csv: PathBuf,

    /// Directory for downloaded artifacts and reports
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Keep the generated tokens instead of revoking them at the end
    #[arg(long, global = true)]
    pub keep_tokens: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one action for every version id of the CSV file
    Batch {
        /// send-for-training, send-for-prediction, assign-attribute or assign-auth-entities
        action: BatchAction,

        /// JSON payload passed to every call (attribute list or auth entity list)
        #[arg(long)]
        payload: Option<String>,
    },

    /// Create and commit a version, creating the project when needed
    CreateVersion {
        /// Project (application) name
        #[arg(long)]
        project: String,

        /// Version name, generated when omitted
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "")]
        description: String,

        /// Option attribute as DEFINITION_ID=GUID (repeatable)
        #[arg(long = "attribute", value_parser = parse_assignment)]
        attributes: Vec<(u64, String)>,

        /// Text attribute as DEFINITION_ID=VALUE (repeatable)
        #[arg(long = "text-attribute", value_parser = parse_assignment)]
        text_attributes: Vec<(u64, String)>,

        /// Copy the current issue state from this version after commit
        #[arg(long)]
        copy_state_from: Option<u64>,

        #[arg(long, default_value = ssc_platform::project::DEFAULT_ISSUE_TEMPLATE)]
        issue_template: String,
    },

    /// Create a version that takes over settings and issue state of another
    CopyVersion {
        /// Version to copy from
        #[arg(long)]
        source_version_id: u64,

        /// Project (application) name
        #[arg(long)]
        project: String,

        /// Version name, generated when omitted
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = ssc_platform::project::DEFAULT_ISSUE_TEMPLATE)]
        issue_template: String,
    },

    /// Create a text attribute definition
    CreateAttribute {
        /// Attribute name, generated when omitted
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Upload a result file (FPR) and wait for it to be processed
    Upload {
        #[arg(long)]
        version_id: u64,

        /// Result file to upload
        #[arg(long)]
        file: PathBuf,

        /// Seconds between job status checks
        #[arg(long, default_value = "5", value_parser = validate_seconds)]
        poll_interval: u64,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "600", value_parser = validate_seconds)]
        timeout_secs: u64,

        /// Return right after the upload is acknowledged
        #[arg(long)]
        no_wait: bool,
    },

    /// Download an uploaded artifact
    DownloadArtifact {
        #[arg(long)]
        artifact_id: u64,

        /// File name inside the download directory
        #[arg(long, default_value = "artifact.fpr")]
        file_name: String,
    },

    /// Generate a saved report, wait for it and download it
    Report {
        /// Name of the report definition on the server
        #[arg(long, default_value = "DISA STIG")]
        definition: String,

        /// Name the report is saved under
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        note: String,

        #[arg(long, default_value = "PDF")]
        format: ReportFormat,

        #[arg(long)]
        project_id: u64,

        #[arg(long)]
        version_id: u64,

        /// Boolean parameter set to true, by identifier (repeatable)
        #[arg(long = "enable")]
        enabled_parameters: Vec<String>,

        #[arg(long, default_value = "5", value_parser = validate_seconds)]
        poll_interval: u64,

        #[arg(long, default_value = "900", value_parser = validate_seconds)]
        timeout_secs: u64,

        /// Only submit the report
        #[arg(long)]
        no_download: bool,
    },

    /// Generate a purpose-scoped token
    Token {
        #[arg(long, default_value = "AnalysisDownloadToken")]
        kind: TokenKind,
    },

    /// List the issues of a version page by page
    Issues {
        #[arg(long)]
        version_id: u64,

        /// Page size
        #[arg(long)]
        limit: Option<u32>,

        /// Server-side filter expression; only the first page is shown when set
        #[arg(long)]
        filter: Option<String>,
    },

    /// Create a custom tag and add it to a version
    TagVersion {
        #[arg(long)]
        version_id: u64,

        /// Tag name, generated when omitted
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "TEXT")]
        value_type: String,
    },

    /// Create a local user and give it access to versions
    CreateUser {
        /// User name, generated when omitted
        #[arg(long)]
        user_name: Option<String>,

        /// Initial password
        #[arg(long, env = "SSC_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        email: Option<String>,

        /// Role id (repeatable)
        #[arg(
            long = "role",
            default_values_t = vec!["securitylead".to_string(), "developer".to_string()]
        )]
        roles: Vec<String>,

        /// Version the user gets access to (repeatable)
        #[arg(long = "version-id")]
        version_ids: Vec<u64>,
    },

    /// Show whether Audit Assistant is enabled
    AaConfig {
        #[arg(long, default_value = "auditassistant")]
        group: String,

        #[arg(long, default_value = "auditassistant.enabled")]
        key: String,
    },

    /// Revoke all tokens of the configured user
    Cleanup,
}

/// Validate batch size (> 0)
fn validate_batch_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value == 0 {
        return Err("Batch size must be greater than 0".to_string());
    }
    Ok(value)
}

/// Validate a duration in seconds (> 0)
fn validate_seconds(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    if value == 0 {
        return Err("Seconds must be greater than 0".to_string());
    }
    Ok(value)
}

/// Parse `ID=VALUE`
fn parse_assignment(s: &str) -> Result<(u64, String), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not of the form ID=VALUE", s))?;
    let id: u64 = id
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid attribute definition id", id))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("Missing value for attribute {}", id));
    }
    Ok((id, value.to_string()))
}
