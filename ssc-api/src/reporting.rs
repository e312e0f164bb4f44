//! Report definitions and saved reports.
//!
//! A saved report is generated from a report definition by supplying a
//! value for every parameter the definition declares; see
//! [`compose_report_parameters`].

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::poll::{Phase, Pollable, poll_until_terminal};
use crate::{SscClient, SscError};

/// Report type sent for issue-based reports
pub const ISSUE_REPORT_TYPE: &str = "ISSUE";

/// Output formats supported for saved reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportFormat {
    Pdf,
    Doc,
    Xls,
}

impl ReportFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "PDF",
            ReportFormat::Doc => "DOC",
            ReportFormat::Xls => "XLS",
        }
    }

    /// File extension for downloads.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Doc => "doc",
            ReportFormat::Xls => "xls",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PDF" => Ok(ReportFormat::Pdf),
            "DOC" => Ok(ReportFormat::Doc),
            "XLS" => Ok(ReportFormat::Xls),
            other => Err(format!(
                "Unsupported report format '{other}' (expected PDF, DOC or XLS)"
            )),
        }
    }
}

/// Parameter types of report definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportParameterType {
    SingleSelectDefault,
    SingleProject,
    Boolean,
    Other(String),
}

impl From<String> for ReportParameterType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SINGLE_SELECT_DEFAULT" => ReportParameterType::SingleSelectDefault,
            "SINGLE_PROJECT" => ReportParameterType::SingleProject,
            "BOOLEAN" => ReportParameterType::Boolean,
            _ => ReportParameterType::Other(value),
        }
    }
}

impl From<ReportParameterType> for String {
    fn from(value: ReportParameterType) -> Self {
        match value {
            ReportParameterType::SingleSelectDefault => "SINGLE_SELECT_DEFAULT".to_string(),
            ReportParameterType::SingleProject => "SINGLE_PROJECT".to_string(),
            ReportParameterType::Boolean => "BOOLEAN".to_string(),
            ReportParameterType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParameterOption {
    pub order: i64,
    pub report_value: String,
    pub display_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParameter {
    pub name: String,
    pub identifier: String,
    #[serde(rename = "type")]
    pub parameter_type: ReportParameterType,
    #[serde(default)]
    pub report_parameter_options: Vec<ReportParameterOption>,
}

/// A report definition (template) installed on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ReportParameter>,
}

/// Value supplied for one definition parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputReportParameter {
    pub name: String,
    pub identifier: String,
    #[serde(rename = "type")]
    pub parameter_type: ReportParameterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_value: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportVersionRef {
    pub id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportProjectRef {
    pub id: u64,
    pub version: ReportVersionRef,
}

/// Request body for `POST /reports`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReportRequest {
    pub name: String,
    pub note: String,
    #[serde(rename = "type")]
    pub report_type: String,
    pub report_definition_id: u64,
    pub format: ReportFormat,
    pub project: ReportProjectRef,
    pub input_report_parameters: Vec<InputReportParameter>,
}

/// Processing status of a saved report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportStatus {
    Processing,
    SchedProcessing,
    ErrorProcessing,
    ProcessComplete,
    Other(String),
}

impl ReportStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ReportStatus::Processing => "PROCESSING",
            ReportStatus::SchedProcessing => "SCHED_PROCESSING",
            ReportStatus::ErrorProcessing => "ERROR_PROCESSING",
            ReportStatus::ProcessComplete => "PROCESS_COMPLETE",
            ReportStatus::Other(status) => status,
        }
    }
}

impl From<String> for ReportStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PROCESSING" => ReportStatus::Processing,
            "SCHED_PROCESSING" => ReportStatus::SchedProcessing,
            "ERROR_PROCESSING" => ReportStatus::ErrorProcessing,
            "PROCESS_COMPLETE" => ReportStatus::ProcessComplete,
            _ => ReportStatus::Other(value),
        }
    }
}

impl From<ReportStatus> for String {
    fn from(value: ReportStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReport {
    pub id: u64,
    pub name: String,
    pub format: Option<String>,
    pub status: ReportStatus,
    pub note: Option<String>,
}

impl SavedReport {
    /// File name for downloading this report, `<name>.<format>`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let extension = self
            .format
            .as_deref()
            .unwrap_or("pdf")
            .to_ascii_lowercase();
        let stem: String = self
            .name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
            .collect();
        format!("{}.{extension}", stem.replace("..", "_"))
    }
}

impl Pollable for SavedReport {
    fn phase(&self) -> Phase {
        match self.status {
            ReportStatus::Processing | ReportStatus::SchedProcessing => Phase::Pending,
            ReportStatus::ProcessComplete => Phase::Succeeded,
            ReportStatus::ErrorProcessing => Phase::Failed,
            ReportStatus::Other(_) => Phase::Unknown,
        }
    }

    fn state_label(&self) -> String {
        self.status.to_string()
    }
}

/// Build the parameter list for a saved report request.
///
/// - `SINGLE_SELECT_DEFAULT` takes the option with `order == 0`
/// - `SINGLE_PROJECT` takes `version_id`
/// - `BOOLEAN` is `false` unless `boolean_overrides` names its identifier
/// - anything else is sent without a value
///
/// # Errors
///
/// Returns [`SscError::NotFound`] when a single-select parameter has no
/// default option.
pub fn compose_report_parameters(
    definition: &ReportDefinition,
    version_id: u64,
    boolean_overrides: &HashMap<String, bool>,
) -> Result<Vec<InputReportParameter>, SscError> {
    definition
        .parameters
        .iter()
        .map(|parameter| -> Result<InputReportParameter, SscError> {
            let param_value = match &parameter.parameter_type {
                ReportParameterType::SingleSelectDefault => {
                    let option = parameter
                        .report_parameter_options
                        .iter()
                        .find(|option| option.order == 0)
                        .ok_or_else(|| {
                            SscError::NotFound(format!(
                                "default option for parameter '{}' of report definition '{}'",
                                parameter.identifier, definition.name
                            ))
                        })?;
                    Some(Value::String(option.report_value.clone()))
                }
                ReportParameterType::SingleProject => Some(Value::from(version_id)),
                ReportParameterType::Boolean => Some(Value::Bool(
                    boolean_overrides
                        .get(&parameter.identifier)
                        .copied()
                        .unwrap_or(false),
                )),
                ReportParameterType::Other(_) => None,
            };

            Ok(InputReportParameter {
                name: parameter.name.clone(),
                identifier: parameter.identifier.clone(),
                parameter_type: parameter.parameter_type.clone(),
                param_value,
            })
        })
        .collect()
}

/// Reporting API operations.
#[derive(Clone, Copy)]
pub struct ReportingApi<'a> {
    client: &'a SscClient,
}

impl<'a> ReportingApi<'a> {
    #[must_use]
    pub fn new(client: &'a SscClient) -> Self {
        Self { client }
    }

    /// Find the report definition with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::NotFound`] unless exactly one definition matches.
    pub async fn find_report_definition(&self, name: &str) -> Result<ReportDefinition, SscError> {
        let query = format!("name:{name}");
        let mut definitions: Vec<ReportDefinition> = self
            .client
            .get_data("/reportDefinitions", &[("q", query.as_str())])
            .await?;

        if definitions.len() != 1 {
            return Err(SscError::NotFound(format!(
                "Could not find a unique '{name}' report definition on the server ({} matches)",
                definitions.len()
            )));
        }
        let definition = definitions.remove(0);
        debug!(
            "Report definition '{}' (id {}) has {} parameters",
            definition.name,
            definition.id,
            definition.parameters.len()
        );
        Ok(definition)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_saved_report(
        &self,
        request: &SavedReportRequest,
    ) -> Result<SavedReport, SscError> {
        let report: SavedReport = self.client.post_data("/reports", request).await?;
        info!("📊 Saved report '{}' submitted (id {})", report.name, report.id);
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_saved_report(&self, report_id: u64) -> Result<SavedReport, SscError> {
        self.client
            .get_data(&format!("/reports/{report_id}"), &[])
            .await
    }

    /// Poll a saved report until processing completes.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::JobFailed`] if processing fails.
    pub async fn wait_for_report(
        &self,
        report_id: u64,
        interval: Duration,
    ) -> Result<SavedReport, SscError> {
        let label = format!("report {report_id}");
        poll_until_terminal(&label, || self.get_saved_report(report_id), interval).await
    }
}
