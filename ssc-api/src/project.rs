//! Projects (applications), project versions and version attributes.
//!
//! Includes the version-level actions used by the workflows: commit, state
//! copy and the Audit Assistant training/prediction triggers.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{SscClient, SscError};

/// Default issue template for new projects
pub const DEFAULT_ISSUE_TEMPLATE: &str = "Prioritized-HighRisk-Project-Template";

/// A project (application).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub description: Option<String>,
    pub issue_template_id: Option<String>,
}

/// A project version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersion {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub committed: bool,
    pub project: Option<Project>,
    pub issue_template_id: Option<String>,
}

/// Request body for `POST /projectVersions`.
///
/// The embedded project is created on the fly unless it carries the id of
/// an existing project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectVersionRequest {
    pub name: String,
    pub description: String,
    pub active: bool,
    pub committed: bool,
    pub project: Project,
    pub issue_template_id: String,
}

/// Selected option of a multi-value attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub guid: String,
}

/// Attribute value assigned to a version.
///
/// Multi-option attributes use `values`, single-value attributes use `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionAttribute {
    pub attribute_definition_id: u64,
    pub values: Option<Vec<AttributeValue>>,
    pub value: Option<String>,
}

impl VersionAttribute {
    /// Attribute with a single selected option.
    pub fn with_option(attribute_definition_id: u64, guid: impl Into<String>) -> Self {
        Self {
            attribute_definition_id,
            values: Some(vec![AttributeValue { guid: guid.into() }]),
            value: None,
        }
    }

    /// Attribute with a free-form value.
    pub fn with_value(attribute_definition_id: u64, value: impl Into<String>) -> Self {
        Self {
            attribute_definition_id,
            values: None,
            value: Some(value.into()),
        }
    }
}

/// Attribute definition (schema for a version attribute).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl AttributeDefinition {
    /// A non-required free text attribute in the TECHNICAL category.
    pub fn text(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: None,
            guid: None,
            name: name.into(),
            description,
            category: "TECHNICAL".to_string(),
            attribute_type: "TEXT".to_string(),
            required: false,
            hidden: false,
        }
    }
}

/// Payload of action endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub message: Option<String>,
    pub status: Option<String>,
}

impl ActionResponse {
    /// Action endpoints report some failures with a 200 status and a
    /// message containing "failed".
    ///
    /// # Errors
    ///
    /// Returns [`SscError::InvalidResponse`] carrying the server message.
    pub fn ensure_succeeded(self) -> Result<Self, SscError> {
        match self.message.as_deref() {
            Some(message) if message.contains("failed") => {
                Err(SscError::InvalidResponse(message.to_string()))
            }
            _ => Ok(self),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TestResult {
    #[serde(default)]
    found: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionIdsRequest {
    project_version_ids: Vec<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CopyFromPartialRequest {
    project_version_id: u64,
    previous_project_version_id: u64,
    copy_analysis_processing_rules: bool,
    copy_bug_tracker_configuration: bool,
    copy_custom_tags: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CopyCurrentStateRequest {
    project_version_id: u64,
    previous_project_version_id: u64,
}

/// Project and project version API operations.
#[derive(Clone, Copy)]
pub struct ProjectVersionApi<'a> {
    client: &'a SscClient,
}

impl<'a> ProjectVersionApi<'a> {
    #[must_use]
    pub fn new(client: &'a SscClient) -> Self {
        Self { client }
    }

    /// Whether a project with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn test_project(&self, project_name: &str) -> Result<bool, SscError> {
        let result: TestResult = self
            .client
            .post_data(
                "/projects/action/test",
                &serde_json::json!({ "projectName": project_name }),
            )
            .await?;
        Ok(result.found)
    }

    /// Projects whose name matches exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn find_projects(&self, project_name: &str) -> Result<Vec<Project>, SscError> {
        let query = format!("name:\"{project_name}\"");
        self.client.get_data("/projects", &[("q", query.as_str())]).await
    }

    /// Whether `version_name` exists under `project_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn test_project_version(
        &self,
        project_name: &str,
        version_name: &str,
    ) -> Result<bool, SscError> {
        let result: TestResult = self
            .client
            .post_data(
                "/projectVersions/action/test",
                &serde_json::json!({
                    "projectName": project_name,
                    "projectVersionName": version_name,
                }),
            )
            .await?;
        Ok(result.found)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_project_version(&self, version_id: u64) -> Result<ProjectVersion, SscError> {
        self.client
            .get_data(&format!("/projectVersions/{version_id}"), &[])
            .await
    }

    /// Create an uncommitted version (and its project, when new).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_project_version(
        &self,
        request: &CreateProjectVersionRequest,
    ) -> Result<ProjectVersion, SscError> {
        let version: ProjectVersion = self.client.post_data("/projectVersions", request).await?;
        info!(
            "Created project version '{}' (id {})",
            version.name, version.id
        );
        Ok(version)
    }

    /// Replace the attribute values of a version.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn assign_attributes(
        &self,
        version_id: u64,
        attributes: &[VersionAttribute],
    ) -> Result<Vec<VersionAttribute>, SscError> {
        debug!(
            "Assigning {} attributes to version {version_id}",
            attributes.len()
        );
        self.client
            .put_data(&format!("/projectVersions/{version_id}/attributes"), attributes)
            .await
    }

    /// Mark a version as committed, making it usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn commit_project_version(
        &self,
        version_id: u64,
    ) -> Result<ProjectVersion, SscError> {
        self.client
            .put_data(
                &format!("/projectVersions/{version_id}"),
                &serde_json::json!({ "committed": true }),
            )
            .await
    }

    /// Start a background copy of issue state from `source_version_id` via
    /// the version action endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server reports a failed
    /// action.
    pub async fn copy_current_state_action(
        &self,
        version_id: u64,
        source_version_id: u64,
    ) -> Result<ActionResponse, SscError> {
        let action = serde_json::json!({
            "type": "COPY_CURRENT_STATE",
            "values": {
                "projectVersionId": version_id,
                "previousProjectVersionId": source_version_id,
                "copyCurrentStateFpr": true,
            }
        });
        self.action(&format!("/projectVersions/{version_id}/action"), &action)
            .await
    }

    /// Copy processing rules, bug tracker configuration and custom tags
    /// from `source_version_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server reports a failed
    /// action.
    pub async fn copy_from_partial(
        &self,
        version_id: u64,
        source_version_id: u64,
    ) -> Result<ActionResponse, SscError> {
        let request = CopyFromPartialRequest {
            project_version_id: version_id,
            previous_project_version_id: source_version_id,
            copy_analysis_processing_rules: true,
            copy_bug_tracker_configuration: true,
            copy_custom_tags: true,
        };
        self.action("/projectVersions/action/copyFromPartial", &request)
            .await
    }

    /// Copy the current issue state from `source_version_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server reports a failed
    /// action.
    pub async fn copy_current_state(
        &self,
        version_id: u64,
        source_version_id: u64,
    ) -> Result<ActionResponse, SscError> {
        let request = CopyCurrentStateRequest {
            project_version_id: version_id,
            previous_project_version_id: source_version_id,
        };
        self.action("/projectVersions/action/copyCurrentState", &request)
            .await
    }

    /// Send a version's audited issues to Audit Assistant for training.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server reports a failed
    /// action.
    pub async fn send_for_training(&self, version_id: u64) -> Result<ActionResponse, SscError> {
        self.audit_assistant_action("trainAuditAssistant", version_id)
            .await
    }

    /// Ask Audit Assistant to predict audits for a version's issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server reports a failed
    /// action.
    pub async fn send_for_prediction(&self, version_id: u64) -> Result<ActionResponse, SscError> {
        self.audit_assistant_action("auditByAuditAssistant", version_id)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_attribute_definition(
        &self,
        definition: &AttributeDefinition,
    ) -> Result<AttributeDefinition, SscError> {
        let created: AttributeDefinition = self
            .client
            .post_data("/attributeDefinitions", definition)
            .await?;
        info!(
            "Attribute definition '{}' created (id {:?})",
            created.name, created.id
        );
        Ok(created)
    }

    async fn audit_assistant_action(
        &self,
        action: &str,
        version_id: u64,
    ) -> Result<ActionResponse, SscError> {
        debug!("Requesting {action} for version {version_id}");
        let request = VersionIdsRequest {
            project_version_ids: vec![version_id],
        };
        self.action(&format!("/projectVersions/action/{action}"), &request)
            .await
    }

    async fn action<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<ActionResponse, SscError> {
        let value: Value = self.client.post_data(endpoint, body).await?;
        let response: ActionResponse = serde_json::from_value(value).unwrap_or_default();
        response.ensure_succeeded()
    }
}
