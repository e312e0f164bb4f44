//! Registry of per-version actions that can be run in batches.
use crate::error::{CliError, Result};
use log::{debug, warn};
use serde_json::Value;
use ssc_platform::validation::parse_entity_id;
use ssc_platform::{AuthEntityRef, SscClient, SscError, VersionAttribute};
use std::fmt;
use std::str::FromStr;

/// An action applied to every version id of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    /// Send audited issues to Audit Assistant for training
    SendForTraining,
    /// Request Audit Assistant predictions
    SendForPrediction,
    /// Replace attribute values, payload is a list of version attributes
    AssignAttribute,
    /// Grant access, payload is a list of `{ "id", "isLdap" }` entities
    AssignAuthEntities,
}

impl BatchAction {
    pub const NAMES: [&'static str; 4] = [
        "send-for-training",
        "send-for-prediction",
        "assign-attribute",
        "assign-auth-entities",
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchAction::SendForTraining => Self::NAMES[0],
            BatchAction::SendForPrediction => Self::NAMES[1],
            BatchAction::AssignAttribute => Self::NAMES[2],
            BatchAction::AssignAuthEntities => Self::NAMES[3],
        }
    }

    #[must_use]
    pub fn requires_audit_assistant(&self) -> bool {
        matches!(
            self,
            BatchAction::SendForTraining | BatchAction::SendForPrediction
        )
    }

    /// Check the payload once, before any version is touched.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Input`] when a payload is required but missing,
    /// or does not have the expected shape.
    pub fn validate_payload(&self, payload: Option<&Value>) -> Result<()> {
        match (self, payload) {
            (BatchAction::AssignAttribute, Some(value)) => {
                let attributes: Vec<VersionAttribute> = serde_json::from_value(value.clone())
                    .map_err(|e| self.bad_payload(&e.to_string()))?;
                if attributes.is_empty() {
                    return Err(self.bad_payload("attribute list is empty"));
                }
                Ok(())
            }
            (BatchAction::AssignAuthEntities, Some(value)) => {
                let entities: Vec<AuthEntityRef> = serde_json::from_value(value.clone())
                    .map_err(|e| self.bad_payload(&e.to_string()))?;
                if entities.is_empty() {
                    return Err(self.bad_payload("entity list is empty"));
                }
                Ok(())
            }
            (BatchAction::AssignAttribute | BatchAction::AssignAuthEntities, None) => {
                Err(self.bad_payload("--payload is required"))
            }
            (_, Some(_)) => {
                warn!("Payload is ignored by {self}");
                Ok(())
            }
            (_, None) => Ok(()),
        }
    }

    fn bad_payload(&self, reason: &str) -> CliError {
        CliError::Input(format!("Invalid payload for {self}: {reason}"))
    }

    /// Run the action for one version id and describe the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error of the failed call; an unparsable id fails without
    /// a request.
    pub async fn execute(
        self,
        client: &SscClient,
        version_id: &str,
        payload: Option<&Value>,
    ) -> std::result::Result<String, SscError> {
        let version_id = parse_entity_id(version_id)?;

        if self.requires_audit_assistant() && client.config().skip_audit_assistant {
            debug!("Audit Assistant disabled, skipping {self} for version {version_id}");
            return Ok("skipped".to_string());
        }

        let projects = client.project_version_api();
        match self {
            BatchAction::SendForTraining => {
                let response = projects.send_for_training(version_id).await?;
                Ok(response.status.or(response.message).unwrap_or_else(|| "OK".to_string()))
            }
            BatchAction::SendForPrediction => {
                let response = projects.send_for_prediction(version_id).await?;
                Ok(response.status.or(response.message).unwrap_or_else(|| "OK".to_string()))
            }
            BatchAction::AssignAttribute => {
                let attributes: Vec<VersionAttribute> =
                    serde_json::from_value(payload.cloned().unwrap_or_default())?;
                let updated = projects.assign_attributes(version_id, &attributes).await?;
                Ok(format!("{} attributes updated", updated.len()))
            }
            BatchAction::AssignAuthEntities => {
                let entities: Vec<AuthEntityRef> =
                    serde_json::from_value(payload.cloned().unwrap_or_default())?;
                let assigned = client
                    .identity_api()
                    .assign_auth_entities_to_version(version_id, &entities)
                    .await?;
                Ok(format!("{} auth entities assigned", assigned.len()))
            }
        }
    }
}

impl fmt::Display for BatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchAction {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "send-for-training" => Ok(BatchAction::SendForTraining),
            "send-for-prediction" => Ok(BatchAction::SendForPrediction),
            "assign-attribute" => Ok(BatchAction::AssignAttribute),
            "assign-auth-entities" => Ok(BatchAction::AssignAuthEntities),
            _ => Err(CliError::UnknownAction(s.to_string())),
        }
    }
}
