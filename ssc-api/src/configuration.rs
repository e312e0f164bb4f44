//! Server features and configuration groups.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{ApiEnvelope, SscClient, SscError};

/// A server feature flag, as listed by `GET /features`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationProperty {
    pub name: String,
    pub value: Option<String>,
    pub group: Option<String>,
    pub description: Option<String>,
}

/// Properties of one configuration group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationGroup {
    #[serde(default)]
    pub properties: Vec<ConfigurationProperty>,
}

impl ConfigurationGroup {
    /// Value of the named property, if present and set.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.value.as_deref())
    }

    /// Interpret the named property as a boolean flag.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.property(name)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// Configuration API operations.
#[derive(Clone, Copy)]
pub struct ConfigurationApi<'a> {
    client: &'a SscClient,
}

impl<'a> ConfigurationApi<'a> {
    #[must_use]
    pub fn new(client: &'a SscClient) -> Self {
        Self { client }
    }

    /// List server features. Also serves as the session heartbeat.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not initialized or the request fails.
    pub async fn list_features(&self) -> Result<Vec<Feature>, SscError> {
        self.client.get_data("/features", &[]).await
    }

    /// Fetch the properties of a configuration group.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Api`] if the envelope reports a non-200 code, or
    /// any transport/decoding error.
    pub async fn get_configuration(&self, group: &str) -> Result<ConfigurationGroup, SscError> {
        let envelope: ApiEnvelope<ConfigurationGroup> = self
            .client
            .get_envelope("/configuration", &[("group", group)])
            .await?;

        if let Some(code) = envelope.response_code.filter(|code| *code != 200) {
            return Err(SscError::Api {
                status: code,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("Failed to read configuration group {group}")),
            });
        }

        let configuration = envelope.into_data("get configuration")?;
        debug!(
            "Configuration group {group} has {} properties",
            configuration.properties.len()
        );
        Ok(configuration)
    }
}
