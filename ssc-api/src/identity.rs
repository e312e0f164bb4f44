//! Local users and access control for project versions.

use log::info;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::{SscClient, SscError};

/// Reference to a role by id (`securitylead`, `manager`, `developer`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: String,
}

impl RoleRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

fn serialize_secret<S: Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Request body for `POST /localUsers`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocalUserRequest {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub clear_password: SecretString,
    pub require_password_change: bool,
    pub password_never_expire: bool,
    pub roles: Vec<RoleRef>,
}

/// A local user as returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUser {
    pub id: u64,
    pub user_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// A user or group with access to project versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEntity {
    pub id: u64,
    #[serde(default)]
    pub is_ldap: bool,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub entity_name: Option<String>,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Minimal auth entity reference used when assigning access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEntityRef {
    pub id: u64,
    #[serde(default)]
    pub is_ldap: bool,
}

/// Request body for assigning versions to an auth entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignVersionsRequest {
    pub project_version_ids: Vec<u64>,
}

/// Identity API operations.
#[derive(Clone, Copy)]
pub struct IdentityApi<'a> {
    client: &'a SscClient,
}

impl<'a> IdentityApi<'a> {
    #[must_use]
    pub fn new(client: &'a SscClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_local_user(
        &self,
        request: &CreateLocalUserRequest,
    ) -> Result<LocalUser, SscError> {
        let user: LocalUser = self.client.post_data("/localUsers", request).await?;
        info!("👤 Created local user '{}' (id {})", user.user_name, user.id);
        Ok(user)
    }

    /// Grant a user or group access to the given versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn assign_user_to_versions(
        &self,
        auth_entity_id: u64,
        version_ids: &[u64],
    ) -> Result<(), SscError> {
        let request = AssignVersionsRequest {
            project_version_ids: version_ids.to_vec(),
        };
        self.client
            .post(
                &format!("/authEntities/{auth_entity_id}/projectVersions/action/assign"),
                &request,
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_auth_entities_of_version(
        &self,
        version_id: u64,
    ) -> Result<Vec<AuthEntity>, SscError> {
        self.client
            .get_data(&format!("/projectVersions/{version_id}/authEntities"), &[])
            .await
    }

    /// Replace the set of users/groups with access to a version.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn assign_auth_entities_to_version(
        &self,
        version_id: u64,
        entities: &[AuthEntityRef],
    ) -> Result<Vec<AuthEntity>, SscError> {
        self.client
            .put_data(&format!("/projectVersions/{version_id}/authEntities"), entities)
            .await
    }
}
