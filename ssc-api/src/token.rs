//! Token lifecycle: session bootstrap, purpose-scoped tokens and cleanup.
//!
//! Token operations authenticate with the configured username/password.
//! Everything else uses the session token obtained by
//! [`SscClient::initialize`].

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use log::{debug, error, info};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::ValidationError;
use crate::{SscClient, SscError};

const TOKEN_DESCRIPTION: &str = "Generated by ssc-platform";

/// Token types understood by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    AnalysisDownloadToken,
    AnalysisUploadToken,
    AuditToken,
    UploadFileTransferToken,
    DownloadFileTransferToken,
    ReportFileTransferToken,
    CloudCtrlToken,
    CloudOneTimeJobToken,
    WIESystemToken,
    WIEUserToken,
    UnifiedLoginToken,
    ReportToken,
    PurgeProjectVersionToken,
    /// Server-defined type not known to this client
    Custom(String),
}

impl TokenKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            TokenKind::AnalysisDownloadToken => "AnalysisDownloadToken",
            TokenKind::AnalysisUploadToken => "AnalysisUploadToken",
            TokenKind::AuditToken => "AuditToken",
            TokenKind::UploadFileTransferToken => "UploadFileTransferToken",
            TokenKind::DownloadFileTransferToken => "DownloadFileTransferToken",
            TokenKind::ReportFileTransferToken => "ReportFileTransferToken",
            TokenKind::CloudCtrlToken => "CloudCtrlToken",
            TokenKind::CloudOneTimeJobToken => "CloudOneTimeJobToken",
            TokenKind::WIESystemToken => "WIESystemToken",
            TokenKind::WIEUserToken => "WIEUserToken",
            TokenKind::UnifiedLoginToken => "UnifiedLoginToken",
            TokenKind::ReportToken => "ReportToken",
            TokenKind::PurgeProjectVersionToken => "PurgeProjectVersionToken",
            TokenKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim() {
            "" => return Err(ValidationError::EmptyName("token type")),
            "AnalysisDownloadToken" => TokenKind::AnalysisDownloadToken,
            "AnalysisUploadToken" => TokenKind::AnalysisUploadToken,
            "AuditToken" => TokenKind::AuditToken,
            "UploadFileTransferToken" => TokenKind::UploadFileTransferToken,
            "DownloadFileTransferToken" => TokenKind::DownloadFileTransferToken,
            "ReportFileTransferToken" => TokenKind::ReportFileTransferToken,
            "CloudCtrlToken" => TokenKind::CloudCtrlToken,
            "CloudOneTimeJobToken" => TokenKind::CloudOneTimeJobToken,
            "WIESystemToken" => TokenKind::WIESystemToken,
            "WIEUserToken" => TokenKind::WIEUserToken,
            "UnifiedLoginToken" => TokenKind::UnifiedLoginToken,
            "ReportToken" => TokenKind::ReportToken,
            "PurgeProjectVersionToken" => TokenKind::PurgeProjectVersionToken,
            other => TokenKind::Custom(other.to_string()),
        };
        Ok(kind)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenRequest<'a> {
    #[serde(rename = "type")]
    token_type: &'a str,
    terminal_date: String,
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedToken {
    id: Option<u64>,
    #[serde(default)]
    token: String,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct GeneratedToken {
    pub id: Option<u64>,
    pub kind: TokenKind,
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl SscClient {
    /// Establish the session.
    ///
    /// Requests a `UnifiedLoginToken` with the configured credentials, then
    /// verifies it with a cheap `GET /features` call. On success the token is
    /// cached and used for every subsequent session-bound call; a previous
    /// session is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Auth`] if the credentials are rejected or the
    /// verification call fails.
    pub async fn initialize(&mut self) -> Result<(), SscError> {
        info!(
            "🔐 Initializing session for user '{}' at {}",
            self.config().username,
            self.config().base_url
        );

        let generated = self
            .generate_token(&TokenKind::UnifiedLoginToken)
            .await
            .map_err(|e| SscError::Auth(format!("Unable to obtain session token: {e}")))?;
        self.set_session(generated.token);

        let heartbeat = self.configuration_api().list_features().await;
        match heartbeat {
            Ok(features) => {
                debug!("Heartbeat returned {} features", features.len());
                info!("✅ Session established");
                Ok(())
            }
            Err(e) => {
                self.clear_session();
                error!("❌ Session verification failed: {e}");
                Err(SscError::Auth(format!("Session verification failed: {e}")))
            }
        }
    }

    /// Request a purpose-scoped token valid for one day.
    ///
    /// Independent of the session token; uses basic authentication.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Token`] if the request fails or the response
    /// carries no token.
    pub async fn generate_token(&self, kind: &TokenKind) -> Result<GeneratedToken, SscError> {
        let expires_at = Utc::now() + TimeDelta::days(1);
        let request = CreateTokenRequest {
            token_type: kind.as_str(),
            terminal_date: expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            description: TOKEN_DESCRIPTION,
        };

        let response = self
            .post_basic("/tokens", &request)
            .await
            .map_err(|e| SscError::Token(format!("Failed to generate {kind}: {e}")))?;
        let created: CreatedToken = Self::decode_envelope(response)
            .await
            .and_then(|envelope| envelope.into_data("generate token"))
            .map_err(|e| SscError::Token(format!("Failed to generate {kind}: {e}")))?;

        if created.token.is_empty() {
            return Err(SscError::Token(format!(
                "Server returned an empty {kind}"
            )));
        }

        debug!("Generated {kind} (id {:?}), expires {expires_at}", created.id);
        Ok(GeneratedToken {
            id: created.id,
            kind: kind.clone(),
            token: SecretString::from(created.token),
            expires_at,
        })
    }

    /// Revoke every token owned by the configured user and drop the session.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::NotInitialized`] before `initialize()`, or
    /// [`SscError::Token`] if the server rejects the request.
    pub async fn clear_tokens(&mut self) -> Result<(), SscError> {
        self.ensure_initialized()?;

        self.delete_basic("/tokens", &[("all", "true")])
            .await
            .map_err(|e| SscError::Token(format!("Failed to clear tokens: {e}")))?;
        self.clear_session();
        info!("🧹 Cleared tokens for user '{}'", self.config().username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_round_trip_names() {
        for name in [
            "AnalysisDownloadToken",
            "UploadFileTransferToken",
            "CloudOneTimeJobToken",
            "WIESystemToken",
            "UnifiedLoginToken",
            "PurgeProjectVersionToken",
        ] {
            let kind: TokenKind = name.parse().unwrap();
            assert!(!matches!(kind, TokenKind::Custom(_)), "{name} should be known");
            assert_eq!(kind.to_string(), name);
        }
    }

    #[test]
    fn test_token_kind_custom_and_empty() {
        assert_eq!(
            "FutureToken".parse::<TokenKind>().unwrap(),
            TokenKind::Custom("FutureToken".to_string())
        );
        assert!("  ".parse::<TokenKind>().is_err());
    }

    #[test]
    fn test_create_token_request_shape() {
        let request = CreateTokenRequest {
            token_type: TokenKind::ReportFileTransferToken.as_str(),
            terminal_date: "2026-10-20T10:00:00.000Z".to_string(),
            description: TOKEN_DESCRIPTION,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "ReportFileTransferToken");
        assert_eq!(json["terminalDate"], "2026-10-20T10:00:00.000Z");
        assert_eq!(json["description"], TOKEN_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_clear_tokens_before_initialize() {
        let mut client = SscClient::new(crate::SscConfig::new(
            "https://ssc.example.com/ssc",
            "admin",
            "pw",
        ))
        .unwrap();
        let result = client.clear_tokens().await;
        assert!(matches!(result, Err(SscError::NotInitialized)));
    }
}
