//! Session bootstrap and token cleanup against a mock SSC server.

mod common;

use common::*;
use serde_json::json;
use ssc_platform::{SscClient, SscError, TokenKind};
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[cfg(test)]
mod session {
    use super::*;

    #[tokio::test]
    async fn test_initialize_establishes_session() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let client = initialized_client(&server, dir.path()).await;
        assert!(client.is_initialized());

        // Session-bound calls now carry the FortifyToken header
        let features = client.configuration_api().list_features().await.unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "auditassistant");
    }

    #[tokio::test]
    async fn test_rejected_credentials_fail_with_auth_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path(api_path("/tokens")))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(api_path("/features")))
            .respond_with(envelope(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = SscClient::new(config(&server, dir.path())).unwrap();
        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, SscError::Auth(_)), "got {err:?}");
        assert!(!client.is_initialized());
    }

    #[tokio::test]
    async fn test_failed_heartbeat_discards_session() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        mount_token(&server, "UnifiedLoginToken", SESSION_TOKEN).await;
        Mock::given(method("GET"))
            .and(path(api_path("/features")))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let mut client = SscClient::new(config(&server, dir.path())).unwrap();
        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, SscError::Auth(_)), "got {err:?}");
        assert!(!client.is_initialized());
    }

    #[tokio::test]
    async fn test_session_calls_before_initialize() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let client = SscClient::new(config(&server, dir.path())).unwrap();
        let err = client.job_api().get_job("JOB_ARTIFACTUPLOAD1").await.unwrap_err();
        assert!(matches!(err, SscError::NotInitialized));
    }
}

#[cfg(test)]
mod tokens {
    use super::*;

    #[tokio::test]
    async fn test_generate_purpose_token() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_token(&server, "ReportFileTransferToken", "report-token").await;

        let client = SscClient::new(config(&server, dir.path())).unwrap();
        let token = client
            .generate_token(&TokenKind::ReportFileTransferToken)
            .await
            .unwrap();
        assert_eq!(token.kind, TokenKind::ReportFileTransferToken);
        assert_eq!(token.id, Some(1));
        assert!(token.expires_at > chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_token(&server, "AuditToken", "").await;

        let client = SscClient::new(config(&server, dir.path())).unwrap();
        let err = client.generate_token(&TokenKind::AuditToken).await.unwrap_err();
        assert!(matches!(err, SscError::Token(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_clear_tokens_revokes_all_and_ends_session() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut client = initialized_client(&server, dir.path()).await;

        Mock::given(method("DELETE"))
            .and(path(api_path("/tokens")))
            .and(query_param("all", "true"))
            .and(basic_auth(USERNAME, PASSWORD))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "responseCode": 200 })))
            .expect(1)
            .mount(&server)
            .await;

        client.clear_tokens().await.unwrap();
        assert!(!client.is_initialized());
    }

    #[tokio::test]
    async fn test_clear_tokens_failure_keeps_session() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut client = initialized_client(&server, dir.path()).await;

        Mock::given(method("DELETE"))
            .and(path(api_path("/tokens")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client.clear_tokens().await.unwrap_err();
        assert!(matches!(err, SscError::Token(_)), "got {err:?}");
        assert!(client.is_initialized());
    }
}
