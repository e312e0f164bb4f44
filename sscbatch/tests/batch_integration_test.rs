//! Integration tests for batch runs against a mock SSC server
//!
//! These tests validate that:
//! - every CSV entry gets exactly one call and one summary record
//! - a failing version does not stop the rest of the run
//! - the payload is sent unchanged to every version

use clap::Parser;
use serde_json::json;
use ssc_platform::{SscClient, SscConfig};
use sscbatch::Cli;
use sscbatch::commands::{BatchPlan, dispatch};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn session_client(server: &MockServer) -> SscClient {
    Mock::given(method("POST"))
        .and(path("/ssc/api/v1/tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 1, "token": "batch-session" }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ssc/api/v1/features"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(server)
        .await;

    let config = SscConfig::new(format!("{}/ssc", server.uri()), "admin", "pw");
    let mut client = SscClient::new(config).unwrap();
    client.initialize().await.unwrap();
    client
}

#[cfg(test)]
mod batch_runs {
    use super::*;

    #[tokio::test]
    async fn test_training_batch_isolates_failures() {
        let server = MockServer::start().await;
        let client = session_client(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("versions.csv");
        tokio::fs::write(&csv, "2,3\n4\n").await.unwrap();

        for ok_version in [2, 4] {
            Mock::given(method("POST"))
                .and(path("/ssc/api/v1/projectVersions/action/trainAuditAssistant"))
                .and(body_json(json!({ "projectVersionIds": [ok_version] })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "data": { "message": "Training scheduled", "status": "success" }
                })))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/ssc/api/v1/projectVersions/action/trainAuditAssistant"))
            .and(body_json(json!({ "projectVersionIds": [3] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "message": "Training failed: no audited issues" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cli = Cli::parse_from([
            "sscbatch",
            "--batch-size",
            "2",
            "--csv",
            csv.to_str().unwrap(),
            "batch",
            "send-for-training",
        ]);
        let plan = BatchPlan::prepare(&cli).await.unwrap();

        // Item failures are reported in the summary, not as a run error
        dispatch(&client, &cli, plan).await.unwrap();
    }

    #[tokio::test]
    async fn test_auth_entity_payload_sent_to_every_version() {
        let server = MockServer::start().await;
        let client = session_client(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("versions.csv");
        tokio::fs::write(&csv, "7,8,9").await.unwrap();

        let entities = json!([{ "id": 12, "isLdap": false }, { "id": 9, "isLdap": true }]);
        Mock::given(method("PUT"))
            .and(header("Authorization", "FortifyToken batch-session"))
            .and(body_json(entities.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [ { "id": 12 }, { "id": 9, "isLdap": true } ]
            })))
            .expect(3)
            .mount(&server)
            .await;

        let payload = entities.to_string();
        let cli = Cli::parse_from([
            "sscbatch",
            "--batch-size",
            "1",
            "--csv",
            csv.to_str().unwrap(),
            "batch",
            "assign-auth-entities",
            "--payload",
            payload.as_str(),
        ]);
        let plan = BatchPlan::prepare(&cli).await.unwrap();
        dispatch(&client, &cli, plan).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_entries_do_not_reach_the_server() {
        let server = MockServer::start().await;
        let client = session_client(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("versions.csv");
        tokio::fs::write(&csv, "abc,0,5").await.unwrap();

        Mock::given(method("POST"))
            .and(path("/ssc/api/v1/projectVersions/action/auditByAuditAssistant"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "message": "Prediction scheduled" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cli = Cli::parse_from([
            "sscbatch",
            "--csv",
            csv.to_str().unwrap(),
            "batch",
            "send-for-prediction",
        ]);
        let plan = BatchPlan::prepare(&cli).await.unwrap();
        dispatch(&client, &cli, plan).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_version_list_runs_no_batches() {
        let server = MockServer::start().await;
        let client = session_client(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("versions.csv");
        tokio::fs::write(&csv, " \n,\n").await.unwrap();

        Mock::given(method("POST"))
            .and(path("/ssc/api/v1/projectVersions/action/trainAuditAssistant"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let cli = Cli::parse_from([
            "sscbatch",
            "--csv",
            csv.to_str().unwrap(),
            "batch",
            "send-for-training",
        ]);
        let plan = BatchPlan::prepare(&cli).await.unwrap();
        assert!(plan.as_ref().is_some_and(|plan| plan.items.is_empty()));
        dispatch(&client, &cli, plan).await.unwrap();
    }
}
