//! Multi-step version and report workflows against a mock server.

mod common;

use common::*;
use serde_json::json;
use ssc_platform::{
    CopyVersionOptions, CreateVersionOptions, ReportFormat, ReportOptions, ReportStatus, SscError,
    VersionAttribute,
};
use std::collections::HashMap;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn version_json(id: u64, committed: bool) -> serde_json::Value {
    json!({
        "id": id,
        "name": "1.0",
        "active": true,
        "committed": committed,
        "project": { "id": 2, "name": "Payments" }
    })
}

async fn mount_create_version(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(api_path("/projectVersions")))
        .and(body_partial_json(json!({
            "name": "1.0",
            "committed": false,
            "project": { "name": "Payments" }
        })))
        .respond_with(envelope(version_json(9, false)))
        .expect(1)
        .mount(server)
        .await;
}

#[cfg(test)]
mod create_version {
    use super::*;

    fn options() -> CreateVersionOptions {
        let mut options = CreateVersionOptions::new("Payments", "1.0");
        options.attributes = vec![VersionAttribute::with_option(5, "New")];
        options
    }

    #[tokio::test]
    async fn test_all_steps_run_in_order() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = initialized_client(&server, dir.path()).await;

        mount_create_version(&server).await;
        Mock::given(method("PUT"))
            .and(path(api_path("/projectVersions/9/attributes")))
            .respond_with(envelope(json!([
                { "attributeDefinitionId": 5, "values": [ { "guid": "New" } ] }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(api_path("/projectVersions/9")))
            .and(body_partial_json(json!({ "committed": true })))
            .respond_with(envelope(version_json(9, true)))
            .expect(1)
            .mount(&server)
            .await;

        let version = client.workflow().create_version(options()).await.unwrap();
        assert_eq!(version.id, 9);
        assert!(version.committed);
    }

    #[tokio::test]
    async fn test_failed_step_stops_the_chain() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = initialized_client(&server, dir.path()).await;

        mount_create_version(&server).await;
        Mock::given(method("PUT"))
            .and(path(api_path("/projectVersions/9/attributes")))
            .respond_with(ResponseTemplate::new(400).set_body_string("unknown attribute"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(api_path("/projectVersions/9")))
            .respond_with(envelope(version_json(9, true)))
            .expect(0)
            .mount(&server)
            .await;

        let err = client.workflow().create_version(options()).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_failed_copy_state_message_is_an_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = initialized_client(&server, dir.path()).await;

        mount_create_version(&server).await;
        Mock::given(method("PUT"))
            .and(path(api_path("/projectVersions/9/attributes")))
            .respond_with(envelope(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(api_path("/projectVersions/9")))
            .respond_with(envelope(version_json(9, true)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api_path("/projectVersions/9/action")))
            .and(body_partial_json(json!({
                "type": "COPY_CURRENT_STATE",
                "values": { "previousProjectVersionId": 4 }
            })))
            .respond_with(envelope(json!({ "message": "Copy state failed: no artifacts" })))
            .expect(1)
            .mount(&server)
            .await;

        let mut options = options();
        options.copy_state_from = Some(4);
        let err = client.workflow().create_version(options).await.unwrap_err();
        assert!(matches!(err, SscError::InvalidResponse(ref m) if m.contains("failed")));
    }

    #[tokio::test]
    async fn test_invalid_name_makes_no_request() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = initialized_client(&server, dir.path()).await;

        Mock::given(method("POST"))
            .and(path(api_path("/projectVersions")))
            .respond_with(envelope(version_json(9, false)))
            .expect(0)
            .mount(&server)
            .await;

        let options = CreateVersionOptions::new("Payments", "   ");
        let err = client.workflow().create_version(options).await.unwrap_err();
        assert!(matches!(err, SscError::Validation(_)), "got {err:?}");
    }
}

#[cfg(test)]
mod copy_version {
    use super::*;

    #[tokio::test]
    async fn test_copy_runs_partial_commit_and_state_copy() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = initialized_client(&server, dir.path()).await;

        mount_create_version(&server).await;
        Mock::given(method("POST"))
            .and(path(api_path("/projectVersions/action/copyFromPartial")))
            .and(body_partial_json(json!({
                "projectVersionId": 9,
                "previousProjectVersionId": 4,
                "copyCustomTags": true
            })))
            .respond_with(envelope(json!({ "message": "Copy from partial completed" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(api_path("/projectVersions/9")))
            .respond_with(envelope(version_json(9, true)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api_path("/projectVersions/action/copyCurrentState")))
            .and(body_partial_json(json!({
                "projectVersionId": 9,
                "previousProjectVersionId": 4
            })))
            .respond_with(envelope(json!({ "message": "Copy current state scheduled" })))
            .expect(1)
            .mount(&server)
            .await;

        let options = CopyVersionOptions {
            name: "1.0".to_string(),
            description: String::new(),
            project_name: "Payments".to_string(),
            project_description: String::new(),
            project_id: Some(2),
            issue_template_id: "Prioritized-HighRisk-Project-Template".to_string(),
            source_version_id: 4,
        };
        let version = client.workflow().copy_version(options).await.unwrap();
        assert_eq!(version.id, 9);
    }
}

#[cfg(test)]
mod report {
    use super::*;

    fn definition() -> serde_json::Value {
        json!([{
            "id": 11,
            "name": "Developer Workbook",
            "parameters": [
                {
                    "name": "Project Version",
                    "identifier": "projectversionid",
                    "type": "SINGLE_PROJECT"
                },
                {
                    "name": "Include Description",
                    "identifier": "includeDescOfKeyThreatCategory",
                    "type": "BOOLEAN"
                },
                {
                    "name": "Filter Set",
                    "identifier": "filterSet",
                    "type": "SINGLE_SELECT_DEFAULT",
                    "reportParameterOptions": [
                        { "order": 1, "reportValue": "quick-view" },
                        { "order": 0, "reportValue": "security-auditor" }
                    ]
                }
            ]
        }])
    }

    fn options() -> ReportOptions {
        ReportOptions {
            name: "weekly".to_string(),
            note: String::new(),
            definition_name: "Developer Workbook".to_string(),
            format: ReportFormat::Pdf,
            project_id: 2,
            version_id: 9,
            boolean_overrides: HashMap::from([(
                "includeDescOfKeyThreatCategory".to_string(),
                true,
            )]),
        }
    }

    #[tokio::test]
    async fn test_generate_report_composes_parameters() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = initialized_client(&server, dir.path()).await;

        Mock::given(method("GET"))
            .and(path(api_path("/reportDefinitions")))
            .and(query_param("q", "name:Developer Workbook"))
            .respond_with(envelope(definition()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api_path("/reports")))
            .and(body_partial_json(json!({
                "reportDefinitionId": 11,
                "format": "PDF",
                "project": { "id": 2, "version": { "id": 9 } },
                "inputReportParameters": [
                    { "identifier": "projectversionid", "paramValue": 9 },
                    { "identifier": "includeDescOfKeyThreatCategory", "paramValue": true },
                    { "identifier": "filterSet", "paramValue": "security-auditor" }
                ]
            })))
            .respond_with(envelope(json!({
                "id": 5,
                "name": "weekly",
                "format": "PDF",
                "status": "PROCESSING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let report = client.workflow().generate_report(options()).await.unwrap();
        assert_eq!(report.id, 5);
        assert_eq!(report.status, ReportStatus::Processing);
        assert_eq!(report.file_name(), "weekly.pdf");
    }

    #[tokio::test]
    async fn test_ambiguous_definition_is_not_found() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = initialized_client(&server, dir.path()).await;

        Mock::given(method("GET"))
            .and(path(api_path("/reportDefinitions")))
            .respond_with(envelope(json!([
                { "id": 11, "name": "Developer Workbook" },
                { "id": 12, "name": "Developer Workbook" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api_path("/reports")))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = client.workflow().generate_report(options()).await.unwrap_err();
        assert!(matches!(err, SscError::NotFound(_)), "got {err:?}");
    }
}
