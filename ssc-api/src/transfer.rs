//! File transfer through the legacy upload/download servlets.
//!
//! Each transfer authenticates with a single-purpose token passed as the
//! `mat` query parameter rather than with the session token.

use log::{debug, info};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::{Body, multipart};
use secrecy::ExposeSecret;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::token::TokenKind;
use crate::validation::{MAX_SEGMENT_LEN, validate_url_segment};
use crate::{SscClient, SscError};

/// Marker the upload servlet puts in a successful acknowledgement
const UPLOAD_ACK_MARKER: &str = ":code>-10001";

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "files";

/// Extract the artifact upload job id from an upload acknowledgement.
///
/// # Errors
///
/// Returns [`SscError::Upload`] when the body lacks the success marker or
/// the job id. The error carries the server message and the raw body.
pub fn parse_upload_acknowledgement(body: &str) -> Result<String, SscError> {
    if !body.to_lowercase().contains(UPLOAD_ACK_MARKER) {
        let message =
            upload_message(body).unwrap_or_else(|| "upload was not acknowledged".to_string());
        return Err(SscError::Upload {
            message,
            body: body.to_string(),
        });
    }

    let pattern = match Regex::new(r":id>(JOB_ARTIFACTUPLOAD\d+)") {
        Ok(p) => p,
        Err(e) => {
            return Err(SscError::InvalidResponse(format!(
                "Failed to compile job id pattern: {e}"
            )));
        }
    };

    pattern
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|job| job.as_str().to_string())
        .ok_or_else(|| SscError::Upload {
            message: "Response ok but no JOB_ARTIFACTUPLOAD id".to_string(),
            body: body.to_string(),
        })
}

/// Text of the `msg` element of an upload response, if any.
fn upload_message(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_msg = false;
    let mut message = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"msg" => {
                in_msg = true;
            }
            Ok(Event::Text(ref e)) if in_msg => {
                message.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"msg" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    (!message.is_empty()).then_some(message)
}

fn transfer_url(endpoint: &str, params: &[(&str, &str)]) -> Result<Url, SscError> {
    Url::parse_with_params(endpoint, params)
        .map_err(|e| SscError::Config(format!("Invalid transfer URL '{endpoint}': {e}")))
}

/// File transfer API operations.
#[derive(Clone, Copy)]
pub struct TransferApi<'a> {
    client: &'a SscClient,
}

impl<'a> TransferApi<'a> {
    #[must_use]
    pub fn new(client: &'a SscClient) -> Self {
        Self { client }
    }

    /// Upload a result file (FPR) to a version.
    ///
    /// # Arguments
    ///
    /// * `version_id` - Version receiving the results
    /// * `path` - Local file to upload
    ///
    /// # Returns
    ///
    /// The name of the server job processing the upload, e.g.
    /// `JOB_ARTIFACTUPLOAD12345`.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Io`] if the file cannot be read,
    /// [`SscError::Token`] if no upload token can be obtained and
    /// [`SscError::Upload`] if the server does not acknowledge the file.
    pub async fn upload_fpr(&self, version_id: u64, path: &Path) -> Result<String, SscError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SscError::Upload {
                message: format!("Invalid file path {}", path.display()),
                body: String::new(),
            })?
            .to_string();
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        info!("📤 Uploading {file_name} ({length} bytes) to version {version_id}");

        let token = self
            .client
            .generate_token(&TokenKind::UploadFileTransferToken)
            .await?;
        let entity_id = version_id.to_string();
        let url = transfer_url(
            &self.client.config().upload_url,
            &[
                ("mat", token.token.expose_secret()),
                ("entityId", entity_id.as_str()),
            ],
        )?;

        let part = multipart::Part::stream_with_length(Body::from(file), length)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self.client.client().post(url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("Upload response (HTTP {status}): {body}");

        if !status.is_success() {
            return Err(SscError::Upload {
                message: format!("HTTP {status}"),
                body,
            });
        }

        let job_id = parse_upload_acknowledgement(&body)?;
        info!("✅ Upload accepted, processing job {job_id}");
        Ok(job_id)
    }

    /// Download an artifact (uploaded result file) into the download
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Download`] on any transfer or file system failure.
    /// A partially written file is left in place.
    pub async fn download_artifact(
        &self,
        artifact_id: u64,
        file_name: &str,
    ) -> Result<PathBuf, SscError> {
        self.download(
            TokenKind::DownloadFileTransferToken,
            &self.client.config().artifact_download_url,
            artifact_id,
            file_name,
        )
        .await
    }

    /// Download a generated report into the download directory.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Download`] on any transfer or file system failure.
    /// A partially written file is left in place.
    pub async fn download_report(
        &self,
        report_id: u64,
        file_name: &str,
    ) -> Result<PathBuf, SscError> {
        self.download(
            TokenKind::ReportFileTransferToken,
            &self.client.config().report_download_url,
            report_id,
            file_name,
        )
        .await
    }

    async fn download(
        &self,
        kind: TokenKind,
        endpoint: &str,
        id: u64,
        file_name: &str,
    ) -> Result<PathBuf, SscError> {
        let file_name = validate_url_segment(file_name, MAX_SEGMENT_LEN)?;
        let destination = self.client.config().download_dir.join(file_name);
        let failed = |message: String| SscError::Download {
            path: destination.clone(),
            message,
        };

        let token = self.client.generate_token(&kind).await?;
        let id = id.to_string();
        let url = transfer_url(
            endpoint,
            &[("mat", token.token.expose_secret()), ("id", id.as_str())],
        )?;
        debug!("Downloading {kind} target {id} to {}", destination.display());

        let mut response = self
            .client
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(format!("cannot create {}: {e}", parent.display())))?;
        }
        let mut file = tokio::fs::File::create(&destination)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
            file.write_all(&chunk)
                .await
                .map_err(|e| failed(e.to_string()))?;
            written = written.saturating_add(chunk.len() as u64);
        }
        file.flush().await.map_err(|e| failed(e.to_string()))?;

        info!("📥 Downloaded {written} bytes to {}", destination.display());
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPTED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><ns2:UploadResultFileResponse xmlns:ns2="xmlns://www.fortify.com/schema/fws"><ns2:code>-10001</ns2:code><ns2:msg>Background submission succeeded.</ns2:msg><ns2:id>JOB_ARTIFACTUPLOAD12345</ns2:id></ns2:UploadResultFileResponse>"#;

    #[test]
    fn test_acknowledged_upload_yields_job_id() {
        assert_eq!(
            parse_upload_acknowledgement(ACCEPTED).unwrap(),
            "JOB_ARTIFACTUPLOAD12345"
        );
    }

    #[test]
    fn test_job_id_stops_at_last_digit() {
        let body = "...:id>JOB_ARTIFACTUPLOAD12345...:code>-10001...";
        assert_eq!(
            parse_upload_acknowledgement(body).unwrap(),
            "JOB_ARTIFACTUPLOAD12345"
        );
    }

    #[test]
    fn test_job_id_requires_digits() {
        let body = "<a:code>-10001</a:code><a:id>JOB_ARTIFACTUPLOAD</a:id>";
        assert!(matches!(
            parse_upload_acknowledgement(body),
            Err(SscError::Upload { .. })
        ));
    }

    #[test]
    fn test_marker_check_ignores_case() {
        let body = "<A:CODE>-10001</A:CODE><a:id>JOB_ARTIFACTUPLOAD7</a:id>";
        assert_eq!(
            parse_upload_acknowledgement(body).unwrap(),
            "JOB_ARTIFACTUPLOAD7"
        );
    }

    #[test]
    fn test_acknowledged_upload_without_job_id() {
        let body = r#"<ns2:R xmlns:ns2="x"><ns2:code>-10001</ns2:code><ns2:msg>ok</ns2:msg></ns2:R>"#;
        match parse_upload_acknowledgement(body) {
            Err(SscError::Upload { message, body: raw }) => {
                assert!(message.contains("no JOB_ARTIFACTUPLOAD id"));
                assert_eq!(raw, body);
            }
            other => panic!("expected upload error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_upload_reports_server_message() {
        let body = r#"<ns2:R xmlns:ns2="x"><ns2:code>-10400</ns2:code><ns2:msg>Invalid token</ns2:msg></ns2:R>"#;
        match parse_upload_acknowledgement(body) {
            Err(SscError::Upload { message, .. }) => assert_eq!(message, "Invalid token"),
            other => panic!("expected upload error, got {other:?}"),
        }
    }

    #[test]
    fn test_upload_message_absent() {
        assert_eq!(upload_message("not xml at all"), None);
        assert_eq!(upload_message("<a><b>x</b></a>"), None);
    }

    #[test]
    fn test_transfer_url_encodes_token() {
        let url = transfer_url(
            "https://ssc.example.com/ssc/upload/resultFileUpload.html",
            &[("mat", "a+b/c="), ("entityId", "3")],
        )
        .unwrap();
        assert_eq!(url.query(), Some("mat=a%2Bb%2Fc%3D&entityId=3"));
    }
}
