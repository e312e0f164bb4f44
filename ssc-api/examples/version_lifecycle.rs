#![allow(clippy::expect_used)]

use ssc_platform::{CreateVersionOptions, SscClient, SscConfig, VersionAttribute};
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = SscConfig::from_env()?;
    let mut client = SscClient::new(config)?;
    client.initialize().await?;

    // Create, attribute and commit a version in one workflow
    let mut options = CreateVersionOptions::new("Example Application", "1.0");
    options.description = "Created by the version lifecycle example".to_string();
    options.attributes = vec![
        VersionAttribute::with_option(5, "New"),
        VersionAttribute::with_option(6, "Internal"),
        VersionAttribute::with_option(7, "internalnetwork"),
        VersionAttribute::with_option(1, "High"),
    ];
    let version = client.workflow().create_version(options).await?;
    println!("Created version {} (id {})", version.name, version.id);

    // Upload results and wait for processing
    let fpr = std::env::args().nth(1).expect("usage: version_lifecycle <file.fpr>");
    let job_name = client
        .transfer_api()
        .upload_fpr(version.id, Path::new(&fpr))
        .await?;
    let job = client
        .job_api()
        .wait_for_job(&job_name, Duration::from_secs(5))
        .await?;
    println!("Processing job {} ended in {}", job.job_name.as_deref().unwrap_or("?"), job.state);

    // Download the processed artifact again
    if let Some(artifact_id) = job.artifact_id().and_then(|id| id.parse::<u64>().ok()) {
        let path = client
            .transfer_api()
            .download_artifact(artifact_id, "roundtrip.fpr")
            .await?;
        println!("Artifact saved to {}", path.display());
    }

    client.clear_tokens().await?;
    Ok(())
}
