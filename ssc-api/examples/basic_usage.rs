#![allow(clippy::expect_used)]

use ssc_platform::{SscClient, SscConfig, TokenKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SscConfig::new(
        std::env::var("SSC_URL").expect("SSC_URL environment variable required"),
        std::env::var("SSC_USERNAME").expect("SSC_USERNAME environment variable required"),
        std::env::var("SSC_PASSWORD").expect("SSC_PASSWORD environment variable required"),
    )
    .with_download_dir("downloads");

    // Create client and open a session
    let mut client = SscClient::new(config)?;
    client.initialize().await?;

    // Server features double as a connectivity check
    let features = client.configuration_api().list_features().await?;
    println!("Server exposes {} features", features.len());

    // Audit Assistant status
    let aa = client
        .configuration_api()
        .get_configuration("auditassistant")
        .await?;
    println!(
        "Audit Assistant enabled: {}",
        aa.is_enabled("auditassistant.enabled")
    );

    // Purpose-scoped token, e.g. for a CI job
    let token = client
        .generate_token(&TokenKind::AnalysisDownloadToken)
        .await?;
    println!("Generated {} valid until {}", token.kind, token.expires_at);

    // Revoke every token of this user, including the session
    client.clear_tokens().await?;
    Ok(())
}
