//! sscbatch library - batch and workflow runs against Fortify SSC
//!
//! Commands share one lifecycle: build the configuration, check local
//! inputs, open a session, run, then revoke the user's tokens.
pub mod actions;
pub mod cli;
pub mod commands;
pub mod error;
pub mod input;
pub mod summary;

use log::{info, warn};
use ssc_platform::{SscClient, SscConfig};

// Re-export commonly used types
pub use actions::BatchAction;
pub use cli::{Cli, Commands};
pub use error::{CliError, Result};

/// Client configuration from the environment plus command line overrides.
///
/// # Errors
///
/// Returns an error when required environment variables are missing.
pub fn build_config(cli: &Cli) -> Result<SscConfig> {
    let mut config = SscConfig::from_env()?;
    if let Some(dir) = &cli.download_dir {
        config = config.with_download_dir(dir);
    }
    Ok(config)
}

/// Execute one command end to end.
///
/// # Errors
///
/// Returns the first error of configuration, session setup or the command.
/// A failed token cleanup is reported only when the command succeeded.
pub async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let plan = commands::BatchPlan::prepare(&cli).await?;

    let mut client = SscClient::new(config)?;
    client.initialize().await?;

    let outcome = commands::dispatch(&client, &cli, plan).await;

    let revoke = matches!(cli.command, Commands::Cleanup) || !cli.keep_tokens;
    if revoke {
        if let Err(e) = client.clear_tokens().await {
            if outcome.is_ok() {
                return Err(e.into());
            }
            warn!("Token cleanup failed: {e}");
        }
    } else {
        info!("Keeping generated tokens");
    }

    outcome
}
