//! sscbatch - Fortify SSC batch and workflow harness
use clap::Parser;
use log::error;
use sscbatch::Cli;

#[tokio::main]
async fn main() {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = sscbatch::run(cli).await {
        error!("❌ {e}");
        std::process::exit(1);
    }
}
