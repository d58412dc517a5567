//! Croupier server binary
//!
//! Loads configuration, wires the in-memory store, and runs the API
//! server with the crash round driver.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use croupier::{ApiServer, CroupierConfig, MemoryStore};

#[derive(Parser, Debug)]
#[command(name = "croupier", about = "Casino minigame server", version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Mint a development token for the given user id and exit
    #[arg(long)]
    mint_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "croupier=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CroupierConfig::load(path)?,
        None => CroupierConfig::default(),
    };
    config.apply_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    if let Some(user_id) = args.mint_token {
        let verifier = croupier::auth::TokenVerifier::new(&config.auth.token_secret);
        println!("{}", verifier.mint(&user_id));
        return Ok(());
    }

    info!(
        port = config.server.port,
        starting_credits = config.bank.starting_credits,
        "croupier starting"
    );

    let store = Arc::new(MemoryStore::new(config.bank.starting_credits));
    ApiServer::new(config, store).run().await?;
    Ok(())
}
