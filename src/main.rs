//! Turnstile - bearer token and password verification service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turnstile::{
    config::{Args, LogFormat},
    db::{MongoClient, MongoCredentialStore},
    server::{self, AppState},
    store::{CredentialStore, MemoryStore},
};

fn init_tracing(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("turnstile={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    match args.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_store(args: &Args) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let opened = async {
        let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db, args.store_timeout()).await?;
        MongoCredentialStore::open(client).await
    }
    .await;

    match opened {
        Ok(store) => {
            info!("MongoDB connected successfully");
            Ok(Arc::new(store))
        }
        Err(e) if args.dev_mode => {
            warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
            Ok(Arc::new(MemoryStore::new()))
        }
        Err(e) => Err(anyhow::anyhow!("MongoDB connection failed: {}", e)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Turnstile {}", env!("CARGO_PKG_VERSION"));
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Store timeout: {}ms", args.store_timeout_ms);
    info!("Legacy hash migration: {}", args.migrate_legacy_hashes);

    let store = open_store(&args).await?;
    let state = Arc::new(AppState::new(args, store));

    tokio::select! {
        result = server::run(state) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
