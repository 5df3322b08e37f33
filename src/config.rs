//! Configuration for Turnstile
//!
//! CLI arguments with environment variable fallbacks. A `.env` file is
//! loaded by `main` before parsing.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

use crate::types::TurnstileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Turnstile - bearer token and password verification service
#[derive(Parser, Debug, Clone)]
#[command(name = "turnstile")]
#[command(about = "Issues and verifies bearer tokens and passwords")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:1313")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "turnstile")]
    pub mongodb_db: String,

    /// Deadline for every credential store call, in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value = "3000")]
    pub store_timeout_ms: u64,

    /// Label stored on issued tokens
    #[arg(long, env = "TOKEN_LABEL", default_value = "issued")]
    pub token_label: String,

    /// Rehash passwords accepted through a legacy digest on successful login
    #[arg(
        long,
        env = "MIGRATE_LEGACY_HASHES",
        default_value = "true",
        action = clap::ArgAction::Set
    )]
    pub migrate_legacy_hashes: bool,

    /// Fall back to an in-memory store when MongoDB is unreachable
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), TurnstileError> {
        if self.store_timeout_ms == 0 {
            return Err(TurnstileError::Config(
                "STORE_TIMEOUT_MS must be greater than zero".into(),
            ));
        }

        if self.token_label.trim().is_empty() {
            return Err(TurnstileError::Config("TOKEN_LABEL must not be empty".into()));
        }

        Ok(())
    }
}
