//! Turnstile - bearer token and password verification
//!
//! Issues bearer tokens, resolves them to principals, checks passwords
//! against current and legacy digests, and gates protected operations by
//! permission tier.
//!
//! ## Components
//!
//! - **Token Issuer**: mints `EST<uuid>ARY` tokens, stored by digest only
//! - **Credential Validator**: token lookup, expiry and owner resolution
//! - **Password Validator**: Argon2id digests with legacy SHA-256, bcrypt
//!   and unsalted fallbacks, migrated on successful login
//! - **Access Gate**: `Authorization: Bearer` extraction and tier checks
//! - **Credential Store**: MongoDB in production, in-memory for tests

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TurnstileError};
