//! Authentication and authorization for Turnstile
//!
//! Provides:
//! - Token issuance and bearer token validation
//! - Password validation with legacy digest compatibility
//! - Permission tiers and token capabilities
//! - The access gate wrapped around protected operations

pub mod capability;
pub mod clock;
pub mod context;
pub mod credentials;
pub mod digest;
pub mod gate;
pub mod models;
pub mod password;
pub mod permissions;
pub mod token;

pub use capability::Capabilities;
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{AuthContext, DEFAULT_STORE_TIMEOUT};
pub use credentials::CredentialValidator;
pub use digest::{digests_match, generate_salt, password_digest, token_digest, HashDialect};
pub use gate::{check_access, extract_bearer, principal_from, AccessGate, GateStage};
pub use models::{AuthResult, AuthenticationResult, Principal, PrincipalId, Token};
pub use password::{hash_new_password, PasswordValidator};
pub use permissions::Tier;
pub use token::{generate_token, is_valid_token_format, permanent_lifetime, TokenIssuer};
