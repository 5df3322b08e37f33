//! Credential check endpoints
//!
//! `/check-api-key`, `/check-user-api-key` and `/check-user-pass` always
//! answer 200 with an `AuthenticationResult`, even when the store is down.
//! Only an unreadable body (400) produces an error envelope.

use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::AuthenticationResult;
use crate::routes::{error_response, json_response, parse_json_body, FullBody};
use crate::server::AppState;
use crate::types::{Result, TurnstileError};

/// Details reported when the credential store could not be reached
pub const STORE_UNAVAILABLE: &str = "store unavailable";

#[derive(Debug, Deserialize)]
pub struct ApiKeyCheckRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "api", alias = "apiKey")]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordCheckRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Fold a check outcome into a yes/no result
pub fn check_result(
    username: &str,
    outcome: Result<AuthenticationResult>,
) -> AuthenticationResult {
    match outcome {
        Ok(result) => result,
        Err(TurnstileError::StoreUnavailable(e)) => {
            warn!("credential check failed, store unavailable: {}", e);
            AuthenticationResult::rejected(username, STORE_UNAVAILABLE)
        }
        Err(e) => {
            warn!(reason = e.reason(), "credential check failed: {}", e);
            AuthenticationResult::rejected(username, e.details())
        }
    }
}

fn respond(username: &str, outcome: Result<AuthenticationResult>) -> Response<FullBody> {
    let result = check_result(username, outcome);
    debug!(validated = result.is_validated(), "{}", result.result.details);
    json_response(StatusCode::OK, &result)
}

/// POST /check-api-key
pub async fn handle_check_api_key<B>(state: &AppState, req: Request<B>) -> Response<FullBody>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body: ApiKeyCheckRequest = match parse_json_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(e),
    };
    respond(
        &body.username,
        state
            .credentials
            .check_api_key(&body.username, &body.token)
            .await,
    )
}

/// POST /check-user-api-key
pub async fn handle_check_user_api_key<B>(state: &AppState, req: Request<B>) -> Response<FullBody>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body: ApiKeyCheckRequest = match parse_json_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(e),
    };
    respond(
        &body.username,
        state
            .credentials
            .check_user_api_key(&body.username, &body.token)
            .await,
    )
}

/// POST /check-user-pass
pub async fn handle_check_user_pass<B>(state: &AppState, req: Request<B>) -> Response<FullBody>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body: PasswordCheckRequest = match parse_json_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(e),
    };
    respond(
        &body.username,
        state
            .passwords
            .validate(&body.username, &body.password)
            .await,
    )
}
