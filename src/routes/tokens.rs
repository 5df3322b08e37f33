//! Token issuance endpoints
//!
//! Both endpoints require an admin bearer token and a `user_id` naming the
//! principal the new token is for. `/register-new-token` mints a permanent
//! token; `/register-new-exp-token` takes a Go-style `duration`.

use chrono::Duration;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{PrincipalId, Tier};
use crate::routes::{error_response, json_response, parse_query, FullBody};
use crate::server::AppState;
use crate::types::{parse_duration, Result, TurnstileError};

#[derive(Debug, Deserialize)]
struct IssueQuery {
    user_id: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedTokenResponse {
    pub token: String,
    /// RFC 3339
    pub expires: String,
}

fn required_user_id(query: &IssueQuery) -> Result<PrincipalId> {
    let raw = query
        .user_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TurnstileError::InvalidInput("user_id is required".into()))?;
    raw.parse()
        .map_err(|_| TurnstileError::InvalidInput(format!("invalid user_id: {}", raw)))
}

async fn issue<B>(state: &AppState, req: &mut Request<B>, with_duration: bool) -> Result<IssuedTokenResponse> {
    let admin = state.gate.guard(req, Tier::ADMIN).await?;

    let query: IssueQuery = parse_query(req.uri())?;
    let user_id = required_user_id(&query)?;
    let lifetime = if with_duration {
        let raw = query
            .duration
            .as_deref()
            .ok_or_else(|| TurnstileError::InvalidInput("duration is required".into()))?;
        parse_duration(raw)?
    } else {
        Duration::zero()
    };

    let token = state.issuer.issue(user_id, lifetime).await?;
    info!(admin = admin.id, principal = user_id, "token issued over HTTP");

    let expires = token.expiry.to_rfc3339();
    let plaintext = token
        .token
        .ok_or_else(|| TurnstileError::Internal("issued token has no plaintext".into()))?;
    Ok(IssuedTokenResponse {
        token: plaintext,
        expires,
    })
}

fn respond(outcome: Result<IssuedTokenResponse>) -> Response<FullBody> {
    match outcome {
        Ok(issued) => json_response(StatusCode::OK, &issued),
        Err(e) => error_response(e),
    }
}

/// GET /register-new-token?user_id=N
pub async fn handle_register_new_token<B>(state: &AppState, mut req: Request<B>) -> Response<FullBody> {
    respond(issue(state, &mut req, false).await)
}

/// GET /register-new-exp-token?user_id=N&duration=2h45m
pub async fn handle_register_new_exp_token<B>(
    state: &AppState,
    mut req: Request<B>,
) -> Response<FullBody> {
    respond(issue(state, &mut req, true).await)
}
