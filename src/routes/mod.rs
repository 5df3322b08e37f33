//! HTTP routes for Turnstile

pub mod check;
pub mod health;
pub mod tokens;

pub use check::{handle_check_api_key, handle_check_user_api_key, handle_check_user_pass};
pub use health::{health_check, version_info};
pub use tokens::{handle_register_new_exp_token, handle_register_new_token};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode, Uri};
use serde::{de::DeserializeOwned, Serialize};

use crate::types::{Result, TurnstileError};

pub type FullBody = Full<Bytes>;

fn with_json_headers(status: StatusCode, body: String) -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    match serde_json::to_string(body) {
        Ok(json) => with_json_headers(status, json),
        Err(e) => error_response(TurnstileError::Internal(format!(
            "Response serialization failed: {}",
            e
        ))),
    }
}

/// `{"error": {"code", "reason", "details"}}` with the error's status
pub fn error_response(err: TurnstileError) -> Response<FullBody> {
    let (status, body) = err.into_status_code_and_body();
    with_json_headers(status, body)
}

/// Read the whole body and decode it as JSON
pub async fn parse_json_body<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: std::fmt::Display,
{
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| TurnstileError::InvalidInput(format!("Invalid body: {}", e)))?
        .to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode the query string; a missing query decodes like an empty one
pub fn parse_query<T: DeserializeOwned>(uri: &Uri) -> Result<T> {
    serde_urlencoded::from_str(uri.query().unwrap_or(""))
        .map_err(|e| TurnstileError::InvalidInput(format!("Invalid query: {}", e)))
}
