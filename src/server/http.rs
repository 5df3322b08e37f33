//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection. Every request is
//! dispatched by method and path; failures become the JSON error envelope.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{AccessGate, AuthContext, CredentialValidator, PasswordValidator, TokenIssuer};
use crate::config::Args;
use crate::routes::{self, json_response, FullBody};
use crate::store::CredentialStore;
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub ctx: AuthContext,
    pub issuer: TokenIssuer,
    pub credentials: CredentialValidator,
    pub passwords: PasswordValidator,
    pub gate: AccessGate,
}

impl AppState {
    /// Wire every component to `store` using the deadlines and options in
    /// `args`
    pub fn new(args: Args, store: Arc<dyn CredentialStore>) -> Self {
        let ctx = AuthContext::new(store).with_store_timeout(args.store_timeout());
        Self::with_context(args, ctx)
    }

    /// Same as [`new`](Self::new) with a caller-built context (custom clock)
    pub fn with_context(args: Args, ctx: AuthContext) -> Self {
        let credentials = CredentialValidator::new(ctx.clone());
        Self {
            issuer: TokenIssuer::new(ctx.clone()).with_label(args.token_label.clone()),
            passwords: PasswordValidator::new(ctx.clone())
                .with_migration(args.migrate_legacy_hashes),
            gate: AccessGate::new(credentials.clone()),
            credentials,
            ctx,
            args,
        }
    }
}

/// Accept connections until the listener fails to bind
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Turnstile listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move {
                            debug!("[{}] {} {}", addr, req.method(), req.uri().path());
                            Ok::<_, Infallible>(handle_request(&state, req).await)
                        }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route one request
pub async fn handle_request<B>(state: &AppState, req: Request<B>) -> Response<FullBody>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(state).await
        }
        (Method::GET, "/version") => routes::version_info(),

        (Method::POST, "/check-api-key") => routes::handle_check_api_key(state, req).await,
        (Method::POST, "/check-user-api-key") => {
            routes::handle_check_user_api_key(state, req).await
        }
        (Method::POST, "/check-user-pass") => routes::handle_check_user_pass(state, req).await,

        (Method::GET, "/register-new-token") => {
            routes::handle_register_new_token(state, req).await
        }
        (Method::GET, "/register-new-exp-token") => {
            routes::handle_register_new_exp_token(state, req).await
        }

        (Method::OPTIONS, _) => preflight_response(),

        _ => not_found_response(&path),
    }
}

fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Authorization, Content-Type"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

fn not_found_response(path: &str) -> Response<FullBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &json!({
            "error": {
                "code": 404,
                "reason": "ERR_NOT_FOUND",
                "details": format!("no route for {}", path),
            }
        }),
    )
}
