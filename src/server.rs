//! HTTP server wiring for the relay.
//!
//! Builds the axum router: OAuth relay routes, discovery documents, health,
//! and a transparent fallback proxy that forwards protocol traffic to the
//! downstream provider with per-caller credentials injected. A middleware
//! layer establishes the request-scoped credential context before any
//! handler runs, so downstream calls at arbitrary depth resolve the right
//! caller's token.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use http::HeaderMap;
use http::header::{AUTHORIZATION, CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::auth::{AuthProvider, context, context_from_headers};
use crate::config::RelayConfig;
use crate::downstream::{
    DownstreamClient, DownstreamError, DownstreamRequest, DownstreamResponse, HttpTransport,
};
use crate::oauth::{self, OAuthRelay};

/// Maximum proxied request body size.
const MAX_PROXY_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Shared state for all relay routes.
pub struct AppState {
    pub config: RelayConfig,
    pub relay: OAuthRelay,
    pub downstream: DownstreamClient,
}

impl AppState {
    /// Build the state from configuration: auth provider selection, the
    /// downstream transport, and the OAuth relay.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let provider = match &config.static_token {
            Some(token) => AuthProvider::static_bearer(token)?,
            None => AuthProvider::context_bound(),
        };
        let transport = HttpTransport::new(config.downstream_base_url.clone());
        let downstream = DownstreamClient::new(Arc::new(transport), provider);
        let relay = OAuthRelay::new(&config);

        Ok(Self {
            config,
            relay,
            downstream,
        })
    }
}

/// Build the relay router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/authorize", get(oauth::authorize))
        .route("/token", post(oauth::token))
        .route(
            "/.well-known/oauth-protected-resource",
            get(oauth::protected_resource_metadata),
        )
        .route(
            "/.well-known/oauth-authorization-server",
            get(oauth::authorization_server_metadata),
        )
        .fallback(proxy_downstream)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        // Outermost layer: the credential context must exist before any
        // other middleware or handler touches the request.
        .layer(middleware::from_fn(request_scope_layer))
        .with_state(state)
}

/// Start the relay HTTP server and block until it exits.
pub async fn start_relay(config: RelayConfig) -> Result<()> {
    let mode = if config.static_token.is_some() {
        "static credentials"
    } else {
        "per-request passthrough"
    };

    let state = Arc::new(AppState::new(config)?);
    let router = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&state.config.bind).await?;

    tracing::info!(
        "Authorization relay listening on http://{} ({}, downstream {})",
        state.config.bind,
        mode,
        state.config.downstream_base_url
    );

    axum::serve(listener, router).await?;

    Ok(())
}

/// Establish the request-scoped credential context.
///
/// Extraction happens exactly once per request, before the body is
/// dispatched to any handler; the rest of the request future runs inside
/// the context's extent, which ends when the response is produced.
async fn request_scope_layer(request: Request, next: Next) -> Response {
    let context = context_from_headers(request.headers());
    debug!(
        request_id = %context.request_id(),
        authenticated = context.bearer_token().is_some(),
        "Established request context"
    );
    context::scope(context, next.run(request)).await
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Transparent proxy for protocol traffic.
///
/// Any route the relay does not own is forwarded to the downstream provider
/// through the authenticated call wrapper, which injects the current
/// provider's credentials and applies the auth-failure retry policy.
async fn proxy_downstream(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let method = request.method().clone();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let headers = forwardable_headers(request.headers());

    let body = match axum::body::to_bytes(request.into_body(), MAX_PROXY_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "payload_too_large" })),
            )
                .into_response();
        }
    };

    let mut downstream_request =
        DownstreamRequest::new(method, path_and_query).with_headers(headers);
    if !body.is_empty() {
        downstream_request = downstream_request.with_body(body.to_vec());
    }

    match state.downstream.call(downstream_request).await {
        Ok(response) => relay_response(response),
        Err(DownstreamError::CredentialUnavailable) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "credential_unavailable",
                "error_description": "Request carried no usable bearer credential",
            })),
        )
            .into_response(),
        // Auth rejections pass through with the downstream status and body
        // unchanged; the caller owns token refresh.
        Err(DownstreamError::AuthenticationRejected(response)) => relay_response(response),
        Err(DownstreamError::Unavailable(message)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "downstream_unavailable",
                "error_description": message,
            })),
        )
            .into_response(),
    }
}

/// Inbound headers safe to forward downstream. Hop-by-hop headers and the
/// caller's `Authorization` are dropped; the auth provider owns outbound
/// credentials.
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let skip = [
        HOST,
        AUTHORIZATION,
        CONTENT_LENGTH,
        CONNECTION,
        TRANSFER_ENCODING,
    ];
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers {
        if skip.contains(name) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

/// Relay a downstream response to the caller, body and status verbatim.
fn relay_response(response: DownstreamResponse) -> Response {
    let skip = [CONTENT_LENGTH, CONNECTION, TRANSFER_ENCODING];
    let mut relayed = (response.status, response.body).into_response();
    for (name, value) in &response.headers {
        if skip.contains(name) {
            continue;
        }
        relayed.headers_mut().insert(name.clone(), value.clone());
    }
    relayed
}
