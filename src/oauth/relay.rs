//! Stateless relay of OAuth authorization-code exchanges.
//!
//! Both operations are pure forwarding: the downstream authorization server
//! stays the single source of truth for token semantics, so downstream
//! responses (including error bodies) are returned to the caller verbatim.
//! The relay validates only that the parameters OAuth requires are present.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::Form;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Redirect, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::config::RelayConfig;
use crate::server::AppState;

/// Rejected or failed relay operation.
#[derive(Debug)]
pub enum RelayRequestError {
    /// Malformed or incomplete OAuth input; surfaced as a 400 and never retried.
    InvalidRequest(String),
    /// Transport-level failure reaching the downstream authorization server.
    Downstream(String),
}

impl fmt::Display for RelayRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(description) => write!(f, "Invalid request: {}", description),
            Self::Downstream(message) => write!(f, "Downstream unavailable: {}", message),
        }
    }
}

impl std::error::Error for RelayRequestError {}

impl IntoResponse for RelayRequestError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidRequest(description) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_request",
                    "error_description": description,
                })),
            )
                .into_response(),
            Self::Downstream(message) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "downstream_unavailable",
                    "error_description": message,
                })),
            )
                .into_response(),
        }
    }
}

/// Downstream token response relayed to the caller verbatim.
#[derive(Debug)]
pub struct TokenRelayResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Vec<u8>,
}

impl IntoResponse for TokenRelayResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        if let Some(content_type) = self.content_type {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        response
    }
}

/// Forwards authorize and token requests to the downstream authorization server.
pub struct OAuthRelay {
    http: reqwest::Client,
    authorization_endpoint: Url,
    token_endpoint: Url,
}

impl OAuthRelay {
    pub fn new(config: &RelayConfig) -> Self {
        Self::from_endpoints(
            config.authorization_endpoint.clone(),
            config.token_endpoint.clone(),
        )
    }

    fn from_endpoints(authorization_endpoint: Url, token_endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            authorization_endpoint,
            token_endpoint,
        }
    }

    /// Build the downstream authorization URL for an inbound authorize request.
    ///
    /// Requires `client_id`, `redirect_uri`, and `state`. All inbound
    /// parameters are preserved (the downstream server decides what it
    /// accepts) and `response_type` is defaulted to `"code"` when absent.
    pub fn authorize_redirect(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Url, RelayRequestError> {
        for required in ["client_id", "redirect_uri", "state"] {
            if !params.contains_key(required) {
                return Err(RelayRequestError::InvalidRequest(format!(
                    "missing required parameter: {required}"
                )));
            }
        }

        let mut target = self.authorization_endpoint.clone();
        {
            let mut query = target.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            if !params.contains_key("response_type") {
                query.append_pair("response_type", "code");
            }
        }

        Ok(target)
    }

    /// Forward an inbound token request to the downstream token endpoint.
    ///
    /// Requires `client_id` and `client_secret`, plus `code` when the grant
    /// type is `authorization_code`. The body is re-encoded as
    /// form-urlencoded and the downstream status and body come back verbatim.
    pub async fn forward_token_request(
        &self,
        form: &BTreeMap<String, String>,
    ) -> Result<TokenRelayResponse, RelayRequestError> {
        for required in ["client_id", "client_secret"] {
            if !form.contains_key(required) {
                return Err(RelayRequestError::InvalidRequest(format!(
                    "missing required parameter: {required}"
                )));
            }
        }
        if form.get("grant_type").map(String::as_str) == Some("authorization_code")
            && !form.contains_key("code")
        {
            return Err(RelayRequestError::InvalidRequest(
                "missing required parameter: code".to_string(),
            ));
        }

        debug!(endpoint = %self.token_endpoint, "Forwarding token exchange downstream");

        let response = self
            .http
            .post(self.token_endpoint.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| RelayRequestError::Downstream(e.to_string()))?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayRequestError::Downstream(e.to_string()))?
            .to_vec();

        Ok(TokenRelayResponse {
            status,
            content_type,
            body,
        })
    }
}

/// `GET /authorize` — redirect the caller to the downstream authorization endpoint.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Redirect, RelayRequestError> {
    let target = state.relay.authorize_redirect(&params)?;
    Ok(Redirect::temporary(target.as_str()))
}

/// `POST /token` — forward the exchange and relay the downstream response.
pub async fn token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Result<TokenRelayResponse, RelayRequestError> {
    state.relay.forward_token_request(&form).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn relay_with_token_endpoint(server_uri: &str) -> OAuthRelay {
        OAuthRelay::from_endpoints(
            Url::parse("https://id.example.com/oauth/authorize").unwrap(),
            Url::parse(&format!("{server_uri}/oauth/token")).unwrap(),
        )
    }

    fn authorize_params() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("client_id".to_string(), "client-1".to_string()),
            ("redirect_uri".to_string(), "https://app.example.com/cb".to_string()),
            ("state".to_string(), "xyz".to_string()),
        ])
    }

    fn token_form() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), "abc".to_string()),
            ("redirect_uri".to_string(), "https://x".to_string()),
            ("client_id".to_string(), "id".to_string()),
            ("client_secret".to_string(), "sec".to_string()),
        ])
    }

    #[test]
    fn test_authorize_redirect_preserves_parameters() {
        let relay = relay_with_token_endpoint("https://id.example.com");
        let mut params = authorize_params();
        params.insert("scope".to_string(), "read write".to_string());

        let target = relay.authorize_redirect(&params).unwrap();

        assert!(target.as_str().starts_with("https://id.example.com/oauth/authorize?"));
        let pairs: BTreeMap<String, String> = target
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-1"));
        assert_eq!(
            pairs.get("redirect_uri").map(String::as_str),
            Some("https://app.example.com/cb")
        );
        assert_eq!(pairs.get("state").map(String::as_str), Some("xyz"));
        assert_eq!(pairs.get("scope").map(String::as_str), Some("read write"));
        assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
    }

    #[test]
    fn test_authorize_keeps_explicit_response_type() {
        let relay = relay_with_token_endpoint("https://id.example.com");
        let mut params = authorize_params();
        params.insert("response_type".to_string(), "code id_token".to_string());

        let target = relay.authorize_redirect(&params).unwrap();
        let response_types: Vec<String> = target
            .query_pairs()
            .filter(|(k, _)| k == "response_type")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(response_types, vec!["code id_token".to_string()]);
    }

    #[test]
    fn test_authorize_rejects_missing_parameters() {
        let relay = relay_with_token_endpoint("https://id.example.com");
        for missing in ["client_id", "redirect_uri", "state"] {
            let mut params = authorize_params();
            params.remove(missing);
            match relay.authorize_redirect(&params) {
                Err(RelayRequestError::InvalidRequest(description)) => {
                    assert!(description.contains(missing));
                }
                other => panic!("expected InvalidRequest for missing {missing}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_token_round_trip_forwards_all_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("redirect_uri=https%3A%2F%2Fx"))
            .and(body_string_contains("client_id=id"))
            .and(body_string_contains("client_secret=sec"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok_fresh",
                "token_type": "bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let relay = relay_with_token_endpoint(&server.uri());
        let relayed = relay.forward_token_request(&token_form()).await.unwrap();

        assert_eq!(relayed.status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&relayed.body).unwrap();
        assert_eq!(body["access_token"], "tok_fresh");
    }

    #[tokio::test]
    async fn test_token_relays_downstream_errors_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let relay = relay_with_token_endpoint(&server.uri());
        let relayed = relay.forward_token_request(&token_form()).await.unwrap();

        assert_eq!(relayed.status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&relayed.body).unwrap();
        assert_eq!(body["error"], "invalid_grant");
    }

    #[tokio::test]
    async fn test_token_rejects_missing_client_secret_without_forwarding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let relay = relay_with_token_endpoint(&server.uri());
        let mut form = token_form();
        form.remove("client_secret");

        match relay.forward_token_request(&form).await {
            Err(RelayRequestError::InvalidRequest(description)) => {
                assert!(description.contains("client_secret"));
            }
            _ => panic!("expected InvalidRequest"),
        }
    }

    #[tokio::test]
    async fn test_token_requires_code_for_authorization_code_grant() {
        let relay = relay_with_token_endpoint("https://id.example.com");
        let mut form = token_form();
        form.remove("code");

        match relay.forward_token_request(&form).await {
            Err(RelayRequestError::InvalidRequest(description)) => {
                assert!(description.contains("code"));
            }
            _ => panic!("expected InvalidRequest"),
        }
    }

    #[tokio::test]
    async fn test_token_forwards_other_grant_types_without_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t"})))
            .expect(1)
            .mount(&server)
            .await;

        let relay = relay_with_token_endpoint(&server.uri());
        let mut form = token_form();
        form.remove("code");
        form.insert("grant_type".to_string(), "client_credentials".to_string());

        let relayed = relay.forward_token_request(&form).await.unwrap();
        assert_eq!(relayed.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_surfaces_unreachable_downstream() {
        let relay = relay_with_token_endpoint("http://127.0.0.1:9");
        let result = relay.forward_token_request(&token_form()).await;
        assert!(matches!(result, Err(RelayRequestError::Downstream(_))));
    }
}
