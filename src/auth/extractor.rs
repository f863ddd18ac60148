//! Credential extraction from inbound HTTP requests.

use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::auth::context::RequestContext;
use crate::types::BearerToken;

/// Build the [`RequestContext`] for an inbound request from its header map.
///
/// The sole credential ingress is `Authorization: Bearer <token>`. When the
/// header is present and carries the `Bearer ` scheme, the remainder of the
/// value becomes the context's token; any other shape (missing header, other
/// scheme, non-UTF-8 value) leaves the token absent. Extraction is lenient
/// beyond the scheme-prefix strip: malformed tokens are not rejected here,
/// they surface as a downstream 401 instead.
///
/// This runs exactly once per request, at the server middleware layer,
/// before the request body is dispatched to any handler.
pub fn context_from_headers(headers: &HeaderMap) -> RequestContext {
    let bearer_token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(BearerToken::new);

    RequestContext::new(bearer_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extracts_bearer_token() {
        let headers = headers_with_authorization("Bearer tok_abc123");
        let context = context_from_headers(&headers);
        assert_eq!(
            context.bearer_token().map(|t| t.as_str()),
            Some("tok_abc123")
        );
    }

    #[test]
    fn test_missing_header_leaves_token_absent() {
        let context = context_from_headers(&HeaderMap::new());
        assert!(context.bearer_token().is_none());
    }

    #[test]
    fn test_other_scheme_leaves_token_absent() {
        let headers = headers_with_authorization("Basic dXNlcjpwYXNz");
        let context = context_from_headers(&headers);
        assert!(context.bearer_token().is_none());
    }

    #[test]
    fn test_scheme_is_case_sensitive() {
        let headers = headers_with_authorization("bearer tok_abc123");
        let context = context_from_headers(&headers);
        assert!(context.bearer_token().is_none());
    }

    #[test]
    fn test_token_is_not_normalized() {
        // Lenient extraction: everything after the scheme prefix is the token,
        // whitespace and all.
        let headers = headers_with_authorization("Bearer  tok with spaces ");
        let context = context_from_headers(&headers);
        assert_eq!(
            context.bearer_token().map(|t| t.as_str()),
            Some(" tok with spaces ")
        );
    }

    #[test]
    fn test_bare_scheme_yields_empty_token() {
        // `Authorization: Bearer ` extracts an empty token; the provider
        // refuses to use it, not the extractor.
        let headers = headers_with_authorization("Bearer ");
        let context = context_from_headers(&headers);
        assert_eq!(context.bearer_token().map(|t| t.as_str()), Some(""));
    }
}
