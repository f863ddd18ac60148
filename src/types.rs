//! NewType wrappers for strong typing throughout the relay.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing an arbitrary header value where a credential is expected).

use std::fmt;

/// An opaque bearer credential presented by the calling agent.
///
/// The token grants the caller's downstream privileges for the lifetime of
/// one request. It is held only inside that request's context and is never
/// serialized or persisted; `Debug` is redacted so the value cannot leak
/// through error formatting.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BearerToken(String);

impl BearerToken {
    /// Create a new token from the raw header value (scheme prefix already stripped).
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the inner value as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner String.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the token is the empty string (e.g. a bare `Authorization: Bearer ` header).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for BearerToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BearerToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for BearerToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken(<{} bytes redacted>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_creation() {
        let token = BearerToken::new("tok_abc123");
        assert_eq!(token.as_str(), "tok_abc123");
        assert!(!token.is_empty());
    }

    #[test]
    fn test_bearer_token_from_str_and_string() {
        let token: BearerToken = "tok_abc".into();
        assert_eq!(token.as_str(), "tok_abc");

        let token: BearerToken = String::from("tok_xyz").into();
        assert_eq!(token.as_str(), "tok_xyz");
    }

    #[test]
    fn test_bearer_token_into_inner() {
        let token = BearerToken::new("tok_abc123");
        assert_eq!(token.into_inner(), "tok_abc123");
    }

    #[test]
    fn test_bearer_token_empty() {
        let token = BearerToken::new("");
        assert!(token.is_empty());
    }

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken::new("super-secret-value");
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_bearer_token_equality() {
        assert_eq!(BearerToken::new("a"), BearerToken::new("a"));
        assert_ne!(BearerToken::new("a"), BearerToken::new("b"));
    }
}
