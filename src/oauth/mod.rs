//! OAuth 2.0 relay surface: authorize/token forwarding and discovery documents.

mod discovery;
mod relay;

pub use discovery::{
    AuthorizationServerMetadata, ProtectedResourceMetadata, authorization_server_metadata,
    protected_resource_metadata,
};
pub use relay::{OAuthRelay, RelayRequestError, TokenRelayResponse, authorize, token};
