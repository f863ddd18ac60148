// Relay configuration resolved from CLI arguments and environment variables.

use anyhow::Result;
use url::Url;

/// Runtime configuration for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind, e.g. "0.0.0.0:8787".
    pub bind: String,
    /// Base URL of the downstream API provider.
    pub downstream_base_url: Url,
    /// Public-facing URL of this relay, echoed in discovery documents.
    pub public_url: Url,
    /// Downstream authorization endpoint the relay redirects callers to.
    pub authorization_endpoint: Url,
    /// Downstream token endpoint the relay forwards exchanges to.
    pub token_endpoint: Url,
    /// Fixed bearer token for single-tenant deployments. When absent, the
    /// relay forwards each caller's own credential instead.
    pub static_token: Option<String>,
}

impl RelayConfig {
    /// Resolve a configuration from raw CLI/env values.
    ///
    /// The downstream OAuth endpoints default to `<downstream>/oauth/authorize`
    /// and `<downstream>/oauth/token` when not given explicitly.
    pub fn resolve(
        bind: String,
        downstream_url: &str,
        public_url: &str,
        authorize_url: Option<&str>,
        token_url: Option<&str>,
        static_token: Option<String>,
    ) -> Result<Self> {
        let downstream_base_url = parse_url("downstream URL", downstream_url)?;
        let public_url = parse_url("public URL", public_url)?;

        let authorization_endpoint = match authorize_url {
            Some(url) => parse_url("authorize URL", url)?,
            None => join_path(&downstream_base_url, "oauth/authorize"),
        };
        let token_endpoint = match token_url {
            Some(url) => parse_url("token URL", url)?,
            None => join_path(&downstream_base_url, "oauth/token"),
        };

        Ok(Self {
            bind,
            downstream_base_url,
            public_url,
            authorization_endpoint,
            token_endpoint,
            static_token,
        })
    }

    /// An endpoint under the relay's public URL, for discovery documents.
    pub fn public_endpoint(&self, path: &str) -> Url {
        join_path(&self.public_url, path)
    }
}

fn parse_url(what: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| anyhow::anyhow!("invalid {} `{}`: {}", what, value, e))
}

/// Append a path segment to a URL, preserving any existing path prefix.
fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}/{}", prefix, path.trim_start_matches('/')));
    url.set_query(None);
    url
}
