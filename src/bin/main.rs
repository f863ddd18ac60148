use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use authrelay::{AuthorizationServerMetadata, ProtectedResourceMetadata, RelayConfig};

#[derive(Parser)]
#[command(name = "authrelay")]
#[command(about = "Multi-tenant OAuth authorization relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RelayArgs {
    /// Bind address, e.g. 0.0.0.0:8787
    #[arg(long, default_value = "0.0.0.0:8787", env = "RELAY_BIND")]
    bind: String,
    /// Base URL of the downstream API provider
    #[arg(long, env = "RELAY_DOWNSTREAM_URL")]
    downstream_url: String,
    /// Public-facing URL of this relay, echoed in discovery documents
    #[arg(long, env = "RELAY_PUBLIC_URL")]
    public_url: String,
    /// Downstream authorization endpoint (default: <downstream>/oauth/authorize)
    #[arg(long, env = "RELAY_AUTHORIZE_URL")]
    authorize_url: Option<String>,
    /// Downstream token endpoint (default: <downstream>/oauth/token)
    #[arg(long, env = "RELAY_TOKEN_URL")]
    token_url: Option<String>,
    /// Fixed bearer token for single-tenant deployments. When omitted, each
    /// caller's own credential is forwarded instead.
    #[arg(long, env = "RELAY_STATIC_TOKEN")]
    static_token: Option<String>,
}

impl RelayArgs {
    fn resolve(self) -> Result<RelayConfig> {
        RelayConfig::resolve(
            self.bind,
            &self.downstream_url,
            &self.public_url,
            self.authorize_url.as_deref(),
            self.token_url.as_deref(),
            self.static_token,
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay HTTP server
    Serve {
        #[command(flatten)]
        args: RelayArgs,
    },
    /// Print the resolved configuration and discovery documents
    CheckConfig {
        #[command(flatten)]
        args: RelayArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("authrelay=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { args } => {
            let config = args.resolve()?;
            info!(
                "Starting authorization relay for downstream {}",
                config.downstream_base_url
            );
            authrelay::start_relay(config).await?;
        }
        Commands::CheckConfig { args } => {
            let config = args.resolve()?;

            println!("bind:                   {}", config.bind);
            println!("downstream base URL:    {}", config.downstream_base_url);
            println!("public URL:             {}", config.public_url);
            println!("authorization endpoint: {}", config.authorization_endpoint);
            println!("token endpoint:         {}", config.token_endpoint);
            println!(
                "credential mode:        {}",
                if config.static_token.is_some() {
                    "static"
                } else {
                    "per-request passthrough"
                }
            );
            println!();
            println!(
                "protected resource metadata:\n{}",
                serde_json::to_string_pretty(&ProtectedResourceMetadata::from_config(&config))?
            );
            println!(
                "authorization server metadata:\n{}",
                serde_json::to_string_pretty(&AuthorizationServerMetadata::from_config(&config))?
            );
        }
    }

    Ok(())
}
