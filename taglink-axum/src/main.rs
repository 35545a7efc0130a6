use std::sync::Arc;

use clap::Parser;
use taglink::{SqliteRepositoryProvider, Taglink, TaglinkConfig};
use taglink_axum::create_router;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// The Taglink HTTP server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string. When absent the server still starts, but
    /// every endpoint responds 503.
    #[arg(long, env = "TAGLINK_DATABASE_URL")]
    db_url: Option<String>,

    /// Address to listen on
    #[arg(long, env = "TAGLINK_LISTEN", default_value = "0.0.0.0:3000")]
    listen: String,

    /// Base URL magic-link login URLs are built from
    #[arg(long, env = "TAGLINK_APP_URL", default_value = "http://localhost:3000")]
    app_url: String,

    /// Issuer shown in authenticator apps
    #[arg(long, env = "TAGLINK_2FA_ISSUER", default_value = "Taglink")]
    two_factor_issuer: String,

    /// Include magic link URLs in issuance responses (development aid)
    #[arg(long, env = "TAGLINK_EXPOSE_MAGIC_LINKS")]
    expose_magic_links: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,taglink=debug")),
        )
        .init();

    let cli = Cli::parse();

    let taglink = match &cli.db_url {
        Some(url) => {
            let repositories = Arc::new(SqliteRepositoryProvider::connect(url).await?);
            let taglink = Taglink::with_config(
                repositories,
                TaglinkConfig {
                    two_factor_issuer: cli.two_factor_issuer.clone(),
                    app_url: cli.app_url.clone(),
                    ..TaglinkConfig::default()
                },
            );
            taglink.migrate().await?;
            info!("Database migrations completed");
            Some(Arc::new(taglink))
        }
        None => {
            warn!("TAGLINK_DATABASE_URL is not set; all endpoints will respond 503");
            None
        }
    };

    let app = create_router(taglink, cli.expose_magic_links);

    info!("Server starting on {}", cli.listen);
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
