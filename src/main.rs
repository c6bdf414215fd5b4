use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use novelbug::auth::jwks::kinde_issuer;
use novelbug::auth::{
    IdentityResolver, JwksClient, JwtVerifier, KindeIdentityResolver, TokenVerifier,
};
use novelbug::config::{Cli, Config};
use novelbug::mail::{LogMailer, Mailer, ResendMailer};
use novelbug::state::AppState;
use novelbug::writer::{AgentStoryWriter, DisabledStoryWriter, StoryWriter};
use novelbug::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    // Identity provider
    let domain = config
        .auth
        .kinde_domain
        .clone()
        .ok_or_else(|| anyhow::anyhow!("auth.kinde_domain (or KINDE_DOMAIN) must be set"))?;
    let jwks = Arc::new(JwksClient::for_kinde_domain(&domain)?);
    let access_tokens = Arc::new(JwtVerifier::access_tokens(
        jwks.clone(),
        &kinde_issuer(&domain),
        config.auth.audience.as_deref(),
    ));
    let identity: Arc<dyn IdentityResolver> = Arc::new(KindeIdentityResolver::new(
        access_tokens,
        config.auth.session_cookie.clone(),
    ));
    let webhook_verifier: Arc<dyn TokenVerifier> = Arc::new(JwtVerifier::webhooks(jwks));

    // Email
    let mailer: Arc<dyn Mailer> = match &config.email.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key.clone())?),
        None => {
            tracing::warn!("No Resend API key configured; emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    // Story generation
    let writer: Arc<dyn StoryWriter> = match &config.writer.base_url {
        Some(base_url) => Arc::new(AgentStoryWriter::new(
            base_url,
            &config.writer.agent_id,
            config.writer.api_key.clone(),
            Duration::from_secs(config.writer.timeout_secs),
        )?),
        None => {
            tracing::warn!("No story agent configured; generation is disabled");
            Arc::new(DisabledStoryWriter)
        }
    };

    let state = AppState {
        db: pool,
        config: config.clone(),
        identity,
        webhook_verifier,
        mailer,
        writer,
    };
    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
