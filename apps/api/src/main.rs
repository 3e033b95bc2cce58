mod accounts;
mod applications;
mod config;
mod dashboard;
mod db;
mod errors;
mod groups;
mod invitations;
mod llm_client;
mod matching;
mod memberships;
mod models;
mod pagination;
mod projects;
mod routes;
mod state;
mod suggestions;
#[cfg(test)]
mod test_support;
mod uploads;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::accounts::sessions::SessionStore;
use crate::config::{Config, UploadBackend};
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::suggestions::{KeywordSuggester, LlmSuggester, TechStackSuggester};
use crate::uploads::{LocalUploadStore, S3UploadStore, UploadStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Crewd API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis sessions
    let redis = redis::Client::open(config.redis_url.clone())?;
    let sessions = SessionStore::new(redis, config.session_ttl_seconds);
    info!(
        "Redis session store initialized (ttl: {}s)",
        config.session_ttl_seconds
    );

    // Initialize profile picture storage
    let uploads: Arc<dyn UploadStore> = match &config.upload_backend {
        UploadBackend::S3 => Arc::new(S3UploadStore::new(
            build_s3_client(&config).await,
            config.s3_bucket.clone(),
        )),
        UploadBackend::Local(root) => Arc::new(LocalUploadStore::new(root.clone())),
    };
    info!("Upload store initialized (backend: {})", uploads.backend());

    // Initialize tech-stack suggester (keyword scan unless an API key is set)
    let suggester: Arc<dyn TechStackSuggester> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmSuggester::new(llm))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; tech-stack suggestions use keyword matching");
            Arc::new(KeywordSuggester)
        }
    };

    let state = AppState {
        db,
        sessions,
        uploads,
        suggester,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "crewd-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets under the path, not as subdomains.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
