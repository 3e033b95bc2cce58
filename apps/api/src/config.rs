use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Where profile pictures are written.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadBackend {
    S3,
    Local(PathBuf),
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Tech-stack suggestions fall back to keyword matching when unset.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub session_ttl_seconds: u64,
    pub max_upload_bytes: usize,
    pub upload_backend: UploadBackend,
}

const DEFAULT_SESSION_TTL_SECONDS: u64 = 14 * 24 * 60 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            session_ttl_seconds: optional_env("SESSION_TTL_SECONDS", DEFAULT_SESSION_TTL_SECONDS)?,
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            upload_backend: parse_upload_backend(
                std::env::var("UPLOAD_BACKEND").ok().as_deref(),
                std::env::var("UPLOAD_DIR").ok(),
            )?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_upload_backend(backend: Option<&str>, dir: Option<String>) -> Result<UploadBackend> {
    match backend.map(str::trim) {
        None | Some("") | Some("s3") => Ok(UploadBackend::S3),
        Some("local") => Ok(UploadBackend::Local(PathBuf::from(
            dir.unwrap_or_else(|| "static/uploads".to_string()),
        ))),
        Some(other) => bail!("UPLOAD_BACKEND must be 's3' or 'local', got '{other}'"),
    }
}
