use std::sync::Arc;

use sqlx::PgPool;

use crate::accounts::sessions::SessionStore;
use crate::config::Config;
use crate::suggestions::TechStackSuggester;
use crate::uploads::UploadStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub sessions: SessionStore,
    /// Profile picture storage. S3 by default, local disk with `UPLOAD_BACKEND=local`.
    pub uploads: Arc<dyn UploadStore>,
    /// LLM-backed when `ANTHROPIC_API_KEY` is set, keyword scan otherwise.
    pub suggester: Arc<dyn TechStackSuggester>,
    pub config: Config,
}
