use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::application::RequestStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvitationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InvitationRow {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending.as_str()
    }
}
