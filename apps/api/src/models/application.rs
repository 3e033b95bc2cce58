use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::membership::MemberRole;

/// Lifecycle shared by applications and invitations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("Unknown status '{other}'")),
        }
    }
}

/// A reviewer's answer to a pending application or invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn resulting_status(self) -> RequestStatus {
        match self {
            Decision::Accept => RequestStatus::Accepted,
            Decision::Reject => RequestStatus::Rejected,
        }
    }

    /// Membership the answer grants in the same transaction, if any.
    pub fn grants_membership(self) -> Option<MemberRole> {
        match self {
            Decision::Accept => Some(MemberRole::Member),
            Decision::Reject => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub applicant_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApplicationRow {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending.as_str()
    }
}
