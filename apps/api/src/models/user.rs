use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::matching::parse_tech_stack;

/// The hat a user is currently wearing. Users can switch at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Applicant,
    Leader,
    Company,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Applicant => "applicant",
            Role::Leader => "leader",
            Role::Company => "company",
        }
    }

    /// Leaders and companies post projects and review applications.
    pub fn can_post_projects(self) -> bool {
        matches!(self, Role::Leader | Role::Company)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applicant" => Ok(Role::Applicant),
            "leader" => Ok(Role::Leader),
            "company" => Ok(Role::Company),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub tech_stack: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Rows are constrained by a CHECK, so an unknown value only shows up
    /// if the schema drifted; treat it as the default role.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }

    pub fn tech_stack_list(&self) -> Vec<String> {
        parse_tech_stack(self.tech_stack.as_deref())
    }
}

/// User as exposed over the API: no password hash, tech stack expanded.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub tech_stack: Vec<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRow> for PublicUser {
    fn from(row: &UserRow) -> Self {
        PublicUser {
            id: row.id,
            username: row.username.clone(),
            email: row.email.clone(),
            profile_picture: row.profile_picture.clone(),
            tech_stack: row.tech_stack_list(),
            role: row.role(),
            created_at: row.created_at,
        }
    }
}

impl From<UserRow> for PublicUser {
    fn from(row: UserRow) -> Self {
        PublicUser::from(&row)
    }
}
