use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::matching::parse_tech_stack;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "cancelled" => Ok(ProjectStatus::Cancelled),
            other => Err(format!("Unknown project status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Option<String>,
    pub team_size: i32,
    pub duration: String,
    pub status: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ProjectRow {
    pub fn required_skills_list(&self) -> Vec<String> {
        parse_tech_stack(self.required_skills.as_deref())
    }

    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active.as_str()
    }
}

/// Project as returned by the API, with skills expanded to a list.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub team_size: i32,
    pub duration: String,
    pub status: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&ProjectRow> for ProjectView {
    fn from(row: &ProjectRow) -> Self {
        ProjectView {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            required_skills: row.required_skills_list(),
            team_size: row.team_size,
            duration: row.duration.clone(),
            status: row.status.clone(),
            creator_id: row.creator_id,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("active".parse::<ProjectStatus>().unwrap(), ProjectStatus::Active);
        assert_eq!(
            "cancelled".parse::<ProjectStatus>().unwrap(),
            ProjectStatus::Cancelled
        );
        assert!("archived".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn test_view_expands_required_skills() {
        let row = ProjectRow {
            id: Uuid::new_v4(),
            title: "Crewd".to_string(),
            description: "Team matching".to_string(),
            required_skills: Some("Rust,PostgreSQL".to_string()),
            team_size: 3,
            duration: "2 months".to_string(),
            status: "active".to_string(),
            creator_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        assert!(row.is_active());
        let view = ProjectView::from(&row);
        assert_eq!(view.required_skills, vec!["Rust", "PostgreSQL"]);
    }
}
