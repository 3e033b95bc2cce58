//! Fixtures for store tests that run against Postgres.
//!
//! Those tests are `#[ignore]`d; run them with a scratch database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use sqlx::PgPool;

use crate::accounts::store::{insert_user, NewUser};
use crate::models::project::ProjectRow;
use crate::models::user::{Role, UserRow};
use crate::projects::store::{create_project, NewProject};

pub async fn user(pool: &PgPool, username: &str, email: &str, role: Role) -> UserRow {
    insert_user(
        pool,
        NewUser {
            username,
            email,
            password_hash: "$argon2id$not-a-real-hash",
            tech_stack: Some("Rust, Go"),
            role,
        },
    )
    .await
    .unwrap()
}

pub async fn project(pool: &PgPool, creator: &UserRow, title: &str) -> ProjectRow {
    create_project(
        pool,
        creator.id,
        NewProject {
            title,
            description: "Build a small compiler",
            required_skills: Some("Rust"),
            team_size: 3,
            duration: "2 months",
        },
    )
    .await
    .unwrap()
}
