use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::{Role, UserRow};

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub tech_stack: Option<&'a str>,
    pub role: Role,
}

/// Which unique account field is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakenField {
    Username,
    Email,
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Looks a user up by username, or by email (case-insensitive).
///
/// A username may look like someone else's email, so an exact username match
/// always wins over an email match.
pub async fn find_user_by_login(pool: &PgPool, login: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        SELECT * FROM users
        WHERE username = $1 OR lower(email) = lower($1)
        ORDER BY (username = $1) DESC
        LIMIT 1
        "#,
    )
    .bind(login)
    .fetch_optional(pool)
    .await
}

/// Reports the first unique field already used by another account.
pub async fn find_taken_field(
    pool: &PgPool,
    username: &str,
    email: &str,
    exclude: Option<Uuid>,
) -> Result<Option<TakenField>, sqlx::Error> {
    let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM users WHERE username = $1 AND id IS DISTINCT FROM $3),
            EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($2) AND id IS DISTINCT FROM $3)
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(exclude)
    .fetch_one(pool)
    .await?;

    Ok(if username_taken {
        Some(TakenField::Username)
    } else if email_taken {
        Some(TakenField::Email)
    } else {
        None
    })
}

pub async fn insert_user(pool: &PgPool, new: NewUser<'_>) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, username, email, password_hash, tech_stack, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.username)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.tech_stack)
    .bind(new.role.as_str())
    .fetch_one(pool)
    .await
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    username: &str,
    email: &str,
    tech_stack: Option<&str>,
) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users SET username = $2, email = $3, tech_stack = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(tech_stack)
    .fetch_one(pool)
    .await
}

pub async fn set_role(pool: &PgPool, id: Uuid, role: Role) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("UPDATE users SET role = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(role.as_str())
        .fetch_one(pool)
        .await
}

pub async fn set_profile_picture(
    pool: &PgPool,
    id: Uuid,
    key: &str,
) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("UPDATE users SET profile_picture = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(key)
        .fetch_one(pool)
        .await
}

/// Contributor search criteria.
///
/// `search` matches username or tech stack; every entry of `tech_patterns`
/// must match the tech stack. Both are ILIKE patterns.
#[derive(Debug, Clone, Copy)]
pub struct UserFilter<'a> {
    pub exclude: &'a [Uuid],
    pub search: Option<&'a str>,
    pub tech_patterns: &'a [String],
}

const USER_FILTER_WHERE: &str = r#"
    WHERE NOT (id = ANY($1))
      AND ($2::text IS NULL OR username ILIKE $2 OR tech_stack ILIKE $2)
      AND tech_stack ILIKE ALL($3)
"#;

/// Every user matching `filter`, by username.
pub async fn search_users(
    pool: &PgPool,
    filter: UserFilter<'_>,
) -> Result<Vec<UserRow>, sqlx::Error> {
    let sql = format!("SELECT * FROM users {USER_FILTER_WHERE} ORDER BY username ASC");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(filter.exclude)
        .bind(filter.search)
        .bind(filter.tech_patterns)
        .fetch_all(pool)
        .await
}

/// One page of users matching `filter`, by username.
pub async fn search_users_page(
    pool: &PgPool,
    filter: UserFilter<'_>,
    limit: i64,
    offset: i64,
) -> Result<Vec<UserRow>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM users {USER_FILTER_WHERE} ORDER BY username ASC LIMIT $4 OFFSET $5"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(filter.exclude)
        .bind(filter.search)
        .bind(filter.tech_patterns)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_users(pool: &PgPool, filter: UserFilter<'_>) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM users {USER_FILTER_WHERE}");
    sqlx::query_scalar(&sql)
        .bind(filter.exclude)
        .bind(filter.search)
        .bind(filter.tech_patterns)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_login_prefers_exact_username(pool: PgPool) {
        let owner = test_support::user(&pool, "alice", "shared@example.com", Role::Applicant).await;
        let lookalike =
            test_support::user(&pool, "shared@example.com", "other@example.com", Role::Applicant)
                .await;

        let found = find_user_by_login(&pool, "shared@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, lookalike.id);

        let found = find_user_by_login(&pool, "SHARED@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, owner.id);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_contributor_search_pages_in_sql(pool: PgPool) {
        let me = test_support::user(&pool, "me", "me@example.com", Role::Leader).await;
        for i in 0..5 {
            let email = format!("dev{i}@example.com");
            test_support::user(&pool, &format!("dev{i}"), &email, Role::Applicant).await;
        }
        let exclude = [me.id];
        let tech = vec!["%Rust%".to_string()];
        let filter = UserFilter {
            exclude: &exclude,
            search: Some("%dev%"),
            tech_patterns: &tech,
        };

        assert_eq!(count_users(&pool, filter).await.unwrap(), 5);
        let page = search_users_page(&pool, filter, 2, 2).await.unwrap();
        let names: Vec<_> = page.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["dev2", "dev3"]);
    }
}
