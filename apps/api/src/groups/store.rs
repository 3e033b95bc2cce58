use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::group::{GroupRow, MessageRow};

/// A chat message with its sender's name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MessageView {
    pub id: Uuid,
    pub group_id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub async fn find_group(pool: &PgPool, id: Uuid) -> Result<Option<GroupRow>, sqlx::Error> {
    sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Groups of every project `user_id` belongs to, by name.
pub async fn groups_for_member(pool: &PgPool, user_id: Uuid) -> Result<Vec<GroupRow>, sqlx::Error> {
    sqlx::query_as::<_, GroupRow>(
        r#"
        SELECT g.* FROM groups g
        JOIN project_memberships m ON m.project_id = g.project_id
        WHERE m.user_id = $1
        ORDER BY g.name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Messages oldest first. With `after`, only those strictly newer.
///
/// `insert_message` gives each group strictly increasing timestamps in commit
/// order, so a client that passes back the newest `created_at` it has seen
/// never skips a message.
pub async fn messages_since(
    pool: &PgPool,
    group_id: Uuid,
    after: Option<DateTime<Utc>>,
) -> Result<Vec<MessageView>, sqlx::Error> {
    sqlx::query_as::<_, MessageView>(
        r#"
        SELECT m.id, m.group_id, m.sender_id, u.username AS sender_username,
               m.content, m.created_at
        FROM messages m
        JOIN users u ON u.id = m.sender_id
        WHERE m.group_id = $1 AND ($2::timestamptz IS NULL OR m.created_at > $2)
        ORDER BY m.created_at ASC, m.id ASC
        "#,
    )
    .bind(group_id)
    .bind(after)
    .fetch_all(pool)
    .await
}

/// Timestamp for the next message in a group whose newest message is `last`.
///
/// Truncated to Postgres' microsecond precision and always after `last`, even
/// if the clock went backwards or two posts land in the same microsecond.
pub fn next_message_timestamp(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match last {
        Some(last) if last >= now => last + Duration::microseconds(1),
        _ => now,
    }
}

/// Appends a message. Posts to one group are serialized on the group row, so
/// timestamps are assigned in the order the inserts commit.
pub async fn insert_message(
    pool: &PgPool,
    group_id: Uuid,
    sender_id: Uuid,
    content: &str,
) -> Result<MessageRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM groups WHERE id = $1 FOR UPDATE")
        .bind(group_id)
        .execute(&mut *tx)
        .await?;
    let last: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT max(created_at) FROM messages WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(&mut *tx)
            .await?;

    let message = sqlx::query_as::<_, MessageRow>(
        r#"
        INSERT INTO messages (id, group_id, sender_id, content, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(group_id)
    .bind(sender_id)
    .bind(content)
    .bind(next_message_timestamp(Utc::now(), last))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn test_first_message_uses_now_at_microsecond_precision() {
        let ts = next_message_timestamp(at(1_700_000_000, 123_456_789), None);
        assert_eq!(ts, at(1_700_000_000, 123_456_000));
    }

    #[test]
    fn test_later_clock_wins() {
        let last = at(1_700_000_000, 0);
        let now = at(1_700_000_005, 0);
        assert_eq!(next_message_timestamp(now, Some(last)), now);
    }

    #[test]
    fn test_timestamps_stay_strictly_increasing() {
        let last = at(1_700_000_000, 500_000);
        // Same microsecond, and a clock that stepped backwards.
        for now in [at(1_700_000_000, 500_400), at(1_699_999_990, 0)] {
            let next = next_message_timestamp(now, Some(last));
            assert_eq!(next, last + Duration::microseconds(1));
            assert!(next > last);
        }
    }

    #[test]
    fn test_burst_of_posts_orders_like_commits() {
        let now = at(1_700_000_000, 0);
        let mut last = None;
        let mut seen = Vec::new();
        for _ in 0..5 {
            let ts = next_message_timestamp(now, last);
            last = Some(ts);
            seen.push(ts);
        }
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_cursor_returns_only_newer_messages(pool: PgPool) {
        use crate::models::user::Role;
        use crate::test_support;

        let leader = test_support::user(&pool, "lead", "lead@example.com", Role::Leader).await;
        test_support::project(&pool, &leader, "Compiler").await;
        let group = groups_for_member(&pool, leader.id).await.unwrap().remove(0);

        let first = insert_message(&pool, group.id, leader.id, "one").await.unwrap();
        let second = insert_message(&pool, group.id, leader.id, "two").await.unwrap();
        assert!(second.created_at > first.created_at);

        let all = messages_since(&pool, group.id, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sender_username, "lead");

        let newer = messages_since(&pool, group.id, Some(first.created_at))
            .await
            .unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].id, second.id);
    }
}
