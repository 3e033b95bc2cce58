use redis::aio::MultiplexedConnection;
use redis::{Client as RedisClient, RedisError};
use tracing::debug;
use uuid::Uuid;

const SESSION_KEY_PREFIX: &str = "crewd:session:";

/// Login sessions kept in Redis: `crewd:session:<token>` → user id, with a TTL.
#[derive(Clone)]
pub struct SessionStore {
    client: RedisClient,
    ttl_seconds: u64,
}

impl SessionStore {
    pub fn new(client: RedisClient, ttl_seconds: u64) -> Self {
        Self {
            client,
            ttl_seconds,
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    /// Creates a session for `user_id` and returns its bearer token.
    pub async fn issue(&self, user_id: Uuid) -> Result<String, RedisError> {
        let token = new_token();
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(session_key(&token))
            .arg(user_id.to_string())
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!("Issued session for user {user_id}");
        Ok(token)
    }

    /// Returns the user behind a token, or `None` if it expired or never existed.
    pub async fn resolve(&self, token: &str) -> Result<Option<Uuid>, RedisError> {
        if !is_well_formed(token) {
            return Ok(None);
        }
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(session_key(token))
            .query_async(&mut conn)
            .await?;
        Ok(raw.and_then(|id| id.parse().ok()))
    }

    pub async fn revoke(&self, token: &str) -> Result<(), RedisError> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(session_key(token))
            .query_async::<_, ()>(&mut conn)
            .await
    }
}

/// 64 hex characters from two v4 UUIDs.
fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn is_well_formed(token: &str) -> bool {
    token.len() == 64 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_well_formed() {
        let a = new_token();
        let b = new_token();
        assert_ne!(a, b);
        assert!(is_well_formed(&a));
        assert!(is_well_formed(&b));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc"));
        assert!(!is_well_formed(&"z".repeat(64)));
    }

    #[test]
    fn test_session_key_is_namespaced() {
        assert_eq!(session_key("abc"), "crewd:session:abc");
    }

    #[tokio::test]
    async fn test_resolve_skips_redis_for_malformed_token() {
        // Nothing listens on this port; a malformed token must not touch it.
        let client = RedisClient::open("redis://127.0.0.1:1/").unwrap();
        let store = SessionStore::new(client, 60);
        assert_eq!(store.resolve("not-a-token").await.unwrap(), None);
    }
}
