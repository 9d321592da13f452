// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use super::Database;
use crate::error::AppError;
use crate::models::{NewSession, UserSession};
use crate::time_utils;
use chrono::{DateTime, Utc};

impl Database {
    // ─── Session Operations ──────────────────────────────────────

    /// Record a newly issued login token.
    pub async fn create_session(&self, session: &NewSession) -> Result<UserSession, AppError> {
        Ok(sqlx::query_as::<_, UserSession>(
            "INSERT INTO user_sessions
                (id, user_id, token_hash, ip_address, user_agent, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(time_utils::now())
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Get a session by id (the token's `jti`).
    pub async fn get_session(&self, session_id: &str) -> Result<Option<UserSession>, AppError> {
        Ok(
            sqlx::query_as::<_, UserSession>("SELECT * FROM user_sessions WHERE id = ?")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Revoke one session. Returns `false` if it was unknown or already revoked.
    pub async fn revoke_session(&self, session_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(time_utils::now())
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every live session of a user. Returns how many were revoked.
    pub async fn revoke_user_sessions(&self, user_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(time_utils::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions that can no longer authenticate anything.
    pub async fn purge_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result =
            sqlx::query("DELETE FROM user_sessions WHERE expires_at <= ? OR revoked_at IS NOT NULL")
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::models::{NewSession, Role};
    use crate::time_utils;

    async fn db_with_user() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .create_user("admin", None, "hash", Role::Admin)
            .await
            .unwrap();
        (db, user.id)
    }

    fn new_session(id: &str, user_id: i64, ttl_hours: i64) -> NewSession {
        NewSession {
            id: id.to_string(),
            user_id,
            token_hash: format!("hash-{}", id),
            ip_address: Some("203.0.113.9".to_string()),
            user_agent: Some("test-agent".to_string()),
            expires_at: time_utils::now() + chrono::Duration::hours(ttl_hours),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (db, user_id) = db_with_user().await;
        let created = db.create_session(&new_session("s1", user_id, 1)).await.unwrap();
        assert!(created.is_active_at(time_utils::now()));

        assert!(db.revoke_session("s1").await.unwrap());
        // Second revoke is a no-op
        assert!(!db.revoke_session("s1").await.unwrap());

        let revoked = db.get_session("s1").await.unwrap().unwrap();
        assert!(!revoked.is_active_at(time_utils::now()));
    }

    #[tokio::test]
    async fn test_revoke_all_and_purge() {
        let (db, user_id) = db_with_user().await;
        db.create_session(&new_session("a", user_id, 1)).await.unwrap();
        db.create_session(&new_session("b", user_id, 1)).await.unwrap();
        db.create_session(&new_session("expired", user_id, -1))
            .await
            .unwrap();

        assert_eq!(db.revoke_user_sessions(user_id).await.unwrap(), 3);

        let purged = db.purge_sessions(time_utils::now()).await.unwrap();
        assert_eq!(purged, 3);
        assert!(db.get_session("a").await.unwrap().is_none());
    }
}
