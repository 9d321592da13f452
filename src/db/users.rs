// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use super::Database;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::time_utils;

impl Database {
    // ─── User Operations ─────────────────────────────────────────

    /// Number of dashboard accounts.
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Create a user. Fails with `Conflict` on a duplicate username/email.
    pub async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(time_utils::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = user.id, username, role = role.as_str(), "User created");
        Ok(user)
    }

    /// Get a user by id.
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Get a user by login name (case-sensitive).
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Record a successful login.
    pub async fn touch_last_login(&self, user_id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(time_utils::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::error::AppError;
    use crate::models::Role;

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let db = Database::in_memory().await.unwrap();
        assert_eq!(db.count_users().await.unwrap(), 0);

        let user = db
            .create_user("registrar", Some("registrar@example.org"), "hash", Role::Admin)
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(user.last_login_at.is_none());

        let by_name = db.get_user_by_username("registrar").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);

        db.touch_last_login(user.id).await.unwrap();
        let reloaded = db.get_user(user.id).await.unwrap().unwrap();
        assert!(reloaded.last_login_at.is_some());
        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let db = Database::in_memory().await.unwrap();
        db.create_user("editor", None, "hash", Role::Editor)
            .await
            .unwrap();

        let err = db
            .create_user("editor", None, "hash", Role::Editor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
