// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login session bookkeeping.

use chrono::{DateTime, Utc};

/// Session row from the `user_sessions` table.
///
/// The id doubles as the JWT `jti` claim, so a token can be revoked
/// server-side before it expires.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSession {
    pub id: String,
    pub user_id: i64,
    /// SHA-256 (hex) of the issued token
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl UserSession {
    /// A session authenticates requests until it expires or is revoked.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Values recorded when a user signs in.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub user_id: i64,
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}
