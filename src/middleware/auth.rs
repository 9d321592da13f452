// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.
//!
//! A token is only accepted while its server-side session is live, so logout
//! takes effect immediately rather than at token expiry.

use crate::error::AppError;
use crate::models::Role;
use crate::time_utils;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "noticeboard_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Session id (row in `user_sessions`)
    pub jti: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub session_id: String,
    pub role: Role,
}

impl AuthUser {
    /// Fail with 403 unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), AppError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Editor => Err(AppError::Forbidden(
                "This action requires the admin role".to_string(),
            )),
        }
    }
}

/// Token from the session cookie, else from `Authorization: Bearer`.
pub fn extract_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&jar, &request).ok_or(AppError::Unauthorized)?;

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(&token, &key, &validation)
        .map_err(|_| AppError::InvalidToken)?
        .claims;

    let user_id: i64 = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

    let session = state
        .db
        .get_session(&claims.jti)
        .await?
        .ok_or(AppError::InvalidToken)?;

    if session.user_id != user_id
        || !session.is_active_at(Utc::now())
        || session.token_hash != hash_token(&token)
    {
        tracing::debug!(session_id = %session.id, user_id, "Rejected inactive session");
        return Err(AppError::InvalidToken);
    }

    // Role comes from the user row so demotions apply to existing sessions.
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or(AppError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser {
        user_id,
        session_id: session.id,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Create a JWT for a user session. Returns the token and its expiry.
pub fn create_jwt(
    user_id: i64,
    role: Role,
    session_id: &str,
    signing_key: &[u8],
    ttl: chrono::Duration,
) -> anyhow::Result<(String, DateTime<Utc>)> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let issued = time_utils::now();
    let expires = issued
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("Session lifetime out of range"))?;

    let claims = Claims {
        sub: user_id.to_string(),
        jti: session_id.to_string(),
        role,
        iat: usize::try_from(issued.timestamp())?,
        exp: usize::try_from(expires.timestamp())?,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?;
    Ok((token, expires))
}

/// SHA-256 of a token, hex encoded, as stored in `user_sessions.token_hash`.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_round_trip() {
        let key = b"unit_test_signing_key_32_bytes!!";
        let (token, expires) =
            create_jwt(42, Role::Editor, "session-1", key, chrono::Duration::hours(2)).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(key),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(data.claims.sub, "42");
        assert_eq!(data.claims.jti, "session-1");
        assert_eq!(data.claims.role, Role::Editor);
        assert_eq!(data.claims.exp as i64, expires.timestamp());
        assert_eq!(data.claims.exp - data.claims.iat, 2 * 60 * 60);
    }

    #[test]
    fn test_jwt_rejects_unrepresentable_expiry() {
        let key = b"unit_test_signing_key_32_bytes!!";
        let ttl = chrono::Duration::hours(10_000_000_000);
        assert!(create_jwt(1, Role::Admin, "session-1", key, ttl).is_err());
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_require_admin() {
        let admin = AuthUser {
            user_id: 1,
            session_id: "s".to_string(),
            role: Role::Admin,
        };
        let editor = AuthUser {
            role: Role::Editor,
            ..admin.clone()
        };

        assert!(admin.require_admin().is_ok());
        assert!(matches!(
            editor.require_admin(),
            Err(AppError::Forbidden(_))
        ));
    }
}
