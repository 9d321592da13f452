// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard login and session routes.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use super::{user_agent, ApiResponse};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::middleware::auth::{create_jwt, hash_token, AuthUser, SESSION_COOKIE};
use crate::middleware::ClientIp;
use crate::models::{NewSession, User, UserProfile};
use crate::services::password;
use crate::time_utils::{self, format_utc_rfc3339};
use crate::AppState;

/// Login, mounted behind the login rate limiter.
pub fn login_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/login", post(login))
}

/// Routes for an authenticated session.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/logout-all", post(logout_all))
        .route("/api/auth/me", get(get_me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    username: String,
    #[validate(length(min = 1, max = 256))]
    password: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: String,
    pub user: UserProfile,
}

/// Check a password off the async runtime; PBKDF2 is deliberately slow.
async fn check_credentials(user: Option<User>, password: String) -> Result<Option<User>> {
    let checked = tokio::task::spawn_blocking(move || match user {
        Some(user) if password::verify_password(&password, &user.password_hash) => Some(user),
        Some(_) => None,
        None => {
            password::dummy_verify(&password);
            None
        }
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Password check task failed: {}", e)))?;
    Ok(checked)
}

/// Session cookie carrying `token`, living as long as the session.
fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(config.secure_cookies())
        .max_age(time::Duration::hours(config.session_ttl_hours))
        .build()
}

fn cleared_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Exchange username and password for a session token.
async fn login(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<ClientIp>,
    headers: HeaderMap,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>)> {
    let username = request.username.trim();
    let stored = state.db.get_user_by_username(username).await?;

    let Some(mut user) = check_credentials(stored, request.password).await? else {
        tracing::warn!(username = %username, client = %client.0, "Failed login attempt");
        return Err(AppError::InvalidCredentials);
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let ttl = chrono::Duration::hours(state.config.session_ttl_hours);
    let (token, expires_at) = create_jwt(
        user.id,
        user.role,
        &session_id,
        &state.config.jwt_signing_key,
        ttl,
    )?;

    state
        .db
        .create_session(&NewSession {
            id: session_id.clone(),
            user_id: user.id,
            token_hash: hash_token(&token),
            ip_address: client.known().map(str::to_string),
            user_agent: user_agent(&headers),
            expires_at,
        })
        .await?;
    state.db.touch_last_login(user.id).await?;
    user.last_login_at = Some(time_utils::now());

    tracing::info!(
        user_id = user.id,
        role = user.role.as_str(),
        session_id = %session_id,
        "User logged in"
    );

    let jar = jar.add(session_cookie(&state.config, token.clone()));
    let response = LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_at: format_utc_rfc3339(expires_at),
        user: UserProfile::from(user),
    };

    Ok((jar, ApiResponse::with_message(response, "Login successful")))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogoutResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub revoked_sessions: u64,
}

/// Revoke the current session and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<LogoutResponse>>)> {
    let revoked = state.db.revoke_session(&auth.session_id).await?;
    tracing::info!(user_id = auth.user_id, session_id = %auth.session_id, "User logged out");

    Ok((
        jar.remove(cleared_cookie()),
        ApiResponse::with_message(
            LogoutResponse {
                revoked_sessions: u64::from(revoked),
            },
            "Logged out",
        ),
    ))
}

/// Revoke every session of the current user, on all devices.
async fn logout_all(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<LogoutResponse>>)> {
    let revoked = state.db.revoke_user_sessions(auth.user_id).await?;
    tracing::info!(user_id = auth.user_id, revoked, "Revoked all sessions");

    Ok((
        jar.remove(cleared_cookie()),
        ApiResponse::with_message(
            LogoutResponse {
                revoked_sessions: revoked,
            },
            "Logged out of all sessions",
        ),
    ))
}

/// Current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let user = state
        .db
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.user_id)))?;

    Ok(ApiResponse::ok(UserProfile::from(user)))
}
