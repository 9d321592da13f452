// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client token bucket rate limiting.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token buckets keyed by client address.
pub struct RateLimiter {
    scope: &'static str,
    capacity: f64,
    refill_per_sec: f64,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    /// Allow `per_minute` requests per client, with bursts up to the same number.
    /// Zero disables limiting.
    pub fn per_minute(scope: &'static str, per_minute: u32) -> Self {
        Self {
            scope,
            capacity: per_minute as f64,
            refill_per_sec: per_minute as f64 / 60.0,
            buckets: DashMap::new(),
        }
    }

    /// Take one token for `key`, or report how many seconds until one is available.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        if self.capacity <= 0.0 {
            return Ok(());
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let wait = (1.0 - bucket.tokens) / self.refill_per_sec;
            Err(wait.ceil().max(1.0) as u64)
        }
    }

    /// Forget clients idle for longer than `idle`; their buckets would be full anyway.
    pub fn prune(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < idle);
        before - self.buckets.len()
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }
}

/// Client address resolved by the rate limiter, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    /// The address, unless it could not be determined.
    pub fn known(&self) -> Option<&str> {
        (self.0 != UNKNOWN_CLIENT).then_some(self.0.as_str())
    }
}

const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client address: first `X-Forwarded-For` hop, then the socket peer.
pub fn client_ip(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

async fn enforce(
    limiter: &RateLimiter,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    if let Err(retry_after_secs) = limiter.check(&ip) {
        tracing::warn!(
            scope = limiter.scope(),
            client = %ip,
            retry_after_secs,
            "Rate limit exceeded"
        );
        return Err(AppError::TooManyRequests { retry_after_secs });
    }

    request.extensions_mut().insert(ClientIp(ip));
    Ok(next.run(request).await)
}

/// Limit for the public read API.
pub async fn limit_public(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.public_limiter, request, next).await
}

/// Stricter limit for login attempts.
pub async fn limit_login(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.login_limiter, request, next).await
}
