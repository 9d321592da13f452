// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Noticeboard: publish announcements and serve them to the public.
//!
//! This crate provides the backend API behind the admin dashboard (notice
//! authoring, uploads, analytics) and the read-only public notice board.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use middleware::rate_limit::RateLimiter;
use services::{UploadStore, VisitorHasher};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub uploads: UploadStore,
    pub visitor_hasher: VisitorHasher,
    pub login_limiter: RateLimiter,
    pub public_limiter: RateLimiter,
}

impl AppState {
    /// Assemble state from loaded configuration and a connected database.
    pub fn new(config: Config, db: Database) -> anyhow::Result<Self> {
        let uploads = UploadStore::new(&config.upload_dir, config.max_upload_bytes);
        let visitor_hasher = VisitorHasher::new(&config.jwt_signing_key)?;
        let login_limiter = RateLimiter::per_minute("login", config.login_rate_limit_per_minute);
        let public_limiter =
            RateLimiter::per_minute("public", config.public_rate_limit_per_minute);

        Ok(Self {
            config,
            db,
            uploads,
            visitor_hasher,
            login_limiter,
            public_limiter,
        })
    }
}
