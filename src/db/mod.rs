// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (SQLite via sqlx).
//!
//! Provides typed operations for:
//! - Users (dashboard accounts)
//! - Sessions (issued login tokens, for revocation)
//! - Notices (authoring, public listing, search, view counts)
//! - Site visits (deduplicated per visitor, path and day)

mod notices;
mod sessions;
mod users;
mod visits;

pub use notices::{NoticeFilter, NoticeSearch};

use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    pub const NOTICES: &str = "notices";
    pub const USER_SESSIONS: &str = "user_sessions";
    pub const SITE_VISITS: &str = "site_visits";
}

const MAX_CONNECTIONS: u32 = 8;

/// Database handle. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and bring the schema up to date.
    ///
    /// In-memory URLs (`sqlite::memory:`) get a single long-lived connection,
    /// since every SQLite connection would otherwise see its own empty database.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(in_memory, "Connected to database");
        Ok(db)
    }

    /// Fresh in-memory database with the schema applied (tests, benches).
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::connect("sqlite::memory:").await
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))?;

        let backfilled = self.backfill_search_text().await?;
        if backfilled > 0 {
            tracing::info!(backfilled, "Indexed existing notices for search");
        }
        Ok(())
    }

    /// Cheap liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
