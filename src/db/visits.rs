// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use super::Database;
use crate::error::AppError;
use crate::models::DailyVisitors;
use crate::time_utils;
use chrono::NaiveDate;

impl Database {
    // ─── Site Visit Operations ───────────────────────────────────

    /// Record a visit. Repeat visits by the same visitor to the same path on
    /// the same date are ignored; returns whether a new row was written.
    pub async fn record_visit(
        &self,
        visitor_hash: &str,
        path: &str,
        visit_date: NaiveDate,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO site_visits (visitor_hash, path, visit_date, visited_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(visitor_hash)
        .bind(path)
        .bind(visit_date.to_string())
        .bind(time_utils::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Distinct visitors, all time.
    pub async fn count_visitors(&self) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(DISTINCT visitor_hash) FROM site_visits")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Distinct visitors on one date.
    pub async fn count_visitors_on(&self, date: NaiveDate) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT visitor_hash) FROM site_visits WHERE visit_date = ?",
        )
        .bind(date.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Distinct visitors per day in `[from, to]`. Days without visits are absent.
    pub async fn visitors_by_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyVisitors>, AppError> {
        Ok(sqlx::query_as::<_, DailyVisitors>(
            "SELECT visit_date AS date, COUNT(DISTINCT visitor_hash) AS visitors
             FROM site_visits
             WHERE visit_date >= ? AND visit_date <= ?
             GROUP BY visit_date
             ORDER BY visit_date",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_visits_are_deduplicated_per_day_and_path() {
        let db = Database::in_memory().await.unwrap();
        let day = date("2026-05-04");

        assert!(db.record_visit("v1", "/", day).await.unwrap());
        assert!(!db.record_visit("v1", "/", day).await.unwrap());
        assert!(db.record_visit("v1", "/notices/exam", day).await.unwrap());
        assert!(db.record_visit("v2", "/", day).await.unwrap());
        assert!(db.record_visit("v1", "/", date("2026-05-05")).await.unwrap());

        assert_eq!(db.count_visitors().await.unwrap(), 2);
        assert_eq!(db.count_visitors_on(day).await.unwrap(), 2);
        assert_eq!(db.count_visitors_on(date("2026-05-05")).await.unwrap(), 1);

        let series = db
            .visitors_by_day(date("2026-05-01"), date("2026-05-31"))
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, "2026-05-04");
        assert_eq!(series[0].visitors, 2);
    }
}
