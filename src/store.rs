//! Postgres-backed `SessionRepository`.
//!
//! Row mapping is defensive in the same way the rest of the read path is:
//! malformed optional columns degrade to defaults, while structurally
//! invalid rows (bad timestamp, missing id) are skipped with a warning.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;

use crate::error::EngineError;
use crate::grading::boundary::BoundaryTable;
use crate::repository::{streak_from_days, SessionRepository};
use crate::scheduling::optimal_time::UserSchedulePreferences;
use crate::types::{
    AssessmentKind, AssessmentPerformanceRecord, SessionKind, StudySessionRecord, Tier,
};

/// Reference DDL for the tables this store reads.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "study_sessions" (
    "id" UUID PRIMARY KEY,
    "userId" TEXT NOT NULL,
    "topicId" TEXT NOT NULL,
    "startedAt" TIMESTAMPTZ NOT NULL,
    "durationMinutes" BIGINT NOT NULL CHECK ("durationMinutes" > 0),
    "confidenceBefore" INT CHECK ("confidenceBefore" BETWEEN 1 AND 10),
    "confidenceAfter" INT CHECK ("confidenceAfter" BETWEEN 1 AND 10),
    "kind" TEXT NOT NULL DEFAULT 'practice',
    "completed" BOOLEAN NOT NULL DEFAULT FALSE,
    "notes" TEXT
);
CREATE INDEX IF NOT EXISTS "idx_sessions_user_topic"
    ON "study_sessions" ("userId", "topicId", "startedAt");

CREATE TABLE IF NOT EXISTS "assessment_records" (
    "id" UUID PRIMARY KEY,
    "userId" TEXT NOT NULL,
    "subjectId" TEXT NOT NULL,
    "score" DOUBLE PRECISION NOT NULL,
    "marksAchieved" INT NOT NULL,
    "marksTotal" INT NOT NULL,
    "kind" TEXT NOT NULL DEFAULT 'quiz',
    "completedAt" TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS "grade_boundaries" (
    "board" TEXT NOT NULL,
    "subjectCode" TEXT NOT NULL,
    "tier" TEXT NOT NULL,
    "grade" TEXT NOT NULL,
    "rawMark" INT NOT NULL,
    "percentageMark" DOUBLE PRECISION NOT NULL,
    PRIMARY KEY ("board", "subjectCode", "tier", "grade")
);

CREATE TABLE IF NOT EXISTS "user_preferences" (
    "userId" TEXT PRIMARY KEY,
    "allowedWeekdays" TEXT,
    "earliestHour" INT,
    "latestHour" INT
);
"#;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreInitError {
    #[error("DATABASE_URL is not set")]
    MissingUrl,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, StoreInitError> {
        dotenvy::dotenv().ok();
        let database_url = std::env::var("DATABASE_URL").map_err(|_| StoreInitError::MissingUrl)?;
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub async fn from_env() -> Result<Self, StoreInitError> {
        let config = StoreConfig::from_env()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn apply_schema(&self) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA_SQL.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn map_session(row: &sqlx::postgres::PgRow) -> Option<StudySessionRecord> {
    let id: uuid::Uuid = row.try_get("id").ok()?;
    let started_at: DateTime<Utc> = row.try_get("startedAt").ok()?;
    let kind: String = row
        .try_get("kind")
        .unwrap_or_else(|_| "practice".to_string());

    Some(StudySessionRecord {
        id,
        user_id: row.try_get("userId").ok()?,
        topic_id: row.try_get("topicId").ok()?,
        started_at,
        duration_minutes: row.try_get("durationMinutes").unwrap_or(0),
        confidence_before: row.try_get("confidenceBefore").ok().flatten(),
        confidence_after: row.try_get("confidenceAfter").ok().flatten(),
        kind: SessionKind::parse(&kind),
        completed: row.try_get("completed").unwrap_or(false),
        notes: row.try_get("notes").ok().flatten(),
    })
}

impl SessionRepository for PgRepository {
    async fn sessions(
        &self,
        user_id: &str,
        topic_id: Option<&str>,
    ) -> Result<Vec<StudySessionRecord>, EngineError> {
        let rows = match topic_id {
            Some(topic) => {
                sqlx::query(
                    r#"SELECT * FROM "study_sessions" WHERE "userId" = $1 AND "topicId" = $2 ORDER BY "startedAt" DESC"#,
                )
                .bind(user_id)
                .bind(topic)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"SELECT * FROM "study_sessions" WHERE "userId" = $1 ORDER BY "startedAt" DESC"#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            match map_session(row) {
                Some(session) => {
                    // A structurally valid row can still violate domain
                    // invariants; keep those out of the analyzers.
                    if session.validate().is_ok() {
                        sessions.push(session);
                    } else {
                        tracing::warn!(user_id, "skipping invalid session row");
                    }
                }
                None => tracing::warn!(user_id, "skipping unmappable session row"),
            }
        }
        Ok(sessions)
    }

    async fn performance_records(
        &self,
        user_id: &str,
        subject_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AssessmentPerformanceRecord>, EngineError> {
        let rows = sqlx::query(
            r#"SELECT "subjectId", "score", "marksAchieved", "marksTotal", "kind", "completedAt" FROM "assessment_records" WHERE "userId" = $1 ORDER BY "completedAt" DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::new();
        for row in &rows {
            let subject: String = row.try_get("subjectId").unwrap_or_default();
            if let Some(wanted) = subject_id {
                if subject != wanted {
                    continue;
                }
            }
            let Ok(completed_at): Result<DateTime<Utc>, _> = row.try_get("completedAt") else {
                continue;
            };
            if let Some(cutoff) = since {
                if completed_at < cutoff {
                    continue;
                }
            }
            let kind: String = row.try_get("kind").unwrap_or_else(|_| "quiz".to_string());
            records.push(AssessmentPerformanceRecord {
                score: row.try_get("score").unwrap_or(0.0),
                marks_achieved: row.try_get("marksAchieved").unwrap_or(0),
                marks_total: row.try_get("marksTotal").unwrap_or(0),
                kind: if kind == "past_paper" {
                    AssessmentKind::PastPaper
                } else {
                    AssessmentKind::Quiz
                },
                completed_at,
            });
        }
        Ok(records)
    }

    async fn grade_boundaries(
        &self,
        board: &str,
        subject_code: &str,
    ) -> Result<Option<BoundaryTable>, EngineError> {
        let rows = sqlx::query(
            r#"SELECT "tier", "grade", "rawMark", "percentageMark" FROM "grade_boundaries" WHERE UPPER("board") = UPPER($1) AND "subjectCode" = $2"#,
        )
        .bind(board)
        .bind(subject_code)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut table = BoundaryTable::new(board, subject_code);
        for row in &rows {
            let tier_raw: String = row.try_get("tier").unwrap_or_default();
            let Some(tier) = Tier::parse(&tier_raw) else {
                tracing::warn!(board, subject_code, tier = tier_raw, "unknown tier in store");
                continue;
            };
            let grade: String = match row.try_get("grade") {
                Ok(g) => g,
                Err(_) => continue,
            };
            let raw_mark: i32 = row.try_get("rawMark").unwrap_or(0);
            let percentage_mark: f64 = row.try_get("percentageMark").unwrap_or(0.0);
            table
                .tiers
                .entry(tier)
                .or_default()
                .insert(grade, crate::types::GradeBoundary {
                    raw_mark,
                    percentage_mark,
                });
        }

        if table.tiers.is_empty() {
            Ok(None)
        } else {
            Ok(Some(table))
        }
    }

    async fn topics(&self, user_id: &str) -> Result<Vec<String>, EngineError> {
        let rows = sqlx::query(
            r#"SELECT "topicId", MIN("startedAt") AS "firstStudied" FROM "study_sessions" WHERE "userId" = $1 GROUP BY "topicId" ORDER BY "firstStudied" ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("topicId").ok())
            .collect())
    }

    async fn study_streak_days(&self, user_id: &str) -> Result<u32, EngineError> {
        let rows = sqlx::query(
            r#"SELECT DISTINCT ("startedAt"::date) AS "day" FROM "study_sessions" WHERE "userId" = $1 AND "completed" ORDER BY "day" ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let days: Vec<chrono::NaiveDate> = rows
            .iter()
            .filter_map(|row| row.try_get::<chrono::NaiveDate, _>("day").ok())
            .collect();

        Ok(streak_from_days(&days, Utc::now().date_naive()))
    }

    async fn schedule_preferences(
        &self,
        user_id: &str,
    ) -> Result<UserSchedulePreferences, EngineError> {
        let row = sqlx::query(
            r#"SELECT "allowedWeekdays", "earliestHour", "latestHour" FROM "user_preferences" WHERE "userId" = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(UserSchedulePreferences::default());
        };

        // Weekdays are stored as a JSON array of names, e.g. ["mon","sat"].
        let allowed_weekdays = row
            .try_get::<Option<String>, _>("allowedWeekdays")
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| chrono::Weekday::from_str(n).ok())
                    .collect::<Vec<_>>()
            })
            .filter(|days| !days.is_empty());

        Ok(UserSchedulePreferences {
            allowed_weekdays,
            earliest_hour: row
                .try_get::<Option<i32>, _>("earliestHour")
                .ok()
                .flatten()
                .map(|h| h.clamp(0, 23) as u32),
            latest_hour: row
                .try_get::<Option<i32>, _>("latestHour")
                .ok()
                .flatten()
                .map(|h| h.clamp(0, 23) as u32),
        })
    }
}
