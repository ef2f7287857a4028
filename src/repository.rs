//! Persistence boundary.
//!
//! The engine never touches a store directly; it is handed an injected
//! `SessionRepository`. Two implementations exist: the Postgres-backed
//! store in `store.rs` and the in-memory repository below, used by tests
//! and by embedders without a durable backend.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::EngineError;
use crate::grading::boundary::BoundaryTable;
use crate::scheduling::optimal_time::UserSchedulePreferences;
use crate::types::{AssessmentPerformanceRecord, StudySessionRecord};

/// Read access to a user's study history and reference data.
///
/// All methods are async: the durable implementation awaits the store,
/// while the in-memory one completes immediately. The engine itself never
/// suspends outside these calls.
#[allow(async_fn_in_trait)]
pub trait SessionRepository {
    /// Sessions for a user, optionally narrowed to one topic. Any order;
    /// analyzers sort as they need.
    async fn sessions(
        &self,
        user_id: &str,
        topic_id: Option<&str>,
    ) -> Result<Vec<StudySessionRecord>, EngineError>;

    async fn performance_records(
        &self,
        user_id: &str,
        subject_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AssessmentPerformanceRecord>, EngineError>;

    /// Boundary table for a (board, subject), if the store has one. The
    /// engine falls back to the static reference catalog when this returns
    /// `None`.
    async fn grade_boundaries(
        &self,
        board: &str,
        subject_code: &str,
    ) -> Result<Option<BoundaryTable>, EngineError>;

    /// Distinct topic ids the user has studied, in first-studied order.
    async fn topics(&self, user_id: &str) -> Result<Vec<String>, EngineError>;

    /// Consecutive days ending today (or yesterday) with at least one
    /// completed session.
    async fn study_streak_days(&self, user_id: &str) -> Result<u32, EngineError>;

    async fn schedule_preferences(
        &self,
        user_id: &str,
    ) -> Result<UserSchedulePreferences, EngineError>;
}

#[derive(Default)]
struct InMemoryState {
    sessions: Vec<StudySessionRecord>,
    performance: Vec<(String, String, AssessmentPerformanceRecord)>,
    boundaries: HashMap<(String, String), BoundaryTable>,
    preferences: HashMap<String, UserSchedulePreferences>,
}

/// In-memory `SessionRepository` for tests and storeless embedding.
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<InMemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session, enforcing boundary validation so malformed records
    /// never reach the analyzers.
    pub fn insert_session(&self, session: StudySessionRecord) -> Result<(), EngineError> {
        session.validate()?;
        self.state.write().sessions.push(session);
        Ok(())
    }

    pub fn insert_performance(
        &self,
        user_id: &str,
        subject_id: &str,
        record: AssessmentPerformanceRecord,
    ) {
        self.state.write().performance.push((
            user_id.to_string(),
            subject_id.to_string(),
            record,
        ));
    }

    pub fn insert_boundaries(&self, table: BoundaryTable) {
        self.state.write().boundaries.insert(
            (table.board.to_uppercase(), table.subject_code.clone()),
            table,
        );
    }

    pub fn set_preferences(&self, user_id: &str, prefs: UserSchedulePreferences) {
        self.state
            .write()
            .preferences
            .insert(user_id.to_string(), prefs);
    }
}

impl SessionRepository for InMemoryRepository {
    async fn sessions(
        &self,
        user_id: &str,
        topic_id: Option<&str>,
    ) -> Result<Vec<StudySessionRecord>, EngineError> {
        let state = self.state.read();
        Ok(state
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| topic_id.map(|t| s.topic_id == t).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn performance_records(
        &self,
        user_id: &str,
        subject_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AssessmentPerformanceRecord>, EngineError> {
        let state = self.state.read();
        Ok(state
            .performance
            .iter()
            .filter(|(u, s, r)| {
                u == user_id
                    && subject_id.map(|wanted| s == wanted).unwrap_or(true)
                    && since.map(|cutoff| r.completed_at >= cutoff).unwrap_or(true)
            })
            .map(|(_, _, r)| r.clone())
            .collect())
    }

    async fn grade_boundaries(
        &self,
        board: &str,
        subject_code: &str,
    ) -> Result<Option<BoundaryTable>, EngineError> {
        let state = self.state.read();
        Ok(state
            .boundaries
            .get(&(board.to_uppercase(), subject_code.to_string()))
            .cloned())
    }

    async fn topics(&self, user_id: &str) -> Result<Vec<String>, EngineError> {
        let state = self.state.read();
        let mut topics = Vec::new();
        for s in state.sessions.iter().filter(|s| s.user_id == user_id) {
            if !topics.contains(&s.topic_id) {
                topics.push(s.topic_id.clone());
            }
        }
        Ok(topics)
    }

    async fn study_streak_days(&self, user_id: &str) -> Result<u32, EngineError> {
        let state = self.state.read();
        let mut days: Vec<chrono::NaiveDate> = state
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.completed)
            .map(|s| s.started_at.date_naive())
            .collect();
        days.sort();
        days.dedup();
        Ok(streak_from_days(&days, Utc::now().date_naive()))
    }

    async fn schedule_preferences(
        &self,
        user_id: &str,
    ) -> Result<UserSchedulePreferences, EngineError> {
        let state = self.state.read();
        Ok(state.preferences.get(user_id).cloned().unwrap_or_default())
    }
}

/// Count consecutive active days backwards from today. A streak that ended
/// yesterday still counts; a gap before that breaks it.
pub(crate) fn streak_from_days(sorted_days: &[chrono::NaiveDate], today: chrono::NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut cursor = today;

    let mut iter = sorted_days.iter().rev().peekable();
    if let Some(&&latest) = iter.peek() {
        if latest == today - Duration::days(1) {
            cursor = latest;
        }
    }

    for &day in sorted_days.iter().rev() {
        if day == cursor {
            streak += 1;
            cursor = cursor - Duration::days(1);
        } else if day < cursor {
            break;
        }
    }
    streak
}
