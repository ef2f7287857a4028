//! Engine facade: the operations callers (HTTP layer, CLI) consume.
//!
//! Every operation fetches what it needs from the injected repository and
//! then runs a pure, synchronous computation. The engine holds no mutable
//! state of its own, so one instance is safely shared across requests.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::analysis::confidence_trend::{analyze_confidence_trend, TrendPoint, TrendResult};
use crate::analysis::mastery::{analyze_mastery, MasteryResult};
use crate::analysis::study_pattern::{
    analyze_study_patterns, pattern_summaries, StudyPatternReport,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grading::boundary::{reference_table, resolve_grade, BoundaryTable, GradeResult};
use crate::grading::predictor::{predict_grade, PredictionResult};
use crate::recommend::{aggregate, TopicSignals};
use crate::repository::SessionRepository;
use crate::scheduling::optimal_time::suggest_optimal_times;
use crate::scheduling::spaced_repetition::next_review_date;
use crate::types::{
    AssessmentPerformanceRecord, OptimalTimeSuggestion, Recommendation, StudyPattern,
    StudySessionRecord, Tier,
};

pub struct AnalyticsEngine<R: SessionRepository> {
    repo: Arc<R>,
    config: EngineConfig,
    now_override: Option<DateTime<Utc>>,
}

impl<R: SessionRepository> AnalyticsEngine<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            config: EngineConfig::default(),
            now_override: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Pin "now" for deterministic tests.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now_override = Some(now);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.now_override.unwrap_or_else(Utc::now)
    }

    /// Boundary lookup with declared precedence: primary store first, then
    /// the static reference catalog.
    async fn boundary_table(
        &self,
        board: &str,
        subject_code: &str,
    ) -> Result<BoundaryTable, EngineError> {
        if let Some(table) = self.repo.grade_boundaries(board, subject_code).await? {
            return Ok(table);
        }
        reference_table(board, subject_code).ok_or_else(|| EngineError::NoBoundaryData {
            board: board.to_string(),
            subject_code: subject_code.to_string(),
        })
    }

    pub async fn analyze_mastery(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<MasteryResult, EngineError> {
        let sessions = self.repo.sessions(user_id, Some(topic_id)).await?;
        let result = analyze_mastery(&sessions, &self.config.mastery);
        tracing::info!(
            user_id,
            topic_id,
            level = result.level,
            progress = result.progress,
            "mastery analyzed"
        );
        Ok(result)
    }

    pub async fn analyze_confidence_trend(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<TrendResult, EngineError> {
        let sessions = self.repo.sessions(user_id, Some(topic_id)).await?;
        Ok(analyze_confidence_trend(
            &trend_points(&sessions),
            &self.config.trend,
        ))
    }

    pub async fn recommend_next_review(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<DateTime<Utc>, EngineError> {
        let sessions = self.repo.sessions(user_id, Some(topic_id)).await?;
        Ok(next_review_date(&sessions, &self.config.review, self.now()))
    }

    pub async fn study_pattern_report(
        &self,
        user_id: &str,
    ) -> Result<StudyPatternReport, EngineError> {
        let sessions = self.repo.sessions(user_id, None).await?;
        Ok(analyze_study_patterns(&sessions, &self.config.pattern))
    }

    /// Keyed pattern summaries for the analytics surface.
    pub async fn study_patterns(&self, user_id: &str) -> Result<Vec<StudyPattern>, EngineError> {
        let sessions = self.repo.sessions(user_id, None).await?;
        let report = analyze_study_patterns(&sessions, &self.config.pattern);
        Ok(pattern_summaries(&sessions, &report))
    }

    pub async fn suggest_optimal_times(
        &self,
        user_id: &str,
        horizon_days: u32,
    ) -> Result<Vec<OptimalTimeSuggestion>, EngineError> {
        let sessions = self.repo.sessions(user_id, None).await?;
        let report = analyze_study_patterns(&sessions, &self.config.pattern);
        let prefs = self.repo.schedule_preferences(user_id).await?;
        let topics = self.repo.topics(user_id).await?;

        Ok(suggest_optimal_times(
            &prefs,
            horizon_days,
            &report.peak_window(),
            &topics,
            &self.config.suggestions,
            self.now(),
        ))
    }

    pub async fn resolve_grade(
        &self,
        achieved: i32,
        total: i32,
        board: &str,
        subject_code: &str,
        tier: Option<Tier>,
    ) -> Result<GradeResult, EngineError> {
        let table = self.boundary_table(board, subject_code).await?;
        resolve_grade(achieved, total, &table, tier, &self.config.grading)
    }

    pub async fn predict_grade(
        &self,
        records: &[AssessmentPerformanceRecord],
        target_grade: &str,
        board: &str,
        subject_code: &str,
        tier: Option<Tier>,
    ) -> Result<PredictionResult, EngineError> {
        let table = self.boundary_table(board, subject_code).await?;
        Ok(predict_grade(
            records,
            target_grade,
            &table,
            tier,
            &self.config.grading,
        ))
    }

    /// Convenience form that pulls the user's stored assessment history.
    pub async fn predict_grade_for_user(
        &self,
        user_id: &str,
        target_grade: &str,
        board: &str,
        subject_code: &str,
        tier: Option<Tier>,
    ) -> Result<PredictionResult, EngineError> {
        let records = self
            .repo
            .performance_records(user_id, Some(subject_code), None)
            .await?;
        self.predict_grade(&records, target_grade, board, subject_code, tier)
            .await
    }

    pub async fn get_recommendations(
        &self,
        user_id: &str,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let now = self.now();
        let topics = self.repo.topics(user_id).await?;

        let mut signals = Vec::with_capacity(topics.len());
        for topic_id in topics {
            let sessions = self.repo.sessions(user_id, Some(&topic_id)).await?;
            signals.push(TopicSignals {
                mastery: analyze_mastery(&sessions, &self.config.mastery),
                trend: analyze_confidence_trend(&trend_points(&sessions), &self.config.trend),
                next_review: next_review_date(&sessions, &self.config.review, now),
                topic_id,
            });
        }

        let streak = self.repo.study_streak_days(user_id).await?;
        let items = aggregate(&signals, streak, &self.config.recommendations, now);
        tracing::info!(user_id, count = items.len(), streak, "recommendations built");
        Ok(items)
    }
}

/// Completed sessions with a post-session rating, as trend points.
fn trend_points(sessions: &[StudySessionRecord]) -> Vec<TrendPoint> {
    sessions
        .iter()
        .filter_map(|s| {
            s.effective_confidence_after().map(|confidence| TrendPoint {
                date: s.started_at,
                confidence,
            })
        })
        .collect()
}
