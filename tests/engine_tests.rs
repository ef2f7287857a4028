//! Integration tests for the analytics engine against the in-memory
//! repository, with a pinned clock for determinism.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use std::sync::Arc;
use uuid::Uuid;

use studytrack_engine::analysis::confidence_trend::TrendDirection;
use studytrack_engine::grading::boundary::BoundaryTable;
use studytrack_engine::grading::predictor::PredictionLabel;
use studytrack_engine::types::{
    AssessmentKind, AssessmentPerformanceRecord, Priority, SessionKind, StudySessionRecord, Tier,
};
use studytrack_engine::{AnalyticsEngine, EngineError, InMemoryRepository};

// 2026-06-10 12:00 UTC, a Wednesday.
fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
}

fn engine(repo: Arc<InMemoryRepository>) -> AnalyticsEngine<InMemoryRepository> {
    AnalyticsEngine::new(repo).with_now(fixed_now())
}

fn session(
    topic: &str,
    days_ago: i64,
    hour: u32,
    minutes: i64,
    before: Option<i32>,
    after: Option<i32>,
) -> StudySessionRecord {
    let date = fixed_now().date_naive() - Duration::days(days_ago);
    StudySessionRecord {
        id: Uuid::new_v4(),
        user_id: "alice".to_string(),
        topic_id: topic.to_string(),
        started_at: Utc
            .from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap()),
        duration_minutes: minutes,
        confidence_before: before,
        confidence_after: after,
        kind: SessionKind::Practice,
        completed: true,
        notes: None,
    }
}

fn assessment(days_ago: i64, achieved: i32, total: i32) -> AssessmentPerformanceRecord {
    AssessmentPerformanceRecord {
        score: achieved as f64 / total as f64 * 100.0,
        marks_achieved: achieved,
        marks_total: total,
        kind: AssessmentKind::PastPaper,
        completed_at: fixed_now() - Duration::days(days_ago),
    }
}

#[tokio::test]
async fn unseen_topic_is_beginner_with_zero_progress() {
    let repo = Arc::new(InMemoryRepository::new());
    let engine = engine(repo);

    let result = engine.analyze_mastery("alice", "algebra").await.unwrap();
    assert_eq!(result.level, 1);
    assert_eq!(result.progress, 0.0);
}

#[tokio::test]
async fn mastery_reflects_seeded_history() {
    let repo = Arc::new(InMemoryRepository::new());
    for i in 0..10 {
        repo.insert_session(session("algebra", i, 9, 30, Some(4), Some(8)))
            .unwrap();
    }
    let engine = engine(repo);

    let result = engine.analyze_mastery("alice", "algebra").await.unwrap();
    // 10 sessions -> 40, 300 minutes -> 30, confidence 8 -> 24.
    assert_eq!(result.progress, 94.0);
    assert_eq!(result.level, 5);
}

#[tokio::test]
async fn confidence_trend_over_topic_history() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.insert_session(session("algebra", 2, 9, 25, Some(4), Some(5)))
        .unwrap();
    repo.insert_session(session("algebra", 1, 9, 25, Some(5), Some(9)))
        .unwrap();
    let engine = engine(repo);

    let result = engine
        .analyze_confidence_trend("alice", "algebra")
        .await
        .unwrap();
    assert_eq!(result.trend, TrendDirection::Improving);
    assert_eq!(result.improvement_rate, 2.0);
}

#[tokio::test]
async fn next_review_is_never_in_the_past() {
    let repo = Arc::new(InMemoryRepository::new());
    // Old session with middling confidence: naive schedule is long past.
    repo.insert_session(session("algebra", 30, 9, 25, Some(4), Some(5)))
        .unwrap();
    let engine = engine(repo);

    let next = engine
        .recommend_next_review("alice", "algebra")
        .await
        .unwrap();
    assert_eq!(next, fixed_now() + Duration::days(1));
}

#[tokio::test]
async fn best_hour_feeds_back_into_suggestions() {
    let repo = Arc::new(InMemoryRepository::new());
    // Strong gains at 9am on two separate days.
    repo.insert_session(session("algebra", 3, 9, 25, Some(3), Some(7)))
        .unwrap();
    repo.insert_session(session("algebra", 2, 9, 25, Some(3), Some(7)))
        .unwrap();
    let engine = engine(repo);

    let report = engine.study_pattern_report("alice").await.unwrap();
    assert_eq!(report.best_hour, Some(9));

    let suggestions = engine.suggest_optimal_times("alice", 7).await.unwrap();
    assert!(!suggestions.is_empty());
    assert!(suggestions
        .iter()
        .any(|s| s.suggested_at.hour() == 9 && s.suggested_at > fixed_now()));
    // The user has one topic, so suggestions carry it.
    assert!(suggestions
        .iter()
        .all(|s| s.topic_id.as_deref() == Some("algebra")));
}

#[tokio::test]
async fn best_hour_survives_into_suggestions_despite_negative_gains() {
    let repo = Arc::new(InMemoryRepository::new());
    // Two rated 10am sessions, both losing a point: 10 is still the only
    // hour the user studies at and must not be displaced by the canonical
    // fallback slots.
    repo.insert_session(session("algebra", 3, 10, 25, Some(6), Some(5)))
        .unwrap();
    repo.insert_session(session("algebra", 2, 10, 25, Some(6), Some(5)))
        .unwrap();
    let engine = engine(repo);

    let report = engine.study_pattern_report("alice").await.unwrap();
    assert_eq!(report.best_hour, Some(10));

    let suggestions = engine.suggest_optimal_times("alice", 7).await.unwrap();
    assert!(suggestions
        .iter()
        .any(|s| s.suggested_at.hour() == 10 && s.suggested_at > fixed_now()));
}

#[tokio::test]
async fn grade_resolution_uses_reference_catalog() {
    let repo = Arc::new(InMemoryRepository::new());
    let engine = engine(repo);

    let result = engine
        .resolve_grade(186, 220, "AQA", "8300", Some(Tier::Higher))
        .await
        .unwrap();
    assert_eq!(result.grade, "8");
    assert_eq!(result.boundary_mark, Some(186));
}

#[tokio::test]
async fn store_boundaries_take_precedence_over_reference() {
    let repo = Arc::new(InMemoryRepository::new());
    // A store table with a deliberately different grade-8 boundary.
    repo.insert_boundaries(
        BoundaryTable::new("AQA", "8300").with_tier(Tier::Higher, &[("8", 200, 83.3)]),
    );
    let engine = engine(repo);

    let result = engine
        .resolve_grade(186, 240, "AQA", "8300", Some(Tier::Higher))
        .await
        .unwrap();
    assert_eq!(result.grade, "U");
}

#[tokio::test]
async fn unknown_subject_is_no_boundary_data() {
    let repo = Arc::new(InMemoryRepository::new());
    let engine = engine(repo);

    let err = engine.resolve_grade(50, 100, "OCR", "J560", None).await;
    assert!(matches!(err, Err(EngineError::NoBoundaryData { .. })));
}

#[tokio::test]
async fn small_improvement_gap_predicts_likely() {
    let repo = Arc::new(InMemoryRepository::new());
    for i in 0..4 {
        repo.insert_performance("alice", "8300", assessment(i, 76, 100));
    }
    let engine = engine(repo);

    let result = engine
        .predict_grade_for_user("alice", "8", "AQA", "8300", Some(Tier::Higher))
        .await
        .unwrap();
    // 76% against the 77.5% grade-8 boundary.
    assert_eq!(result.prediction, PredictionLabel::Likely);
    assert_eq!(result.confidence, 85);
}

#[tokio::test]
async fn recommendations_are_capped_and_ordered() {
    let repo = Arc::new(InMemoryRepository::new());
    // Six topics, each with a single stale session: every topic is both
    // low-mastery and overdue for review.
    for topic in ["a", "b", "c", "d", "e", "f"] {
        repo.insert_session(session(topic, 20, 9, 20, Some(4), Some(3)))
            .unwrap();
    }
    let engine = engine(repo);

    let items = engine.get_recommendations("alice").await.unwrap();
    assert!(items.len() <= 5);
    assert!(items.windows(2).all(|w| w[0].priority <= w[1].priority));
}

#[tokio::test]
async fn fresh_user_gets_streak_starter() {
    let repo = Arc::new(InMemoryRepository::new());
    let engine = engine(repo);

    let items = engine.get_recommendations("alice").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, "streak");
    assert_eq!(items[0].priority, Priority::High);
}

#[tokio::test]
async fn pattern_summaries_cover_every_type() {
    let repo = Arc::new(InMemoryRepository::new());
    for i in 0..5 {
        repo.insert_session(session("algebra", i, 9, 25, Some(4), Some(6)))
            .unwrap();
    }
    let engine = engine(repo);

    let patterns = engine.study_patterns("alice").await.unwrap();
    assert_eq!(patterns.len(), 6);
    assert!(patterns.iter().all(|p| (0.0..=1.0).contains(&p.confidence)));
}
