//! Topic mastery scoring.
//!
//! Combines three capped signals into a 0-100 score: how many sessions the
//! user has completed, how much time they have put in, and their latest
//! self-reported confidence. The score maps onto five named levels.

use serde::Serialize;

use crate::config::MasteryWeights;
use crate::types::StudySessionRecord;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryComponents {
    pub session_score: f64,
    pub time_score: f64,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryResult {
    pub level: u8,
    pub level_name: &'static str,
    /// Equal to the raw mastery score, clamped to [0, 100].
    pub progress: f64,
    pub next_milestone: &'static str,
    pub components: MasteryComponents,
}

fn level_for(score: f64) -> (u8, &'static str, &'static str) {
    if score >= 80.0 {
        (5, "Expert", "Keep topics fresh with occasional reviews")
    } else if score >= 60.0 {
        (
            4,
            "Advanced",
            "Hold a confidence of 9+ across your next sessions to reach Expert",
        )
    } else if score >= 40.0 {
        (
            3,
            "Intermediate",
            "Add regular review sessions to push towards Advanced",
        )
    } else if score >= 20.0 {
        (
            2,
            "Novice",
            "Keep practising steadily to reach Intermediate",
        )
    } else {
        (1, "Beginner", "Complete your first study session")
    }
}

/// Score one (user, topic) session history. Only completed sessions count;
/// an empty history degrades to level 1 / progress 0 rather than erroring.
pub fn analyze_mastery(sessions: &[StudySessionRecord], weights: &MasteryWeights) -> MasteryResult {
    let completed: Vec<&StudySessionRecord> =
        sessions.iter().filter(|s| s.completed).collect();

    if completed.is_empty() {
        return MasteryResult {
            level: 1,
            level_name: "Beginner",
            progress: 0.0,
            next_milestone: "Complete your first study session",
            components: MasteryComponents {
                session_score: 0.0,
                time_score: 0.0,
                confidence_score: 0.0,
            },
        };
    }

    let session_score =
        (completed.len() as f64 * weights.points_per_session).min(weights.session_cap);

    let total_minutes: i64 = completed.iter().map(|s| s.duration_minutes).sum();
    let time_score = (total_minutes as f64 / weights.minutes_per_time_point).min(weights.time_cap);

    let latest_confidence = completed
        .iter()
        .filter(|s| s.confidence_after.is_some())
        .max_by_key(|s| s.started_at)
        .and_then(|s| s.confidence_after)
        .unwrap_or(weights.default_confidence);
    let confidence_score =
        (latest_confidence as f64 * weights.confidence_multiplier).min(weights.confidence_cap);

    let score = (session_score + time_score + confidence_score).clamp(0.0, 100.0);
    let (level, level_name, next_milestone) = level_for(score);

    MasteryResult {
        level,
        level_name,
        progress: score,
        next_milestone,
        components: MasteryComponents {
            session_score,
            time_score,
            confidence_score,
        },
    }
}
