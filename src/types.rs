use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum SessionKind {
    Review,
    #[default]
    Practice,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Practice => "practice",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "review" => Self::Review,
            _ => Self::Practice,
        }
    }
}

/// One logged study session. Produced by the session-logging flow; the
/// engine only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub topic_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub confidence_before: Option<i32>,
    pub confidence_after: Option<i32>,
    pub kind: SessionKind,
    pub completed: bool,
    pub notes: Option<String>,
}

impl StudySessionRecord {
    /// Boundary validation. Bad records fail fast here instead of skewing
    /// downstream scores; sparse-but-valid records are always accepted.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.duration_minutes <= 0 {
            return Err(EngineError::Validation(format!(
                "session duration must be positive, got {}",
                self.duration_minutes
            )));
        }
        for (label, value) in [
            ("confidenceBefore", self.confidence_before),
            ("confidenceAfter", self.confidence_after),
        ] {
            if let Some(v) = value {
                if !(1..=10).contains(&v) {
                    return Err(EngineError::Validation(format!(
                        "{label} must be in 1..=10, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The post-session confidence is only meaningful once the session has
    /// actually been completed.
    pub fn effective_confidence_after(&self) -> Option<i32> {
        if self.completed {
            self.confidence_after
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum AssessmentKind {
    #[default]
    Quiz,
    PastPaper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPerformanceRecord {
    pub score: f64,
    pub marks_achieved: i32,
    pub marks_total: i32,
    pub kind: AssessmentKind,
    pub completed_at: DateTime<Utc>,
}

impl AssessmentPerformanceRecord {
    pub fn percentage(&self) -> f64 {
        if self.marks_total <= 0 {
            return 0.0;
        }
        self.marks_achieved as f64 / self.marks_total as f64 * 100.0
    }
}

/// Exam-board difficulty band. Boards without tiering collapse to `Single`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Foundation,
    Higher,
    Single,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foundation => "foundation",
            Self::Higher => "higher",
            Self::Single => "single",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "foundation" | "f" => Some(Self::Foundation),
            "higher" | "h" => Some(Self::Higher),
            "single" => Some(Self::Single),
            _ => None,
        }
    }
}

/// Minimum marks required for one grade within a tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBoundary {
    pub raw_mark: i32,
    pub percentage_mark: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    PeakHours,
    BestDays,
    Duration,
    TopicPreference,
    ConfidenceTrend,
    Consistency,
}

/// A computed per-user study pattern summary. Recomputed on every analysis
/// call; callers may cache the snapshot but the engine never does.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPattern {
    pub pattern_type: PatternType,
    pub summary: String,
    pub confidence: f64,
    pub sample_size: usize,
}

/// A ranked candidate study slot. Ephemeral output: the caller decides
/// whether to persist or accept it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalTimeSuggestion {
    pub suggested_at: DateTime<Utc>,
    pub confidence: f64,
    pub reasoning: String,
    pub factors: BTreeMap<String, serde_json::Value>,
    pub topic_id: Option<String>,
    pub kind: SessionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub kind: String,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
}
