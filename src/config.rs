use serde::{Deserialize, Serialize};

/// Mastery score weighting: 40 points from session count, 30 from cumulative
/// time, 30 from latest confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryWeights {
    pub points_per_session: f64,
    pub session_cap: f64,
    pub minutes_per_time_point: f64,
    pub time_cap: f64,
    pub confidence_multiplier: f64,
    pub confidence_cap: f64,
    pub default_confidence: i32,
}

impl Default for MasteryWeights {
    fn default() -> Self {
        Self {
            points_per_session: 4.0,
            session_cap: 40.0,
            minutes_per_time_point: 10.0,
            time_cap: 30.0,
            confidence_multiplier: 3.0,
            confidence_cap: 30.0,
            default_confidence: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendParams {
    /// Improvement-rate cutoff above which a series counts as improving.
    pub improving_threshold: f64,
    /// Cutoff below which a series counts as declining (negative).
    pub declining_threshold: f64,
    /// Step subtracted from the last point when forecasting a decline.
    pub decline_step: f64,
    /// Points required before a trend can be classified at all.
    pub min_points: usize,
    /// Points required before an improving forecast extrapolates.
    pub forecast_min_points: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            improving_threshold: 0.5,
            declining_threshold: -0.5,
            decline_step: 0.5,
            min_points: 2,
            forecast_min_points: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternParams {
    /// Reliability floor: buckets with fewer samples are ignored.
    pub min_bucket_samples: usize,
    /// Session-length band edges in minutes; the observed optimum is
    /// snapped up to the first edge that covers it.
    pub duration_bands: Vec<i64>,
    pub default_duration: i64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            min_bucket_samples: 2,
            duration_bands: vec![15, 25, 45, 60],
            default_duration: 25,
        }
    }
}

/// Confidence-to-interval mapping for review scheduling. Intervals step
/// down 7 -> 3 -> 1 -> 0 days at confidence thresholds 8, 6, 4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewIntervals {
    pub high_threshold: i32,
    pub high_days: i64,
    pub medium_threshold: i32,
    pub medium_days: i64,
    pub low_threshold: i32,
    pub low_days: i64,
    pub floor_days: i64,
    pub default_confidence: i32,
}

impl Default for ReviewIntervals {
    fn default() -> Self {
        Self {
            high_threshold: 8,
            high_days: 7,
            medium_threshold: 6,
            medium_days: 3,
            low_threshold: 4,
            low_days: 1,
            floor_days: 0,
            default_confidence: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionParams {
    pub max_suggestions: usize,
    /// Hours widely treated as productive defaults; used as a factor in the
    /// candidate explanation, not as a filter.
    pub canonical_peak_hours: Vec<u32>,
}

impl Default for SuggestionParams {
    fn default() -> Self {
        Self {
            max_suggestions: 10,
            canonical_peak_hours: vec![9, 14, 20],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingParams {
    /// Tier auto-selection: below this percentage the Foundation tier is
    /// assumed when both tiers exist for a subject.
    pub foundation_cutoff_pct: f64,
    /// Improvement-needed bands for grade prediction, in percentage points.
    pub likely_band: f64,
    pub possible_band: f64,
    pub challenging_band: f64,
    /// How many of the most recent records form the "recent" mean when
    /// classifying a performance trend.
    pub recent_window: usize,
}

impl Default for GradingParams {
    fn default() -> Self {
        Self {
            foundation_cutoff_pct: 50.0,
            likely_band: 5.0,
            possible_band: 15.0,
            challenging_band: 25.0,
            recent_window: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationParams {
    pub max_items: usize,
    /// Streaks longer than this no longer need a motivation nudge.
    pub streak_nudge_max: u32,
}

impl Default for RecommendationParams {
    fn default() -> Self {
        Self {
            max_items: 5,
            streak_nudge_max: 6,
        }
    }
}

/// Single source of truth for every heuristic threshold in the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mastery: MasteryWeights,
    pub trend: TrendParams,
    pub pattern: PatternParams,
    pub review: ReviewIntervals,
    pub suggestions: SuggestionParams,
    pub grading: GradingParams,
    pub recommendations: RecommendationParams,
}
