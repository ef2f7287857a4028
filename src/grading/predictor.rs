//! Target-grade feasibility estimation.
//!
//! Compares aggregate performance so far against the target grade's
//! percentage boundary and folds in a recent-vs-historical trend.

use serde::Serialize;

use crate::config::GradingParams;
use crate::grading::boundary::BoundaryTable;
use crate::types::{AssessmentPerformanceRecord, Tier};

/// Recent-mean-vs-earlier-mean gap (percentage points) past which the
/// performance trend counts as moving.
const TREND_GAP_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTrend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionLabel {
    Likely,
    Possible,
    Challenging,
    Unlikely,
    InvalidTarget,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub prediction: PredictionLabel,
    /// 0-100.
    pub confidence: u8,
    pub message: String,
    pub current_percentage: f64,
    pub target_percentage: Option<f64>,
    pub improvement_needed: Option<f64>,
    pub trend: PerformanceTrend,
    pub target_grade: String,
    pub tier: Tier,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn classify_trend(records: &[AssessmentPerformanceRecord], recent_window: usize) -> PerformanceTrend {
    let mut sorted: Vec<&AssessmentPerformanceRecord> = records.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.completed_at));

    let window = recent_window.min(sorted.len());
    let (recent, earlier) = sorted.split_at(window);
    if earlier.is_empty() {
        return PerformanceTrend::InsufficientData;
    }

    let mean = |rs: &[&AssessmentPerformanceRecord]| {
        rs.iter().map(|r| r.percentage()).sum::<f64>() / rs.len() as f64
    };
    let gap = mean(recent) - mean(earlier);

    if gap > TREND_GAP_PCT {
        PerformanceTrend::Improving
    } else if gap < -TREND_GAP_PCT {
        PerformanceTrend::Declining
    } else {
        PerformanceTrend::Stable
    }
}

/// Estimate how reachable a target grade is from recent assessments.
///
/// Sparse data degrades to sentinel labels (`insufficient_data`,
/// `invalid_target`) rather than erroring: callers always get a renderable
/// result.
pub fn predict_grade(
    records: &[AssessmentPerformanceRecord],
    target_grade: &str,
    table: &BoundaryTable,
    requested_tier: Option<Tier>,
    params: &GradingParams,
) -> PredictionResult {
    if records.is_empty() {
        return PredictionResult {
            prediction: PredictionLabel::InsufficientData,
            confidence: 0,
            message: "Complete a few quizzes or past papers before predicting a grade"
                .to_string(),
            current_percentage: 0.0,
            target_percentage: None,
            improvement_needed: None,
            trend: PerformanceTrend::InsufficientData,
            target_grade: target_grade.to_string(),
            tier: requested_tier.unwrap_or(Tier::Single),
        };
    }

    let total_achieved: i64 = records.iter().map(|r| r.marks_achieved as i64).sum();
    let total_marks: i64 = records.iter().map(|r| r.marks_total as i64).sum();
    let current_pct = if total_marks > 0 {
        total_achieved as f64 / total_marks as f64 * 100.0
    } else {
        0.0
    };

    let tier = table.select_tier(requested_tier, current_pct, params);

    let Some(target) = table.tiers.get(&tier).and_then(|m| m.get(target_grade)) else {
        return PredictionResult {
            prediction: PredictionLabel::InvalidTarget,
            confidence: 0,
            message: format!(
                "Grade {target_grade} is not awarded on the {} tier",
                tier.as_str()
            ),
            current_percentage: round1(current_pct),
            target_percentage: None,
            improvement_needed: None,
            trend: classify_trend(records, params.recent_window),
            target_grade: target_grade.to_string(),
            tier,
        };
    };

    let improvement_needed = target.percentage_mark - current_pct;
    let trend = classify_trend(records, params.recent_window);
    let improving = trend == PerformanceTrend::Improving;

    let (prediction, confidence, message) = if improvement_needed <= params.likely_band {
        (
            PredictionLabel::Likely,
            85,
            format!("You are on track for grade {target_grade} — keep up the current routine"),
        )
    } else if improvement_needed <= params.possible_band {
        if improving {
            (
                PredictionLabel::Possible,
                70,
                format!(
                    "Grade {target_grade} is within reach — your recent results are trending up"
                ),
            )
        } else {
            (
                PredictionLabel::Challenging,
                45,
                format!(
                    "Grade {target_grade} needs a {:.0}-point lift — focus revision on weak topics",
                    improvement_needed
                ),
            )
        }
    } else if improvement_needed <= params.challenging_band {
        if improving {
            (
                PredictionLabel::Challenging,
                40,
                format!(
                    "Grade {target_grade} is a stretch, but your trajectory is positive"
                ),
            )
        } else {
            (
                PredictionLabel::Unlikely,
                20,
                format!(
                    "Grade {target_grade} needs a {:.0}-point improvement — consider a revised plan",
                    improvement_needed
                ),
            )
        }
    } else {
        (
            PredictionLabel::Unlikely,
            10,
            format!(
                "Grade {target_grade} is far from current performance — an adjusted target may help"
            ),
        )
    };

    tracing::debug!(
        target_grade,
        tier = tier.as_str(),
        current_pct,
        improvement_needed,
        ?trend,
        ?prediction,
        "grade prediction computed"
    );

    PredictionResult {
        prediction,
        confidence,
        message,
        current_percentage: round1(current_pct),
        target_percentage: Some(target.percentage_mark),
        improvement_needed: Some(round1(improvement_needed)),
        trend,
        target_grade: target_grade.to_string(),
        tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::boundary::reference_table;
    use crate::types::AssessmentKind;
    use chrono::{Duration, TimeZone, Utc};

    fn record(days_ago: i64, achieved: i32, total: i32) -> AssessmentPerformanceRecord {
        let base = Utc.with_ymd_and_hms(2026, 6, 1, 16, 0, 0).unwrap();
        AssessmentPerformanceRecord {
            score: achieved as f64 / total as f64 * 100.0,
            marks_achieved: achieved,
            marks_total: total,
            kind: AssessmentKind::Quiz,
            completed_at: base - Duration::days(days_ago),
        }
    }

    fn params() -> GradingParams {
        GradingParams::default()
    }

    #[test]
    fn no_records_is_insufficient_data() {
        let table = reference_table("AQA", "8300").unwrap();
        let result = predict_grade(&[], "5", &table, None, &params());
        assert_eq!(result.prediction, PredictionLabel::InsufficientData);
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn small_gap_is_always_likely() {
        let table = reference_table("AQA", "8300").unwrap();
        // Aggregate 75% against the Higher grade-8 boundary at 77.5%:
        // gap 2.5 points, inside the likely band whatever the trend.
        let declining = vec![
            record(0, 70, 100),
            record(1, 70, 100),
            record(2, 70, 100),
            record(3, 70, 100),
            record(4, 70, 100),
            record(30, 85, 100),
            record(31, 90, 100),
        ];
        let result = predict_grade(&declining, "8", &table, Some(Tier::Higher), &params());
        assert_eq!(result.trend, PerformanceTrend::Declining);
        assert_eq!(result.prediction, PredictionLabel::Likely);
        assert_eq!(result.confidence, 85);
    }

    #[test]
    fn already_above_target_is_likely() {
        let table = reference_table("AQA", "8300").unwrap();
        let records = vec![record(0, 90, 100), record(1, 92, 100)];
        let result = predict_grade(&records, "7", &table, None, &params());
        assert_eq!(result.prediction, PredictionLabel::Likely);
        assert!(result.improvement_needed.unwrap() < 0.0);
    }

    #[test]
    fn medium_gap_depends_on_trend() {
        let table = reference_table("AQA", "8300").unwrap();
        // Aggregate ~65%; grade 8 boundary 77.5% -> gap ~12.5 points.
        let improving = vec![
            record(0, 72, 100),
            record(1, 70, 100),
            record(2, 70, 100),
            record(3, 68, 100),
            record(4, 68, 100),
            record(30, 51, 100),
            record(31, 56, 100),
        ];
        let result = predict_grade(&improving, "8", &table, Some(Tier::Higher), &params());
        assert_eq!(result.trend, PerformanceTrend::Improving);
        assert_eq!(result.prediction, PredictionLabel::Possible);
        assert_eq!(result.confidence, 70);

        let flat = vec![record(0, 65, 100), record(30, 65, 100)];
        let result = predict_grade(&flat, "8", &table, Some(Tier::Higher), &params());
        assert_eq!(result.prediction, PredictionLabel::Challenging);
        assert_eq!(result.confidence, 45);
    }

    #[test]
    fn wide_gap_is_unlikely() {
        let table = reference_table("AQA", "8300").unwrap();
        let records = vec![record(0, 55, 100), record(30, 55, 100)];
        // Gap to grade 9 (89.2%) is ~34 points.
        let result = predict_grade(&records, "9", &table, Some(Tier::Higher), &params());
        assert_eq!(result.prediction, PredictionLabel::Unlikely);
        assert_eq!(result.confidence, 10);
    }

    #[test]
    fn missing_grade_in_tier_is_invalid_target() {
        let table = reference_table("AQA", "8300").unwrap();
        // Grade 9 is not awarded on Foundation.
        let records = vec![record(0, 30, 100)];
        let result = predict_grade(&records, "9", &table, None, &params());
        assert_eq!(result.tier, Tier::Foundation);
        assert_eq!(result.prediction, PredictionLabel::InvalidTarget);
    }

    #[test]
    fn single_record_has_insufficient_trend_but_still_predicts() {
        let table = reference_table("AQA", "8300").unwrap();
        let records = vec![record(0, 80, 100)];
        let result = predict_grade(&records, "8", &table, Some(Tier::Higher), &params());
        assert_eq!(result.trend, PerformanceTrend::InsufficientData);
        assert_eq!(result.prediction, PredictionLabel::Likely);
    }
}
