//! Confidence trend classification and one-step forecast.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TrendParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum TrendDirection {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: DateTime<Utc>,
    pub confidence: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub trend: TrendDirection,
    /// (last - first) / count, rounded to 2 decimals.
    pub improvement_rate: f64,
    pub points: Vec<TrendPoint>,
    /// One-step-ahead confidence, rounded to 1 decimal. `None` when there
    /// are too few points to say anything.
    pub forecast: Option<f64>,
    pub total_improvement: i32,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Classify a topic's confidence history and forecast the next rating.
///
/// Points are sorted ascending by date before anything else, so the caller
/// may pass history in whatever order the store returned it.
pub fn analyze_confidence_trend(points: &[TrendPoint], params: &TrendParams) -> TrendResult {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);

    if sorted.len() < params.min_points {
        return TrendResult {
            trend: TrendDirection::Stable,
            improvement_rate: 0.0,
            points: sorted,
            forecast: None,
            total_improvement: 0,
        };
    }

    let first = sorted.first().map(|p| p.confidence).unwrap_or(0);
    let last = sorted.last().map(|p| p.confidence).unwrap_or(0);
    let rate = (last - first) as f64 / sorted.len() as f64;

    let trend = if rate > params.improving_threshold {
        TrendDirection::Improving
    } else if rate < params.declining_threshold {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    let forecast = match trend {
        TrendDirection::Improving if sorted.len() >= params.forecast_min_points => {
            let reference = sorted[sorted.len() - params.forecast_min_points].confidence;
            let extrapolated = last as f64 + (last - reference) as f64 / 2.0;
            extrapolated.min(10.0)
        }
        TrendDirection::Declining => (last as f64 - params.decline_step).max(1.0),
        _ => last as f64,
    };

    TrendResult {
        trend,
        improvement_rate: round2(rate),
        points: sorted,
        forecast: Some(round1(forecast)),
        total_improvement: last - first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn points(confidences: &[i32]) -> Vec<TrendPoint> {
        confidences
            .iter()
            .enumerate()
            .map(|(i, &c)| TrendPoint {
                date: Utc.with_ymd_and_hms(2026, 5, 1 + i as u32, 18, 0, 0).unwrap(),
                confidence: c,
            })
            .collect()
    }

    #[test]
    fn single_point_is_stable_with_no_forecast() {
        let result = analyze_confidence_trend(&points(&[7]), &TrendParams::default());
        assert_eq!(result.trend, TrendDirection::Stable);
        assert!(result.forecast.is_none());
        assert_eq!(result.improvement_rate, 0.0);
    }

    #[test]
    fn two_point_jump_is_improving() {
        let result = analyze_confidence_trend(&points(&[5, 9]), &TrendParams::default());
        assert_eq!(result.trend, TrendDirection::Improving);
        assert_eq!(result.improvement_rate, 2.0);
        assert_eq!(result.total_improvement, 4);
        // Two points is below the extrapolation floor: hold the last value.
        assert_eq!(result.forecast, Some(9.0));
    }

    #[test]
    fn improving_forecast_extrapolates_half_delta() {
        let result = analyze_confidence_trend(&points(&[2, 4, 8]), &TrendParams::default());
        assert_eq!(result.trend, TrendDirection::Improving);
        // last=8, third-from-last=2 -> 8 + 3 = 11, clamped to 10.
        assert_eq!(result.forecast, Some(10.0));
    }

    #[test]
    fn declining_forecast_steps_down() {
        let result = analyze_confidence_trend(&points(&[9, 5, 3]), &TrendParams::default());
        assert_eq!(result.trend, TrendDirection::Declining);
        assert_eq!(result.forecast, Some(2.5));
        assert_eq!(result.total_improvement, -6);
    }

    #[test]
    fn declining_forecast_never_drops_below_one() {
        let result = analyze_confidence_trend(&points(&[8, 4, 1]), &TrendParams::default());
        assert_eq!(result.trend, TrendDirection::Declining);
        assert_eq!(result.forecast, Some(1.0));
    }

    #[test]
    fn flat_series_holds_last_value() {
        let result = analyze_confidence_trend(&points(&[6, 6, 7]), &TrendParams::default());
        assert_eq!(result.trend, TrendDirection::Stable);
        assert_eq!(result.forecast, Some(7.0));
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let mut pts = points(&[5, 9]);
        pts.reverse();
        let result = analyze_confidence_trend(&pts, &TrendParams::default());
        assert_eq!(result.trend, TrendDirection::Improving);
        assert_eq!(result.points[0].confidence, 5);
    }
}
