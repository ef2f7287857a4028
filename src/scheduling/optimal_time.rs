//! Ranked candidate study slots over a horizon.
//!
//! Crosses the user's observed peak hours with their day/time preferences
//! and produces explainable, confidence-scored suggestions. Candidates at
//! or before "now" are never emitted.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::study_pattern::{format_hour_12, PeakWindow};
use crate::config::SuggestionParams;
use crate::types::{OptimalTimeSuggestion, SessionKind};

/// Later-ranked peak hours score slightly lower.
const HOUR_RANK_PENALTY: f64 = 0.1;
/// Sooner days rank marginally ahead of identical later slots.
const DAY_OFFSET_PENALTY: f64 = 0.01;
const CANONICAL_PEAK_BONUS: f64 = 0.05;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSchedulePreferences {
    /// Days the user is willing to study; `None` means every day.
    pub allowed_weekdays: Option<Vec<Weekday>>,
    pub earliest_hour: Option<u32>,
    pub latest_hour: Option<u32>,
}

impl UserSchedulePreferences {
    fn allows_day(&self, day: Weekday) -> bool {
        match &self.allowed_weekdays {
            Some(days) => days.contains(&day),
            None => true,
        }
    }

    fn allows_hour(&self, hour: u32) -> bool {
        if let Some(earliest) = self.earliest_hour {
            if hour < earliest {
                return false;
            }
        }
        if let Some(latest) = self.latest_hour {
            if hour > latest {
                return false;
            }
        }
        true
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Generate ranked study-slot suggestions.
///
/// One candidate per (day, hour, topic) when the user has topics, else one
/// per (day, hour); ranked by confidence descending and capped.
pub fn suggest_optimal_times(
    prefs: &UserSchedulePreferences,
    horizon_days: u32,
    peak: &PeakWindow,
    topics: &[String],
    params: &SuggestionParams,
    now: DateTime<Utc>,
) -> Vec<OptimalTimeSuggestion> {
    // Without observed peaks, fall back to the canonical set so a new user
    // still gets suggestions.
    let hours: Vec<u32> = if peak.hours.is_empty() {
        params.canonical_peak_hours.clone()
    } else {
        peak.hours.clone()
    };

    let mut suggestions = Vec::new();

    for offset in 0..horizon_days as i64 {
        let date = now.date_naive() + Duration::days(offset);
        if !prefs.allows_day(date.weekday()) {
            continue;
        }

        for (rank, &hour) in hours.iter().enumerate() {
            if !prefs.allows_hour(hour) {
                continue;
            }
            let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            let candidate = Utc.from_utc_datetime(&naive);
            if candidate <= now {
                continue;
            }

            let is_canonical = params.canonical_peak_hours.contains(&hour);
            let confidence = (peak.confidence.max(0.2) - rank as f64 * HOUR_RANK_PENALTY
                - offset as f64 * DAY_OFFSET_PENALTY
                + if is_canonical { CANONICAL_PEAK_BONUS } else { 0.0 })
            .clamp(0.0, 1.0);

            let weekday = weekday_name(date.weekday());
            let reasoning = format!(
                "{} at {} has been a productive window in your study history",
                weekday,
                format_hour_12(hour)
            );

            let mut factors = BTreeMap::new();
            factors.insert("hour".to_string(), serde_json::json!(hour));
            factors.insert(
                "patternConfidence".to_string(),
                serde_json::json!(peak.confidence),
            );
            factors.insert("weekday".to_string(), serde_json::json!(weekday));
            factors.insert(
                "isCanonicalPeak".to_string(),
                serde_json::json!(is_canonical),
            );

            if topics.is_empty() {
                suggestions.push(OptimalTimeSuggestion {
                    suggested_at: candidate,
                    confidence,
                    reasoning,
                    factors,
                    topic_id: None,
                    kind: SessionKind::Practice,
                });
            } else {
                for topic in topics {
                    suggestions.push(OptimalTimeSuggestion {
                        suggested_at: candidate,
                        confidence,
                        reasoning: reasoning.clone(),
                        factors: factors.clone(),
                        topic_id: Some(topic.clone()),
                        kind: SessionKind::Review,
                    });
                }
            }
        }
    }

    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    suggestions.truncate(params.max_suggestions);

    tracing::debug!(
        count = suggestions.len(),
        horizon_days,
        peak_hours = ?hours,
        "optimal time suggestions generated"
    );

    suggestions
}
