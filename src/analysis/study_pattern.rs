//! Hour-of-day and day-of-week productivity analysis.
//!
//! Buckets completed sessions by when they happened and accumulates the
//! confidence gain (`after - before`) per bucket. Buckets are kept in
//! first-seen order so tie-breaks are deterministic for a stable input
//! ordering.

use chrono::{Datelike, Timelike};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::PatternParams;
use crate::types::{PatternType, StudyPattern, StudySessionRecord};

/// How many peak hours feed the time recommender.
const PEAK_HOUR_COUNT: usize = 3;
/// Sample count at which the pattern confidence saturates.
const CONFIDENCE_SATURATION_SAMPLES: f64 = 20.0;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourBucket {
    pub hour: u32,
    pub total_gain: i32,
    pub samples: usize,
}

impl HourBucket {
    pub fn avg_gain(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.total_gain as f64 / self.samples as f64
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub day: String,
    pub total_gain: i32,
    pub samples: usize,
}

impl DayBucket {
    pub fn avg_gain(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.total_gain as f64 / self.samples as f64
    }
}

/// The peak-hour set handed to the optimal-time recommender.
#[derive(Debug, Clone)]
pub struct PeakWindow {
    pub hours: Vec<u32>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPatternReport {
    /// 12-hour label such as "9:00 AM", or "insufficient_data".
    pub best_time: String,
    pub best_hour: Option<u32>,
    pub best_day: Option<String>,
    /// Coarse tag: "morning", "evening", or "insufficient_data".
    pub productivity_pattern: String,
    pub ideal_duration_minutes: i64,
    pub recommendations: Vec<String>,
    pub hour_buckets: Vec<HourBucket>,
    pub day_buckets: Vec<DayBucket>,
    pub sample_size: usize,
    pub confidence: f64,
}

impl StudyPatternReport {
    /// The best hour always makes the window, even when every bucket
    /// averages a non-positive gain; "least bad" still beats the
    /// canonical fallback slots for a user who never studies at those.
    pub fn peak_window(&self) -> PeakWindow {
        let mut ranked: Vec<&HourBucket> = self
            .hour_buckets
            .iter()
            .filter(|b| {
                b.samples >= 2 && (b.avg_gain() > 0.0 || Some(b.hour) == self.best_hour)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.avg_gain()
                .partial_cmp(&a.avg_gain())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        PeakWindow {
            hours: ranked
                .iter()
                .take(PEAK_HOUR_COUNT)
                .map(|b| b.hour)
                .collect(),
            confidence: self.confidence,
        }
    }
}

pub fn format_hour_12(hour: u32) -> String {
    match hour {
        0 => "12:00 AM".to_string(),
        12 => "12:00 PM".to_string(),
        h if h < 12 => format!("{h}:00 AM"),
        h => format!("{}:00 PM", h - 12),
    }
}

fn weekday_name(day: chrono::Weekday) -> &'static str {
    match day {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

/// Best bucket = highest average gain among buckets that clear the
/// reliability floor; first-seen order wins ties.
fn best_index(avgs: &[(f64, usize)], min_samples: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &(avg, samples)) in avgs.iter().enumerate() {
        if samples < min_samples {
            continue;
        }
        match best {
            Some((_, current)) if avg <= current => {}
            _ => best = Some((i, avg)),
        }
    }
    best.map(|(i, _)| i)
}

fn ideal_duration(sessions: &[&StudySessionRecord], params: &PatternParams) -> i64 {
    // Only sessions that actually moved confidence upward say anything
    // about an effective length.
    let mut groups: Vec<(i64, f64, usize)> = Vec::new();
    for s in sessions {
        let gain = match (s.confidence_before, s.confidence_after) {
            (Some(b), Some(a)) if a > b => (a - b) as f64,
            _ => continue,
        };
        let efficiency = gain / s.duration_minutes as f64;
        match groups.iter_mut().find(|(d, _, _)| *d == s.duration_minutes) {
            Some(group) => {
                group.1 += efficiency;
                group.2 += 1;
            }
            None => groups.push((s.duration_minutes, efficiency, 1)),
        }
    }

    let mut best: Option<(i64, f64)> = None;
    for (duration, total, n) in &groups {
        let avg = total / *n as f64;
        match best {
            Some((_, current)) if avg <= current => {}
            _ => best = Some((*duration, avg)),
        }
    }

    let Some((optimum, _)) = best else {
        return params.default_duration;
    };

    params
        .duration_bands
        .iter()
        .copied()
        .find(|&edge| edge >= optimum)
        .or_else(|| params.duration_bands.last().copied())
        .unwrap_or(params.default_duration)
}

/// Analyze a user's full session history for productivity windows.
pub fn analyze_study_patterns(
    sessions: &[StudySessionRecord],
    params: &PatternParams,
) -> StudyPatternReport {
    let eligible: Vec<&StudySessionRecord> = sessions
        .iter()
        .filter(|s| s.completed && s.confidence_before.is_some() && s.confidence_after.is_some())
        .collect();

    let mut hour_buckets: Vec<HourBucket> = Vec::new();
    let mut day_buckets: Vec<DayBucket> = Vec::new();

    for s in &eligible {
        let gain = s.confidence_after.unwrap() - s.confidence_before.unwrap();
        let hour = s.started_at.hour();
        match hour_buckets.iter_mut().find(|b| b.hour == hour) {
            Some(bucket) => {
                bucket.total_gain += gain;
                bucket.samples += 1;
            }
            None => hour_buckets.push(HourBucket {
                hour,
                total_gain: gain,
                samples: 1,
            }),
        }

        let day = weekday_name(s.started_at.weekday());
        match day_buckets.iter_mut().find(|b| b.day == day) {
            Some(bucket) => {
                bucket.total_gain += gain;
                bucket.samples += 1;
            }
            None => day_buckets.push(DayBucket {
                day: day.to_string(),
                total_gain: gain,
                samples: 1,
            }),
        }
    }

    let hour_avgs: Vec<(f64, usize)> = hour_buckets
        .iter()
        .map(|b| (b.avg_gain(), b.samples))
        .collect();
    let best_hour = best_index(&hour_avgs, params.min_bucket_samples)
        .map(|i| hour_buckets[i].hour);

    let day_avgs: Vec<(f64, usize)> = day_buckets
        .iter()
        .map(|b| (b.avg_gain(), b.samples))
        .collect();
    let best_day = best_index(&day_avgs, params.min_bucket_samples)
        .map(|i| day_buckets[i].day.clone());

    let ideal_duration_minutes = ideal_duration(&eligible, params);
    let confidence = pattern_confidence(eligible.len(), &hour_buckets);

    let best_time = best_hour
        .map(format_hour_12)
        .unwrap_or_else(|| "insufficient_data".to_string());
    let productivity_pattern = match best_hour {
        Some(h) if h < 12 => "morning".to_string(),
        Some(_) => "evening".to_string(),
        None => "insufficient_data".to_string(),
    };

    let mut recommendations = Vec::new();
    if let Some(hour) = best_hour {
        recommendations.push(format!(
            "Your confidence gains peak around {} — schedule demanding topics then",
            format_hour_12(hour)
        ));
    }
    if let Some(day) = &best_day {
        recommendations.push(format!(
            "{day} sessions show your biggest confidence gains"
        ));
    }
    recommendations.push(format!(
        "Sessions of about {ideal_duration_minutes} minutes give you the best return"
    ));
    if best_hour.is_none() && best_day.is_none() {
        recommendations.push(
            "Log a few more completed sessions with confidence ratings to unlock pattern insights"
                .to_string(),
        );
    }

    tracing::debug!(
        samples = eligible.len(),
        ?best_hour,
        best_day = best_day.as_deref(),
        ideal_duration_minutes,
        "study pattern analysis complete"
    );

    StudyPatternReport {
        best_time,
        best_hour,
        best_day,
        productivity_pattern,
        ideal_duration_minutes,
        recommendations,
        hour_buckets,
        day_buckets,
        sample_size: eligible.len(),
        confidence,
    }
}

fn pattern_confidence(samples: usize, hour_buckets: &[HourBucket]) -> f64 {
    if samples == 0 {
        return 0.0;
    }
    let sample_confidence = (samples as f64 / CONFIDENCE_SATURATION_SAMPLES).min(1.0);

    // Spread of hourly averages: a flat profile tells us little even with
    // plenty of samples.
    let avgs: Vec<f64> = hour_buckets.iter().map(|b| b.avg_gain()).collect();
    let spread_confidence = if avgs.len() < 2 {
        0.0
    } else {
        let mean = avgs.iter().sum::<f64>() / avgs.len() as f64;
        let variance =
            avgs.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / avgs.len() as f64;
        (variance * 2.0).min(1.0)
    };

    sample_confidence * 0.6 + spread_confidence * 0.4
}

/// Keyed per-user pattern summaries for the analytics surface.
pub fn pattern_summaries(
    sessions: &[StudySessionRecord],
    report: &StudyPatternReport,
) -> Vec<StudyPattern> {
    let mut out = Vec::new();

    out.push(StudyPattern {
        pattern_type: PatternType::PeakHours,
        summary: match report.best_hour {
            Some(h) => format!("Most productive around {}", format_hour_12(h)),
            None => "Not enough rated sessions to find a peak hour".to_string(),
        },
        confidence: report.confidence,
        sample_size: report.sample_size,
    });

    out.push(StudyPattern {
        pattern_type: PatternType::BestDays,
        summary: match &report.best_day {
            Some(day) => format!("Strongest gains on {day}s"),
            None => "Not enough rated sessions to find a best day".to_string(),
        },
        confidence: report.confidence,
        sample_size: report.sample_size,
    });

    out.push(StudyPattern {
        pattern_type: PatternType::Duration,
        summary: format!(
            "Ideal session length around {} minutes",
            report.ideal_duration_minutes
        ),
        confidence: report.confidence,
        sample_size: report.sample_size,
    });

    let completed: Vec<&StudySessionRecord> = sessions.iter().filter(|s| s.completed).collect();

    let mut minutes_by_topic: HashMap<&str, i64> = HashMap::new();
    for s in &completed {
        *minutes_by_topic.entry(s.topic_id.as_str()).or_insert(0) += s.duration_minutes;
    }
    let favourite = minutes_by_topic
        .iter()
        .max_by_key(|(topic, minutes)| (*minutes, std::cmp::Reverse(*topic)))
        .map(|(topic, minutes)| (topic.to_string(), *minutes));
    out.push(StudyPattern {
        pattern_type: PatternType::TopicPreference,
        summary: match &favourite {
            Some((topic, minutes)) => {
                format!("Most study time goes to {topic} ({minutes} minutes)")
            }
            None => "No completed sessions yet".to_string(),
        },
        confidence: if favourite.is_some() { report.confidence } else { 0.0 },
        sample_size: completed.len(),
    });

    let total_gain: i32 = report.hour_buckets.iter().map(|b| b.total_gain).sum();
    out.push(StudyPattern {
        pattern_type: PatternType::ConfidenceTrend,
        summary: if report.sample_size == 0 {
            "No rated sessions yet".to_string()
        } else if total_gain > 0 {
            "Sessions usually leave you more confident than you started".to_string()
        } else if total_gain < 0 {
            "Sessions often leave you less confident — consider shorter, focused reviews"
                .to_string()
        } else {
            "Confidence holds steady across sessions".to_string()
        },
        confidence: report.confidence,
        sample_size: report.sample_size,
    });

    let mut days: Vec<chrono::NaiveDate> =
        completed.iter().map(|s| s.started_at.date_naive()).collect();
    days.sort();
    days.dedup();
    let consistency = match (days.first(), days.last()) {
        (Some(first), Some(last)) => {
            let span = (*last - *first).num_days() + 1;
            days.len() as f64 / span as f64
        }
        _ => 0.0,
    };
    out.push(StudyPattern {
        pattern_type: PatternType::Consistency,
        summary: if days.is_empty() {
            "No completed sessions yet".to_string()
        } else {
            format!(
                "Studied on {} of the last {} days",
                days.len(),
                (*days.last().unwrap() - *days.first().unwrap()).num_days() + 1
            )
        },
        confidence: consistency.clamp(0.0, 1.0),
        sample_size: completed.len(),
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionKind;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn session(
        day: u32,
        hour: u32,
        minutes: i64,
        before: i32,
        after: i32,
    ) -> StudySessionRecord {
        StudySessionRecord {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            topic_id: "algebra".to_string(),
            started_at: Utc.with_ymd_and_hms(2026, 6, day, hour, 0, 0).unwrap(),
            duration_minutes: minutes,
            confidence_before: Some(before),
            confidence_after: Some(after),
            kind: SessionKind::Practice,
            completed: true,
            notes: None,
        }
    }

    #[test]
    fn empty_history_reports_insufficient_data() {
        let report = analyze_study_patterns(&[], &PatternParams::default());
        assert_eq!(report.best_time, "insufficient_data");
        assert_eq!(report.productivity_pattern, "insufficient_data");
        assert_eq!(report.ideal_duration_minutes, 25);
        assert_eq!(report.sample_size, 0);
    }

    #[test]
    fn single_sample_buckets_fall_below_reliability_floor() {
        // One 9am session, however good, cannot name a best hour.
        let report =
            analyze_study_patterns(&[session(1, 9, 25, 3, 9)], &PatternParams::default());
        assert_eq!(report.best_hour, None);
        assert_eq!(report.best_time, "insufficient_data");
    }

    #[test]
    fn best_hour_by_average_gain() {
        let sessions = vec![
            // 9am: gains 3 and 3 -> avg 3.0
            session(1, 9, 25, 3, 6),
            session(2, 9, 25, 4, 7),
            // 8pm: gains 1 and 1 -> avg 1.0
            session(3, 20, 25, 5, 6),
            session(4, 20, 25, 5, 6),
        ];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        assert_eq!(report.best_hour, Some(9));
        assert_eq!(report.best_time, "9:00 AM");
        assert_eq!(report.productivity_pattern, "morning");
    }

    #[test]
    fn tie_keeps_first_seen_bucket() {
        let sessions = vec![
            session(1, 14, 25, 3, 5),
            session(2, 14, 25, 3, 5),
            session(3, 20, 25, 3, 5),
            session(4, 20, 25, 3, 5),
        ];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        assert_eq!(report.best_hour, Some(14));
    }

    #[test]
    fn best_day_by_average_gain() {
        // 2026-06-01 is a Monday, 2026-06-02 a Tuesday.
        let sessions = vec![
            session(1, 9, 25, 3, 4),
            session(8, 9, 25, 3, 4),
            session(2, 9, 25, 2, 6),
            session(9, 9, 25, 2, 6),
        ];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        assert_eq!(report.best_day.as_deref(), Some("Tuesday"));
    }

    #[test]
    fn duration_snaps_up_to_band_edge() {
        // 20-minute sessions are the most efficient; snap up to 25.
        let sessions = vec![
            session(1, 9, 20, 3, 7),
            session(2, 9, 20, 3, 7),
            session(3, 9, 60, 3, 5),
        ];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        assert_eq!(report.ideal_duration_minutes, 25);
    }

    #[test]
    fn duration_beyond_last_band_stays_at_sixty() {
        let sessions = vec![session(1, 9, 90, 2, 9), session(2, 9, 90, 2, 9)];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        assert_eq!(report.ideal_duration_minutes, 60);
    }

    #[test]
    fn duration_defaults_without_effective_sessions() {
        // Negative gains only: no session is "effective".
        let sessions = vec![session(1, 9, 45, 7, 5), session(2, 9, 45, 7, 5)];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        assert_eq!(report.ideal_duration_minutes, 25);
    }

    #[test]
    fn peak_window_ranks_hours_by_gain() {
        let sessions = vec![
            session(1, 9, 25, 3, 6),
            session(2, 9, 25, 3, 6),
            session(3, 20, 25, 5, 6),
            session(4, 20, 25, 5, 6),
            session(5, 7, 25, 5, 5),
            session(6, 7, 25, 5, 5),
        ];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        let window = report.peak_window();
        // Hour 7 has zero average gain and is excluded.
        assert_eq!(window.hours, vec![9, 20]);
    }

    #[test]
    fn peak_window_keeps_best_hour_when_all_gains_are_negative() {
        // Two 10am sessions, each losing a point of confidence. The hour
        // still clears the reliability floor and is the user's best, so
        // the window must carry it rather than coming back empty.
        let sessions = vec![session(1, 10, 25, 6, 5), session(2, 10, 25, 6, 5)];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        assert_eq!(report.best_hour, Some(10));
        assert_eq!(report.peak_window().hours, vec![10]);
    }

    #[test]
    fn summaries_cover_all_pattern_types() {
        let sessions = vec![
            session(1, 9, 25, 3, 6),
            session(2, 9, 25, 3, 6),
            session(3, 20, 25, 5, 6),
        ];
        let report = analyze_study_patterns(&sessions, &PatternParams::default());
        let summaries = pattern_summaries(&sessions, &report);
        assert_eq!(summaries.len(), 6);
        assert!(summaries
            .iter()
            .any(|p| p.pattern_type == PatternType::Consistency && p.confidence > 0.0));
    }
}
