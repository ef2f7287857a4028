//! Confidence-driven review scheduling.
//!
//! A coarse spaced-repetition policy: the better the user felt after the
//! last completed session, the longer the gap before the next review.
//! Intervals step down 7 -> 3 -> 1 -> 0 days at confidence 8, 6 and 4.

use chrono::{DateTime, Duration, Utc};

use crate::config::ReviewIntervals;
use crate::types::StudySessionRecord;

fn interval_days(confidence: i32, intervals: &ReviewIntervals) -> i64 {
    if confidence >= intervals.high_threshold {
        intervals.high_days
    } else if confidence >= intervals.medium_threshold {
        intervals.medium_days
    } else if confidence >= intervals.low_threshold {
        intervals.low_days
    } else {
        intervals.floor_days
    }
}

/// Next recommended review datetime for one topic.
///
/// Never recommends a date in the past: anything the naive computation puts
/// before today is clamped forward to tomorrow. No history at all also
/// means tomorrow.
pub fn next_review_date(
    sessions: &[StudySessionRecord],
    intervals: &ReviewIntervals,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let tomorrow = now + Duration::days(1);

    let Some(latest) = sessions
        .iter()
        .filter(|s| s.completed)
        .max_by_key(|s| s.started_at)
    else {
        return tomorrow;
    };

    let confidence = latest
        .effective_confidence_after()
        .unwrap_or(intervals.default_confidence);
    let next = latest.started_at + Duration::days(interval_days(confidence, intervals));

    if next.date_naive() < now.date_naive() {
        tomorrow
    } else {
        next
    }
}
