//! Per-topic signal aggregation into a short, prioritized action list.

use chrono::{DateTime, Utc};

use crate::analysis::confidence_trend::{TrendDirection, TrendResult};
use crate::analysis::mastery::MasteryResult;
use crate::config::RecommendationParams;
use crate::types::{Priority, Recommendation};

/// Everything the aggregator needs to know about one topic.
#[derive(Debug, Clone)]
pub struct TopicSignals {
    pub topic_id: String,
    pub mastery: MasteryResult,
    pub trend: TrendResult,
    pub next_review: DateTime<Utc>,
}

/// Merge mastery, trend and schedule signals into at most
/// `params.max_items` recommendations, high priority first. The sort is
/// stable, so topic iteration order breaks ties.
pub fn aggregate(
    signals: &[TopicSignals],
    streak_days: u32,
    params: &RecommendationParams,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut items = Vec::new();

    for signal in signals {
        if signal.mastery.level == 1 {
            items.push(Recommendation {
                kind: "start_learning".to_string(),
                priority: Priority::High,
                title: format!("Start learning {}", signal.topic_id),
                description: "You have barely scratched this topic — a first proper session goes a long way".to_string(),
                action: "schedule_session".to_string(),
                topic_id: Some(signal.topic_id.clone()),
            });
        }

        if signal.mastery.level <= 3 && signal.trend.trend == TrendDirection::Declining {
            items.push(Recommendation {
                kind: "review_now".to_string(),
                priority: Priority::High,
                title: format!("Review {} now", signal.topic_id),
                description: "Your confidence here is slipping — a focused review can stop the slide".to_string(),
                action: "start_review".to_string(),
                topic_id: Some(signal.topic_id.clone()),
            });
        }

        if signal.next_review.date_naive() <= now.date_naive() {
            items.push(Recommendation {
                kind: "review_due".to_string(),
                priority: Priority::Medium,
                title: format!("{} is due for review", signal.topic_id),
                description: "Spaced repetition says it is time to revisit this topic".to_string(),
                action: "start_review".to_string(),
                topic_id: Some(signal.topic_id.clone()),
            });
        }
    }

    if streak_days == 0 {
        items.push(Recommendation {
            kind: "streak".to_string(),
            priority: Priority::High,
            title: "Start a study streak".to_string(),
            description: "One session today starts a new streak".to_string(),
            action: "schedule_session".to_string(),
            topic_id: None,
        });
    } else if streak_days <= params.streak_nudge_max {
        items.push(Recommendation {
            kind: "streak".to_string(),
            priority: Priority::Medium,
            title: format!("Keep your {streak_days}-day streak going"),
            description: "Study today to keep the momentum".to_string(),
            action: "schedule_session".to_string(),
            topic_id: None,
        });
    }

    // Stable: equal priorities keep topic iteration order.
    items.sort_by_key(|r| r.priority);
    items.truncate(params.max_items);
    items
}
