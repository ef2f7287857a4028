pub mod optimal_time;
pub mod spaced_repetition;

pub use optimal_time::{suggest_optimal_times, UserSchedulePreferences};
pub use spaced_repetition::next_review_date;
