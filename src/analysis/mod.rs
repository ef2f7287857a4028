pub mod confidence_trend;
pub mod mastery;
pub mod study_pattern;

pub use confidence_trend::{analyze_confidence_trend, TrendDirection, TrendPoint, TrendResult};
pub use mastery::{analyze_mastery, MasteryComponents, MasteryResult};
pub use study_pattern::{analyze_study_patterns, PeakWindow, StudyPatternReport};
