pub mod boundary;
pub mod predictor;

pub use boundary::{reference_table, resolve_grade, BoundaryTable, GradeResult};
pub use predictor::{predict_grade, PerformanceTrend, PredictionLabel, PredictionResult};
