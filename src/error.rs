use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no grade boundary data for board {board}, subject {subject_code}")]
    NoBoundaryData { board: String, subject_code: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}
