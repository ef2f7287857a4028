pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod grading;
pub mod logging;
pub mod recommend;
pub mod repository;
pub mod scheduling;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use engine::AnalyticsEngine;
pub use error::EngineError;
pub use repository::{InMemoryRepository, SessionRepository};
