pub mod config;
pub mod engine;
pub mod logging;
pub mod services;

pub use config::EngineConfig;
pub use engine::agent::AdaptiveEngine;
pub use engine::types::{Action, AnswerEvent, LearnerSessionState, ProcessResult, QuestionData};
