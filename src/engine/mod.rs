pub mod agent;
pub mod dispatch;
pub mod encoder;
pub mod policy;
pub mod qnet;
pub mod replay;
pub mod reward;
pub mod snapshot;
pub mod types;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed state: {0}")]
    MalformedState(String),
    #[error("snapshot rejected: {0}")]
    Snapshot(String),
    #[error("snapshot serialization failed: {0}")]
    SnapshotCodec(#[from] serde_json::Error),
}
