use serde::{Deserialize, Serialize};

use crate::engine::qnet::QNetwork;
use crate::engine::EngineError;

/// Serializable capture of everything the engine needs to survive a process
/// restart: both parameter sets, epsilon, and the training-step counter.
///
/// Online and target always come from the same capture, so a restored
/// target can never be ahead of its online network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub online: QNetwork,
    pub target: QNetwork,
    pub epsilon: f64,
    pub training_steps: u64,
}

impl EngineSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EngineError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        let snapshot: Self = serde_json::from_slice(bytes)?;
        if !snapshot.epsilon.is_finite() || !(0.0..=1.0).contains(&snapshot.epsilon) {
            return Err(EngineError::Snapshot(format!(
                "epsilon out of range: {}",
                snapshot.epsilon
            )));
        }
        Ok(snapshot)
    }
}
