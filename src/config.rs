use crate::engine::types::ACTION_COUNT;

/// Hyperparameters and buffer sizing for the adaptive engine.
///
/// Defaults match the values the engine was tuned with; every field can be
/// overridden through an `ENGINE_*` environment variable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub state_dim: usize,
    pub hidden_dim: usize,
    pub action_count: usize,
    pub learning_rate: f64,
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_min: f64,
    pub epsilon_decay: f64,
    pub batch_size: usize,
    pub replay_capacity: usize,
    pub target_sync_every: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dim: 20,
            hidden_dim: 64,
            action_count: ACTION_COUNT,
            learning_rate: 0.001,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            batch_size: 32,
            replay_capacity: 10_000,
            target_sync_every: 10,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        Self {
            state_dim: env_usize("ENGINE_STATE_DIM").unwrap_or(defaults.state_dim),
            hidden_dim: env_usize("ENGINE_HIDDEN_DIM").unwrap_or(defaults.hidden_dim),
            action_count: ACTION_COUNT,
            learning_rate: env_f64("ENGINE_LEARNING_RATE").unwrap_or(defaults.learning_rate),
            gamma: env_f64("ENGINE_GAMMA").unwrap_or(defaults.gamma),
            epsilon_start: env_f64("ENGINE_EPSILON_START").unwrap_or(defaults.epsilon_start),
            epsilon_min: env_f64("ENGINE_EPSILON_MIN").unwrap_or(defaults.epsilon_min),
            epsilon_decay: env_f64("ENGINE_EPSILON_DECAY").unwrap_or(defaults.epsilon_decay),
            batch_size: env_usize("ENGINE_BATCH_SIZE").unwrap_or(defaults.batch_size),
            replay_capacity: env_usize("ENGINE_REPLAY_CAPACITY")
                .unwrap_or(defaults.replay_capacity),
            // An interval of 0 would make the sync modulo panic.
            target_sync_every: env_u64("ENGINE_TARGET_SYNC_EVERY")
                .unwrap_or(defaults.target_sync_every)
                .max(1),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_f64(key: &str) -> Option<f64> {
    env_string(key).and_then(|v| v.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_string(key).and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key).and_then(|v| v.parse().ok())
}
