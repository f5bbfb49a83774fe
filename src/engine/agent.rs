//! Training orchestration: one answer event in, one pedagogical action out,
//! with an online Q-learning update in between.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::dispatch::ActionDispatcher;
use crate::engine::encoder::StateEncoder;
use crate::engine::policy::EpsilonGreedy;
use crate::engine::qnet::{FitExample, QNetwork};
use crate::engine::replay::ExperienceStore;
use crate::engine::reward::reward;
use crate::engine::snapshot::EngineSnapshot;
use crate::engine::types::{Action, AnswerEvent, Experience, ProcessResult};
use crate::engine::EngineError;
use crate::services::{MasteryStore, QuestionService};

/// Mastery streak at which a correct answer upgrades the dispatched action
/// to `mark_mastered`.
const MASTERY_STREAK: u32 = 3;

/// Wrong streak at which the learner is offered practice mode.
const PRACTICE_OFFER_STREAK: u32 = 2;

struct ModelState {
    online: QNetwork,
    target: QNetwork,
    policy: EpsilonGreedy,
    training_steps: u64,
}

/// The adaptive decision engine. One instance serves every learner of a
/// deployment; model parameters, the replay buffer, and epsilon are shared
/// mutable state guarded by the locks below.
///
/// The training sequence {sample, fit, sync, decay} runs as one critical
/// section under the model write lock. Action selection takes a read lock,
/// so it sees a consistent parameter snapshot and may overlap with other
/// selections. Collaborator I/O happens only after the locks are released.
pub struct AdaptiveEngine {
    config: EngineConfig,
    encoder: StateEncoder,
    model: RwLock<ModelState>,
    replay: RwLock<ExperienceStore>,
    dispatcher: ActionDispatcher,
}

impl AdaptiveEngine {
    pub fn new(
        config: EngineConfig,
        questions: Arc<QuestionService>,
        mastery: Arc<MasteryStore>,
    ) -> Self {
        let mut rng = rand::rng();
        let online = QNetwork::new(
            config.state_dim,
            config.hidden_dim,
            config.action_count,
            &mut rng,
        );
        let target = online.clone();
        let policy = EpsilonGreedy::new(
            config.epsilon_start,
            config.epsilon_min,
            config.epsilon_decay,
        );
        let replay = ExperienceStore::new(config.replay_capacity);
        Self {
            encoder: StateEncoder::new(config.state_dim),
            model: RwLock::new(ModelState {
                online,
                target,
                policy,
                training_steps: 0,
            }),
            replay: RwLock::new(replay),
            dispatcher: ActionDispatcher::new(questions, mastery),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            EngineConfig::from_env(),
            Arc::new(QuestionService::from_env()),
            Arc::new(MasteryStore::new()),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mastery(&self) -> &Arc<MasteryStore> {
        self.dispatcher.mastery()
    }

    pub async fn epsilon(&self) -> f64 {
        self.model.read().await.policy.epsilon()
    }

    /// Overrides the exploration rate. The value is clamped to
    /// `[epsilon_min, 1.0]`, so forcing pure greedy selection requires a
    /// configuration with `epsilon_min` of zero.
    pub async fn set_epsilon(&self, epsilon: f64) {
        self.model.write().await.policy.set_epsilon(epsilon);
    }

    pub async fn training_steps(&self) -> u64 {
        self.model.read().await.training_steps
    }

    pub async fn replay_len(&self) -> usize {
        self.replay.read().await.len()
    }

    /// Online-network Q-values for a probe state.
    pub async fn q_values(&self, state: &[f64]) -> Vec<f64> {
        self.model.read().await.online.evaluate(state)
    }

    /// Target-network Q-values for a probe state.
    pub async fn target_q_values(&self, state: &[f64]) -> Vec<f64> {
        self.model.read().await.target.evaluate(state)
    }

    /// Processes one answer event: encode, select, score, store, train,
    /// dispatch. The learner always receives a valid action and payload;
    /// internal training failures degrade to the already-selected action.
    pub async fn process_answer(&self, event: AnswerEvent) -> Result<ProcessResult, EngineError> {
        let question_features = self.encoder.question_features(&event.question_data);
        let student_features = self.encoder.student_features(&event.current_state);
        let state = self.encoder.encode(&student_features, &question_features)?;

        let mut next_session = event.current_state.clone();
        next_session.record_answer(event.is_correct);
        let next_student_features = self.encoder.student_features(&next_session);
        let next_state = self
            .encoder
            .encode(&next_student_features, &question_features)?;

        // Selection reads a consistent snapshot of the online parameters.
        let action_index = {
            let model = self.model.read().await;
            let q_values = model.online.evaluate(&state);
            let mut rng = rand::rng();
            model.policy.select(&q_values, &mut rng)
        };
        let selected_action = Action::from_index(action_index);

        let reward_value = reward(
            event.is_correct,
            selected_action,
            event.current_state.is_in_adaptive_mode,
            event.current_state.consecutive_wrong,
        );

        self.store_and_train(Experience {
            state,
            action: action_index,
            reward: reward_value,
            next_state,
            terminal: !event.is_correct,
        })
        .await;

        // Pedagogical overrides on top of the policy's pick: wrong answers
        // always get the explanation, a mastery streak gets the celebration.
        let final_action = if !event.is_correct {
            Action::ShowExplanation
        } else if next_session.consecutive_correct >= MASTERY_STREAK {
            Action::MarkMastered
        } else {
            selected_action
        };

        let mut data = self.dispatcher.execute(final_action, &event).await;
        if let Some(payload) = data.as_object_mut() {
            if event.is_correct {
                payload.insert("message".to_string(), json!("Correct! Great job!"));
                payload.insert("moveToNext".to_string(), json!(true));
                if next_session.consecutive_correct >= MASTERY_STREAK {
                    payload.insert("showCelebration".to_string(), json!(true));
                    payload.insert(
                        "conceptsMastered".to_string(),
                        json!(event.question_data.concept_tags),
                    );
                }
            } else if next_session.consecutive_wrong >= PRACTICE_OFFER_STREAK {
                payload.insert("offerPractice".to_string(), json!(true));
            }
        }

        // Fire-and-forget mastery bookkeeping for every event.
        let concept_id = if event.question_data.concept_tags.is_empty() {
            "general".to_string()
        } else {
            event.question_data.concept_tags.join(",")
        };
        self.dispatcher
            .mastery()
            .update_mastery(
                &event.student_id,
                &concept_id,
                if event.is_correct { 1 } else { 0 },
            )
            .await;

        Ok(ProcessResult {
            action: final_action,
            data,
            reward: reward_value,
            next_state: next_session,
        })
    }

    /// Steps 5-8 of the per-event state machine, serialized under the model
    /// write lock so no concurrent event observes a torn parameter set or
    /// double-decays epsilon.
    async fn store_and_train(&self, experience: Experience) {
        let mut model = self.model.write().await;
        let mut replay = self.replay.write().await;
        replay.add(experience);

        let mut rng = rand::rng();
        let batch = match replay.sample(self.config.batch_size, &mut rng) {
            Some(batch) => batch,
            // Under-filled buffer: training quietly defers.
            None => {
                debug!(
                    buffered = replay.len(),
                    batch_size = self.config.batch_size,
                    "replay buffer under-filled, skipping training step"
                );
                return;
            }
        };
        drop(replay);

        let examples: Vec<FitExample> = batch
            .iter()
            .map(|e| {
                let target = if e.terminal {
                    e.reward
                } else {
                    let next_q = model.target.evaluate(&e.next_state);
                    let best_next = next_q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    e.reward + self.config.gamma * best_next
                };
                FitExample {
                    state: e.state.clone(),
                    action: e.action,
                    target,
                }
            })
            .collect();

        let backup = model.online.clone();
        let loss = model.online.fit_step(&examples, self.config.learning_rate);
        if !loss.is_finite() || !model.online.is_finite() {
            warn!(loss, "training step diverged, rolling back online parameters");
            model.online = backup;
            return;
        }

        model.training_steps += 1;
        // max(1) guards hand-built configs; from_env already clamps.
        if model.training_steps % self.config.target_sync_every.max(1) == 0 {
            model.target = model.online.clone();
        }
        model.policy.decay();
    }

    /// Serializes online and target parameters, epsilon, and the step
    /// counter for external persistence.
    pub async fn save_snapshot(&self) -> Result<Vec<u8>, EngineError> {
        let model = self.model.read().await;
        EngineSnapshot {
            online: model.online.clone(),
            target: model.target.clone(),
            epsilon: model.policy.epsilon(),
            training_steps: model.training_steps,
        }
        .to_bytes()
    }

    /// Restores a previously saved snapshot. Rejects parameter sets whose
    /// dimensions do not match this engine's configuration.
    pub async fn load_snapshot(&self, bytes: &[u8]) -> Result<(), EngineError> {
        let snapshot = EngineSnapshot::from_bytes(bytes)?;
        for network in [&snapshot.online, &snapshot.target] {
            if !network.dimensions_match(
                self.config.state_dim,
                self.config.hidden_dim,
                self.config.action_count,
            ) {
                return Err(EngineError::Snapshot(
                    "parameter dimensions do not match engine configuration".to_string(),
                ));
            }
        }

        let mut model = self.model.write().await;
        model.online = snapshot.online;
        model.target = snapshot.target;
        model.policy.set_epsilon(snapshot.epsilon);
        model.training_steps = snapshot.training_steps;
        Ok(())
    }
}
