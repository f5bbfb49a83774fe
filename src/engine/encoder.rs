use crate::engine::types::{LearnerSessionState, QuestionData};
use crate::engine::EngineError;

const NORM_EPSILON: f64 = 1e-8;

/// Builds the fixed-length state vector the value function consumes.
///
/// Encoding is deterministic: exploration randomness lives entirely in the
/// policy's epsilon draw, never inside the representation.
#[derive(Debug, Clone)]
pub struct StateEncoder {
    dim: usize,
}

impl StateEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Concatenates learner and question features, z-normalizes, and pads
    /// or truncates to exactly `dim` entries.
    pub fn encode(
        &self,
        student_features: &[f64],
        question_features: &[f64],
    ) -> Result<Vec<f64>, EngineError> {
        let mut vector: Vec<f64> = student_features
            .iter()
            .chain(question_features.iter())
            .copied()
            .collect();

        if vector.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::MalformedState(
                "feature vector contains non-finite values".to_string(),
            ));
        }

        if !vector.is_empty() {
            let mean = vector.iter().sum::<f64>() / vector.len() as f64;
            let variance =
                vector.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vector.len() as f64;
            let std = variance.sqrt();
            for v in &mut vector {
                *v = (*v - mean) / (std + NORM_EPSILON);
            }
        }

        vector.resize(self.dim, 0.0);
        Ok(vector)
    }

    /// Learner-side features, each scaled into roughly [0, 1].
    pub fn student_features(&self, state: &LearnerSessionState) -> Vec<f64> {
        vec![
            state.class_level as f64 / 12.0,
            state.consecutive_correct as f64 / 10.0,
            state.consecutive_wrong as f64 / 10.0,
            if state.is_in_adaptive_mode { 1.0 } else { 0.0 },
            state.recent_performance.len() as f64 / 10.0,
            state.recent_accuracy(),
            state.time_spent as f64 / 300.0,
            state.hints_used as f64 / 5.0,
            state.current_difficulty.feature_value(),
        ]
    }

    /// Question-side features, padded with neutral 0.5 entries so the two
    /// halves of the vector stay balanced.
    pub fn question_features(&self, question: &QuestionData) -> Vec<f64> {
        vec![
            question.difficulty.feature_value(),
            question.options.len() as f64 / 4.0,
            question.concept_tags.len() as f64 / 5.0,
            0.5,
            0.5,
            0.5,
            0.5,
            0.5,
            0.5,
            0.5,
        ]
    }
}
