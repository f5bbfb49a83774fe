use rand::Rng;

/// Epsilon-greedy action selection over a slice of Q-values.
///
/// With probability `epsilon` a uniformly random action index is returned,
/// otherwise the argmax with ties broken by lowest index. Epsilon decays
/// once per completed training step, never per selection.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    epsilon: f64,
    epsilon_min: f64,
    epsilon_decay: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon_start: f64, epsilon_min: f64, epsilon_decay: f64) -> Self {
        Self {
            epsilon: epsilon_start,
            epsilon_min,
            epsilon_decay,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Clamps to `[epsilon_min, 1.0]`; an `epsilon_min` above zero means a
    /// request for pure greedy selection lands on the floor instead.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(self.epsilon_min, 1.0);
    }

    pub fn select<R: Rng>(&self, q_values: &[f64], rng: &mut R) -> usize {
        if q_values.is_empty() {
            return 0;
        }
        if rng.random::<f64>() < self.epsilon {
            return rng.random_range(0..q_values.len());
        }
        argmax(q_values)
    }

    /// `epsilon = max(epsilon_min, epsilon * epsilon_decay)`.
    pub fn decay(&mut self) {
        self.epsilon = (self.epsilon * self.epsilon_decay).max(self.epsilon_min);
    }
}

/// Lowest index wins ties, so greedy selection is deterministic.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_breaks_ties_by_lowest_index() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[5.0, 5.0, 5.0]), 0);
        assert_eq!(argmax(&[0.0]), 0);
    }

    #[test]
    fn zero_epsilon_is_pure_greedy() {
        let policy = EpsilonGreedy::new(0.0, 0.0, 0.995);
        let q = vec![0.1, 0.9, 0.3, 0.2];
        let mut rng = rand::rng();
        for _ in 0..100 {
            assert_eq!(policy.select(&q, &mut rng), 1);
        }
    }

    #[test]
    fn full_epsilon_covers_all_actions() {
        let policy = EpsilonGreedy::new(1.0, 0.01, 0.995);
        let q = vec![0.0; 7];
        let mut rng = rand::rng();
        let mut counts = [0usize; 7];
        let trials = 7000;
        for _ in 0..trials {
            counts[policy.select(&q, &mut rng)] += 1;
        }
        // Uniform draw: each arm expects 1000 hits; allow a generous band.
        for (i, &count) in counts.iter().enumerate() {
            assert!(
                count > 700 && count < 1300,
                "action {i} drawn {count} times out of {trials}"
            );
        }
    }

    #[test]
    fn decay_is_monotone_and_floored() {
        let mut policy = EpsilonGreedy::new(1.0, 0.01, 0.995);
        let mut previous = policy.epsilon();
        for _ in 0..2000 {
            policy.decay();
            assert!(policy.epsilon() <= previous);
            assert!(policy.epsilon() >= 0.01);
            previous = policy.epsilon();
        }
        assert!((policy.epsilon() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn set_epsilon_clamps_to_valid_range() {
        let mut policy = EpsilonGreedy::new(1.0, 0.01, 0.995);
        policy.set_epsilon(5.0);
        assert_eq!(policy.epsilon(), 1.0);
        policy.set_epsilon(-1.0);
        assert_eq!(policy.epsilon(), 0.01);
        policy.set_epsilon(0.4);
        assert_eq!(policy.epsilon(), 0.4);
    }

    #[test]
    fn select_on_empty_q_values_returns_zero() {
        let policy = EpsilonGreedy::new(0.5, 0.01, 0.995);
        let mut rng = rand::rng();
        assert_eq!(policy.select(&[], &mut rng), 0);
    }
}
