use rand::Rng;
use serde::{Deserialize, Serialize};

/// One training example for [`QNetwork::fit_step`]: only the taken action's
/// output is pulled toward the target value.
#[derive(Debug, Clone)]
pub struct FitExample {
    pub state: Vec<f64>,
    pub action: usize,
    pub target: f64,
}

/// Small feed-forward value approximator: state -> one score per action.
///
/// Two copies exist at runtime, an online network updated every training
/// step and a target network refreshed only at synchronization points, so
/// the bootstrapped TD target is computed against a stable parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QNetwork {
    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
    w1: Vec<Vec<f64>>,
    b1: Vec<f64>,
    w2: Vec<Vec<f64>>,
    b2: Vec<f64>,
}

impl QNetwork {
    pub fn new<R: Rng>(input_dim: usize, hidden_dim: usize, output_dim: usize, rng: &mut R) -> Self {
        let scale_1 = 1.0 / (input_dim.max(1) as f64).sqrt();
        let scale_2 = 1.0 / (hidden_dim.max(1) as f64).sqrt();
        let w1 = (0..hidden_dim)
            .map(|_| {
                (0..input_dim)
                    .map(|_| rng.random_range(-scale_1..scale_1))
                    .collect()
            })
            .collect();
        let w2 = (0..output_dim)
            .map(|_| {
                (0..hidden_dim)
                    .map(|_| rng.random_range(-scale_2..scale_2))
                    .collect()
            })
            .collect();
        Self {
            input_dim,
            hidden_dim,
            output_dim,
            w1,
            b1: vec![0.0; hidden_dim],
            w2,
            b2: vec![0.0; output_dim],
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn dimensions_match(&self, input_dim: usize, hidden_dim: usize, output_dim: usize) -> bool {
        self.input_dim == input_dim
            && self.hidden_dim == hidden_dim
            && self.output_dim == output_dim
            && self.w1.len() == hidden_dim
            && self.w1.iter().all(|row| row.len() == input_dim)
            && self.b1.len() == hidden_dim
            && self.w2.len() == output_dim
            && self.w2.iter().all(|row| row.len() == hidden_dim)
            && self.b2.len() == output_dim
    }

    /// Forward pass returning one Q-value per action.
    pub fn evaluate(&self, state: &[f64]) -> Vec<f64> {
        let (_, hidden) = self.forward_hidden(state);
        self.forward_output(&hidden)
    }

    fn forward_hidden(&self, state: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut pre = vec![0.0; self.hidden_dim];
        for (j, row) in self.w1.iter().enumerate() {
            let mut sum = self.b1[j];
            for (w, x) in row.iter().zip(state.iter()) {
                sum += w * x;
            }
            pre[j] = sum;
        }
        let post = pre.iter().map(|&z| z.max(0.0)).collect();
        (pre, post)
    }

    fn forward_output(&self, hidden: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.output_dim];
        for (a, row) in self.w2.iter().enumerate() {
            let mut sum = self.b2[a];
            for (w, h) in row.iter().zip(hidden.iter()) {
                sum += w * h;
            }
            out[a] = sum;
        }
        out
    }

    /// One SGD pass over the batch minimizing squared error on the taken
    /// action's output only. Returns the mean squared error over the batch.
    pub fn fit_step(&mut self, batch: &[FitExample], learning_rate: f64) -> f64 {
        if batch.is_empty() {
            return 0.0;
        }

        let mut total_loss = 0.0;
        for example in batch {
            if example.action >= self.output_dim {
                continue;
            }
            let (pre, hidden) = self.forward_hidden(&example.state);
            let out = self.forward_output(&hidden);
            let delta = out[example.action] - example.target;
            total_loss += delta * delta;

            // Hidden-layer gradient uses the pre-update output weights.
            let mut hidden_grad = vec![0.0; self.hidden_dim];
            for j in 0..self.hidden_dim {
                if pre[j] > 0.0 {
                    hidden_grad[j] = delta * self.w2[example.action][j];
                }
            }

            for j in 0..self.hidden_dim {
                self.w2[example.action][j] -= learning_rate * delta * hidden[j];
            }
            self.b2[example.action] -= learning_rate * delta;

            for j in 0..self.hidden_dim {
                if hidden_grad[j] == 0.0 {
                    continue;
                }
                let row = &mut self.w1[j];
                for (w, x) in row.iter_mut().zip(example.state.iter()) {
                    *w -= learning_rate * hidden_grad[j] * x;
                }
                self.b1[j] -= learning_rate * hidden_grad[j];
            }
        }

        total_loss / batch.len() as f64
    }

    /// True when every parameter is a finite number. Used to detect
    /// divergence after a training step.
    pub fn is_finite(&self) -> bool {
        self.w1.iter().flatten().all(|v| v.is_finite())
            && self.b1.iter().all(|v| v.is_finite())
            && self.w2.iter().flatten().all(|v| v.is_finite())
            && self.b2.iter().all(|v| v.is_finite())
    }
}
