use std::collections::VecDeque;

use rand::Rng;

use crate::engine::types::Experience;

/// Bounded FIFO buffer of past transitions for replay training.
#[derive(Debug)]
pub struct ExperienceStore {
    buffer: VecDeque<Experience>,
    capacity: usize,
}

impl ExperienceStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Appends one experience, evicting the oldest when at capacity.
    pub fn add(&mut self, experience: Experience) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Uniformly samples `batch_size` distinct experiences, or `None` when
    /// the buffer is under-filled. Training quietly defers in that case.
    pub fn sample<R: Rng>(&self, batch_size: usize, rng: &mut R) -> Option<Vec<Experience>> {
        if batch_size == 0 || self.buffer.len() < batch_size {
            return None;
        }

        // Partial Fisher-Yates over indices: distinct picks, no replacement.
        let mut indices: Vec<usize> = (0..self.buffer.len()).collect();
        for i in 0..batch_size {
            let j = rng.random_range(i..indices.len());
            indices.swap(i, j);
        }

        Some(
            indices[..batch_size]
                .iter()
                .map(|&i| self.buffer[i].clone())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: f64) -> Experience {
        Experience {
            state: vec![tag; 4],
            action: 0,
            reward: tag,
            next_state: vec![tag; 4],
            terminal: false,
        }
    }

    #[test]
    fn add_grows_until_capacity() {
        let mut store = ExperienceStore::new(3);
        assert!(store.is_empty());
        for i in 0..3 {
            store.add(tagged(i as f64));
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut store = ExperienceStore::new(5);
        for i in 0..50 {
            store.add(tagged(i as f64));
            assert!(store.len() <= 5);
        }
    }

    #[test]
    fn eviction_is_fifo() {
        let mut store = ExperienceStore::new(3);
        for i in 0..5 {
            store.add(tagged(i as f64));
        }
        // Oldest two (0, 1) evicted; 2, 3, 4 retained in order.
        let retained: Vec<f64> = store.buffer.iter().map(|e| e.reward).collect();
        assert_eq!(retained, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn sample_refuses_underfilled_buffer() {
        let mut store = ExperienceStore::new(10);
        let mut rng = rand::rng();
        assert!(store.sample(1, &mut rng).is_none());
        store.add(tagged(1.0));
        store.add(tagged(2.0));
        assert!(store.sample(3, &mut rng).is_none());
        assert!(store.sample(2, &mut rng).is_some());
    }

    #[test]
    fn sample_returns_distinct_entries() {
        let mut store = ExperienceStore::new(10);
        for i in 0..10 {
            store.add(tagged(i as f64));
        }
        let mut rng = rand::rng();
        for _ in 0..20 {
            let batch = store.sample(10, &mut rng).unwrap();
            let mut tags: Vec<i64> = batch.iter().map(|e| e.reward as i64).collect();
            tags.sort_unstable();
            tags.dedup();
            assert_eq!(tags.len(), 10, "sampled batch contained duplicates");
        }
    }

    #[test]
    fn sample_zero_batch_is_refused() {
        let mut store = ExperienceStore::new(4);
        store.add(tagged(1.0));
        let mut rng = rand::rng();
        assert!(store.sample(0, &mut rng).is_none());
    }
}
