use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Per-learner, per-concept mastery levels plus a review schedule.
///
/// Calls from the engine are fire-and-forget side effects; nothing here
/// feeds back into action selection.
#[derive(Debug, Default)]
pub struct MasteryStore {
    levels: RwLock<HashMap<String, HashMap<String, i32>>>,
    reviews: RwLock<Vec<ReviewEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub student_id: String,
    pub concept_id: String,
    pub review_date: DateTime<Utc>,
}

impl MasteryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update_mastery(&self, student_id: &str, concept_id: &str, level: i32) {
        let mut levels = self.levels.write().await;
        levels
            .entry(student_id.to_string())
            .or_default()
            .insert(concept_id.to_string(), level);
    }

    pub async fn mark_mastered(&self, student_id: &str, concept_id: &str) {
        self.update_mastery(student_id, concept_id, 1).await;
    }

    pub async fn schedule_review(
        &self,
        student_id: &str,
        concept_id: &str,
        review_date: DateTime<Utc>,
    ) {
        let mut reviews = self.reviews.write().await;
        reviews.push(ReviewEntry {
            student_id: student_id.to_string(),
            concept_id: concept_id.to_string(),
            review_date,
        });
    }

    pub async fn schedule_review_in_days(&self, student_id: &str, concept_id: &str, days: i64) {
        self.schedule_review(student_id, concept_id, Utc::now() + Duration::days(days))
            .await;
    }

    pub async fn mastery_levels(&self, student_id: &str) -> HashMap<String, i32> {
        let levels = self.levels.read().await;
        levels.get(student_id).cloned().unwrap_or_default()
    }

    pub async fn pending_reviews(&self, student_id: &str) -> Vec<ReviewEntry> {
        let reviews = self.reviews.read().await;
        reviews
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_then_read_mastery() {
        let store = MasteryStore::new();
        store.update_mastery("s1", "fractions", 0).await;
        store.update_mastery("s1", "fractions", 1).await;
        store.update_mastery("s1", "decimals", 0).await;

        let levels = store.mastery_levels("s1").await;
        assert_eq!(levels.get("fractions"), Some(&1));
        assert_eq!(levels.get("decimals"), Some(&0));
        assert!(store.mastery_levels("s2").await.is_empty());
    }

    #[tokio::test]
    async fn mark_mastered_sets_level_one() {
        let store = MasteryStore::new();
        store.mark_mastered("s1", "multiplication").await;
        let levels = store.mastery_levels("s1").await;
        assert_eq!(levels.get("multiplication"), Some(&1));
    }

    #[tokio::test]
    async fn scheduled_reviews_are_per_student() {
        let store = MasteryStore::new();
        store.schedule_review_in_days("s1", "fractions", 3).await;
        store.schedule_review_in_days("s2", "decimals", 1).await;

        let reviews = store.pending_reviews("s1").await;
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].concept_id, "fractions");
        assert!(reviews[0].review_date > Utc::now());
    }
}
