use std::sync::Arc;

use serde_json::json;

use crate::engine::types::{Action, AnswerEvent, Difficulty};
use crate::services::{MasteryStore, QuestionService};

const REVIEW_INTERVAL_DAYS: i64 = 3;

/// Maps chosen action indices to named actions and runs their side effects
/// against the collaborators.
///
/// Collaborator failures never surface to the learner: the question service
/// substitutes canned content internally, and the response always carries
/// the originally selected action.
#[derive(Clone)]
pub struct ActionDispatcher {
    questions: Arc<QuestionService>,
    mastery: Arc<MasteryStore>,
}

impl ActionDispatcher {
    pub fn new(questions: Arc<QuestionService>, mastery: Arc<MasteryStore>) -> Self {
        Self { questions, mastery }
    }

    /// Pure index-to-action mapping over the fixed 7-entry table.
    pub fn dispatch(action_index: usize) -> Action {
        Action::from_index(action_index)
    }

    pub fn mastery(&self) -> &Arc<MasteryStore> {
        &self.mastery
    }

    /// Executes the action's side effect and packages the response payload.
    pub async fn execute(&self, action: Action, event: &AnswerEvent) -> serde_json::Value {
        match action {
            Action::NextQuestion => json!({ "moveToNext": true }),
            Action::ShowExplanation => self.execute_explanation(event).await,
            Action::GenerateEasy | Action::GenerateMedium | Action::GenerateHard => {
                let difficulty = action
                    .generation_difficulty()
                    .unwrap_or(Difficulty::Medium);
                self.execute_generate(event, difficulty).await
            }
            Action::MarkMastered => self.execute_mark_mastered(event).await,
            Action::ScheduleReview => self.execute_schedule_review(event).await,
        }
    }

    async fn execute_explanation(&self, event: &AnswerEvent) -> serde_json::Value {
        let question = &event.question_data;
        let correct_answer = question.correct_answer_text().unwrap_or("Unknown");
        let student_answer = question.option_text(event.selected_answer).unwrap_or("Unknown");
        let explanation = self
            .questions
            .explanation(
                &question.question,
                correct_answer,
                student_answer,
                &question.concept_tags,
            )
            .await;
        let hint = explanation.tip.clone();
        json!({
            "explanation": explanation,
            "correctAnswer": correct_answer,
            "hint": hint,
        })
    }

    async fn execute_generate(
        &self,
        event: &AnswerEvent,
        difficulty: Difficulty,
    ) -> serde_json::Value {
        let questions = self
            .questions
            .generate(
                &event.question_data.topic(),
                difficulty,
                event.current_state.class_level,
                event.subject_type,
                1,
            )
            .await;
        json!({ "question": questions.first() })
    }

    async fn execute_mark_mastered(&self, event: &AnswerEvent) -> serde_json::Value {
        for concept in concept_ids(event) {
            self.mastery.mark_mastered(&event.student_id, &concept).await;
        }
        json!({
            "status": "mastered",
            "questionId": event.question_id,
        })
    }

    async fn execute_schedule_review(&self, event: &AnswerEvent) -> serde_json::Value {
        for concept in concept_ids(event) {
            self.mastery
                .schedule_review_in_days(&event.student_id, &concept, REVIEW_INTERVAL_DAYS)
                .await;
        }
        json!({
            "status": "review scheduled",
            "questionId": event.question_id,
        })
    }
}

fn concept_ids(event: &AnswerEvent) -> Vec<String> {
    if event.question_data.concept_tags.is_empty() {
        vec!["general".to_string()]
    } else {
        event.question_data.concept_tags.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{AnswerOption, LearnerSessionState, QuestionData, SubjectType};

    fn sample_event() -> AnswerEvent {
        AnswerEvent {
            student_id: "s1".to_string(),
            question_id: "q1".to_string(),
            selected_answer: 1,
            is_correct: false,
            current_state: LearnerSessionState::new(5),
            question_data: QuestionData {
                id: 1,
                question: "What is 2 + 2?".to_string(),
                options: vec![
                    AnswerOption {
                        text: "4".to_string(),
                        emoji: None,
                        correct: true,
                    },
                    AnswerOption {
                        text: "5".to_string(),
                        emoji: None,
                        correct: false,
                    },
                ],
                difficulty: Difficulty::Easy,
                explanation: None,
                hint: None,
                concept_tags: vec!["addition".to_string()],
            },
            subject_type: SubjectType::Math,
        }
    }

    fn test_dispatcher() -> ActionDispatcher {
        ActionDispatcher::new(
            Arc::new(QuestionService::mocked()),
            Arc::new(MasteryStore::new()),
        )
    }

    #[test]
    fn dispatch_maps_all_seven_indices() {
        assert_eq!(ActionDispatcher::dispatch(0), Action::NextQuestion);
        assert_eq!(ActionDispatcher::dispatch(1), Action::ShowExplanation);
        assert_eq!(ActionDispatcher::dispatch(2), Action::GenerateEasy);
        assert_eq!(ActionDispatcher::dispatch(3), Action::GenerateMedium);
        assert_eq!(ActionDispatcher::dispatch(4), Action::GenerateHard);
        assert_eq!(ActionDispatcher::dispatch(5), Action::MarkMastered);
        assert_eq!(ActionDispatcher::dispatch(6), Action::ScheduleReview);
        assert_eq!(ActionDispatcher::dispatch(42), Action::NextQuestion);
    }

    #[tokio::test]
    async fn next_question_payload_moves_on() {
        let dispatcher = test_dispatcher();
        let payload = dispatcher.execute(Action::NextQuestion, &sample_event()).await;
        assert_eq!(payload["moveToNext"], true);
    }

    #[tokio::test]
    async fn explanation_payload_names_the_correct_answer() {
        let dispatcher = test_dispatcher();
        let payload = dispatcher
            .execute(Action::ShowExplanation, &sample_event())
            .await;
        assert_eq!(payload["correctAnswer"], "4");
        assert!(payload["explanation"]["encouragement"].is_string());
        assert!(payload["hint"].is_string());
    }

    #[tokio::test]
    async fn generate_actions_carry_a_question_at_requested_difficulty() {
        let dispatcher = test_dispatcher();
        for (action, difficulty) in [
            (Action::GenerateEasy, "easy"),
            (Action::GenerateMedium, "medium"),
            (Action::GenerateHard, "hard"),
        ] {
            let payload = dispatcher.execute(action, &sample_event()).await;
            assert_eq!(payload["question"]["difficulty"], difficulty);
            assert!(payload["question"]["question"].is_string());
        }
    }

    #[tokio::test]
    async fn mark_mastered_updates_the_store() {
        let dispatcher = test_dispatcher();
        let payload = dispatcher.execute(Action::MarkMastered, &sample_event()).await;
        assert_eq!(payload["status"], "mastered");
        let levels = dispatcher.mastery().mastery_levels("s1").await;
        assert_eq!(levels.get("addition"), Some(&1));
    }

    #[tokio::test]
    async fn schedule_review_records_an_entry() {
        let dispatcher = test_dispatcher();
        let payload = dispatcher
            .execute(Action::ScheduleReview, &sample_event())
            .await;
        assert_eq!(payload["status"], "review scheduled");
        let reviews = dispatcher.mastery().pending_reviews("s1").await;
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].concept_id, "addition");
    }

    #[tokio::test]
    async fn events_without_tags_fall_back_to_general_concept() {
        let dispatcher = test_dispatcher();
        let mut event = sample_event();
        event.question_data.concept_tags.clear();
        dispatcher.execute(Action::MarkMastered, &event).await;
        let levels = dispatcher.mastery().mastery_levels("s1").await;
        assert_eq!(levels.get("general"), Some(&1));
    }
}
