use serde::{Deserialize, Serialize};

pub const ACTION_COUNT: usize = 7;

/// Sliding window of recent answer correctness kept on the session state.
pub const RECENT_WINDOW: usize = 10;

/// The closed set of pedagogical actions the policy chooses between.
///
/// Index order is load-bearing: it is the output ordering of the value
/// function and the ordering stored in replayed experiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NextQuestion,
    ShowExplanation,
    GenerateEasy,
    GenerateMedium,
    GenerateHard,
    MarkMastered,
    ScheduleReview,
}

impl Action {
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::NextQuestion,
        Action::ShowExplanation,
        Action::GenerateEasy,
        Action::GenerateMedium,
        Action::GenerateHard,
        Action::MarkMastered,
        Action::ScheduleReview,
    ];

    /// Out-of-range indices fall back to `NextQuestion` rather than failing:
    /// the learner must always receive a valid action.
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Action::NextQuestion)
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|a| a == self).unwrap_or(0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::NextQuestion => "next_question",
            Action::ShowExplanation => "show_explanation",
            Action::GenerateEasy => "generate_easy",
            Action::GenerateMedium => "generate_medium",
            Action::GenerateHard => "generate_hard",
            Action::MarkMastered => "mark_mastered",
            Action::ScheduleReview => "schedule_review",
        }
    }

    /// Difficulty requested by the regeneration actions.
    pub fn generation_difficulty(&self) -> Option<Difficulty> {
        match self {
            Action::GenerateEasy => Some(Difficulty::Easy),
            Action::GenerateMedium => Some(Difficulty::Medium),
            Action::GenerateHard => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Feature encoding used by the state builder: easy reads as the
    /// highest value because easier material correlates with success.
    pub fn feature_value(&self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 0.5,
            Difficulty::Hard => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    #[default]
    Math,
    Science,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Math => "math",
            SubjectType::Science => "science",
        }
    }
}

/// Per-learner session state, owned by the session and mutated once per
/// answer event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerSessionState {
    pub class_level: i32,
    #[serde(default)]
    pub consecutive_correct: u32,
    #[serde(default)]
    pub consecutive_wrong: u32,
    #[serde(default)]
    pub current_difficulty: Difficulty,
    #[serde(default)]
    pub is_in_adaptive_mode: bool,
    #[serde(default)]
    pub recent_performance: Vec<bool>,
    #[serde(default)]
    pub concept_tags: Vec<String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub time_spent: i64,
    #[serde(default)]
    pub hints_used: u32,
}

impl LearnerSessionState {
    pub fn new(class_level: i32) -> Self {
        Self {
            class_level,
            consecutive_correct: 0,
            consecutive_wrong: 0,
            current_difficulty: Difficulty::Medium,
            is_in_adaptive_mode: false,
            recent_performance: Vec::new(),
            concept_tags: Vec::new(),
            question_type: None,
            time_spent: 0,
            hints_used: 0,
        }
    }

    /// Advances the streak counters and the bounded recent-performance
    /// window for one answer.
    pub fn record_answer(&mut self, correct: bool) {
        if correct {
            self.consecutive_correct += 1;
            self.consecutive_wrong = 0;
        } else {
            self.consecutive_wrong += 1;
            self.consecutive_correct = 0;
        }
        self.recent_performance.push(correct);
        if self.recent_performance.len() > RECENT_WINDOW {
            let overflow = self.recent_performance.len() - RECENT_WINDOW;
            self.recent_performance.drain(..overflow);
        }
    }

    pub fn recent_accuracy(&self) -> f64 {
        if self.recent_performance.is_empty() {
            return 0.0;
        }
        let correct = self.recent_performance.iter().filter(|&&c| c).count();
        correct as f64 / self.recent_performance.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default)]
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionData {
    pub id: i64,
    pub question: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub concept_tags: Vec<String>,
}

impl QuestionData {
    pub fn correct_answer_text(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.correct)
            .map(|o| o.text.as_str())
    }

    pub fn option_text(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(|o| o.text.as_str())
    }

    pub fn topic(&self) -> String {
        if self.concept_tags.is_empty() {
            "general".to_string()
        } else {
            self.concept_tags.join(" ")
        }
    }
}

/// One answer event as submitted by the session layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvent {
    pub student_id: String,
    pub question_id: String,
    pub selected_answer: usize,
    pub is_correct: bool,
    pub current_state: LearnerSessionState,
    pub question_data: QuestionData,
    #[serde(default)]
    pub subject_type: SubjectType,
}

/// One recorded transition, immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub state: Vec<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub terminal: bool,
}

/// Learner-facing result of processing one answer event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    pub action: Action,
    pub data: serde_json::Value,
    pub reward: f64,
    pub next_state: LearnerSessionState,
}

/// Explanation block shown to a learner after a wrong answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub encouragement: String,
    pub explanation: String,
    pub example: String,
    pub tip: String,
}
