use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::engine::types::{AnswerOption, Difficulty, Explanation, QuestionData, SubjectType};

const DEFAULT_API_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-2.0-flash:generateContent";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum QuestionGenError {
    #[error("question provider not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty provider response")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct QuestionGenConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
    pub mock: bool,
}

impl QuestionGenConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_string("QUESTION_API_KEY"),
            endpoint: env_string("QUESTION_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            timeout: Duration::from_millis(
                env_string("QUESTION_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            mock: env_string("QUESTION_MOCK")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Client for the external natural-language question provider.
///
/// The provider is free-text in, free-text out; this service owns prompt
/// construction, JSON extraction from fenced or unfenced responses, and the
/// canned fallbacks used whenever the provider is unreachable or returns
/// something unparseable.
#[derive(Clone)]
pub struct QuestionService {
    config: QuestionGenConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl QuestionService {
    pub fn from_env() -> Self {
        Self::new(QuestionGenConfig::from_env())
    }

    pub fn new(config: QuestionGenConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Offline deterministic instance for tests and degraded deployments.
    pub fn mocked() -> Self {
        Self::new(QuestionGenConfig {
            api_key: None,
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            mock: true,
        })
    }

    /// Generates `count` multiple-choice questions for the topic. Falls back
    /// to canned questions on any provider failure so callers always get a
    /// usable batch.
    pub async fn generate(
        &self,
        topic: &str,
        difficulty: Difficulty,
        class_level: i32,
        subject_type: SubjectType,
        count: usize,
    ) -> Vec<QuestionData> {
        let count = count.max(1);
        if self.config.mock {
            return canned_batch(difficulty, subject_type, count);
        }
        match self
            .generate_from_provider(topic, difficulty, class_level, subject_type, count)
            .await
        {
            Ok(questions) if !questions.is_empty() => questions,
            Ok(_) => {
                warn!(topic, "question provider returned no questions, using canned fallback");
                canned_batch(difficulty, subject_type, count)
            }
            Err(err) => {
                warn!(error = %err, topic, "question generation failed, using canned fallback");
                canned_batch(difficulty, subject_type, count)
            }
        }
    }

    async fn generate_from_provider(
        &self,
        topic: &str,
        difficulty: Difficulty,
        class_level: i32,
        subject_type: SubjectType,
        count: usize,
    ) -> Result<Vec<QuestionData>, QuestionGenError> {
        let text = self
            .call_provider(&question_prompt(
                topic,
                difficulty,
                class_level,
                subject_type,
                count,
            ))
            .await?;
        let json = extract_json(&text);
        let questions = parse_questions(json)?;
        Ok(questions.into_iter().take(count).collect())
    }

    /// Builds the learner-facing explanation block for a wrong answer.
    /// Deterministic fallback when the provider is unavailable.
    pub async fn explanation(
        &self,
        question: &str,
        correct_answer: &str,
        student_answer: &str,
        concept_tags: &[String],
    ) -> Explanation {
        if self.config.mock {
            return fallback_explanation(correct_answer, concept_tags);
        }
        match self
            .explanation_from_provider(question, correct_answer, student_answer, concept_tags)
            .await
        {
            Ok(explanation) => explanation,
            Err(err) => {
                warn!(error = %err, "explanation generation failed, using fallback");
                fallback_explanation(correct_answer, concept_tags)
            }
        }
    }

    async fn explanation_from_provider(
        &self,
        question: &str,
        correct_answer: &str,
        student_answer: &str,
        concept_tags: &[String],
    ) -> Result<Explanation, QuestionGenError> {
        let text = self
            .call_provider(&explanation_prompt(
                question,
                correct_answer,
                student_answer,
                concept_tags,
            ))
            .await?;
        let explanation: Explanation = serde_json::from_str(extract_json(&text))?;
        Ok(explanation)
    }

    async fn call_provider(&self, prompt: &str) -> Result<String, QuestionGenError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(QuestionGenError::NotConfigured("QUESTION_API_KEY not set"))?;

        let url = format!("{}?key={}", self.config.endpoint, api_key);
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuestionGenError::HttpStatus { status, body });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(QuestionGenError::Empty);
        }
        Ok(text)
    }
}

fn question_prompt(
    topic: &str,
    difficulty: Difficulty,
    class_level: i32,
    subject_type: SubjectType,
    count: usize,
) -> String {
    format!(
        "Generate {count} multiple-choice {subject} question(s) about {topic} at {difficulty} \
         difficulty for a class {class_level} student.\n\
         Respond with a JSON array where each element has this structure:\n\
         {{\"id\": <number>, \"question\": \"...\", \
         \"options\": [{{\"text\": \"...\", \"correct\": true}}, ...], \
         \"difficulty\": \"{difficulty}\", \"explanation\": \"...\", \
         \"hint\": \"...\", \"conceptTags\": [\"{topic}\"]}}\n\
         Exactly one option per question must be correct. Respond with JSON only.",
        count = count,
        subject = subject_type.as_str(),
        topic = topic,
        difficulty = difficulty.as_str(),
        class_level = class_level,
    )
}

fn explanation_prompt(
    question: &str,
    correct_answer: &str,
    student_answer: &str,
    concept_tags: &[String],
) -> String {
    let concepts = if concept_tags.is_empty() {
        "this topic".to_string()
    } else {
        concept_tags.join(", ")
    };
    format!(
        "You are a friendly, encouraging tutor helping a student who just answered incorrectly.\n\
         QUESTION: {question}\n\
         STUDENT CHOSE: {student_answer}\n\
         CORRECT ANSWER: {correct_answer}\n\
         TOPIC: {concepts}\n\
         Respond with exactly this JSON format:\n\
         {{\"encouragement\": \"...\", \"explanation\": \"why '{correct_answer}' is correct\", \
         \"example\": \"a concrete, relatable example\", \"tip\": \"a memory trick\"}}\n\
         Respond with JSON only."
    )
}

/// Strips optional markdown code fences so `{...}` or `[...]` can be parsed
/// from a chatty provider response.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    trimmed
}

fn parse_questions(json: &str) -> Result<Vec<QuestionData>, QuestionGenError> {
    match serde_json::from_str::<Vec<QuestionData>>(json) {
        Ok(list) => Ok(list),
        // Some providers answer with a single object even when asked for an
        // array.
        Err(_) => Ok(vec![serde_json::from_str::<QuestionData>(json)?]),
    }
}

fn fallback_explanation(correct_answer: &str, concept_tags: &[String]) -> Explanation {
    let concepts = if concept_tags.is_empty() {
        "this topic".to_string()
    } else {
        concept_tags.join(", ")
    };
    Explanation {
        encouragement: format!(
            "Good try! Let's understand why '{correct_answer}' is the right answer."
        ),
        explanation: format!(
            "The correct answer is '{correct_answer}' because this question tests your \
             knowledge of {concepts}. Understanding this concept will help you solve \
             similar problems."
        ),
        example: format!(
            "For '{correct_answer}': this is commonly seen when dealing with {concepts}. \
             Try to connect it with what you already know about the topic."
        ),
        tip: format!(
            "Focus on the key concept of {concepts} and how '{correct_answer}' relates to it."
        ),
    }
}

/// Static fallback question keyed by (difficulty, subject).
pub fn canned_question(difficulty: Difficulty, subject_type: SubjectType) -> QuestionData {
    let (question, options, concept): (&str, [(&str, bool); 4], &str) =
        match (subject_type, difficulty) {
            (SubjectType::Math, Difficulty::Easy) => (
                "What is 5 + 3?",
                [("8", true), ("7", false), ("9", false), ("6", false)],
                "addition",
            ),
            (SubjectType::Math, Difficulty::Medium) => (
                "A box holds 6 eggs. How many eggs are in 4 boxes?",
                [("24", true), ("18", false), ("20", false), ("26", false)],
                "multiplication",
            ),
            (SubjectType::Math, Difficulty::Hard) => (
                "Sara has 48 stickers and shares them equally among 6 friends. \
                 How many stickers does each friend get?",
                [("8", true), ("6", false), ("7", false), ("9", false)],
                "division",
            ),
            (SubjectType::Science, Difficulty::Easy) => (
                "What do plants need to make their own food?",
                [
                    ("Sunlight", true),
                    ("Sand", false),
                    ("Plastic", false),
                    ("Metal", false),
                ],
                "plants",
            ),
            (SubjectType::Science, Difficulty::Medium) => (
                "Which gas do we breathe in to stay alive?",
                [
                    ("Oxygen", true),
                    ("Carbon dioxide", false),
                    ("Helium", false),
                    ("Nitrogen", false),
                ],
                "human body",
            ),
            (SubjectType::Science, Difficulty::Hard) => (
                "What happens to water when it evaporates?",
                [
                    ("It turns into vapor", true),
                    ("It freezes", false),
                    ("It disappears forever", false),
                    ("It becomes soil", false),
                ],
                "water cycle",
            ),
        };

    QuestionData {
        id: canned_id(difficulty, subject_type),
        question: question.to_string(),
        options: options
            .iter()
            .map(|(text, correct)| AnswerOption {
                text: text.to_string(),
                emoji: None,
                correct: *correct,
            })
            .collect(),
        difficulty,
        explanation: Some(format!(
            "This is a {} practice question about {}.",
            difficulty.as_str(),
            concept
        )),
        hint: Some("Take your time and think through each option.".to_string()),
        concept_tags: vec![concept.to_string()],
    }
}

fn canned_id(difficulty: Difficulty, subject_type: SubjectType) -> i64 {
    let d = match difficulty {
        Difficulty::Easy => 1,
        Difficulty::Medium => 2,
        Difficulty::Hard => 3,
    };
    let s = match subject_type {
        SubjectType::Math => 100,
        SubjectType::Science => 200,
    };
    s + d
}

pub fn canned_batch(
    difficulty: Difficulty,
    subject_type: SubjectType,
    count: usize,
) -> Vec<QuestionData> {
    (0..count)
        .map(|i| {
            let mut question = canned_question(difficulty, subject_type);
            question.id += (i as i64) * 1000;
            question
        })
        .collect()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
