use std::time::Duration;

use async_trait::async_trait;

use crate::protocol::{AnswerCheck, Boss, Question};

/// Failures reported by an external content source.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContentError {
    #[error("content source unavailable: {0}")]
    Unavailable(String),
    #[error("content source returned no questions for category {0}")]
    EmptyPool(String),
}

/// Async collaborator supplying boss metadata and question banks.
///
/// The coordinator tolerates these calls failing or being slow: every call
/// is wrapped in a timeout and falls back to the built-in content so game
/// start never blocks on a sick upstream.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn get_boss_data(&self, boss_id: &str) -> Result<Boss, ContentError>;

    async fn get_questions_pool(&self, category_id: &str) -> Result<Vec<Question>, ContentError>;

    async fn validate_answer(
        &self,
        question: &Question,
        answer_text: &str,
    ) -> Result<AnswerCheck, ContentError>;
}

/// Answer comparison used during batch evaluation: trimmed, case-insensitive
/// equality against the question's stored answer. Kept synchronous because
/// evaluation runs inside the room critical section.
pub fn check_answer_locally(question: &Question, answer_text: &str) -> AnswerCheck {
    let submitted = answer_text.trim();
    if submitted.is_empty() {
        return AnswerCheck {
            valid: false,
            correct: false,
        };
    }
    AnswerCheck {
        valid: true,
        correct: submitted.eq_ignore_ascii_case(question.correct_answer.trim()),
    }
}

/// Built-in content used when no external source is configured or the
/// external source fails. A handful of general-knowledge questions keeps a
/// battle playable in every environment.
#[derive(Debug, Clone)]
pub struct FallbackContent {
    base_health: f64,
}

impl FallbackContent {
    pub fn new(base_health: f64) -> Self {
        Self { base_health }
    }

    /// The bundled question set, also used to refill an emptied pool.
    pub fn builtin_questions() -> Vec<Question> {
        let raw: &[(&str, &str, &[&str], &str)] = &[
            (
                "fb-1",
                "What planet is known as the Red Planet?",
                &["Venus", "Mars", "Jupiter", "Mercury"],
                "Mars",
            ),
            (
                "fb-2",
                "How many sides does a hexagon have?",
                &["five", "six", "seven", "eight"],
                "six",
            ),
            (
                "fb-3",
                "What gas do plants absorb from the atmosphere?",
                &["Oxygen", "Nitrogen", "Carbon dioxide", "Helium"],
                "Carbon dioxide",
            ),
            (
                "fb-4",
                "What is the largest ocean on Earth?",
                &["Atlantic", "Indian", "Arctic", "Pacific"],
                "Pacific",
            ),
            (
                "fb-5",
                "How many minutes are in a full day?",
                &["1440", "1200", "960", "1600"],
                "1440",
            ),
            (
                "fb-6",
                "Which element has the chemical symbol O?",
                &["Gold", "Oxygen", "Osmium", "Iron"],
                "Oxygen",
            ),
            (
                "fb-7",
                "What is the capital of Japan?",
                &["Kyoto", "Osaka", "Tokyo", "Sapporo"],
                "Tokyo",
            ),
            (
                "fb-8",
                "How many continents are there?",
                &["five", "six", "seven", "eight"],
                "seven",
            ),
        ];
        raw.iter()
            .map(|(id, text, options, answer)| Question {
                id: (*id).to_string(),
                text: (*text).to_string(),
                time_limit_seconds: 30,
                options: options.iter().map(ToString::to_string).collect(),
                correct_answer: (*answer).to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl ContentSource for FallbackContent {
    async fn get_boss_data(&self, boss_id: &str) -> Result<Boss, ContentError> {
        Ok(Boss {
            id: boss_id.to_string(),
            name: "Crystal Golem".to_string(),
            base_health: self.base_health,
            category_id: None,
        })
    }

    async fn get_questions_pool(&self, _category_id: &str) -> Result<Vec<Question>, ContentError> {
        Ok(Self::builtin_questions())
    }

    async fn validate_answer(
        &self,
        question: &Question,
        answer_text: &str,
    ) -> Result<AnswerCheck, ContentError> {
        Ok(check_answer_locally(question, answer_text))
    }
}

/// Fetch boss data with a timeout, falling back to the built-in boss on any
/// failure. Never errors and never blocks longer than `timeout`.
pub async fn resolve_boss(
    source: &dyn ContentSource,
    boss_id: &str,
    base_health: f64,
    timeout: Duration,
) -> Boss {
    match tokio::time::timeout(timeout, source.get_boss_data(boss_id)).await {
        Ok(Ok(boss)) => boss,
        Ok(Err(err)) => {
            tracing::warn!(boss_id, %err, "content source failed to supply boss, using fallback");
            fallback_boss(boss_id, base_health)
        }
        Err(_) => {
            tracing::warn!(boss_id, "content source timed out supplying boss, using fallback");
            fallback_boss(boss_id, base_health)
        }
    }
}

/// Fetch the question pool with a timeout, falling back to the built-in set
/// on failure, timeout, or an empty upstream pool.
pub async fn resolve_questions(
    source: &dyn ContentSource,
    category_id: &str,
    timeout: Duration,
) -> Vec<Question> {
    match tokio::time::timeout(timeout, source.get_questions_pool(category_id)).await {
        Ok(Ok(questions)) if !questions.is_empty() => questions,
        Ok(Ok(_)) => {
            tracing::warn!(category_id, "content source returned an empty pool, using fallback");
            FallbackContent::builtin_questions()
        }
        Ok(Err(err)) => {
            tracing::warn!(category_id, %err, "content source failed to supply questions, using fallback");
            FallbackContent::builtin_questions()
        }
        Err(_) => {
            tracing::warn!(category_id, "content source timed out supplying questions, using fallback");
            FallbackContent::builtin_questions()
        }
    }
}

fn fallback_boss(boss_id: &str, base_health: f64) -> Boss {
    Boss {
        id: boss_id.to_string(),
        name: "Crystal Golem".to_string(),
        base_health,
        category_id: None,
    }
}
