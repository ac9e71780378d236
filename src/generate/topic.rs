//! Quizzes generated from a topic instead of a paper.

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AiError;
use crate::extract::QuestionDraft;
use crate::models::Question;

use super::client::LanguageModel;

#[derive(Debug, Deserialize)]
struct GeneratedQuiz {
    #[serde(default)]
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    answer: Option<String>,
}

impl From<GeneratedQuestion> for Question {
    fn from(generated: GeneratedQuestion) -> Self {
        QuestionDraft {
            prompt: generated.question,
            options: generated.options,
            answer: generated.answer.filter(|a| !a.trim().is_empty()),
        }
        .finalize()
    }
}

pub fn topic_quiz_prompt(topic: &str, count: usize) -> String {
    format!(
        "Generate {count} multiple-choice questions about {topic} with 4 options each and the correct answer. \
         Format the response as JSON with the following structure: \
         {{ questions: [{{ question: string, options: [string], answer: string }}] }}"
    )
}

/// Stand-ins used when no model is configured.
pub fn mocked_questions(topic: &str, count: usize) -> Vec<Question> {
    (1..=count)
        .map(|i| Question::generic(format!("Mocked Question {i} about {topic}")))
        .collect()
}

/// Stand-ins used when the model's reply cannot be parsed.
pub fn fallback_questions(topic: &str, count: usize) -> Vec<Question> {
    (1..=count)
        .map(|i| Question::generic(format!("Fallback Question {i} about {topic}")))
        .collect()
}

/// Remove Markdown code fences around a JSON reply.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json\n", "").replace("```", "").trim().to_string()
}

/// Parse a model reply into questions, each normalized to four options.
pub fn parse_generated_questions(reply: &str) -> Result<Vec<Question>, serde_json::Error> {
    let quiz: GeneratedQuiz = serde_json::from_str(&strip_code_fences(reply))?;
    Ok(quiz.questions.into_iter().map(Question::from).collect())
}

/// Generate a quiz about `topic`.
///
/// The topic arrives percent-encoded from clients and is decoded first.
/// Without a model the quiz is mocked; an unparseable reply yields
/// fallback questions. Only a failed model call is an error.
pub async fn generate_topic_quiz(
    model: Option<&dyn LanguageModel>,
    topic: &str,
    count: usize,
) -> Result<Vec<Question>, AiError> {
    let topic = urlencoding::decode(topic)
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| topic.to_string());

    let Some(model) = model else {
        info!(topic = %topic, count, "no model configured, mocking quiz");
        return Ok(mocked_questions(&topic, count));
    };

    let reply = model.generate(topic_quiz_prompt(&topic, count)).await?;

    match parse_generated_questions(&reply) {
        Ok(questions) => {
            info!(topic = %topic, count = questions.len(), "generated topic quiz");
            Ok(questions)
        }
        Err(e) => {
            warn!(error = %e, raw = %reply, "failed to parse generated quiz");
            Ok(fallback_questions(&topic, count))
        }
    }
}
