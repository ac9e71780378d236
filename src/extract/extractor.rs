//! Folds classified lines into questions and reconciles the count.

use crate::models::{NUM_OPTIONS, Question};

use super::classify::{LineKind, classify_line};

/// Fills option slots the paper did not provide.
pub const OPTION_PLACEHOLDER: &str = "A) Option Placeholder";

/// A question while its option and answer lines are still being read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: Option<String>,
}

impl QuestionDraft {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options: Vec::with_capacity(NUM_OPTIONS),
            answer: None,
        }
    }

    /// Pad the options to four with [`OPTION_PLACEHOLDER`] and default a
    /// missing answer to the first option. Options past the fourth are dropped.
    pub fn finalize(self) -> Question {
        let mut options = self.options.into_iter();
        let options: [String; NUM_OPTIONS] = std::array::from_fn(|_| {
            options
                .next()
                .unwrap_or_else(|| OPTION_PLACEHOLDER.to_string())
        });
        let answer = self.answer.unwrap_or_else(|| options[0].clone());

        Question {
            prompt: self.prompt,
            options,
            answer,
        }
    }
}

/// Stand-in question appended when a paper yields too few.
///
/// `number` is 1-based over the fillers only.
pub fn filler_question(number: usize) -> Question {
    Question::generic(format!("Additional Question {} from paper", number))
}

/// Read the questions out of a paper's text, returning exactly
/// `desired_count` of them.
///
/// Blank lines are skipped and every line is trimmed. Questions found in the
/// text come first, in document order; fillers make up any shortfall.
pub fn extract_questions(raw_text: &str, desired_count: usize) -> Vec<Question> {
    let mut questions = parse_questions(raw_text);

    if questions.len() >= desired_count {
        questions.truncate(desired_count);
    } else {
        let missing = desired_count - questions.len();
        questions.extend((1..=missing).map(filler_question));
    }

    questions
}

/// Every question in the text, finalized, without count reconciliation.
pub fn parse_questions(raw_text: &str) -> Vec<Question> {
    let mut questions = Vec::new();
    let mut current: Option<QuestionDraft> = None;

    for line in raw_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match classify_line(line) {
            LineKind::QuestionStart => {
                if let Some(draft) = current.replace(QuestionDraft::new(line)) {
                    questions.push(draft.finalize());
                }
            }
            LineKind::Option => {
                if let Some(draft) = current.as_mut() {
                    draft.options.push(line.to_string());
                }
            }
            LineKind::Answer(Some(letter)) => {
                if let Some(draft) = current.as_mut() {
                    draft.answer = Some(letter);
                }
            }
            LineKind::Answer(None) | LineKind::Other => {}
        }
    }

    if let Some(draft) = current {
        questions.push(draft.finalize());
    }

    questions
}
