//! Question paper extraction.
//!
//! Turns the plain text of a question paper into a fixed number of
//! four-option questions. Lines are classified one at a time
//! ([`classify_line`]) and folded into questions ([`extract_questions`]).

mod classify;
mod extractor;

pub use classify::{LineKind, classify_line};
pub use extractor::{
    OPTION_PLACEHOLDER, QuestionDraft, extract_questions, filler_question, parse_questions,
};

/// Question count used when a request names none.
pub const DEFAULT_QUESTION_COUNT: usize = 2;

/// Requested question count, falling back to [`DEFAULT_QUESTION_COUNT`] for
/// a missing or zero value.
pub fn resolve_count(requested: Option<usize>) -> usize {
    requested
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_QUESTION_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_count() {
        assert_eq!(resolve_count(None), 2);
        assert_eq!(resolve_count(Some(0)), 2);
        assert_eq!(resolve_count(Some(7)), 7);
    }
}
