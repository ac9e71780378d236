//! Line classification for question papers.

use std::sync::LazyLock;

use regex::Regex;

/// `Q`, `Q12`, `3.` at the start of a line. ASCII digits only.
static QUESTION_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(Q[0-9]*|[0-9]+\.)").unwrap());

/// `A)` .. `D)` at the start of a line.
static OPTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-D]\)").unwrap());

static ANSWER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(Answer|Ans):").unwrap());

/// Captures the `X)` fragment after the answer prefix.
static ANSWER_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(Answer|Ans):\s*([A-D]\))").unwrap());

/// What a single trimmed line of a paper is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    QuestionStart,
    Option,
    /// Answer line, with the `X)` fragment when one could be read.
    Answer(Option<String>),
    Other,
}

/// Classify one trimmed line. First match wins, in the order of the variants.
pub fn classify_line(line: &str) -> LineKind {
    if QUESTION_START.is_match(line) {
        LineKind::QuestionStart
    } else if OPTION.is_match(line) {
        LineKind::Option
    } else if ANSWER.is_match(line) {
        let letter = ANSWER_LETTER
            .captures(line)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str().to_string());
        LineKind::Answer(letter)
    } else {
        LineKind::Other
    }
}
