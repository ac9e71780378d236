use serde::{Deserialize, Serialize};

/// Number of options every question carries.
pub const NUM_OPTIONS: usize = 4;

/// A multiple-choice question.
///
/// `answer` is expected to name one of `options`, either verbatim or by its
/// letter label (`"B)"`), but nothing enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: [String; NUM_OPTIONS],
    pub answer: String,
}

impl Question {
    /// Question with the generic `A) Option 1` .. `D) Option 4` choices.
    pub fn generic(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options: [
                "A) Option 1".to_string(),
                "B) Option 2".to_string(),
                "C) Option 3".to_string(),
                "D) Option 4".to_string(),
            ],
            answer: "A) Option 1".to_string(),
        }
    }

    /// Index of the option `answer` refers to.
    ///
    /// An exact match wins; otherwise the first option sharing the answer's
    /// letter label is used. Returns `None` when neither matches.
    pub fn correct_option(&self) -> Option<usize> {
        let answer = self.answer.trim();
        if let Some(index) = self.options.iter().position(|o| o.trim() == answer) {
            return Some(index);
        }

        let label = option_label(answer)?;
        self.options
            .iter()
            .position(|o| option_label(o.trim()) == Some(label))
    }

    /// Whether picking `option` answers this question correctly.
    pub fn is_correct(&self, option: usize) -> bool {
        self.correct_option() == Some(option)
    }
}

/// Upper-cased letter of a leading `X)` label.
fn option_label(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    match (letter, chars.next()) {
        ('A'..='D', Some(')')) => Some(letter),
        _ => None,
    }
}
