//! Education chat assistant prompts and reply formatting.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\. ").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").unwrap());

/// Restricts the assistant to academic topics.
pub const SYSTEM_INSTRUCTION: &str = "You are an AI assistant specialized in education. \
You will ONLY answer questions related to exams, studies, school subjects, and academic topics. \
If the query is not related to education, politely decline to answer with: \
\"I'm sorry, I can only assist with education-related topics like exams, studies, or school subjects.\"";

/// What the user wants the assistant to do with their message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatMode {
    #[serde(rename = "Explain Topic")]
    ExplainTopic,
    #[serde(rename = "Explore Questions")]
    ExploreQuestions,
    #[serde(rename = "Start a Test")]
    StartTest,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::ExplainTopic => "Explain Topic",
            ChatMode::ExploreQuestions => "Explore Questions",
            ChatMode::StartTest => "Start a Test",
        }
    }

    fn template(&self, message: &str) -> String {
        match self {
            ChatMode::ExplainTopic => {
                format!("Explain the following topic: \"{message}\". Provide examples.")
            }
            ChatMode::ExploreQuestions => {
                format!("Generate a list of meaningful questions based on: \"{message}\".")
            }
            ChatMode::StartTest => format!(
                "Create a quiz with multiple-choice questions (MCQs) for: \"{message}\"."
            ),
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid mode selected.")]
pub struct InvalidMode;

impl FromStr for ChatMode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Explain Topic" => Ok(ChatMode::ExplainTopic),
            "Explore Questions" => Ok(ChatMode::ExploreQuestions),
            "Start a Test" => Ok(ChatMode::StartTest),
            _ => Err(InvalidMode),
        }
    }
}

/// Full prompt for a chat message: the system instruction, then the mode's
/// request.
pub fn build_chat_prompt(mode: ChatMode, message: &str) -> String {
    format!("{SYSTEM_INSTRUCTION}\n\n{}", mode.template(message))
}

/// Tidy a model reply for display: no `*` markup, one sentence per line, no
/// blank lines.
pub fn format_response(text: &str) -> String {
    let text = text.replace('*', "");
    let text = SENTENCE_BREAK.replace_all(&text, ".\n");
    BLANK_LINES.replace_all(&text, "\n").trim().to_string()
}
