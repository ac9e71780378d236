//! Text generation over a generative-language API: topic quizzes and the
//! education chat assistant.

mod chat;
mod client;
mod topic;

pub use chat::{ChatMode, InvalidMode, SYSTEM_INSTRUCTION, build_chat_prompt, format_response};
pub use client::{DEFAULT_MODEL, EMPTY_RESPONSE, GeminiClient, GeminiConfig, LanguageModel};
pub use topic::{
    fallback_questions, generate_topic_quiz, mocked_questions, parse_generated_questions,
    strip_code_fences, topic_quiz_prompt,
};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::LanguageModel;
    use crate::error::AiError;

    /// Replies with a fixed text and records the prompts it saw.
    #[derive(Debug, Default)]
    pub(crate) struct StaticModel {
        pub reply: String,
        pub prompts: Mutex<Vec<String>>,
    }

    impl StaticModel {
        pub(crate) fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for StaticModel {
        async fn generate(&self, prompt: String) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt);
            Ok(self.reply.clone())
        }
    }

    #[derive(Debug)]
    pub(crate) struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn generate(&self, _prompt: String) -> Result<String, AiError> {
            Err(AiError::RateLimit)
        }
    }
}
