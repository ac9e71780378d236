//! Server configuration.

use std::time::Duration;

use crate::generate::GeminiConfig;
use crate::protocol::DEFAULT_PORT;

/// Question requests allowed per client address and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// `None` runs without a model: topic quizzes are mocked and chat is
    /// unavailable.
    pub gemini: Option<GeminiConfig>,
    pub question_limit: RateLimit,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            gemini: None,
            question_limit: RateLimit::default(),
        }
    }
}
