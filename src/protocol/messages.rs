//! Protocol messages for client-server communication.
//!
//! All messages are serialized as JSON over WebSocket.

use serde::{Deserialize, Serialize};

use crate::models::{ChatEntry, Question, SearchEntry, TestResult};

/// Messages sent from client to server.
///
/// Missing fields decode as blank so the server can answer with the field
/// that was required instead of dropping the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Chat message for the assistant, relayed to everyone.
    SendMessage {
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        mode: String,
    },

    /// Conversation with the assistant so far, oldest first.
    GetChatHistory {
        #[serde(default)]
        user_id: String,
    },

    /// Register a PDF question paper already on the server's disk.
    RegisterPaper {
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        original_name: String,
    },

    /// Ask for a quiz, from a registered paper or about a topic.
    FetchQuestions {
        #[serde(default)]
        paper_id: Option<String>,
        #[serde(default)]
        topic: Option<String>,
        #[serde(default)]
        question_count: Option<usize>,
    },

    /// Record the score of a finished quiz.
    SaveTestResult {
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        percentage: Option<f64>,
        #[serde(default)]
        topic: Option<String>,
        #[serde(default)]
        paper_id: Option<String>,
    },

    /// Latest recorded score.
    GetTestResult {
        #[serde(default)]
        user_id: String,
    },

    /// Every recorded score, newest first.
    GetTestHistory {
        #[serde(default)]
        user_id: String,
    },

    /// Store a whiteboard drawing.
    SaveCanvas {
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        canvas_data: String,
    },

    /// Latest stored drawing.
    GetCanvas {
        #[serde(default)]
        user_id: String,
    },

    SaveSearch {
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        query: String,
        #[serde(default)]
        option: String,
    },

    /// Every saved search, newest first.
    GetSearchHistory {
        #[serde(default)]
        user_id: String,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Connection accepted.
    ConnectionAck,

    /// A chat line, broadcast to every connection.
    ReceiveMessage { sender: String, text: String },

    /// The last request from this client failed.
    ErrorMessage { error: String },

    ChatHistory { history: Vec<ChatEntry> },

    PaperRegistered { message: String, paper_id: String },

    Questions { questions: Vec<Question> },

    TestResultSaved { message: String },

    LatestTestResult { percentage: f64 },

    TestHistory { history: Vec<TestResult> },

    CanvasSaved { message: String },

    Canvas { canvas_data: String },

    SearchSaved { message: String, entry: SearchEntry },

    SearchHistory { history: Vec<SearchEntry> },
}

impl ServerMessage {
    pub fn error(error: impl Into<String>) -> Self {
        ServerMessage::ErrorMessage {
            error: error.into(),
        }
    }
}

/// Sender name on relayed user messages.
pub const USER_SENDER: &str = "User";

/// Sender name on assistant replies.
pub const AI_SENDER: &str = "Exam-AI";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Returns the trimmed value, or `None` when it is blank.
pub fn required(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
