//! Server state management.
//!
//! Connected sessions plus the per-user records kept in memory: registered
//! papers, test results, chat logs, whiteboard drawings and searches.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::RateLimit;
use crate::generate::LanguageModel;
use crate::models::{CanvasDrawing, ChatEntry, Paper, SearchEntry, TestResult};
use crate::protocol::ServerMessage;

use super::limiter::AddressLimiter;

/// A single connection.
pub struct Session {
    /// Unique session ID.
    pub id: Uuid,
    /// Client IP address.
    pub ip_addr: IpAddr,
    /// Channel to send messages to this client.
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Session {
    pub fn new(ip_addr: IpAddr, sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ip_addr,
            sender,
        }
    }

    /// Send a message to this client.
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.sender.send(msg).is_ok()
    }
}

/// Main server state.
pub struct ServerState {
    /// Connected sessions (by session ID).
    pub sessions: HashMap<Uuid, Session>,
    /// Registered papers (by paper ID).
    pub papers: HashMap<String, Paper>,
    /// Test results per user, oldest first.
    pub results: HashMap<String, Vec<TestResult>>,
    /// Chat log per user.
    pub chats: HashMap<String, Vec<ChatEntry>>,
    /// Whiteboard drawings per user, oldest first.
    pub canvases: HashMap<String, Vec<CanvasDrawing>>,
    /// Saved searches per user, oldest first.
    pub searches: HashMap<String, Vec<SearchEntry>>,
    /// Limits question requests per address.
    pub question_limiter: AddressLimiter,
    /// Model used for chat and topic quizzes.
    pub model: Option<Arc<dyn LanguageModel>>,
}

impl ServerState {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, question_limit: RateLimit) -> Self {
        Self {
            sessions: HashMap::new(),
            papers: HashMap::new(),
            results: HashMap::new(),
            chats: HashMap::new(),
            canvases: HashMap::new(),
            searches: HashMap::new(),
            question_limiter: AddressLimiter::new(question_limit),
            model,
        }
    }

    /// Send a message to one session; `false` if it is gone.
    pub fn send_to(&self, session_id: Uuid, msg: ServerMessage) -> bool {
        self.sessions
            .get(&session_id)
            .is_some_and(|session| session.send(msg))
    }

    /// Broadcast a message to every connected session.
    pub fn broadcast(&self, msg: ServerMessage) {
        for session in self.sessions.values() {
            session.send(msg.clone());
        }
    }

    pub fn admit_question_request(&self, ip: IpAddr) -> bool {
        self.question_limiter.check(ip)
    }

    /// Store a paper and return its ID.
    pub fn register_paper(&mut self, user_id: &str, path: &str, original_name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.papers.insert(
            id.clone(),
            Paper {
                id: id.clone(),
                user_id: user_id.to_string(),
                path: path.to_string(),
                original_name: original_name.to_string(),
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn record_result(
        &mut self,
        user_id: &str,
        percentage: f64,
        topic: Option<String>,
        paper_id: Option<String>,
    ) {
        self.results
            .entry(user_id.to_string())
            .or_default()
            .push(TestResult {
                user_id: user_id.to_string(),
                percentage,
                topic,
                paper_id,
                created_at: Utc::now(),
            });
    }

    /// Most recent result for a user.
    pub fn latest_result(&self, user_id: &str) -> Option<&TestResult> {
        self.results.get(user_id).and_then(|results| results.last())
    }

    /// All results for a user, newest first.
    pub fn result_history(&self, user_id: &str) -> Vec<TestResult> {
        newest_first(&self.results, user_id)
    }

    pub fn record_chat(&mut self, user_id: &str, entries: impl IntoIterator<Item = ChatEntry>) {
        self.chats
            .entry(user_id.to_string())
            .or_default()
            .extend(entries);
    }

    /// A user's conversation with the assistant, oldest first.
    pub fn chat_history(&self, user_id: &str) -> Vec<ChatEntry> {
        self.chats.get(user_id).cloned().unwrap_or_default()
    }

    pub fn record_canvas(&mut self, user_id: &str, canvas_data: &str) {
        self.canvases
            .entry(user_id.to_string())
            .or_default()
            .push(CanvasDrawing {
                user_id: user_id.to_string(),
                canvas_data: canvas_data.to_string(),
                created_at: Utc::now(),
            });
    }

    pub fn latest_canvas(&self, user_id: &str) -> Option<&CanvasDrawing> {
        self.canvases.get(user_id).and_then(|drawings| drawings.last())
    }

    /// Store a search and return the stored entry.
    pub fn record_search(&mut self, user_id: &str, query: &str, option: &str) -> SearchEntry {
        let entry = SearchEntry {
            user_id: user_id.to_string(),
            query: query.to_string(),
            option: option.to_string(),
            created_at: Utc::now(),
        };
        self.searches
            .entry(user_id.to_string())
            .or_default()
            .push(entry.clone());
        entry
    }

    /// All searches for a user, newest first.
    pub fn search_history(&self, user_id: &str) -> Vec<SearchEntry> {
        newest_first(&self.searches, user_id)
    }
}

fn newest_first<T: Clone>(records: &HashMap<String, Vec<T>>, user_id: &str) -> Vec<T> {
    records
        .get(user_id)
        .map(|records| records.iter().rev().cloned().collect())
        .unwrap_or_default()
}
