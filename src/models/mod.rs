//! Domain types shared by the extractor, the terminal runner and the server.

mod question;
mod record;

pub use question::{NUM_OPTIONS, Question};
pub use record::{CanvasDrawing, ChatEntry, ChatRole, Paper, SearchEntry, TestResult};

/// Screen the terminal runner is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Welcome,
    Quiz,
    Result,
}
