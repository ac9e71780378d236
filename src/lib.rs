//! # examina
//!
//! Turns exam question papers and study topics into multiple-choice quizzes.
//!
//! - [`extract_questions`] reads the questions out of a paper's plain text,
//!   always returning the requested number of four-option questions.
//! - [`generate`] builds quizzes and study answers with a generative-language
//!   model.
//! - [`server`] serves chat, quizzes and score history over WebSocket.
//! - [`Quiz`] runs a quiz in the terminal.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use examina::{Quiz, QuizError, questions_from_paper};
//!
//! fn main() -> Result<(), QuizError> {
//!     // Pull five questions out of a PDF paper
//!     let questions = questions_from_paper("midterm.pdf", 5)?;
//!
//!     // Run the quiz in the terminal
//!     if let Some(percentage) = Quiz::new("Midterm", questions).run()? {
//!         println!("{percentage:.0}%");
//!     }
//!
//!     Ok(())
//! }
//! ```

mod app;
pub mod config;
mod data;
mod error;
pub mod extract;
pub mod generate;
mod models;
pub mod protocol;
pub mod server;
pub mod terminal;
mod ui;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

pub use app::App;
pub use data::{extract_pdf_text, load_questions_from_json, questions_from_paper};
pub use error::{AiError, LoadError, QuizError};
pub use extract::extract_questions;
pub use models::{
    AppState, CanvasDrawing, ChatEntry, ChatRole, NUM_OPTIONS, Paper, Question, SearchEntry, TestResult,
};

/// A quiz instance that can be run in the terminal.
pub struct Quiz {
    app: App,
}

impl Quiz {
    /// Create a new quiz from a vector of questions.
    pub fn new(title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            app: App::with_questions(title, questions),
        }
    }

    /// Load a quiz from a JSON file.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use examina::Quiz;
    ///
    /// let quiz = Quiz::from_json("questions.json").expect("Failed to load quiz");
    /// ```
    pub fn from_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, QuizError> {
        let questions = load_questions_from_json(path)?;
        Ok(Self::new("Quiz", questions))
    }

    /// Run the quiz in the terminal.
    ///
    /// Takes over the terminal until the user quits and returns the score of
    /// the last completed attempt as a percentage, if any attempt finished.
    pub fn run(mut self) -> Result<Option<f64>, QuizError> {
        let mut term = terminal::TerminalSession::start()?;
        run_event_loop(&mut term, &mut self.app)?;
        Ok(self.app.last_percentage())
    }

    /// Get a reference to the underlying app for custom handling.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the underlying app for custom handling.
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }
}

fn run_event_loop(terminal: &mut terminal::AppTerminal, app: &mut App) -> Result<(), QuizError> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if handle_input(app, key.code) {
                break;
            }
        }
    }

    Ok(())
}

/// Rows moved by PageUp/PageDown on the result screen.
const RESULT_PAGE: isize = 10;

/// Returns true if the app should exit.
fn handle_input(app: &mut App, key: KeyCode) -> bool {
    if matches!(key, KeyCode::Char('q' | 'Q') | KeyCode::Esc) {
        return true;
    }

    match (app.state, key) {
        (AppState::Welcome, KeyCode::Enter) => app.start_quiz(),

        (AppState::Quiz, KeyCode::Up | KeyCode::Char('k')) => app.select_previous_option(),
        (AppState::Quiz, KeyCode::Down | KeyCode::Char('j')) => app.select_next_option(),
        (AppState::Quiz, KeyCode::Char(label @ ('a'..='d' | 'A'..='D'))) => {
            app.select_option_by_label(label)
        }
        (AppState::Quiz, KeyCode::Enter | KeyCode::Char(' ')) => app.submit_answer(),

        (AppState::Result, KeyCode::Down | KeyCode::Char('j')) => app.scroll_results(1),
        (AppState::Result, KeyCode::Up | KeyCode::Char('k')) => app.scroll_results(-1),
        (AppState::Result, KeyCode::PageDown) => app.scroll_results(RESULT_PAGE),
        (AppState::Result, KeyCode::PageUp) => app.scroll_results(-RESULT_PAGE),
        (AppState::Result, KeyCode::Home | KeyCode::Char('g')) => app.scroll_results_to(0),
        (AppState::Result, KeyCode::End | KeyCode::Char('G')) => app.scroll_results_to(usize::MAX),
        (AppState::Result, KeyCode::Char('r' | 'R')) => app.restart(),

        _ => {}
    }

    false
}
