//! Loading question sets and paper text from disk.

mod loader;
mod pdf;

pub use loader::load_questions_from_json;
pub use pdf::{extract_pdf_text, questions_from_paper};
