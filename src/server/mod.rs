//! Quiz server module.
//!
//! JSON-over-WebSocket service: chat relay, question requests and per-user
//! records (test results, chat logs, canvas drawings, searches).

mod limiter;
mod server;
mod state;

pub use limiter::AddressLimiter;
pub use server::{SharedState, handle_client_message, handle_client_text, run};
pub use state::{ServerState, Session};
