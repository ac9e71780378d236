//! Client-server protocol.

mod messages;

pub use messages::*;
