//! Networking: JSON-lines protocol over TCP

pub mod protocol;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage};
pub use server::Server;
