mod message;
mod request;
mod session;

pub use message::*;
pub use request::{BatchRequest, ChatMode, ChatRequest, LiveRequest, WireMessage};
pub use session::{generate_session_id, Session, SessionSummary};
