//! Live response pipeline: bytes → lines → events.
//!
//! ```text
//! ByteStream ──decode_lines──▶ non-blank lines ──parse_events──▶ StreamEvent
//! ```

pub mod decoder;
pub mod parser;

use std::pin::Pin;

use futures::Stream;

pub use decoder::{decode_lines, LineDecoder};
pub use parser::{is_live_model, parse_events, parse_line, ParsedLine, StreamEvent, END_OF_RESPONSE};

use crate::error::HttpError;
use crate::traits::ByteStream;

/// Events of one live response, in delivery order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, HttpError>> + Send>>;

/// Build the full pipeline over a response body.
pub fn event_stream(body: ByteStream) -> EventStream {
    let lines = Box::pin(decode_lines(body));
    Box::pin(parse_events(lines))
}
