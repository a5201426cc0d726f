//! Event parsing for the live completion stream.
//!
//! Each non-blank line is either the terminal sentinel or a JSON object.
//! Objects may carry text in several places:
//! - `{"delta": "text"}`
//! - `{"delta": {"content": "text"}}` or `{"delta": {"text": "text"}}`
//! - `{"content": "text"}`
//!
//! and may name the producing model in a `model` field. Anything that does not
//! fit is noise and is dropped without failing the stream.

use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tracing::trace;

/// Literal that ends a live response
pub const END_OF_RESPONSE: &str = "[END_OF_RESPONSE]";

/// Substring (lowercase) that identifies the live model in a `model` field
const LIVE_MODEL_MARKER: &str = "monday";

/// Typed event from one stream line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text to add to the reply
    Delta {
        text: String,
        model: Option<String>,
    },
    /// A line that only identifies the model
    Metadata { model: String },
}

impl StreamEvent {
    pub fn model(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta { model, .. } => model.as_deref(),
            StreamEvent::Metadata { model } => Some(model),
        }
    }

    /// Whether this event names the live model
    pub fn is_live(&self) -> bool {
        self.model().is_some_and(is_live_model)
    }
}

/// Outcome of parsing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Event(StreamEvent),
    /// Terminal sentinel: stop reading
    End,
    /// Malformed or irrelevant line: skip it
    Noise,
}

/// Whether a model name identifies the live backend.
pub fn is_live_model(model: &str) -> bool {
    model.to_lowercase().contains(LIVE_MODEL_MARKER)
}

/// Parse a single decoded line. Never fails.
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line == END_OF_RESPONSE {
        return ParsedLine::End;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            trace!("Dropping malformed stream line ({}): {:?}", e, line);
            return ParsedLine::Noise;
        }
    };
    let Some(object) = value.as_object() else {
        trace!("Dropping non-object stream line: {:?}", line);
        return ParsedLine::Noise;
    };

    let model = object
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_string);
    let text = object
        .get("delta")
        .and_then(delta_text)
        .or_else(|| object.get("content").and_then(Value::as_str).map(str::to_string));

    match (text, model) {
        (Some(text), model) => ParsedLine::Event(StreamEvent::Delta { text, model }),
        (None, Some(model)) => ParsedLine::Event(StreamEvent::Metadata { model }),
        (None, None) => ParsedLine::Noise,
    }
}

fn delta_text(delta: &Value) -> Option<String> {
    match delta {
        Value::String(text) => Some(text.clone()),
        Value::Object(nested) => nested
            .get("content")
            .or_else(|| nested.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Turn a stream of lines into a stream of events.
///
/// Noise is skipped. The stream ends at the terminal sentinel without reading
/// any further line, and right after passing through an upstream error.
pub fn parse_events<S, E>(lines: S) -> impl Stream<Item = Result<StreamEvent, E>>
where
    S: Stream<Item = Result<String, E>> + Unpin,
{
    stream::unfold(Some(lines), |lines| async move {
        let mut lines = lines?;
        loop {
            match lines.next().await? {
                Ok(line) => match parse_line(&line) {
                    ParsedLine::Event(event) => return Some((Ok(event), Some(lines))),
                    ParsedLine::End => return None,
                    ParsedLine::Noise => continue,
                },
                Err(e) => return Some((Err(e), None)),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> ParsedLine {
        ParsedLine::Event(StreamEvent::Delta {
            text: text.to_string(),
            model: None,
        })
    }

    #[test]
    fn test_sentinel() {
        assert_eq!(parse_line("[END_OF_RESPONSE]"), ParsedLine::End);
        assert_eq!(parse_line("  [END_OF_RESPONSE]\r"), ParsedLine::End);
    }

    #[test]
    fn test_delta_shapes() {
        assert_eq!(parse_line(r#"{"delta":"hi"}"#), delta("hi"));
        assert_eq!(parse_line(r#"{"delta":{"content":"hi"}}"#), delta("hi"));
        assert_eq!(parse_line(r#"{"delta":{"text":"hi"}}"#), delta("hi"));
        assert_eq!(parse_line(r#"{"content":"hi"}"#), delta("hi"));
        assert_eq!(parse_line(r#"{"delta":""}"#), delta(""));
    }

    #[test]
    fn test_delta_preferred_over_content() {
        assert_eq!(parse_line(r#"{"delta":"a","content":"b"}"#), delta("a"));
    }

    #[test]
    fn test_model_is_captured() {
        let parsed = parse_line(r#"{"delta":"x","model":"Monday-GPT"}"#);
        let ParsedLine::Event(event) = parsed else {
            panic!("expected event");
        };
        assert_eq!(event.model(), Some("Monday-GPT"));
        assert!(event.is_live());
    }

    #[test]
    fn test_model_only_line_is_metadata() {
        assert_eq!(
            parse_line(r#"{"model":"mistral"}"#),
            ParsedLine::Event(StreamEvent::Metadata {
                model: "mistral".to_string()
            })
        );
    }

    #[test]
    fn test_noise() {
        assert_eq!(parse_line("not json"), ParsedLine::Noise);
        assert_eq!(parse_line(r#"{"delta":"trunc"#), ParsedLine::Noise);
        assert_eq!(parse_line("[1,2,3]"), ParsedLine::Noise);
        assert_eq!(parse_line("\"just a string\""), ParsedLine::Noise);
        assert_eq!(parse_line(r#"{"keepalive":true}"#), ParsedLine::Noise);
        assert_eq!(parse_line(r#"{"delta":null}"#), ParsedLine::Noise);
        assert_eq!(parse_line(r#"{"delta":42}"#), ParsedLine::Noise);
    }

    #[test]
    fn test_is_live_model() {
        assert!(is_live_model("monday"));
        assert!(is_live_model("ASK-MONDAY"));
        assert!(!is_live_model("mistral-13b"));
    }

    #[tokio::test]
    async fn test_parse_events_stops_at_sentinel() {
        let lines: Vec<Result<String, ()>> = vec![
            Ok(r#"{"delta":"a"}"#.to_string()),
            Ok("garbage".to_string()),
            Ok(r#"{"delta":"b"}"#.to_string()),
            Ok(END_OF_RESPONSE.to_string()),
            Ok(r#"{"delta":"after"}"#.to_string()),
        ];
        let events: Vec<_> = parse_events(stream::iter(lines)).collect().await;
        let texts: Vec<_> = events
            .into_iter()
            .map(|e| match e {
                Ok(StreamEvent::Delta { text, .. }) => text,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_parse_events_ends_after_error() {
        let lines: Vec<Result<String, &str>> = vec![
            Ok(r#"{"delta":"a"}"#.to_string()),
            Err("reset"),
            Ok(r#"{"delta":"b"}"#.to_string()),
        ];
        let events: Vec<_> = parse_events(stream::iter(lines)).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], Err("reset"));
    }
}
