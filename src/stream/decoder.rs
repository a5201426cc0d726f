//! Line framing for chunked response bodies.
//!
//! The transport hands over bytes at arbitrary boundaries: a chunk may end in
//! the middle of a line, or in the middle of a multi-byte UTF-8 sequence. The
//! decoder keeps the unterminated tail as raw bytes and only decodes a line once
//! its `\n` has arrived.

use std::collections::VecDeque;

use futures_util::stream::{self, Stream, StreamExt};

/// Incremental byte-to-line decoder.
#[derive(Debug, Default, Clone)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no `\n`
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and take every line it completed, terminators stripped.
    ///
    /// Blank lines are returned as-is; filtering happens in [`decode_lines`].
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            lines.push(decode_line(&self.buffer[start..end]));
            start = end + 1;
            from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        lines
    }

    /// Flush the unterminated tail at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        self.scanned = 0;
        let tail = std::mem::take(&mut self.buffer);
        Some(decode_line(&tail))
    }

    /// Bytes buffered while waiting for a terminator
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

struct DecodeState<S> {
    bytes: S,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn queue(&mut self, lines: impl IntoIterator<Item = String>) {
        self.ready
            .extend(lines.into_iter().filter(|line| !line.trim().is_empty()));
    }
}

/// Turn a chunked byte stream into a lazy stream of non-blank lines.
///
/// A transport error is passed through as the last item; the partial tail
/// buffered at that point is dropped.
pub fn decode_lines<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let state = DecodeState {
        bytes,
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.decoder.push(chunk.as_ref());
                    state.queue(lines);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    let tail = state.decoder.finish();
                    state.queue(tail);
                }
            }
        }
    })
}
