//! Base provider trait and the shared streaming line decoder
//!
//! A provider turns a conversation into a stream of text deltas for the next
//! assistant message. Both built-in providers speak line-delimited HTTP
//! response bodies, so the byte-to-line decoding lives here.

use crate::error::{PocketchatError, Result};
use crate::history::Message;
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

/// Stream of text deltas making up one assistant reply
///
/// The stream ends when the reply is complete. An `Err` item reports a failed
/// reply and is always the last item.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Source of streamed chat completions
///
/// # Examples
///
/// ```
/// use pocketchat::providers::{Provider, TextStream};
/// use pocketchat::history::Message;
/// use pocketchat::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn stream_chat(&self, _id: &str, messages: &[Message]) -> Result<TextStream> {
///         let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
///         Ok(Box::pin(futures::stream::iter(vec![Ok(last)])))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name used in logs and status output
    fn name(&self) -> &str;

    /// Start streaming the reply to `messages`
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent or the endpoint answers
    /// with a non-success status. Failures after the first byte arrive as an
    /// `Err` item of the returned stream.
    async fn stream_chat(&self, conversation_id: &str, messages: &[Message])
        -> Result<TextStream>;
}

/// What one decoded line contributes to the reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Append this text to the reply
    Text(String),
    /// The line carries nothing for the reply
    Skip,
    /// The reply is complete; later lines are ignored
    Done,
}

/// Splits a byte stream into `\n`-terminated lines
///
/// Lines may arrive split across chunks. `\r\n` endings are accepted.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed
    ///
    /// # Examples
    ///
    /// ```
    /// use pocketchat::providers::LineDecoder;
    ///
    /// let mut decoder = LineDecoder::new();
    /// assert!(decoder.push(b"0:\"Hel").is_empty());
    /// assert_eq!(decoder.push(b"lo\"\n"), vec!["0:\"Hello\"".to_string()]);
    /// ```
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Return the unterminated tail, if any, once the body has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text: &str = &text;
    text.strip_suffix('\r').unwrap_or(text).to_string()
}

struct DecodeState<B, F> {
    body: Pin<Box<B>>,
    decoder: LineDecoder,
    lines: VecDeque<String>,
    body_done: bool,
    finished: bool,
    parse: F,
}

/// Turn a streamed HTTP body into a [`TextStream`]
///
/// Every non-empty line is handed to `parse`. Parsing stops at the first
/// [`LineOutcome::Done`] or error.
pub fn decode_text_stream<B, F>(body: B, parse: F) -> TextStream
where
    B: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    F: FnMut(&str) -> Result<LineOutcome> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: LineDecoder::new(),
        lines: VecDeque::new(),
        body_done: false,
        finished: false,
        parse,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(line) = state.lines.pop_front() {
                if line.trim().is_empty() {
                    continue;
                }
                let outcome = (state.parse)(&line);
                match outcome {
                    Ok(LineOutcome::Text(text)) => return Some((Ok(text), state)),
                    Ok(LineOutcome::Skip) => continue,
                    Ok(LineOutcome::Done) => {
                        state.finished = true;
                        return None;
                    }
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            if state.body_done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.decoder.push(&chunk);
                    state.lines.extend(lines);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(PocketchatError::Http(e).into()), state));
                }
                None => {
                    state.body_done = true;
                    if let Some(rest) = state.decoder.finish() {
                        state.lines.push_back(rest);
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_decoder_splits_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"first li").is_empty());
        let lines = decoder.push(b"ne\nsecond\nthi");
        assert_eq!(lines, vec!["first line", "second"]);
        assert_eq!(decoder.finish(), Some("thi".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_line_decoder_strips_carriage_return() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"a\r\nb\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_line_decoder_keeps_multibyte_chars_split_over_chunks() {
        let mut decoder = LineDecoder::new();
        let bytes = "héllo\n".as_bytes();
        assert!(decoder.push(&bytes[..2]).is_empty());
        assert_eq!(decoder.push(&bytes[2..]), vec!["héllo"]);
    }

    fn body(chunks: Vec<&'static str>) -> impl Stream<Item = reqwest::Result<Bytes>> + Send {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<Bytes, reqwest::Error>(Bytes::from_static(c.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    fn upper(line: &str) -> Result<LineOutcome> {
        match line {
            "END" => Ok(LineOutcome::Done),
            "skip" => Ok(LineOutcome::Skip),
            "bad" => Err(PocketchatError::Stream("bad line".to_string()).into()),
            other => Ok(LineOutcome::Text(other.to_uppercase())),
        }
    }

    #[tokio::test]
    async fn test_decode_text_stream_stops_at_done() {
        let stream = decode_text_stream(body(vec!["a\nsk", "ip\nb\nEND\nc\n"]), upper);
        let items: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(items, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_decode_text_stream_handles_unterminated_tail() {
        let stream = decode_text_stream(body(vec!["a\n\n", "b"]), upper);
        let items: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(items, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_decode_text_stream_ends_after_error() {
        let stream = decode_text_stream(body(vec!["a\nbad\nc\n"]), upper);
        let items: Vec<Result<String>> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "A");
        assert!(items[1].is_err());
    }
}
