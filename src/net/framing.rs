//! Newline-delimited framing over a connected stream.
//!
//! The framer is stateful: bytes read past the first terminator are retained
//! for the next call, and a partial line survives a non-blocking "not ready"
//! poll.

use crate::net::error::{SocketError, SocketResult};
use crate::net::stream::{ReadOutcome, Stream};

/// Bytes requested from the stream per read.
pub const LINE_CHUNK_SIZE: usize = 2048;

/// Line terminator.
const LINE_TERMINATOR: u8 = b'\n';

/// Accumulates chunks from a stream and splits them into lines.
///
/// No size or time bound is imposed on an unterminated line from a peer that
/// keeps the connection open; callers must impose their own.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one line, terminator stripped.
    ///
    /// Splits at the first terminator and retains the remainder for the next
    /// call. `Ok(None)` means the stream reported "not ready" before a full
    /// line arrived (non-blocking mode); the partial buffer is kept. EOF
    /// before a terminator is an error, as is a line that is not valid UTF-8.
    pub fn read_line(&mut self, stream: &mut Stream) -> SocketResult<Option<String>> {
        loop {
            if let Some(line) = self.take_buffered_line()? {
                return Ok(Some(line));
            }
            match stream.read(LINE_CHUNK_SIZE)? {
                ReadOutcome::Data(chunk) => self.buffer.extend_from_slice(&chunk),
                ReadOutcome::Eof => {
                    return Err(SocketError::read_msg(format!(
                        "connection closed before a line terminator; {} bytes buffered",
                        self.buffer.len()
                    )))
                }
                ReadOutcome::NotReady => return Ok(None),
            }
        }
    }

    /// Write the line plus terminator in one send call.
    ///
    /// Returns the byte count the OS accepted, which includes the terminator.
    pub fn send_line(&self, stream: &mut Stream, line: &str) -> SocketResult<usize> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(LINE_TERMINATOR);
        stream.send(&data)
    }

    /// Bytes buffered past the last returned line.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Split off the first buffered line, if a terminator is present.
    fn take_buffered_line(&mut self) -> SocketResult<Option<String>> {
        let Some(pos) = self.buffer.iter().position(|&b| b == LINE_TERMINATOR) else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        String::from_utf8(line)
            .map(Some)
            .map_err(|err| SocketError::read_msg(format!("line is not valid UTF-8: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_at_first_terminator() {
        let mut framer = LineFramer::new();
        framer.buffer.extend_from_slice(b"ONE\nTWO\nTHR");

        assert_eq!(framer.take_buffered_line().unwrap(), Some("ONE".into()));
        assert_eq!(framer.take_buffered_line().unwrap(), Some("TWO".into()));
        assert_eq!(framer.take_buffered_line().unwrap(), None);
        assert_eq!(framer.buffered(), b"THR");
    }

    #[test]
    fn test_empty_line() {
        let mut framer = LineFramer::new();
        framer.buffer.extend_from_slice(b"\nrest");
        assert_eq!(framer.take_buffered_line().unwrap(), Some(String::new()));
        assert_eq!(framer.buffered(), b"rest");
    }

    #[test]
    fn test_invalid_utf8_is_read_error() {
        let mut framer = LineFramer::new();
        framer.buffer.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let err = framer.take_buffered_line().unwrap_err();
        assert!(matches!(err, SocketError::Read { .. }));
    }

    #[test]
    fn test_no_terminator_keeps_buffer() {
        let mut framer = LineFramer::new();
        framer.buffer.extend_from_slice(b"partial");
        assert_eq!(framer.take_buffered_line().unwrap(), None);
        assert_eq!(framer.buffered(), b"partial");
    }
}
