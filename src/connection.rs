//! Control-channel line I/O: buffered reads of CRLF-terminated command
//! lines, buffered writes of [`Reply`] values.
//!
//! Generalizes the teacher's `Connection<S>`/`ConnectionStream` pattern from
//! RESP frames to FTP command/reply lines, keeping the same "buffer until a
//! full unit is available" read loop and the same testability: any
//! `AsyncRead + AsyncWrite + Unpin + Send` stream works, including
//! `tokio_test::io::Builder` mocks.
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::Result;
use crate::reply::Reply;

const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// A parsed command line: an uppercased verb and its verbatim parameter
/// string (empty if none was given).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub verb: String,
    pub param: String,
}

/// A trait for types usable as a control-channel stream. Only write access is
/// required generically, so a write-only half (`tokio::net::tcp::OwnedWriteHalf`,
/// once the session's background reader task owns the other half) still
/// satisfies `Session<S>`; `read_command` below carries its own `AsyncRead`
/// bound for the callers that do read from `S` directly.
pub trait ConnectionStream: AsyncWrite + Unpin + Send {}
impl<T: AsyncWrite + Unpin + Send> ConnectionStream for T {}

/// Buffered CRLF-delimited command/reply I/O over a generic stream.
#[derive(Debug)]
pub struct ControlConnection<S> {
    stream: BufWriter<S>,
    buffer: BytesMut,
}

impl<S: ConnectionStream> ControlConnection<S> {
    pub fn new(socket: S) -> ControlConnection<S> {
        ControlConnection {
            stream: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    pub async fn write_reply(&mut self, reply: &Reply) -> Result<()> {
        self.stream.write_all(reply.render().as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Number of bytes currently buffered and not yet parsed into a command.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

impl<S: ConnectionStream + AsyncRead> ControlConnection<S> {
    /// Reads one command line. Returns `Ok(None)` on a clean EOF between
    /// lines; any other read error propagates.
    #[tracing::instrument(skip_all)]
    pub async fn read_command(&mut self) -> Result<Option<CommandLine>> {
        loop {
            if let Some(len) = find_newline(&self.buffer) {
                let line = take_line(&mut self.buffer, len);
                debug!(?line, "command line received");
                return Ok(Some(line));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                } else {
                    // A trailing line with no terminator is still a command;
                    // legacy clients sometimes omit the final CRLF.
                    let len = self.buffer.len();
                    return Ok(Some(take_line(&mut self.buffer, len)));
                }
            }
        }
    }
}

/// Finds the position just past the first `\n` in `buf`, if any, returning
/// the number of bytes of the line including its terminator.
fn find_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}

/// A line reader over a plain `AsyncRead` half, used by the session's
/// background reader task once the control socket has been split so reads
/// and writes can proceed concurrently (needed for ABOR to preempt an
/// in-flight transfer).
pub struct CommandReader<R> {
    stream: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin + Send> CommandReader<R> {
    pub fn new(stream: R) -> CommandReader<R> {
        CommandReader {
            stream,
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    pub async fn read_command(&mut self) -> Result<Option<CommandLine>> {
        loop {
            if let Some(len) = find_newline(&self.buffer) {
                return Ok(Some(take_line(&mut self.buffer, len)));
            }
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let len = self.buffer.len();
                return Ok(Some(take_line(&mut self.buffer, len)));
            }
        }
    }
}

fn take_line(buffer: &mut BytesMut, len: usize) -> CommandLine {
    let raw = buffer.split_to(len);
    let text = String::from_utf8_lossy(&raw);
    let text = text.trim_end_matches(['\r', '\n']);
    match text.find(|c: char| c.is_whitespace()) {
        Some(idx) => CommandLine {
            verb: text[..idx].to_ascii_uppercase(),
            param: text[idx..].trim_start().to_string(),
        },
        None => CommandLine {
            verb: text.to_ascii_uppercase(),
            param: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::ReplyCode;

    #[tokio::test]
    async fn reads_crlf_terminated_command_line() {
        let stream = tokio_test::io::Builder::new().read(b"USER anonymous\r\n").build();
        let mut conn = ControlConnection::new(stream);
        let line = conn.read_command().await.unwrap().unwrap();
        assert_eq!(line.verb, "USER");
        assert_eq!(line.param, "anonymous");
    }

    #[tokio::test]
    async fn empty_parameter_is_valid() {
        let stream = tokio_test::io::Builder::new().read(b"PWD\r\n").build();
        let mut conn = ControlConnection::new(stream);
        let line = conn.read_command().await.unwrap().unwrap();
        assert_eq!(line.verb, "PWD");
        assert_eq!(line.param, "");
    }

    #[tokio::test]
    async fn clean_eof_between_lines_returns_none() {
        let stream = tokio_test::io::Builder::new().build();
        let mut conn = ControlConnection::new(stream);
        assert!(conn.read_command().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verb_is_uppercased() {
        let stream = tokio_test::io::Builder::new().read(b"user bob\r\n").build();
        let mut conn = ControlConnection::new(stream);
        let line = conn.read_command().await.unwrap().unwrap();
        assert_eq!(line.verb, "USER");
    }

    #[tokio::test]
    async fn writes_reply_with_flush() {
        let stream = tokio_test::io::Builder::new().write(b"220 Service ready\r\n").build();
        let mut conn = ControlConnection::new(stream);
        conn.write_reply(&Reply::new(ReplyCode::ServiceReady, "Service ready")).await.unwrap();
    }
}
