//! Reply codes and the single-line / multi-line reply framing described in
//! the control-channel design notes.
//!
//! Generalizes the teacher's frame-encoding approach
//! (`connection.rs`'s `write_value`/`write_decimal`) from RESP value types to
//! three-digit FTP status lines.
use std::fmt;

/// Three-digit FTP reply codes used by this server. Only the subset the
/// command set actually produces is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    FileStatusOkay = 150,
    Ok = 200,
    NotImplementedStub = 202,
    SystemStatus = 211,
    FileStatus = 213,
    SystemType = 215,
    ServiceReady = 220,
    ClosingControlConnection = 221,
    DataConnectionOpen = 225,
    ClosingDataConnection = 226,
    EnteringPassive = 227,
    EnteringExtendedPassive = 229,
    UserLoggedIn = 230,
    FileActionOkay = 250,
    PathCreated = 257,
    UsernameOkay = 331,
    FileActionPending = 350,
    ServiceNotAvailable = 421,
    CantOpenDataConnection = 425,
    TransferAborted = 426,
    FileActionNotTaken = 450,
    CommandSyntaxError = 500,
    ParameterSyntaxError = 501,
    CommandNotImplemented = 502,
    BadCommandSequence = 503,
    NotLoggedIn = 530,
    FileUnavailable = 550,
}

impl ReplyCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// A reply to be written to the control channel: either a single line or a
/// multi-line block sharing one code.
#[derive(Debug, Clone)]
pub enum Reply {
    Single { code: ReplyCode, message: String },
    Multi { code: ReplyCode, lines: Vec<String> },
}

impl Reply {
    pub fn new(code: ReplyCode, message: impl Into<String>) -> Reply {
        Reply::Single {
            code,
            message: message.into(),
        }
    }

    /// `lines` must contain at least one entry; the last line closes the
    /// reply block and shares the same code as the opening line.
    pub fn multi(code: ReplyCode, lines: Vec<String>) -> Reply {
        debug_assert!(!lines.is_empty(), "multi-line reply needs at least one line");
        Reply::Multi { code, lines }
    }

    /// Renders the reply as the exact bytes that should be written to the
    /// control channel, CRLF-terminated.
    pub fn render(&self) -> String {
        match self {
            Reply::Single { code, message } => format!("{code} {message}\r\n"),
            Reply::Multi { code, lines } => {
                let mut out = String::new();
                let (last, head) = lines.split_last().expect("multi-line reply needs at least one line");
                out.push_str(&format!("{code}-{}\r\n", head.first().map(String::as_str).unwrap_or("")));
                for line in &head[1.min(head.len())..] {
                    out.push_str(&format!(" {line}\r\n"));
                }
                out.push_str(&format!("{code} {last}\r\n"));
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_reply_renders_code_and_message() {
        let r = Reply::new(ReplyCode::Ok, "OK");
        assert_eq!(r.render(), "200 OK\r\n");
    }

    #[test]
    fn multi_line_reply_closes_with_same_code() {
        let r = Reply::multi(
            ReplyCode::SystemStatus,
            vec!["These are my features".into(), "UTF8".into(), "End".into()],
        );
        let rendered = r.render();
        assert!(rendered.starts_with("211-These are my features\r\n"));
        assert!(rendered.contains(" UTF8\r\n"));
        assert!(rendered.ends_with("211 End\r\n"));
    }
}
