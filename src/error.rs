//! Error taxonomy for the control-channel protocol engine.
//!
//! Every variant maps to exactly one reply code family from the design
//! notes' taxonomy (protocol / auth / not-implemented / transient resource /
//! storage-not-found / storage-other / abort). Handlers return `Result<T>`
//! and the dispatcher turns the error into a reply via [`Error::to_reply`]
//! instead of each handler writing its own status line.
use crate::reply::{Reply, ReplyCode};
use thiserror::Error;

/// A specialized `Result` for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed parameter or unrecognizable syntax (500/501).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Sequencing violation specifically (503), kept distinct from
    /// `Protocol` so call sites don't have to compose a message.
    #[error("bad command sequence")]
    BadSequence,

    /// Authentication required or failed (530).
    #[error("not authenticated")]
    Auth,

    /// Recognized but declined command, or an optional storage capability
    /// the active backend does not implement (502).
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Listener bind failure, accept-deadline expiry, connect timeout (425).
    #[error("transient resource error: {0}")]
    TransientResource(String),

    /// Object does not exist (550).
    #[error("not found: {0}")]
    StorageNotFound(String),

    /// Any other storage-driver failure (550 with driver message).
    #[error("storage error: {0}")]
    StorageOther(String),

    /// ABOR preempted an in-flight data transfer.
    #[error("transfer aborted")]
    Aborted,

    /// A handler panicked; the session survives (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Renders this error as the control-channel reply it should produce.
    pub fn to_reply(&self) -> Reply {
        match self {
            Error::Io(e) => Reply::new(ReplyCode::ServiceNotAvailable, format!("local error: {e}")),
            Error::Protocol(msg) => Reply::new(ReplyCode::ParameterSyntaxError, msg.clone()),
            Error::BadSequence => Reply::new(ReplyCode::BadCommandSequence, "Bad sequence of commands"),
            Error::Auth => Reply::new(ReplyCode::NotLoggedIn, "Not logged in"),
            Error::NotImplemented(what) => Reply::new(ReplyCode::CommandNotImplemented, format!("{what} not implemented")),
            Error::TransientResource(msg) => Reply::new(ReplyCode::CantOpenDataConnection, msg.clone()),
            Error::StorageNotFound(path) => Reply::new(ReplyCode::FileUnavailable, format!("{path}: no such file or directory")),
            Error::StorageOther(msg) => Reply::new(ReplyCode::FileUnavailable, msg.clone()),
            Error::Aborted => Reply::new(ReplyCode::TransferAborted, "Transfer aborted"),
            Error::Internal(msg) => Reply::new(ReplyCode::CommandSyntaxError, format!("Internal error: {msg}")),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Error {
        Error::Protocol(msg.into())
    }

    pub fn storage_other(msg: impl std::fmt::Display) -> Error {
        Error::StorageOther(msg.to_string())
    }
}

/// Maps storage-driver IO errors onto the taxonomy. Mirrors the pack's
/// convention (see `other_examples/...bolcom-libunftp...storage_backend.rs`'s
/// `From<std::io::Error> for Error`) of classifying `NotFound` separately
/// from other transient failures.
pub fn from_storage_io_error(path: &str, err: std::io::Error) -> Error {
    match err.kind() {
        std::io::ErrorKind::NotFound => Error::StorageNotFound(path.to_string()),
        _ => Error::StorageOther(format!("{path}: {err}")),
    }
}
