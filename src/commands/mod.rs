//! Per-verb command handlers and the dispatch table that wires a looked-up
//! [`crate::command::Command`] to its handler.
//!
//! Generalizes the teacher's `CommandVariant::apply` (`cmd/mod.rs`) from
//! three Redis verbs to the FTP set; handlers write their own success-path
//! replies at the point spec.md's sequencing requires (e.g. 150 before any
//! byte crosses the data channel), and propagate failures via `?` for the
//! dispatcher to render through [`crate::error::Error::to_reply`].
pub mod auth;
pub mod directories;
pub mod files;
pub mod navigation;
pub mod system;
pub mod transfer_setup;

use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionStream;
use crate::error::{Error, Result};
use crate::reply::{Reply, ReplyCode};
use crate::session::Session;

/// Opens the session's current transfer handle (failing with `TransientResource`,
/// reply 425, if none is set) and announces it with the standard 150 reply.
pub(crate) async fn open_data_channel<S: ConnectionStream>(session: &mut Session<S>, cancel: &CancellationToken) -> Result<()> {
    {
        let handle = session
            .transfer
            .as_mut()
            .ok_or_else(|| Error::TransientResource("no transfer channel open".to_string()))?;
        handle.open(cancel).await?;
    }
    session
        .conn
        .write_reply(&Reply::new(ReplyCode::FileStatusOkay, "Using transfer connection"))
        .await?;
    Ok(())
}

/// Closes the current transfer handle and builds the terminating reply: 226
/// if `outcome` succeeded and the command wasn't aborted, 426 otherwise. The
/// caller returns the built reply so the dispatcher writes it exactly once.
pub(crate) fn close_data_channel<S: ConnectionStream>(session: &mut Session<S>, cancel: &CancellationToken, outcome: Result<()>) -> Reply {
    session.clear_transfer();
    if outcome.is_ok() && !cancel.is_cancelled() {
        Reply::new(ReplyCode::ClosingDataConnection, "Transfer complete")
    } else {
        Reply::new(ReplyCode::TransferAborted, "Transfer aborted")
    }
}

/// Dispatches one already-authorized, already-classified command to its
/// handler. `verb` is the canonical token from [`crate::command::Command`].
pub async fn dispatch<S: ConnectionStream>(session: &mut Session<S>, verb: &str, param: &str, cancel: &CancellationToken) -> Result<Reply> {
    match verb {
        "USER" => auth::user(session, param).await,
        "PASS" => auth::pass(session, param).await,
        "CWD" => navigation::cwd(session, param).await,
        "CDUP" => navigation::cdup(session).await,
        "PWD" => navigation::pwd(session).await,
        "MKD" => directories::mkd(session, param).await,
        "RMD" => directories::rmd(session, param).await,
        "LIST" | "NLST" => directories::list(session, param, cancel).await,
        "RETR" => files::retr(session, param, cancel).await,
        "STOR" => files::stor(session, param, cancel).await,
        "APPE" => files::appe(session, param, cancel).await,
        "DELE" => files::dele(session, param).await,
        "SIZE" => files::size(session, param).await,
        "MDTM" => files::mdtm(session, param).await,
        "RNFR" => files::rnfr(session, param).await,
        "RNTO" => files::rnto(session, param).await,
        "REST" => files::rest(session, param).await,
        "TYPE" => system::type_(session, param).await,
        "NOOP" => system::noop(),
        "ALLO" => system::allo(),
        "OPTS" => system::opts(param),
        "FEAT" => Ok(system::feat()),
        "SYST" => Ok(system::syst()),
        "STAT" => system::stat(session, param).await,
        "PASV" | "EPSV" => transfer_setup::pasv(session, verb).await,
        "PORT" => transfer_setup::port(session, param).await,
        other => unreachable!("dispatch called with unhandled verb {other}"),
    }
}
