//! Per-connection session state and the path-resolution helper every
//! file-operation adapter uses.
//!
//! Generalizes the teacher's per-connection `Handler<S>` (`server.rs`) from
//! a stateless Redis command executor to the stateful FTP session described
//! in spec.md §3: working directory, pending-USER, pending-RNFR, restart
//! offset, and the current transfer handle, mutated only by this session's
//! own tasks.
use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::command::Command;
use crate::commands;
use crate::config::ServerSettings;
use crate::connection::{CommandLine, CommandReader, ConnectionStream, ControlConnection};
use crate::reply::{Reply, ReplyCode};
use crate::shutdown::Shutdown;
use crate::storage::StorageBackend;
use crate::transfer::TransferHandle;

/// Commands buffered by the background reader faster than the worker loop
/// consumes them.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Per-connection state, touched only by that connection's reader/worker
/// pair (never concurrently, thanks to the single-slot rendezvous).
pub struct Session<S: ConnectionStream> {
    pub id: String,
    pub conn: ControlConnection<S>,
    pub remote_addr: std::net::SocketAddr,
    pub cwd: PathBuf,
    pub user: Option<String>,
    pub pending_user: Option<String>,
    pub pending_rnfr: Option<PathBuf>,
    pub restart_offset: u64,
    pub transfer: Option<TransferHandle>,
    /// `true` for TYPE I (binary), `false` for TYPE A. Advertised only;
    /// bytes are never transformed either way.
    pub binary_type: bool,
    pub settings: Arc<ServerSettings>,
    pub storage: Arc<dyn StorageBackend>,
}

impl<S: ConnectionStream> Session<S> {
    pub fn new(
        id: String,
        conn: ControlConnection<S>,
        remote_addr: std::net::SocketAddr,
        settings: Arc<ServerSettings>,
        storage: Arc<dyn StorageBackend>,
    ) -> Session<S> {
        Session {
            id,
            conn,
            remote_addr,
            cwd: PathBuf::from("/"),
            user: None,
            pending_user: None,
            pending_rnfr: None,
            restart_offset: 0,
            transfer: None,
            binary_type: true,
            settings,
            storage,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Resolves `input` (a command parameter) against the session's working
    /// directory into a clean, absolute virtual path.
    pub fn resolve(&self, input: &str) -> PathBuf {
        abs_path(&self.cwd, input)
    }

    /// Consumes and zeroes the restart offset; called by RETR/STOR/APPE
    /// regardless of outcome (invariant e).
    pub fn take_restart_offset(&mut self) -> u64 {
        std::mem::take(&mut self.restart_offset)
    }

    /// Closes and clears any current transfer handle.
    pub fn clear_transfer(&mut self) {
        self.transfer = None;
    }
}

/// Drives one accepted connection from greeting to QUIT/EOF/shutdown.
///
/// The control socket is split so a background task can keep reading while
/// the worker loop below is deep inside a RETR/STOR/LIST transfer: that's
/// the only way an `ABOR` sent mid-transfer can reach the worker in time to
/// cancel it. The worker processes one command at a time; any line the
/// reader hands over while a command is in flight is either the `ABOR` that
/// cancels it or a pipelined command queued for the next iteration.
impl Session<OwnedWriteHalf> {
    #[tracing::instrument(skip_all, fields(id = %self.id, remote = %self.remote_addr))]
    pub async fn serve(mut self, read_half: OwnedReadHalf, mut shutdown: Shutdown) {
        let (tx, mut rx) = mpsc::channel::<CommandLine>(COMMAND_CHANNEL_CAPACITY);
        let reader_task = tokio::spawn(async move {
            let mut reader = CommandReader::new(read_half);
            loop {
                match reader.read_command().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            return;
                        }
                    }
                    _ => return,
                }
            }
        });

        if let Err(e) = self.conn.write_reply(&Reply::new(ReplyCode::ServiceReady, "Service ready")).await {
            error!(cause = %e, "failed to greet connection");
            reader_task.abort();
            return;
        }

        let mut pending: VecDeque<CommandLine> = VecDeque::new();
        let mut session = self;
        'outer: loop {
            let line = match pending.pop_front() {
                Some(line) => line,
                None => {
                    tokio::select! {
                        _ = shutdown.recv() => break 'outer,
                        maybe_line = rx.recv() => match maybe_line {
                            Some(line) => line,
                            None => break 'outer,
                        },
                    }
                }
            };

            match run_one(session, line, &mut rx, &mut pending).await {
                Outcome::Continue(returned) => session = returned,
                Outcome::Quit(returned) => {
                    session = returned;
                    break 'outer;
                }
                Outcome::HandlerPanicked => {
                    error!("command handler panicked; closing connection");
                    reader_task.abort();
                    return;
                }
            }
        }
        drop(session);
        reader_task.abort();
    }
}

enum Outcome {
    Continue(Session<OwnedWriteHalf>),
    Quit(Session<OwnedWriteHalf>),
    HandlerPanicked,
}

/// Classifies and executes a single command line, racing its dispatch
/// against the reader channel so a concurrently-arriving `ABOR` can cancel
/// it. Returns the session back to the caller (moved into the spawned
/// dispatch task and handed back on completion) along with what the worker
/// loop should do next.
async fn run_one(
    mut session: Session<OwnedWriteHalf>,
    line: CommandLine,
    rx: &mut mpsc::Receiver<CommandLine>,
    pending: &mut VecDeque<CommandLine>,
) -> Outcome {
    match Command::lookup(&line.verb) {
        Command::Unknown => {
            let _ = session.conn.write_reply(&Reply::new(ReplyCode::CommandSyntaxError, "Unrecognized command")).await;
            Outcome::Continue(session)
        }
        Command::Declined(verb) => {
            let _ = session
                .conn
                .write_reply(&Reply::new(ReplyCode::CommandNotImplemented, format!("{verb} not implemented")))
                .await;
            Outcome::Continue(session)
        }
        Command::Known { verb, open_without_auth } => {
            if !open_without_auth && !session.is_authenticated() {
                let _ = session.conn.write_reply(&Reply::new(ReplyCode::NotLoggedIn, "Please login with USER and PASS")).await;
                return Outcome::Continue(session);
            }
            if verb == "QUIT" {
                let _ = session.conn.write_reply(&Reply::new(ReplyCode::ClosingControlConnection, "Goodbye")).await;
                return Outcome::Quit(session);
            }
            if verb == "ABOR" {
                // Reachable only between commands: an ABOR that arrives
                // while a transfer is in flight is consumed below instead.
                let _ = session.conn.write_reply(&Reply::new(ReplyCode::ClosingDataConnection, "No transfer in progress")).await;
                return Outcome::Continue(session);
            }
            dispatch_one(session, verb, line.param, rx, pending).await
        }
    }
}

async fn dispatch_one(
    session: Session<OwnedWriteHalf>,
    verb: &'static str,
    param: String,
    rx: &mut mpsc::Receiver<CommandLine>,
    pending: &mut VecDeque<CommandLine>,
) -> Outcome {
    let cancel = CancellationToken::new();
    let cancel_for_reader = cancel.clone();
    let mut handle = tokio::spawn(async move {
        let mut session = session;
        let result = commands::dispatch(&mut session, verb, &param, &cancel_for_reader).await;
        (session, result)
    });

    let joined = loop {
        tokio::select! {
            res = &mut handle => break res,
            maybe_line = rx.recv() => match maybe_line {
                Some(next) if next.verb == "ABOR" => cancel.cancel(),
                Some(next) => pending.push_back(next),
                None => cancel.cancel(),
            },
        }
    };

    match joined {
        Ok((mut session, result)) => {
            let reply = result.unwrap_or_else(|e| e.to_reply());
            let _ = session.conn.write_reply(&reply).await;
            if cancel.is_cancelled() {
                let _ = session
                    .conn
                    .write_reply(&Reply::new(ReplyCode::ClosingDataConnection, "ABOR command successful"))
                    .await;
            }
            Outcome::Continue(session)
        }
        Err(join_err) => {
            debug!(cause = %join_err, "command handler task failed");
            Outcome::HandlerPanicked
        }
    }
}

/// Cleans `input` (collapsing `.`, `..`, and duplicate separators) and, if
/// relative, joins it onto `cwd`. The result is always absolute. Idempotent:
/// `abs_path(abs_path(p))` is a fixed point, since absolute inputs already
/// clean to themselves.
pub fn abs_path(cwd: &Path, input: &str) -> PathBuf {
    let joined = if input.starts_with('/') { PathBuf::from(input) } else { cwd.join(input) };
    clean(&joined)
}

fn clean(path: &Path) -> PathBuf {
    let mut stack: Vec<std::ffi::OsString> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(seg) => stack.push(seg.to_os_string()),
            Component::ParentDir => {
                stack.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    let mut result = PathBuf::from("/");
    for seg in stack {
        result.push(seg);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_joins_onto_cwd() {
        assert_eq!(abs_path(Path::new("/a/b"), "c"), PathBuf::from("/a/b/c"));
    }

    #[test]
    fn absolute_path_ignores_cwd() {
        assert_eq!(abs_path(Path::new("/a/b"), "/x/y"), PathBuf::from("/x/y"));
    }

    #[test]
    fn dot_dot_walks_up() {
        assert_eq!(abs_path(Path::new("/a/b"), "../c"), PathBuf::from("/a/c"));
    }

    #[test]
    fn cannot_escape_root() {
        assert_eq!(abs_path(Path::new("/"), "../../.."), PathBuf::from("/"));
    }

    #[test]
    fn resolution_is_idempotent() {
        let once = abs_path(Path::new("/a"), "./b/../c/");
        let twice = abs_path(Path::new("/"), once.to_str().unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn result_is_always_absolute() {
        let p = abs_path(Path::new("/x"), "y/z");
        assert!(p.is_absolute());
    }
}
