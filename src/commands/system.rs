//! TYPE/NOOP/ALLO/OPTS/FEAT/SYST/STAT. Grounded on `client/misc.go`'s
//! `handleTYPE`/`handleNOOP`/`handleOPTS`/`handleFEAT`/`handleSYST`/
//! `handleSTATServer`/`handleSTATFile`.
use crate::connection::ConnectionStream;
use crate::error::{Error, Result};
use crate::listing::format_entry;
use crate::reply::{Reply, ReplyCode};
use crate::session::Session;

pub async fn type_<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    match param.trim().to_ascii_uppercase().as_str() {
        "I" => {
            session.binary_type = true;
            Ok(Reply::new(ReplyCode::Ok, "Switching to Binary mode"))
        }
        "A" => {
            session.binary_type = false;
            Ok(Reply::new(ReplyCode::Ok, "Switching to ASCII mode"))
        }
        _ => Err(Error::protocol("TYPE only supports I and A")),
    }
}

pub fn noop() -> Result<Reply> {
    Ok(Reply::new(ReplyCode::Ok, "NOOP ok"))
}

/// `ALLO` is accepted but never enforced: the storage layer doesn't
/// preallocate space.
pub fn allo() -> Result<Reply> {
    Ok(Reply::new(ReplyCode::NotImplementedStub, "ALLO command ignored"))
}

pub fn opts(param: &str) -> Result<Reply> {
    let mut parts = param.trim().splitn(2, ' ');
    match parts.next().map(str::to_ascii_uppercase).as_deref() {
        Some("UTF8") => Ok(Reply::new(ReplyCode::Ok, "UTF8 enabled")),
        _ => Err(Error::protocol("unsupported OPTS option")),
    }
}

pub fn feat() -> Reply {
    Reply::multi(
        ReplyCode::SystemStatus,
        vec!["Features:".into(), "UTF8".into(), "SIZE".into(), "MDTM".into(), "REST STREAM".into(), "End".into()],
    )
}

pub fn syst() -> Reply {
    Reply::new(ReplyCode::SystemType, "UNIX Type: L8")
}

pub async fn stat<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    if param.trim().is_empty() {
        return Ok(server_status(session));
    }
    let target = session.resolve(param);
    let meta = session.storage.stat(&target).await?;
    let object = crate::storage::Object {
        path: target,
        metadata: meta,
    };
    Ok(Reply::multi(
        ReplyCode::FileStatus,
        vec!["Status follows:".into(), format_entry(&object), "End of status".into()],
    ))
}

fn server_status<S: ConnectionStream>(session: &Session<S>) -> Reply {
    Reply::multi(
        ReplyCode::SystemStatus,
        vec![
            "FTP server status:".into(),
            format!("Connected as {}", session.user.as_deref().unwrap_or("(not logged in)")),
            format!("Current directory is {}", session.cwd.display()),
            format!("TYPE: {}", if session.binary_type { "Binary" } else { "ASCII" }),
            "End of status".into(),
        ],
    )
}
