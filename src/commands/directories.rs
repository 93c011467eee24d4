//! MKD/RMD/LIST/NLST. Grounded on `client/dirs.go`'s `handleMKD`/`handleRMD`/
//! `handleLIST`.
//!
//! NLST is dispatched to the same handler as LIST (full long-format lines),
//! matching the original's `commandsMap[NLST] = handleLIST` rather than a
//! names-only rendering — the Open Question this resolves is recorded in
//! DESIGN.md.
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionStream;
use crate::error::{Error, Result};
use crate::listing::format_listing;
use crate::reply::{Reply, ReplyCode};
use crate::session::Session;
use crate::storage::FEATURE_MAKE_DIR;

pub async fn mkd<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let target = session.resolve(param);
    if !session.storage.supports(FEATURE_MAKE_DIR) {
        return Err(Error::NotImplemented("MKD"));
    }
    if session.storage.stat(&target).await.is_ok() {
        return Err(Error::storage_other(format!("{}: already exists", target.display())));
    }
    session.storage.make_dir(&target).await?;
    Ok(Reply::new(ReplyCode::PathCreated, format!("\"{}\" directory created", target.display())))
}

pub async fn rmd<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let target = session.resolve(param);
    session.storage.delete(&target).await?;
    Ok(Reply::new(ReplyCode::FileActionOkay, format!("Deleted dir {}", target.display())))
}

pub async fn list<S: ConnectionStream>(session: &mut Session<S>, param: &str, cancel: &CancellationToken) -> Result<Reply> {
    let target = if param.trim().is_empty() { session.cwd.clone() } else { session.resolve(param) };
    let objects = session.storage.list(&target).await?;
    let body = format_listing(&objects);

    super::open_data_channel(session, cancel).await?;
    let outcome = write_listing(session, &body, cancel).await;
    Ok(super::close_data_channel(session, cancel, outcome))
}

async fn write_listing<S: ConnectionStream>(session: &mut Session<S>, body: &str, cancel: &CancellationToken) -> Result<()> {
    let handle = session.transfer.as_mut().expect("opened by open_data_channel");
    let stream = match handle {
        crate::transfer::TransferHandle::Passive { connection, .. } => connection.as_mut().expect("opened"),
        crate::transfer::TransferHandle::Active { connection, .. } => connection.as_mut().expect("opened"),
    };
    tokio::select! {
        res = stream.write_all(body.as_bytes()) => res.map_err(Error::from),
        _ = cancel.cancelled() => Err(Error::Aborted),
    }
}
