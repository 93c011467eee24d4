//! CWD/CDUP/PWD. Grounded on `client/dirs.go`'s `handleCWD`/`handleCDUP`/
//! `handlePWD`.
use crate::connection::ConnectionStream;
use crate::error::{Error, Result};
use crate::reply::{Reply, ReplyCode};
use crate::session::Session;

pub async fn cwd<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    if param.trim() == ".." {
        return cdup(session).await;
    }
    let target = session.resolve(param);
    let meta = session.storage.stat(&target).await?;
    if !meta.is_dir() {
        return Err(Error::StorageNotFound(target.display().to_string()));
    }
    session.cwd = target;
    Ok(Reply::new(ReplyCode::FileActionOkay, "Directory successfully changed"))
}

pub async fn cdup<S: ConnectionStream>(session: &mut Session<S>) -> Result<Reply> {
    if session.cwd == std::path::Path::new("/") {
        return Err(Error::StorageNotFound("/".to_string()));
    }
    let parent = session.cwd.parent().unwrap_or(std::path::Path::new("/")).to_path_buf();
    session.cwd = parent;
    Ok(Reply::new(ReplyCode::FileActionOkay, "Directory successfully changed"))
}

pub async fn pwd<S: ConnectionStream>(session: &mut Session<S>) -> Result<Reply> {
    Ok(Reply::new(ReplyCode::PathCreated, format!("\"{}\" is the current directory", session.cwd.display())))
}
