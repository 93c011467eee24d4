//! RETR/STOR/APPE/DELE/SIZE/MDTM/RNFR/RNTO/REST. Grounded on `client/files.go`'s
//! `handleRETR`/`handleSTOR`/`handleDELE`/`handleRNFR`/`handleRNTO`/
//! `handleSIZE`/`handleMDTM`/`handleREST`.
use std::io::Cursor;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionStream;
use crate::error::{Error, Result};
use crate::reply::{Reply, ReplyCode};
use crate::session::Session;
use crate::storage::FEATURE_APPEND;
use crate::transfer::TransferHandle;

fn data_stream<S: ConnectionStream>(session: &mut Session<S>) -> &mut tokio::net::TcpStream {
    match session.transfer.as_mut().expect("opened by open_data_channel") {
        TransferHandle::Passive { connection, .. } => connection.as_mut().expect("opened"),
        TransferHandle::Active { connection, .. } => connection.as_mut().expect("opened"),
    }
}

pub async fn retr<S: ConnectionStream>(session: &mut Session<S>, param: &str, cancel: &CancellationToken) -> Result<Reply> {
    let target = session.resolve(param);
    let offset = session.take_restart_offset();
    let mut reader = session.storage.read(&target, offset).await?;

    super::open_data_channel(session, cancel).await?;
    let outcome = copy_to_data_channel(session, &mut reader, cancel).await;
    Ok(super::close_data_channel(session, cancel, outcome))
}

async fn copy_to_data_channel<S: ConnectionStream>(
    session: &mut Session<S>,
    reader: &mut (dyn tokio::io::AsyncRead + Send + Unpin),
    cancel: &CancellationToken,
) -> Result<()> {
    let stream = data_stream(session);
    tokio::select! {
        res = tokio::io::copy(reader, stream) => res.map(|_| ()).map_err(Error::from),
        _ = cancel.cancelled() => Err(Error::Aborted),
    }
}

pub async fn stor<S: ConnectionStream>(session: &mut Session<S>, param: &str, cancel: &CancellationToken) -> Result<Reply> {
    let target = session.resolve(param);
    session.take_restart_offset();

    super::open_data_channel(session, cancel).await?;
    let outcome = receive_then_store(session, &target, cancel, false).await;
    Ok(super::close_data_channel(session, cancel, outcome))
}

pub async fn appe<S: ConnectionStream>(session: &mut Session<S>, param: &str, cancel: &CancellationToken) -> Result<Reply> {
    session.take_restart_offset();
    if !session.storage.supports(FEATURE_APPEND) {
        return Err(Error::NotImplemented("APPE"));
    }
    let target = session.resolve(param);

    super::open_data_channel(session, cancel).await?;
    let outcome = receive_then_store(session, &target, cancel, true).await;
    Ok(super::close_data_channel(session, cancel, outcome))
}

/// Buffers the whole upload from the data channel, then hands it to the
/// storage backend in one call. Mirrors the reference backend's own
/// read-to-end behavior rather than streaming writes through the driver.
async fn receive_then_store<S: ConnectionStream>(session: &mut Session<S>, target: &Path, cancel: &CancellationToken, append: bool) -> Result<()> {
    let mut buf = Vec::new();
    {
        let stream = data_stream(session);
        tokio::select! {
            res = stream.read_to_end(&mut buf) => { res.map_err(Error::from)?; }
            _ = cancel.cancelled() => return Err(Error::Aborted),
        }
    }
    let input: Box<dyn tokio::io::AsyncRead + Send + Unpin> = Box::new(Cursor::new(buf));
    if append {
        session.storage.append(target, input).await?;
    } else {
        session.storage.write(target, input).await?;
    }
    Ok(())
}

pub async fn dele<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let target = session.resolve(param);
    session.storage.delete(&target).await?;
    Ok(Reply::new(ReplyCode::FileActionOkay, format!("Deleted {}", target.display())))
}

pub async fn size<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let target = session.resolve(param);
    let meta = session.storage.stat(&target).await?;
    if meta.is_dir() {
        return Err(Error::storage_other(format!("{}: is a directory", target.display())));
    }
    Ok(Reply::new(ReplyCode::FileStatus, meta.len.to_string()))
}

pub async fn mdtm<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let target = session.resolve(param);
    let meta = session.storage.stat(&target).await?;
    Ok(Reply::new(ReplyCode::FileStatus, meta.modified.format("%Y%m%d%H%M%S").to_string()))
}

pub async fn rnfr<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let target = session.resolve(param);
    session.storage.stat(&target).await?;
    session.pending_rnfr = Some(target);
    Ok(Reply::new(ReplyCode::FileActionPending, "Ready for RNTO"))
}

pub async fn rnto<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let from = session.pending_rnfr.take().ok_or(Error::BadSequence)?;
    if !session.storage.supports(crate::storage::FEATURE_MOVE) {
        return Err(Error::NotImplemented("RNTO"));
    }
    let to = session.resolve(param);
    session.storage.rename(&from, &to).await?;
    Ok(Reply::new(ReplyCode::FileActionOkay, "Rename successful"))
}

pub async fn rest<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let offset: u64 = param.trim().parse().map_err(|_| Error::protocol("REST requires a non-negative integer"))?;
    session.restart_offset = offset;
    Ok(Reply::new(ReplyCode::FileActionPending, format!("Restarting at {offset}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerSettings;
    use crate::connection::ControlConnection;
    use crate::storage::memory::MemoryBackend;
    use std::sync::Arc;

    fn session() -> Session<tokio_test::io::Mock> {
        let stream = tokio_test::io::Builder::new().build();
        Session::new(
            "test".into(),
            ControlConnection::new(stream),
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(ServerSettings::defaults()),
            Arc::new(MemoryBackend::new()),
        )
    }

    async fn put(s: &Session<tokio_test::io::Mock>, path: &str, data: &[u8]) {
        s.storage
            .write(Path::new(path), Box::new(Cursor::new(data.to_vec())))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dele_removes_object() {
        let mut s = session();
        put(&s, "/a.txt", b"x").await;
        dele(&mut s, "a.txt").await.unwrap();
        assert!(s.storage.stat(Path::new("/a.txt")).await.is_err());
    }

    #[tokio::test]
    async fn dele_missing_object_fails() {
        let mut s = session();
        assert!(dele(&mut s, "missing.txt").await.is_err());
    }

    #[tokio::test]
    async fn size_reports_byte_length() {
        let mut s = session();
        put(&s, "/a.txt", b"hello").await;
        let reply = size(&mut s, "a.txt").await.unwrap();
        assert_eq!(reply.render(), "213 5\r\n");
    }

    #[tokio::test]
    async fn size_on_directory_fails() {
        let mut s = session();
        s.storage.make_dir(Path::new("/dir")).await.unwrap();
        assert!(size(&mut s, "dir").await.is_err());
    }

    #[tokio::test]
    async fn mdtm_reports_utc_timestamp() {
        let mut s = session();
        put(&s, "/a.txt", b"x").await;
        let reply = mdtm(&mut s, "a.txt").await.unwrap().render();
        assert!(reply.starts_with("213 "));
        assert_eq!(reply.trim_end().split(' ').nth(1).unwrap().len(), 14);
    }

    #[tokio::test]
    async fn rnfr_then_rnto_renames() {
        let mut s = session();
        put(&s, "/a.txt", b"x").await;
        rnfr(&mut s, "a.txt").await.unwrap();
        rnto(&mut s, "b.txt").await.unwrap();
        assert!(s.storage.stat(Path::new("/a.txt")).await.is_err());
        assert!(s.storage.stat(Path::new("/b.txt")).await.is_ok());
    }

    #[tokio::test]
    async fn rnto_without_rnfr_is_bad_sequence() {
        let mut s = session();
        let err = rnto(&mut s, "b.txt").await.unwrap_err();
        assert!(matches!(err, Error::BadSequence));
    }

    #[tokio::test]
    async fn rnfr_missing_source_fails_without_setting_pending() {
        let mut s = session();
        assert!(rnfr(&mut s, "missing.txt").await.is_err());
        assert!(s.pending_rnfr.is_none());
    }

    #[tokio::test]
    async fn rest_sets_restart_offset() {
        let mut s = session();
        rest(&mut s, "512").await.unwrap();
        assert_eq!(s.restart_offset, 512);
    }

    #[tokio::test]
    async fn rest_rejects_non_numeric_argument() {
        let mut s = session();
        assert!(rest(&mut s, "nope").await.is_err());
    }

    #[derive(Debug)]
    struct NoAppendBackend;

    #[async_trait::async_trait]
    impl crate::storage::StorageBackend for NoAppendBackend {
        async fn stat(&self, _path: &Path) -> Result<crate::storage::ObjectMetadata> {
            unreachable!("not exercised by this test")
        }
        async fn read(&self, _path: &Path, _offset: u64) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            unreachable!("not exercised by this test")
        }
        async fn write(&self, _path: &Path, _input: Box<dyn tokio::io::AsyncRead + Send + Unpin>) -> Result<u64> {
            unreachable!("not exercised by this test")
        }
        async fn delete(&self, _path: &Path) -> Result<()> {
            unreachable!("not exercised by this test")
        }
        async fn list(&self, _path: &Path) -> Result<Vec<crate::storage::Object>> {
            unreachable!("not exercised by this test")
        }
    }

    #[tokio::test]
    async fn appe_clears_restart_offset_even_when_unsupported() {
        let stream = tokio_test::io::Builder::new().build();
        let mut s = Session::new(
            "test".into(),
            ControlConnection::new(stream),
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(ServerSettings::defaults()),
            Arc::new(NoAppendBackend),
        );
        rest(&mut s, "512").await.unwrap();
        assert_eq!(s.restart_offset, 512);

        let cancel = CancellationToken::new();
        let err = appe(&mut s, "a.txt", &cancel).await.unwrap_err();
        assert!(matches!(err, Error::NotImplemented("APPE")));
        assert_eq!(s.restart_offset, 0);
    }
}
