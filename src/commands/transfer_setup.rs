//! PASV/EPSV/PORT. Grounded on `client/transfer.go`'s `handlePASV`/`handlePORT`.
use crate::connection::ConnectionStream;
use crate::error::Result;
use crate::reply::{Reply, ReplyCode};
use crate::session::Session;
use crate::transfer::{self, TransferHandle};

pub async fn pasv<S: ConnectionStream>(session: &mut Session<S>, verb: &str) -> Result<Reply> {
    let (listener, port) = transfer::bind_passive_listener(&session.settings.listen_host, session.settings.data_port_range).await?;
    session.transfer = Some(TransferHandle::Passive { listener, connection: None });
    if verb == "EPSV" {
        Ok(Reply::new(ReplyCode::EnteringExtendedPassive, transfer::format_epsv_reply(port)))
    } else {
        let body = transfer::format_pasv_reply(&session.settings.public_host, port)?;
        Ok(Reply::new(ReplyCode::EnteringPassive, body))
    }
}

pub async fn port<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let addr = transfer::parse_port_addr(param)?;
    session.transfer = Some(TransferHandle::Active { addr, connection: None });
    Ok(Reply::new(ReplyCode::Ok, "PORT command successful"))
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
        let mut settings = ServerSettings::defaults();
        settings.data_port_range = crate::config::PortRange { start: 41000, end: 41010 };
        Session::new(
            "test".into(),
            ControlConnection::new(stream),
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(settings),
            Arc::new(MemoryBackend::new()),
        )
    }

    #[tokio::test]
    async fn pasv_opens_a_passive_listener_in_range() {
        let mut s = session();
        let reply = pasv(&mut s, "PASV").await.unwrap().render();
        assert!(reply.starts_with("227 "));
        assert!(matches!(s.transfer, Some(TransferHandle::Passive { .. })));
    }

    #[tokio::test]
    async fn epsv_reports_bare_port_form() {
        let mut s = session();
        let reply = pasv(&mut s, "EPSV").await.unwrap().render();
        assert!(reply.starts_with("229 Entering Extended Passive Mode (|||"));
    }

    #[tokio::test]
    async fn port_sets_active_transfer_handle() {
        let mut s = session();
        port(&mut s, "127,0,0,1,19,136").await.unwrap();
        assert!(matches!(s.transfer, Some(TransferHandle::Active { .. })));
    }

    #[tokio::test]
    async fn port_rejects_malformed_parameter() {
        let mut s = session();
        assert!(port(&mut s, "garbage").await.is_err());
    }
}
