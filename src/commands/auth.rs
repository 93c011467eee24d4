//! USER/PASS sequencing. Grounded on `client/auth.go`'s `handleUSER`/
//! `handlePASS`.
use crate::connection::ConnectionStream;
use crate::error::{Error, Result};
use crate::reply::{Reply, ReplyCode};
use crate::session::Session;

/// `USER` never fails by itself: it records the pending name and asks for a
/// password.
pub async fn user<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    session.pending_user = Some(param.to_string());
    session.user = None;
    Ok(Reply::new(ReplyCode::UsernameOkay, "Please specify the password"))
}

/// `PASS` without a preceding `USER` is a sequencing error. The anonymous
/// user accepts any password; any other user's password must match exactly.
/// Pending-user is cleared on both outcomes.
pub async fn pass<S: ConnectionStream>(session: &mut Session<S>, param: &str) -> Result<Reply> {
    let pending = session.pending_user.take().ok_or(Error::BadSequence)?;
    if session.settings.authenticate(&pending, param) {
        session.user = Some(pending);
        Ok(Reply::new(ReplyCode::UserLoggedIn, "Login successful"))
    } else {
        Err(Error::Auth)
    }
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

    #[tokio::test]
    async fn pass_before_user_is_bad_sequence() {
        let mut s = session();
        let err = pass(&mut s, "x").await.unwrap_err();
        assert!(matches!(err, Error::BadSequence));
    }

    #[tokio::test]
    async fn anonymous_accepts_any_password() {
        let mut s = session();
        user(&mut s, "anonymous").await.unwrap();
        pass(&mut s, "whoever@example.com").await.unwrap();
        assert_eq!(s.user.as_deref(), Some("anonymous"));
        assert!(s.pending_user.is_none());
    }

    #[tokio::test]
    async fn wrong_password_clears_pending_user_and_fails() {
        let mut s = session();
        user(&mut s, "nonexistent").await.unwrap();
        let err = pass(&mut s, "wrong").await.unwrap_err();
        assert!(matches!(err, Error::Auth));
        assert!(s.pending_user.is_none());
        assert!(s.user.is_none());
    }

    #[tokio::test]
    async fn bare_pass_after_failed_login_is_bad_sequence_again() {
        let mut s = session();
        user(&mut s, "nonexistent").await.unwrap();
        let _ = pass(&mut s, "wrong").await;
        let err = pass(&mut s, "wrong").await.unwrap_err();
        assert!(matches!(err, Error::BadSequence));
    }
}
