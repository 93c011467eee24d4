//! Transfer-channel subsystem: passive (PASV/EPSV) and active (PORT) data
//! connections, with cooperative cancellation for ABOR.
//!
//! Grounded on `transfer/{passive,active,handler}.go`: a one-minute accept
//! deadline for passive listeners, a five-second connect timeout for active
//! dials. The passive port-selection loop is NOT a direct port of
//! `server.go`'s `PassiveTransferFactory`, which can retry the same port
//! because it draws fully random ports inside a bounded-iteration loop
//! instead of tracking which ports it already tried; here a shuffled
//! permutation of the range is walked once, per the design note this fixes.
use std::net::SocketAddr;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::PortRange;
use crate::error::{Error, Result};

const PASSIVE_ACCEPT_TIMEOUT: Duration = Duration::from_secs(60);
const ACTIVE_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The session's current data-channel handle: set by PASV/EPSV/PORT,
/// consumed by the next data command, closed at transfer end or ABOR.
pub enum TransferHandle {
    Passive { listener: TcpListener, connection: Option<TcpStream> },
    Active { addr: SocketAddr, connection: Option<TcpStream> },
}

impl TransferHandle {
    /// Opens the data connection if not already open: accepts (passive) or
    /// dials (active). Returns a reference to the established stream.
    /// `cancel` lets ABOR preempt a pending accept/dial.
    pub async fn open(&mut self, cancel: &CancellationToken) -> Result<&mut TcpStream> {
        match self {
            TransferHandle::Passive { listener, connection } => {
                if connection.is_none() {
                    let accepted = tokio::select! {
                        res = timeout(PASSIVE_ACCEPT_TIMEOUT, listener.accept()) => {
                            match res {
                                Ok(Ok((stream, _))) => stream,
                                Ok(Err(e)) => return Err(Error::from(e)),
                                Err(_) => return Err(Error::TransientResource("timed out waiting for passive connection".into())),
                            }
                        }
                        _ = cancel.cancelled() => return Err(Error::Aborted),
                    };
                    *connection = Some(accepted);
                }
                Ok(connection.as_mut().expect("just set"))
            }
            TransferHandle::Active { addr, connection } => {
                if connection.is_none() {
                    let dialed = tokio::select! {
                        res = timeout(ACTIVE_CONNECT_TIMEOUT, TcpStream::connect(*addr)) => {
                            match res {
                                Ok(Ok(stream)) => stream,
                                Ok(Err(e)) => return Err(Error::TransientResource(format!("could not establish active connection: {e}"))),
                                Err(_) => return Err(Error::TransientResource("timed out dialing active connection".into())),
                            }
                        }
                        _ = cancel.cancelled() => return Err(Error::Aborted),
                    };
                    *connection = Some(dialed);
                }
                Ok(connection.as_mut().expect("just set"))
            }
        }
    }
}

/// Binds a passive listener on a port drawn from `range`, trying each port
/// in the range at most once via a shuffled permutation.
pub async fn bind_passive_listener(host: &str, range: PortRange) -> Result<(TcpListener, u16)> {
    let mut ports: Vec<u16> = (range.start..range.end).collect();
    ports.shuffle(&mut rand::thread_rng());
    for port in ports {
        if let Ok(listener) = TcpListener::bind((host, port)).await {
            let bound_port = listener.local_addr()?.port();
            return Ok((listener, bound_port));
        }
    }
    Err(Error::TransientResource(format!(
        "could not bind a passive listener in range {}..{}",
        range.start, range.end
    )))
}

/// Parses a `PORT` command's `h1,h2,h3,h4,p1,p2` parameter into the
/// client-advertised data address.
pub fn parse_port_addr(param: &str) -> Result<SocketAddr> {
    let parts: Vec<&str> = param.split(',').collect();
    if parts.len() != 6 {
        return Err(Error::protocol("PORT requires h1,h2,h3,h4,p1,p2"));
    }
    let mut octets = [0u8; 4];
    for (i, slot) in octets.iter_mut().enumerate() {
        *slot = parts[i].parse().map_err(|_| Error::protocol("invalid PORT address octet"))?;
    }
    let p1: u16 = parts[4].parse().map_err(|_| Error::protocol("invalid PORT port octet"))?;
    let p2: u16 = parts[5].parse().map_err(|_| Error::protocol("invalid PORT port octet"))?;
    let port = p1 * 256 + p2;
    Ok(SocketAddr::from((octets, port)))
}

/// Renders the `227`/`229` reply body for a just-opened passive listener.
pub fn format_pasv_reply(public_host: &str, port: u16) -> Result<String> {
    let quads: Vec<&str> = public_host.split('.').collect();
    if quads.len() != 4 {
        return Err(Error::protocol("public-host must be an IPv4 dotted quad"));
    }
    let p1 = port / 256;
    let p2 = port % 256;
    Ok(format!(
        "Entering Passive Mode ({},{},{},{},{},{})",
        quads[0], quads[1], quads[2], quads[3], p1, p2
    ))
}

pub fn format_epsv_reply(port: u16) -> String {
    format!("Entering Extended Passive Mode (|||{port}|)")
}
