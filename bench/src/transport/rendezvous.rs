use super::loopback::bind_loopback;
use super::{Endpoint, TransportKind};
use crate::error::PipeBenchError;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tracing::debug;

const UNIX_SOCKET_NAME: &str = "consumer.sock";

/// Address a consumer process connects to, passed on its command line as
/// `tcp:<ip>:<port>` or `unix:<path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendezvousAddress {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Display for RendezvousAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RendezvousAddress::Tcp(address) => write!(f, "tcp:{address}"),
            RendezvousAddress::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

impl FromStr for RendezvousAddress {
    type Err = PipeBenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("tcp", address)) => address.parse().map(RendezvousAddress::Tcp).map_err(|_| {
                PipeBenchError::invalid_argument(format!("invalid tcp rendezvous address '{address}'"))
            }),
            Some(("unix", path)) if !path.is_empty() => Ok(RendezvousAddress::Unix(path.into())),
            _ => Err(PipeBenchError::invalid_argument(format!(
                "invalid rendezvous address '{s}', expected tcp:<ip>:<port> or unix:<path>"
            ))),
        }
    }
}

#[derive(Debug)]
enum Listener {
    Tcp(TcpListener),
    // The directory keeps the socket path private and is removed on drop.
    Unix(UnixListener, TempDir),
}

/// Listening side of a cross-process flow. Accepts a single consumer.
#[derive(Debug)]
pub struct RendezvousListener {
    address: RendezvousAddress,
    listener: Listener,
}

impl RendezvousListener {
    pub fn bind(kind: TransportKind) -> Result<Self, PipeBenchError> {
        let (address, listener) = match kind {
            TransportKind::Tcp => {
                let (listener, address) = bind_loopback()?;
                (RendezvousAddress::Tcp(address), Listener::Tcp(listener))
            }
            TransportKind::Unix => {
                let dir = tempfile::Builder::new()
                    .prefix("pipebench-")
                    .tempdir()
                    .map_err(|e| PipeBenchError::transport("mkdtemp", e))?;
                let path = dir.path().join(UNIX_SOCKET_NAME);
                let listener =
                    UnixListener::bind(&path).map_err(|e| PipeBenchError::transport("bind", e))?;
                (RendezvousAddress::Unix(path), Listener::Unix(listener, dir))
            }
        };
        debug!("Rendezvous listening on {address}");
        Ok(Self { address, listener })
    }

    pub fn address(&self) -> &RendezvousAddress {
        &self.address
    }

    pub async fn accept(&self) -> Result<Endpoint, PipeBenchError> {
        let endpoint: Endpoint = match &self.listener {
            Listener::Tcp(listener) => {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| PipeBenchError::transport("accept", e))?;
                Box::new(stream)
            }
            Listener::Unix(listener, _) => {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| PipeBenchError::transport("accept", e))?;
                Box::new(stream)
            }
        };
        Ok(endpoint)
    }
}

pub async fn connect(address: &RendezvousAddress) -> Result<Endpoint, PipeBenchError> {
    let endpoint: Endpoint = match address {
        RendezvousAddress::Tcp(address) => Box::new(
            TcpStream::connect(address)
                .await
                .map_err(|e| PipeBenchError::transport("connect", e))?,
        ),
        RendezvousAddress::Unix(path) => Box::new(
            UnixStream::connect(path)
                .await
                .map_err(|e| PipeBenchError::transport("connect", e))?,
        ),
    };
    Ok(endpoint)
}
