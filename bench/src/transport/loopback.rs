use super::{Endpoint, Transport, TransportKind};
use crate::error::PipeBenchError;
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, trace};

const LISTEN_BACKLOG: u32 = 1;

/// Binds `127.0.0.1:0` and listens for exactly one pending connection.
pub(crate) fn bind_loopback() -> Result<(TcpListener, SocketAddr), PipeBenchError> {
    let socket = TcpSocket::new_v4().map_err(|e| PipeBenchError::transport("socket", e))?;
    socket
        .bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .map_err(|e| PipeBenchError::transport("bind", e))?;
    let listener = socket
        .listen(LISTEN_BACKLOG)
        .map_err(|e| PipeBenchError::transport("listen", e))?;
    let address = listener
        .local_addr()
        .map_err(|e| PipeBenchError::transport("getsockname", e))?;
    Ok((listener, address))
}

/// Serves a single reader/writer pair over the loopback interface.
#[derive(Debug)]
pub struct LoopbackTransport {
    listener: TcpListener,
    address: SocketAddr,
}

impl LoopbackTransport {
    pub fn bind() -> Result<Self, PipeBenchError> {
        let (listener, address) = bind_loopback()?;
        debug!("Loopback transport listening on {address}");
        Ok(Self { listener, address })
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    async fn read_endpoint(&self) -> Result<Endpoint, PipeBenchError> {
        let stream = TcpStream::connect(self.address)
            .await
            .map_err(|e| PipeBenchError::transport("connect", e))?;
        trace!("Connected to {}", self.address);
        Ok(Box::new(stream))
    }

    async fn write_endpoint(&self) -> Result<Endpoint, PipeBenchError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| PipeBenchError::transport("accept", e))?;
        trace!("Accepted connection from {peer}");
        Ok(Box::new(stream))
    }
}
