use super::{Endpoint, Transport, TransportKind};
use crate::error::PipeBenchError;
use async_trait::async_trait;
use std::os::unix::net::UnixStream as StdUnixStream;
use tokio::net::UnixStream;
use tracing::trace;

/// Both ends are created together as an already connected socket pair.
/// Every call hands out a new descriptor for the same socket. The transport
/// keeps its own descriptors open until it is dropped, so a peer only sees
/// end of stream or a broken pipe after that.
#[derive(Debug)]
pub struct LocalTransport {
    reader: StdUnixStream,
    writer: StdUnixStream,
}

impl LocalTransport {
    pub fn new() -> Result<Self, PipeBenchError> {
        let (reader, writer) =
            StdUnixStream::pair().map_err(|e| PipeBenchError::transport("socketpair", e))?;
        trace!("Created unix socket pair");
        Ok(Self { reader, writer })
    }

    fn endpoint(stream: &StdUnixStream) -> Result<Endpoint, PipeBenchError> {
        let stream = stream
            .try_clone()
            .map_err(|e| PipeBenchError::transport("dup", e))?;
        stream
            .set_nonblocking(true)
            .map_err(|e| PipeBenchError::transport("fcntl", e))?;
        let stream =
            UnixStream::from_std(stream).map_err(|e| PipeBenchError::transport("register", e))?;
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Unix
    }

    async fn read_endpoint(&self) -> Result<Endpoint, PipeBenchError> {
        Self::endpoint(&self.reader)
    }

    async fn write_endpoint(&self) -> Result<Endpoint, PipeBenchError> {
        Self::endpoint(&self.writer)
    }
}
