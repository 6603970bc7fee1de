pub mod local;
pub mod loopback;
pub mod rendezvous;

use crate::error::PipeBenchError;
use async_trait::async_trait;
use clap::ValueEnum;
use local::LocalTransport;
use loopback::LoopbackTransport;
use pipebench_report::transport::BenchmarkTransport;
use std::fmt::{Debug, Display, Formatter};
use tokio::io::{AsyncRead, AsyncWrite};

/// A connected, full-duplex byte stream.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

pub type Endpoint = Box<dyn ByteStream>;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// In-process Unix domain socket pair
    Unix,
    /// TCP rendezvous on an ephemeral loopback port
    Tcp,
}

impl Display for TransportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Unix => write!(f, "unix"),
            TransportKind::Tcp => write!(f, "tcp"),
        }
    }
}

impl From<TransportKind> for BenchmarkTransport {
    fn from(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Unix => BenchmarkTransport::Unix,
            TransportKind::Tcp => BenchmarkTransport::Tcp,
        }
    }
}

/// Produces the two ends of a single byte pipe. Bytes written to the write
/// endpoint are read, in order, from the read endpoint.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    fn kind(&self) -> TransportKind;
    async fn read_endpoint(&self) -> Result<Endpoint, PipeBenchError>;
    async fn write_endpoint(&self) -> Result<Endpoint, PipeBenchError>;
}

pub fn create_transport(kind: TransportKind) -> Result<Box<dyn Transport>, PipeBenchError> {
    let transport: Box<dyn Transport> = match kind {
        TransportKind::Unix => Box::new(LocalTransport::new()?),
        TransportKind::Tcp => Box::new(LoopbackTransport::bind()?),
    };
    Ok(transport)
}

/// Resolves both endpoints concurrently, so a rendezvous that blocks on one
/// side until the other shows up cannot stall.
pub async fn connect_endpoints(
    transport: &dyn Transport,
) -> Result<(Endpoint, Endpoint), PipeBenchError> {
    tokio::try_join!(transport.read_endpoint(), transport.write_endpoint())
}
