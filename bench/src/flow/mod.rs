mod consumer;
mod producer;

pub(crate) use consumer::{is_disconnect, Consumer, ACK_SIZE};

use crate::error::PipeBenchError;
use crate::reclaim::ReclaimQueue;
use crate::transport::{connect_endpoints, Endpoint, Transport, TransportKind};
use producer::Producer;
use std::fmt::{Debug, Display, Formatter};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Created,
    Connected,
    Running,
    /// Write direction shut down, consumer draining in-flight bytes.
    Draining,
    /// Consumer reached end-of-stream and sent its acknowledgment.
    Closed,
    /// Acknowledgment consumed, `bytes_transferred` is final.
    Reported,
}

impl Display for FlowState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlowState::Created => "created",
            FlowState::Connected => "connected",
            FlowState::Running => "running",
            FlowState::Draining => "draining",
            FlowState::Closed => "closed",
            FlowState::Reported => "reported",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    pub buffer_size: usize,
    /// Buffers the producer sends before stopping on its own.
    pub quota: Option<u64>,
    /// Hand every received buffer to a reclaim queue instead of reusing one.
    pub reclaim: bool,
}

/// One producer/consumer pair measuring traffic over its own transport.
pub struct Flow {
    id: u32,
    kind: TransportKind,
    /// Released once both endpoints exist, so they are the only open handles.
    transport: Option<Box<dyn Transport>>,
    config: FlowConfig,
    state: FlowState,
    running: Arc<AtomicBool>,
    progress: Arc<AtomicU64>,
    writer: Option<Endpoint>,
    producer: Option<JoinHandle<Result<Endpoint, PipeBenchError>>>,
    consumer: Option<JoinHandle<Result<u64, PipeBenchError>>>,
    bytes_transferred: u64,
}

impl Debug for Flow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("id", &self.id)
            .field("transport", &self.kind)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("bytes_transferred", &self.bytes_transferred)
            .finish_non_exhaustive()
    }
}

impl Flow {
    pub fn new(id: u32, transport: Box<dyn Transport>, config: FlowConfig) -> Self {
        Self {
            id,
            kind: transport.kind(),
            transport: Some(transport),
            config,
            state: FlowState::Created,
            running: Arc::new(AtomicBool::new(false)),
            progress: Arc::new(AtomicU64::new(0)),
            writer: None,
            producer: None,
            consumer: None,
            bytes_transferred: 0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Bytes seen by the consumer so far. For sampling only, the reported
    /// total comes from the acknowledgment.
    pub fn progress(&self) -> Arc<AtomicU64> {
        self.progress.clone()
    }

    /// The acknowledged byte count, once the flow has been reported.
    pub fn bytes_transferred(&self) -> Option<u64> {
        (self.state == FlowState::Reported).then_some(self.bytes_transferred)
    }

    /// Establishes both endpoints and starts the consumer.
    pub async fn connect(&mut self) -> Result<(), PipeBenchError> {
        self.expect_state(FlowState::Created, "connect")?;
        let transport = self.transport.take().ok_or(PipeBenchError::InvalidState {
            flow_id: self.id,
            operation: "connect",
            state: self.state,
        })?;
        let (reader, writer) = connect_endpoints(transport.as_ref()).await?;
        drop(transport);

        let reclaim = if self.config.reclaim {
            let queue = ReclaimQueue::new(&format!("flow-{}", self.id))
                .map_err(|e| PipeBenchError::io("spawning the reclaim worker", e))?;
            Some(queue)
        } else {
            None
        };
        let consumer = Consumer::new(
            self.id,
            reader,
            self.config.buffer_size,
            self.progress.clone(),
            reclaim,
        );
        self.consumer = Some(tokio::spawn(consumer.run()));
        self.writer = Some(writer);
        self.transition(FlowState::Connected);
        Ok(())
    }

    /// Starts the producer.
    pub fn start(&mut self) -> Result<(), PipeBenchError> {
        self.expect_state(FlowState::Connected, "start")?;
        let writer = self.take_writer()?;
        self.running.store(true, Ordering::Release);
        let producer = Producer::new(
            self.id,
            writer,
            self.config.buffer_size,
            self.running.clone(),
            self.config.quota,
        );
        self.producer = Some(tokio::spawn(producer.run()));
        self.transition(FlowState::Running);
        Ok(())
    }

    /// Waits until the producer exits on its own, which for a flow without a
    /// quota only happens after `stop()` or on error.
    pub async fn wait_for_producer(&mut self) -> Result<(), PipeBenchError> {
        self.expect_state(FlowState::Running, "wait for the producer")?;
        self.join_producer().await
    }

    /// Stops the producer, half-closes the connection and returns the byte
    /// count acknowledged by the consumer.
    pub async fn stop(&mut self) -> Result<u64, PipeBenchError> {
        match self.state {
            FlowState::Reported => return Ok(self.bytes_transferred),
            FlowState::Running => {}
            state => {
                return Err(PipeBenchError::InvalidState {
                    flow_id: self.id,
                    operation: "stop",
                    state,
                })
            }
        }

        self.running.store(false, Ordering::Release);
        self.join_producer().await?;
        let mut writer = self.take_writer()?;

        writer.shutdown().await.map_err(|e| {
            PipeBenchError::io(format!("half-closing flow #{}", self.id), e)
        })?;
        self.transition(FlowState::Draining);

        let consumed = match self.consumer.take() {
            Some(handle) => handle.await.map_err(|e| PipeBenchError::TaskFailed {
                flow_id: self.id,
                task: "consumer",
                source: e,
            })??,
            None => {
                return Err(PipeBenchError::InvalidState {
                    flow_id: self.id,
                    operation: "join the consumer",
                    state: self.state,
                })
            }
        };
        self.transition(FlowState::Closed);

        let acknowledged = read_acknowledgment(self.id, &mut writer).await?;
        if acknowledged != consumed {
            warn!(
                "Flow #{} → acknowledged {} bytes but the consumer counted {}",
                self.id, acknowledged, consumed
            );
        }
        self.bytes_transferred = acknowledged;
        self.transition(FlowState::Reported);
        Ok(acknowledged)
    }

    async fn join_producer(&mut self) -> Result<(), PipeBenchError> {
        if let Some(handle) = self.producer.take() {
            let writer = handle.await.map_err(|e| PipeBenchError::TaskFailed {
                flow_id: self.id,
                task: "producer",
                source: e,
            })??;
            self.writer = Some(writer);
        }
        Ok(())
    }

    fn take_writer(&mut self) -> Result<Endpoint, PipeBenchError> {
        self.writer.take().ok_or(PipeBenchError::InvalidState {
            flow_id: self.id,
            operation: "take the write endpoint",
            state: self.state,
        })
    }

    fn expect_state(
        &self,
        expected: FlowState,
        operation: &'static str,
    ) -> Result<(), PipeBenchError> {
        if self.state == expected {
            return Ok(());
        }
        Err(PipeBenchError::InvalidState {
            flow_id: self.id,
            operation,
            state: self.state,
        })
    }

    fn transition(&mut self, next: FlowState) {
        debug!("Flow #{} → {} -> {}", self.id, self.state, next);
        self.state = next;
    }
}

/// Reads the consumer's 8-byte little-endian tally from `endpoint`.
pub(crate) async fn read_acknowledgment(
    flow_id: u32,
    endpoint: &mut Endpoint,
) -> Result<u64, PipeBenchError> {
    let mut ack = [0u8; ACK_SIZE];
    match endpoint.read_exact(&mut ack).await {
        Ok(_) => Ok(u64::from_le_bytes(ack)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof || is_disconnect(&e) => {
            Err(PipeBenchError::MissingAcknowledgment { flow_id })
        }
        Err(e) => Err(PipeBenchError::io(
            format!("reading the acknowledgment of flow #{flow_id}"),
            e,
        )),
    }
}
