use crate::error::PipeBenchError;
use crate::reclaim::ReclaimQueue;
use crate::transport::Endpoint;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

pub(crate) const ACK_SIZE: usize = std::mem::size_of::<u64>();

/// Reads until end-of-stream, then acknowledges the tally on the same
/// connection.
pub(crate) struct Consumer {
    flow_id: u32,
    reader: Endpoint,
    buffer_size: usize,
    progress: Arc<AtomicU64>,
    reclaim: Option<ReclaimQueue<Vec<u8>>>,
}

impl Consumer {
    pub fn new(
        flow_id: u32,
        reader: Endpoint,
        buffer_size: usize,
        progress: Arc<AtomicU64>,
        reclaim: Option<ReclaimQueue<Vec<u8>>>,
    ) -> Self {
        Self {
            flow_id,
            reader,
            buffer_size,
            progress,
            reclaim,
        }
    }

    pub async fn run(mut self) -> Result<u64, PipeBenchError> {
        let mut total: u64 = 0;
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            let read = match &self.reclaim {
                Some(queue) => {
                    let mut received = vec![0u8; self.buffer_size];
                    let read = self.reader.read(&mut received).await;
                    queue.push(received);
                    read
                }
                None => self.reader.read(&mut buffer).await,
            };

            match read {
                Ok(0) => break,
                Ok(n) => {
                    total += n as u64;
                    self.progress.fetch_add(n as u64, Ordering::Relaxed);
                }
                // A reset peer ends the stream just like a half-close does.
                Err(e) if is_disconnect(&e) => {
                    warn!(
                        "Flow #{} consumer → connection lost after {} bytes: {}",
                        self.flow_id, total, e
                    );
                    break;
                }
                Err(e) => {
                    return Err(PipeBenchError::io(
                        format!("reading from flow #{}", self.flow_id),
                        e,
                    ))
                }
            }
        }

        debug!(
            "Flow #{} consumer → end of stream after {} bytes",
            self.flow_id, total
        );
        if let Some(queue) = &self.reclaim {
            debug!(
                "Flow #{} consumer → {} buffers still waiting for reclamation",
                self.flow_id,
                queue.len()
            );
        }

        match self.acknowledge(total).await {
            Ok(()) => Ok(total),
            // Nobody is left to read the acknowledgment.
            Err(e) if is_disconnect(&e) => {
                warn!(
                    "Flow #{} consumer → cannot acknowledge {} bytes: {}",
                    self.flow_id, total, e
                );
                Ok(total)
            }
            Err(e) => Err(PipeBenchError::io(
                format!("acknowledging flow #{}", self.flow_id),
                e,
            )),
        }
    }

    async fn acknowledge(&mut self, total: u64) -> std::io::Result<()> {
        self.reader.write_all(&total.to_le_bytes()).await?;
        self.reader.flush().await
    }
}

pub(crate) fn is_disconnect(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}
