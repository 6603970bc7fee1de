use crate::error::PipeBenchError;
use crate::transport::Endpoint;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writes zeroed buffers until told to stop or until its quota is spent.
/// Hands the endpoint back so the flow can half-close it and read the
/// acknowledgment.
pub(crate) struct Producer {
    flow_id: u32,
    writer: Endpoint,
    buffer: Bytes,
    running: Arc<AtomicBool>,
    quota: Option<u64>,
}

impl Producer {
    pub fn new(
        flow_id: u32,
        writer: Endpoint,
        buffer_size: usize,
        running: Arc<AtomicBool>,
        quota: Option<u64>,
    ) -> Self {
        Self {
            flow_id,
            writer,
            buffer: Bytes::from(vec![0u8; buffer_size]),
            running,
            quota,
        }
    }

    pub async fn run(mut self) -> Result<Endpoint, PipeBenchError> {
        let mut buffers_sent: u64 = 0;
        while self.running.load(Ordering::Acquire) {
            if self.quota.is_some_and(|quota| buffers_sent >= quota) {
                break;
            }
            // A short write is continued here; only the consumer's tally counts.
            self.writer.write_all(&self.buffer).await.map_err(|e| {
                PipeBenchError::io(format!("writing a buffer for flow #{}", self.flow_id), e)
            })?;
            buffers_sent += 1;
        }

        debug!(
            "Flow #{} producer → stopped after {} buffers",
            self.flow_id, buffers_sent
        );
        Ok(self.writer)
    }
}
