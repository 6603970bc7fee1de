use crate::args::consume::ConsumeArgs;
use crate::error::PipeBenchError;
use crate::flow::{read_acknowledgment, Consumer};
use crate::reclaim::ReclaimQueue;
use crate::transport::rendezvous::{self, RendezvousListener};
use crate::transport::{Endpoint, TransportKind};
use crate::utils::finish_condition::FinishCondition;
use bytes::Bytes;
use std::process::Stdio;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Producing side of a flow whose consumer is a child process running the
/// hidden `consume` subcommand.
pub(crate) struct ChildFlow {
    id: u32,
    child: Child,
    writer: Endpoint,
    buffer: Bytes,
    quota: u64,
    expected: u64,
}

impl ChildFlow {
    /// Spawns the consumer process and waits until it has connected.
    pub async fn spawn(
        id: u32,
        kind: TransportKind,
        buffer_size: usize,
        finish: FinishCondition,
        reclaim: bool,
    ) -> Result<Self, PipeBenchError> {
        let (Some(quota), Some(expected)) = (finish.quota(), finish.expected_bytes(buffer_size))
        else {
            return Err(PipeBenchError::invalid_argument(
                "process isolation requires a buffer count whose byte total fits in 64 bits",
            ));
        };
        let listener = RendezvousListener::bind(kind)?;
        let executable = std::env::current_exe()
            .map_err(|e| PipeBenchError::io("locating the pipebench executable", e))?;

        let mut command = Command::new(executable);
        command
            .arg("consume")
            .arg("--connect")
            .arg(listener.address().to_string())
            .arg("-s")
            .arg(buffer_size.to_string())
            .arg("--expect")
            .arg(expected.to_string())
            .arg("--flow-id")
            .arg(id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if reclaim {
            command.arg("--reclaim");
        }

        let mut child = command.spawn().map_err(|e| PipeBenchError::ChildProcess {
            flow_id: id,
            reason: format!("cannot spawn: {e}"),
        })?;
        debug!(
            "Flow #{id} → spawned consumer process {:?} for {}",
            child.id(),
            listener.address()
        );

        let writer = tokio::select! {
            accepted = listener.accept() => accepted?,
            status = child.wait() => {
                return Err(PipeBenchError::ChildProcess {
                    flow_id: id,
                    reason: match status {
                        Ok(status) => format!("exited with {status} before connecting"),
                        Err(e) => format!("cannot be waited for: {e}"),
                    },
                });
            }
        };

        Ok(Self {
            id,
            child,
            writer,
            buffer: Bytes::from(vec![0u8; buffer_size]),
            quota,
            expected,
        })
    }

    /// Sends the whole quota.
    pub async fn send(&mut self) -> Result<(), PipeBenchError> {
        for _ in 0..self.quota {
            self.writer.write_all(&self.buffer).await.map_err(|e| {
                PipeBenchError::io(format!("writing a buffer for flow #{}", self.id), e)
            })?;
        }
        debug!("Flow #{} → sent {} buffers", self.id, self.quota);
        Ok(())
    }

    /// Half-closes and waits for the acknowledgment, which arrives once the
    /// child has read every byte.
    pub async fn drain(&mut self) -> Result<u64, PipeBenchError> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| PipeBenchError::io(format!("half-closing flow #{}", self.id), e))?;
        let acknowledged = read_acknowledgment(self.id, &mut self.writer).await?;
        if acknowledged != self.expected {
            warn!(
                "Flow #{} → consumer process acknowledged {} of {} bytes",
                self.id, acknowledged, self.expected
            );
        }
        Ok(acknowledged)
    }

    /// Waits for the child to exit and checks its status.
    pub async fn reap(mut self) -> Result<(), PipeBenchError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| PipeBenchError::ChildProcess {
                flow_id: self.id,
                reason: format!("cannot be waited for: {e}"),
            })?;
        if !status.success() {
            return Err(PipeBenchError::ChildProcess {
                flow_id: self.id,
                reason: format!("exited with {status}"),
            });
        }
        Ok(())
    }
}

/// Entry point of the `consume` subcommand.
pub async fn run_consumer(args: &ConsumeArgs) -> Result<u64, PipeBenchError> {
    let reader = rendezvous::connect(&args.connect).await?;
    info!(
        "Flow #{} consumer process connected to {}",
        args.flow_id, args.connect
    );

    let reclaim = if args.reclaim {
        let queue = ReclaimQueue::new(&format!("flow-{}", args.flow_id))
            .map_err(|e| PipeBenchError::io("spawning the reclaim worker", e))?;
        Some(queue)
    } else {
        None
    };
    let consumer = Consumer::new(
        args.flow_id,
        reader,
        args.buffer_size,
        Arc::new(AtomicU64::new(0)),
        reclaim,
    );
    let received = consumer.run().await?;

    if received != args.expect {
        return Err(PipeBenchError::ChildProcess {
            flow_id: args.flow_id,
            reason: format!("received {received} bytes, expected {}", args.expect),
        });
    }
    Ok(received)
}
