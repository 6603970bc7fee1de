use crate::flow::FlowState;
use std::io;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum PipeBenchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Transport operation '{operation}' failed (os error {}): {source}", format_os_code(.code))]
    Transport {
        operation: &'static str,
        code: Option<i32>,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("Flow #{flow_id} closed without acknowledging its byte count")]
    MissingAcknowledgment { flow_id: u32 },
    #[error("Flow #{flow_id} cannot {operation} while {state}")]
    InvalidState {
        flow_id: u32,
        operation: &'static str,
        state: FlowState,
    },
    #[error("Flow #{flow_id} {task} task failed: {source}")]
    TaskFailed {
        flow_id: u32,
        task: &'static str,
        #[source]
        source: JoinError,
    },
    #[error("Consumer process for flow #{flow_id} failed: {reason}")]
    ChildProcess { flow_id: u32, reason: String },
}

fn format_os_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "n/a".to_owned(), |code| code.to_string())
}

impl PipeBenchError {
    pub fn transport(operation: &'static str, source: io::Error) -> Self {
        PipeBenchError::Transport {
            operation,
            code: source.raw_os_error(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        PipeBenchError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        PipeBenchError::InvalidArgument(message.into())
    }
}
