use crate::error::PipeBenchError;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    layer::{Layer, SubscriberExt},
};

pub(crate) const LOG_FILE_NAME: &str = "pipebench.log";

/// Stdout carries only the result lines, so every layer writes elsewhere.
pub(crate) struct Logging {
    file_guard: Option<WorkerGuard>,
}

impl Logging {
    pub(crate) fn new() -> Self {
        Logging { file_guard: None }
    }

    pub(crate) fn init(
        &mut self,
        verbose: bool,
        output_dir: Option<&Path>,
    ) -> Result<&mut Self, PipeBenchError> {
        let mut layers = vec![];

        let default_level = if verbose {
            LevelFilter::INFO
        } else {
            LevelFilter::WARN
        };
        let stderr_filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();
        let stderr_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(stderr_filter)
            .boxed();
        layers.push(stderr_layer);

        if let Some(output_dir) = output_dir {
            std::fs::create_dir_all(output_dir)
                .map_err(|e| PipeBenchError::io("creating the output directory", e))?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE_NAME)
                .build(output_dir)
                .map_err(|e| PipeBenchError::io("creating the log file", io::Error::other(e)))?;
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(non_blocking_file)
                .with_filter(LevelFilter::TRACE)
                .boxed();
            self.file_guard = Some(file_guard);

            layers.push(file_layer);
        }

        let subscriber = tracing_subscriber::registry().with(layers);
        tracing::subscriber::set_global_default(subscriber).map_err(|e| {
            PipeBenchError::io("installing the log subscriber", io::Error::other(e))
        })?;

        Ok(self)
    }
}
