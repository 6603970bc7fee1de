use crate::transport::TransportKind;
use std::num::{NonZeroU32, NonZeroU64};

pub const DEFAULT_TRANSPORT: TransportKind = TransportKind::Unix;
pub const DEFAULT_BUFFER_SIZE: &str = "1k";

pub const DEFAULT_BUFFERS_PER_FLOW: NonZeroU64 = nonzero_lit::u64!(1000);
pub const DEFAULT_NUMBER_OF_FLOWS: NonZeroU32 = nonzero_lit::u32!(1);

pub const DEFAULT_SAMPLING_TIME: &str = "100ms";
pub const DEFAULT_MOVING_AVERAGE_WINDOW: u32 = 10;
pub const DEFAULT_RECLAIM: bool = false;

/// Largest relative standard deviation of the samples that still counts as
/// a stable throughput.
pub const DEFAULT_TOLERANCE: f64 = 0.02;
