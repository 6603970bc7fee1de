use crate::transport::rendezvous::RendezvousAddress;
use crate::utils::parse::{parse_buffer_size, parse_number};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct ConsumeArgs {
    /// Rendezvous address of the producing process, `tcp:<addr>` or `unix:<path>`
    #[arg(long, value_parser = clap::value_parser!(RendezvousAddress))]
    pub connect: RendezvousAddress,

    /// Read buffer size
    #[arg(long = "size", short = 's', value_parser = parse_buffer_size)]
    pub buffer_size: usize,

    /// Bytes to read before acknowledging
    #[arg(long, value_parser = parse_number)]
    pub expect: u64,

    /// Flow this consumer belongs to, used in log messages
    #[arg(long, default_value_t = 1)]
    pub flow_id: u32,

    /// Receive into a fresh buffer per read and destroy it on a background thread
    #[arg(long, default_value_t = false)]
    pub reclaim: bool,

    /// Log at info level
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}
