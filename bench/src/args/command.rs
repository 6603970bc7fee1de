use super::consume::ConsumeArgs;
use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum PipeBenchCommand {
    /// Prints usage examples
    Examples,

    /// Runs the consuming side of one flow, spawned by process isolation
    #[command(hide = true)]
    Consume(ConsumeArgs),
}
