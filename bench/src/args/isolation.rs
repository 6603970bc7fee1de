use clap::ValueEnum;
use pipebench_report::isolation::BenchmarkIsolation;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Isolation {
    /// Producer and consumer are tasks of this process
    #[default]
    Thread,
    /// Every consumer runs in its own child process
    Process,
}

impl From<Isolation> for BenchmarkIsolation {
    fn from(isolation: Isolation) -> Self {
        match isolation {
            Isolation::Thread => BenchmarkIsolation::Thread,
            Isolation::Process => BenchmarkIsolation::Process,
        }
    }
}
