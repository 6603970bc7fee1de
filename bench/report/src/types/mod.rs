pub mod flow;
pub mod hardware;
pub mod isolation;
pub mod mode;
pub mod params;
pub mod report;
pub mod result;
pub mod sample;
pub mod sweep;
pub mod time_series;
pub mod transport;
