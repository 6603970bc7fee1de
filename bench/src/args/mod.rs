pub mod command;
pub mod common;
pub mod consume;
pub mod defaults;
pub mod examples;
pub mod isolation;
pub mod output;
