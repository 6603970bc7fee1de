pub mod finish_condition;
pub mod parse;
pub mod size_range;
