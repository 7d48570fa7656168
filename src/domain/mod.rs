//! Core domain types and logic. Nothing here performs I/O.

pub mod compiler;
pub mod condition;
pub mod condition_parser;
pub mod config_validation;
pub mod error;
pub mod evaluator;
pub mod indicator;
pub mod period;
pub mod risk;
pub mod schedule;
pub mod sizing;
pub mod spec;
pub mod summary;
pub mod universe;
pub mod validation;
