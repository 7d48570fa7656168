//! Port traits for the outside world.

pub mod config_port;
pub mod result_port;
pub mod spec_store;
pub mod submission_port;
