//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod json_spec_store;
pub mod outbox_adapter;
pub mod results_adapter;
