//! strategy-factory: declarative trading strategy specs compiled into
//! executable units for an external backtest runtime.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
