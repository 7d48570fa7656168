//! Backtest result storage port trait.

use crate::domain::error::FactoryError;
use crate::domain::summary::{BacktestSummary, ComparisonRow};
use std::path::Path;

pub trait ResultStore {
    /// Every stored summary, in file name order.
    fn load_summaries(&self) -> Result<Vec<BacktestSummary>, FactoryError>;

    fn save_summary(&self, summary: &BacktestSummary) -> Result<(), FactoryError>;

    /// Write a ranked comparison table to `path`.
    fn export_comparison(&self, rows: &[ComparisonRow], path: &Path) -> Result<(), FactoryError>;
}
