//! Hand-off of compiled strategies to the backtest orchestrator.

use crate::domain::compiler::StrategyManifest;
use crate::domain::error::FactoryError;

/// Acknowledgement that a manifest was accepted for a backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub spec_id: String,
    pub period_label: String,
    /// Where the orchestrator can find the submission, e.g. a file path.
    pub reference: String,
}

pub trait SubmissionPort {
    /// Failures surface as [`FactoryError::RemoteSubmission`].
    fn submit(&self, manifest: &StrategyManifest) -> Result<SubmissionReceipt, FactoryError>;
}
