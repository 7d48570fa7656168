//! Domain error types.

use crate::domain::validation::ValidationError;
use std::collections::BTreeSet;

/// A parse error with position information for condition expressions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for the strategy factory.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("malformed spec document at {path}: {message}")]
    SpecParse { path: String, message: String },

    #[error("spec {spec_id} failed validation with {} error(s)", .errors.len())]
    SpecValidation {
        spec_id: String,
        errors: Vec<ValidationError>,
    },

    #[error("internal compiler error in spec {spec_id}: {reason}")]
    CompilerInternal { spec_id: String, reason: String },

    #[error("spec not found: {id}")]
    NotFound { id: String },

    #[error("remote submission failed: {reason}")]
    RemoteSubmission { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    ConditionParse(#[from] ParseError),

    #[error("failed to encode {what}: {reason}")]
    Encode { what: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FactoryError {
    /// Validation errors carried by this error, empty for every other variant.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            FactoryError::SpecValidation { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Undeclared indicator names behind a validation failure, sorted and
    /// deduplicated.
    pub fn missing_indicators(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .validation_errors()
            .iter()
            .filter_map(|e| match e {
                ValidationError::DanglingIndicator { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        names.into_iter().collect()
    }
}

impl From<&FactoryError> for std::process::ExitCode {
    fn from(err: &FactoryError) -> Self {
        let code: u8 = match err {
            FactoryError::Io(_) | FactoryError::Encode { .. } => 1,
            FactoryError::SpecParse { .. } | FactoryError::ConditionParse(_) => 2,
            FactoryError::SpecValidation { .. } => 3,
            FactoryError::CompilerInternal { .. } => 4,
            FactoryError::NotFound { .. } => 5,
            FactoryError::RemoteSubmission { .. } => 6,
            FactoryError::ConfigParse { .. } | FactoryError::ConfigInvalid { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}
