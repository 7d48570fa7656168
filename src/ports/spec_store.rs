//! Spec repository port trait.

use crate::domain::error::FactoryError;
use crate::domain::spec::StrategySpec;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::warn;

/// Outcome of loading several specs at once.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Loaded specs keyed by the id they were requested under.
    pub specs: BTreeMap<String, StrategySpec>,
    /// Ids with no stored document.
    pub missing: Vec<String>,
    /// Ids whose document exists but could not be read or parsed.
    pub failed: Vec<(String, FactoryError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }
}

/// Port for persisting strategy specs by id.
pub trait SpecStore {
    /// Store a spec under its id, replacing any previous document.
    fn save(&self, spec: &StrategySpec) -> Result<PathBuf, FactoryError>;

    fn load(&self, id: &str) -> Result<StrategySpec, FactoryError>;

    fn list_ids(&self) -> Result<BTreeSet<String>, FactoryError>;

    /// Remove a spec; `false` when nothing was stored under `id`.
    fn delete(&self, id: &str) -> Result<bool, FactoryError>;

    /// Load every id, collecting misses and failures instead of stopping.
    fn load_many(&self, ids: &[&str]) -> LoadReport {
        let mut report = LoadReport::default();
        for id in ids {
            match self.load(id) {
                Ok(spec) => {
                    report.specs.insert(id.to_string(), spec);
                }
                Err(FactoryError::NotFound { .. }) => {
                    warn!(spec_id = %id, "spec not found");
                    report.missing.push(id.to_string());
                }
                Err(err) => {
                    warn!(spec_id = %id, error = %err, "spec failed to load");
                    report.failed.push((id.to_string(), err));
                }
            }
        }
        report
    }
}
