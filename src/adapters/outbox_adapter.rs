//! Outbox submission adapter.
//!
//! The external orchestrator watches the outbox directory and runs each
//! manifest it finds on the platform.

use crate::domain::compiler::StrategyManifest;
use crate::domain::error::FactoryError;
use crate::ports::submission_port::{SubmissionPort, SubmissionReceipt};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct OutboxAdapter {
    dir: PathBuf,
}

impl OutboxAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self, manifest: &StrategyManifest) -> PathBuf {
        self.dir.join(format!(
            "{}__{}.json",
            manifest.spec_id, manifest.period_label
        ))
    }

    fn write(&self, manifest: &StrategyManifest) -> Result<PathBuf, String> {
        let json = manifest.to_json().map_err(|e| e.to_string())?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("cannot create outbox {}: {}", self.dir.display(), e))?;
        let path = self.manifest_path(manifest);
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(|e| format!("cannot write {}: {}", temp.display(), e))?;
        fs::rename(&temp, &path).map_err(|e| format!("cannot publish {}: {}", path.display(), e))?;
        Ok(path)
    }
}

impl SubmissionPort for OutboxAdapter {
    fn submit(&self, manifest: &StrategyManifest) -> Result<SubmissionReceipt, FactoryError> {
        let path = self
            .write(manifest)
            .map_err(|reason| FactoryError::RemoteSubmission { reason })?;
        info!(
            spec_id = %manifest.spec_id,
            period = %manifest.period_label,
            path = %path.display(),
            "manifest queued"
        );
        Ok(SubmissionReceipt {
            spec_id: manifest.spec_id.clone(),
            period_label: manifest.period_label.clone(),
            reference: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compiler::compile;
    use crate::domain::spec::StrategySpec;
    use tempfile::TempDir;

    fn manifest() -> StrategyManifest {
        let spec = StrategySpec::from_json(
            r#"{
                "id": "spy_trend",
                "universe": ["SPY"],
                "indicators": [{"name": "sma_200", "kind": "sma", "lookback": 200}],
                "entry_conditions": "ALL(GT(price, sma_200))",
                "exit_conditions": "ANY(LT(price, sma_200))",
                "risk": {"sizing": {"type": "fixed_weight", "weight": 1.0}, "max_positions": 1},
                "rebalance": {"frequency": {"type": "daily"}},
                "period": {"start": "2010-01-01", "end": "2020-01-01"}
            }"#,
        )
        .unwrap();
        compile(&spec).unwrap().manifest()
    }

    #[test]
    fn submit_writes_manifest_file() {
        let tmp = TempDir::new().unwrap();
        let outbox = OutboxAdapter::new(tmp.path().join("outbox"));
        let receipt = outbox.submit(&manifest()).unwrap();
        assert_eq!(receipt.spec_id, "spy_trend");
        assert_eq!(receipt.period_label, "full");

        let written = fs::read_to_string(&receipt.reference).unwrap();
        let back: StrategyManifest = serde_json::from_str(&written).unwrap();
        assert_eq!(back, manifest());
    }

    #[test]
    fn one_file_per_period() {
        let tmp = TempDir::new().unwrap();
        let outbox = OutboxAdapter::new(tmp.path());
        let full = manifest();
        let (train, test) = full.period.split(0.7).unwrap();
        outbox.submit(&full.for_period(train, "train")).unwrap();
        outbox.submit(&full.for_period(test, "test")).unwrap();
        assert!(tmp.path().join("spy_trend__train.json").exists());
        assert!(tmp.path().join("spy_trend__test.json").exists());
    }

    #[test]
    fn unwritable_outbox_is_submission_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let outbox = OutboxAdapter::new(blocker.join("outbox"));
        assert!(matches!(
            outbox.submit(&manifest()),
            Err(FactoryError::RemoteSubmission { .. })
        ));
    }
}
