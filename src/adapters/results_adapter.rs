//! Results directory adapter: JSON summaries in, CSV comparison tables out.

use crate::domain::error::FactoryError;
use crate::domain::summary::{BacktestSummary, ComparisonRow};
use crate::ports::result_port::ResultStore;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct ResultsDirAdapter {
    dir: PathBuf,
}

impl ResultsDirAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn summary_paths(&self) -> Result<Vec<PathBuf>, FactoryError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl ResultStore for ResultsDirAdapter {
    /// Unreadable or malformed files are skipped with a warning.
    fn load_summaries(&self) -> Result<Vec<BacktestSummary>, FactoryError> {
        let mut summaries = Vec::new();
        for path in self.summary_paths()? {
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|text| {
                    serde_json::from_str::<BacktestSummary>(&text).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(summary) => summaries.push(summary),
                Err(reason) => {
                    warn!(path = %path.display(), %reason, "skipping result file")
                }
            }
        }
        Ok(summaries)
    }

    fn save_summary(&self, summary: &BacktestSummary) -> Result<(), FactoryError> {
        let json = serde_json::to_string_pretty(summary).map_err(|e| FactoryError::Encode {
            what: format!("summary {}", summary.strategy_id),
            reason: e.to_string(),
        })?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!(
            "{}__{}.json",
            summary.strategy_id, summary.period_label
        ));
        fs::write(path, json)?;
        Ok(())
    }

    fn export_comparison(&self, rows: &[ComparisonRow], path: &Path) -> Result<(), FactoryError> {
        let encode_err = |e: csv::Error| FactoryError::Encode {
            what: format!("comparison table {}", path.display()),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path).map_err(encode_err)?;
        for row in rows {
            writer.serialize(row).map_err(encode_err)?;
        }
        writer.flush()?;
        Ok(())
    }
}
