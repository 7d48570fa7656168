//! JSON file spec store: one `<id>.json` document per spec in a directory.

use crate::domain::error::FactoryError;
use crate::domain::spec::StrategySpec;
use crate::domain::validation::{id_problem, ValidationError};
use crate::ports::spec_store::SpecStore;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// Writes go to a hidden temporary sibling and are then renamed into place.
/// No locking: with two writers for the same id the last rename wins.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn spec_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, EXTENSION))
    }

    fn temp_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!(".{}.{}.tmp", id, EXTENSION))
    }
}

impl SpecStore for JsonFileStore {
    fn save(&self, spec: &StrategySpec) -> Result<PathBuf, FactoryError> {
        if let Some(reason) = id_problem(&spec.id) {
            return Err(FactoryError::SpecValidation {
                spec_id: spec.id.clone(),
                errors: vec![ValidationError::InvalidId {
                    id: spec.id.clone(),
                    reason,
                }],
            });
        }
        let json = spec.to_json()?;
        fs::create_dir_all(&self.dir)?;

        let temp = self.temp_path(&spec.id);
        let path = self.spec_path(&spec.id);
        fs::write(&temp, json)?;
        if let Err(err) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        debug!(spec_id = %spec.id, path = %path.display(), "saved spec");
        Ok(path)
    }

    fn load(&self, id: &str) -> Result<StrategySpec, FactoryError> {
        if id_problem(id).is_some() {
            return Err(FactoryError::NotFound { id: id.to_string() });
        }
        let path = self.spec_path(id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FactoryError::NotFound { id: id.to_string() });
            }
            Err(err) => return Err(err.into()),
        };
        let spec = StrategySpec::from_json(&text)?;
        if spec.id != id {
            warn!(
                spec_id = %id,
                document_id = %spec.id,
                "stored document carries a different id"
            );
        }
        Ok(spec)
    }

    fn list_ids(&self) -> Result<BTreeSet<String>, FactoryError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(err) => return Err(err.into()),
        };
        let mut ids = BTreeSet::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if id_problem(stem).is_none() => {
                    ids.insert(stem.to_string());
                }
                _ => debug!(path = %path.display(), "skipping file without a valid spec id"),
            }
        }
        Ok(ids)
    }

    fn delete(&self, id: &str) -> Result<bool, FactoryError> {
        if id_problem(id).is_some() {
            return Ok(false);
        }
        match fs::remove_file(self.spec_path(id)) {
            Ok(()) => {
                debug!(spec_id = %id, "deleted spec");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
