//! Factory settings and their validation.
//!
//! Settings come from the INI config file; every key has a default so the
//! CLI also works without one.

use crate::domain::error::FactoryError;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const DEFAULT_STORE_DIR: &str = "specs";
pub const DEFAULT_OUTBOX_DIR: &str = "outbox";
pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;
pub const DEFAULT_WALK_FORWARD_WINDOWS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct FactorySettings {
    pub store_dir: PathBuf,
    pub outbox_dir: PathBuf,
    pub results_dir: PathBuf,
    pub train_fraction: f64,
    pub walk_forward_windows: usize,
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            outbox_dir: PathBuf::from(DEFAULT_OUTBOX_DIR),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            train_fraction: DEFAULT_TRAIN_FRACTION,
            walk_forward_windows: DEFAULT_WALK_FORWARD_WINDOWS,
        }
    }
}

impl FactorySettings {
    /// Validate then read settings; the first invalid key is the error.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FactoryError> {
        validate_factory_config(config)?;
        Ok(Self {
            store_dir: PathBuf::from(config.get_string_or("store", "dir", DEFAULT_STORE_DIR)),
            outbox_dir: PathBuf::from(config.get_string_or("outbox", "dir", DEFAULT_OUTBOX_DIR)),
            results_dir: PathBuf::from(config.get_string_or(
                "results",
                "dir",
                DEFAULT_RESULTS_DIR,
            )),
            train_fraction: config.get_double("periods", "train_fraction", DEFAULT_TRAIN_FRACTION),
            walk_forward_windows: config.get_int(
                "periods",
                "walk_forward_windows",
                DEFAULT_WALK_FORWARD_WINDOWS as i64,
            ) as usize,
        })
    }
}

pub fn validate_factory_config(config: &dyn ConfigPort) -> Result<(), FactoryError> {
    validate_train_fraction(config)?;
    validate_walk_forward_windows(config)?;
    validate_directories(config)?;
    Ok(())
}

fn validate_train_fraction(config: &dyn ConfigPort) -> Result<(), FactoryError> {
    let value = config.get_double("periods", "train_fraction", DEFAULT_TRAIN_FRACTION);
    if !(value > 0.0 && value < 1.0) {
        return Err(FactoryError::ConfigInvalid {
            section: "periods".to_string(),
            key: "train_fraction".to_string(),
            reason: "train_fraction must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_walk_forward_windows(config: &dyn ConfigPort) -> Result<(), FactoryError> {
    let value = config.get_int(
        "periods",
        "walk_forward_windows",
        DEFAULT_WALK_FORWARD_WINDOWS as i64,
    );
    if value < 1 {
        return Err(FactoryError::ConfigInvalid {
            section: "periods".to_string(),
            key: "walk_forward_windows".to_string(),
            reason: "walk_forward_windows must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_directories(config: &dyn ConfigPort) -> Result<(), FactoryError> {
    let store = config.get_string_or("store", "dir", DEFAULT_STORE_DIR);
    for section in ["outbox", "results"] {
        let dir = config.get_string_or(section, "dir", section);
        if dir == store {
            return Err(FactoryError::ConfigInvalid {
                section: section.to_string(),
                key: "dir".to_string(),
                reason: "must differ from the spec store directory".to_string(),
            });
        }
    }
    Ok(())
}
