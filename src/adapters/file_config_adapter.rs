//! INI file configuration adapter.

use crate::domain::error::FactoryError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FactoryError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| FactoryError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, FactoryError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| FactoryError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn reads_sections() {
        let adapter = FileConfigAdapter::from_string(
            "[store]\ndir = /srv/specs\n\n[periods]\ntrain_fraction = 0.75\nwalk_forward_windows = 6\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_string("store", "dir"),
            Some("/srv/specs".to_string())
        );
        assert_eq!(adapter.get_double("periods", "train_fraction", 0.0), 0.75);
        assert_eq!(adapter.get_int("periods", "walk_forward_windows", 0), 6);
    }

    #[test]
    fn missing_keys_fall_back() {
        let adapter = FileConfigAdapter::from_string("[store]\n").unwrap();
        assert_eq!(adapter.get_string("store", "dir"), None);
        assert_eq!(adapter.get_string("missing_section", "dir"), None);
        assert_eq!(adapter.get_int("periods", "walk_forward_windows", 4), 4);
        assert_eq!(adapter.get_double("periods", "train_fraction", 0.7), 0.7);
        assert_eq!(adapter.get_string_or("store", "dir", "specs"), "specs");
    }

    #[test]
    fn non_numeric_values_fall_back() {
        let adapter = FileConfigAdapter::from_string(
            "[periods]\ntrain_fraction = most\nwalk_forward_windows = many\n",
        )
        .unwrap();
        assert_eq!(adapter.get_double("periods", "train_fraction", 0.7), 0.7);
        assert_eq!(adapter.get_int("periods", "walk_forward_windows", 4), 4);
    }

    #[test]
    fn blank_string_uses_default() {
        let adapter = FileConfigAdapter::from_string("[outbox]\ndir =\n").unwrap();
        assert_eq!(adapter.get_string_or("outbox", "dir", "outbox"), "outbox");
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[results]\ndir = /tmp/results\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("results", "dir"),
            Some("/tmp/results".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/factory.ini");
        assert!(matches!(result, Err(FactoryError::ConfigParse { .. })));
    }
}
