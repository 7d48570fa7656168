//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Settings loading from real INI files on disk
//! - Import and validation of spec documents
//! - Period slicing into train, test and walk-forward manifests
//! - Submission through a recording port, including rejection
//! - Compile-only output and result comparison
//! - List, show and delete against the JSON store

mod common;

use common::*;
use std::fs;
use std::io::Write;
use std::process::ExitCode;
use strategy_factory::adapters::json_spec_store::JsonFileStore;
use strategy_factory::adapters::outbox_adapter::OutboxAdapter;
use strategy_factory::adapters::results_adapter::ResultsDirAdapter;
use strategy_factory::cli::{self, PeriodArg};
use strategy_factory::domain::compiler::{compile, StrategyManifest};
use strategy_factory::domain::config_validation::FactorySettings;
use strategy_factory::domain::error::FactoryError;
use strategy_factory::domain::period::BacktestPeriod;
use strategy_factory::domain::summary::BacktestSummary;
use strategy_factory::ports::result_port::ResultStore;
use strategy_factory::ports::spec_store::SpecStore;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn exit_code(err: &FactoryError) -> String {
    format!("{:?}", ExitCode::from(err))
}

const VALID_INI: &str = r#"
[store]
dir = /var/lib/factory/specs

[outbox]
dir = /var/lib/factory/outbox

[results]
dir = /var/lib/factory/results

[periods]
train_fraction = 0.6
walk_forward_windows = 3
"#;

mod settings {
    use super::*;

    #[test]
    fn loads_every_key() {
        let file = write_temp_ini(VALID_INI);
        let settings = cli::load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.store_dir.to_str(), Some("/var/lib/factory/specs"));
        assert_eq!(settings.outbox_dir.to_str(), Some("/var/lib/factory/outbox"));
        assert_eq!(settings.train_fraction, 0.6);
        assert_eq!(settings.walk_forward_windows, 3);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_temp_ini("[periods]\nwalk_forward_windows = 6\n");
        let settings = cli::load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.walk_forward_windows, 6);
        assert_eq!(settings.store_dir, FactorySettings::default().store_dir);
    }

    #[test]
    fn invalid_fraction_is_config_error() {
        let file = write_temp_ini("[periods]\ntrain_fraction = 1.5\n");
        let err = cli::load_settings(Some(file.path())).unwrap_err();
        assert!(matches!(err, FactoryError::ConfigInvalid { ref key, .. } if key == "train_fraction"));
        assert_eq!(exit_code(&err), format!("{:?}", ExitCode::from(7u8)));
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let err = cli::load_settings(Some(tmp.path().join("absent.ini").as_path())).unwrap_err();
        assert!(matches!(err, FactoryError::ConfigParse { .. }));
    }
}

mod import_and_validate {
    use super::*;

    #[test]
    fn import_stores_valid_document() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("rotation.json");
        fs::write(&doc, SAMPLE_JSON).unwrap();
        let store = JsonFileStore::new(tmp.path().join("specs"));

        let stored = cli::import_file(&store, &doc).unwrap();
        assert!(stored.exists());
        assert_eq!(store.load("sector_rotation").unwrap().indicators.len(), 3);
    }

    #[test]
    fn import_rejects_invalid_document_without_storing() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("bad.json");
        fs::write(&doc, SAMPLE_JSON.replace("GT(mom, 0)", "GT(momentum, 0)")).unwrap();
        let store = MemoryStore::new();

        let err = cli::import_file(&store, &doc).unwrap_err();
        assert_eq!(err.missing_indicators(), vec!["momentum"]);
        assert_eq!(exit_code(&err), format!("{:?}", ExitCode::from(3u8)));
        assert!(store.list_ids().unwrap().is_empty());
    }

    #[test]
    fn import_of_malformed_json_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("broken.json");
        fs::write(&doc, "{\"id\": \"x\",").unwrap();
        let err = cli::import_file(&MemoryStore::new(), &doc).unwrap_err();
        assert_eq!(exit_code(&err), format!("{:?}", ExitCode::from(2u8)));
    }

    #[test]
    fn validate_passes_sample_spec() {
        assert!(cli::validate_spec(&sample_spec("trend")).is_ok());
    }
}

mod periods {
    use super::*;

    fn manifest() -> StrategyManifest {
        compile(&sample_spec("trend")).unwrap().manifest()
    }

    #[test]
    fn full_period_is_one_manifest() {
        let manifests =
            cli::period_manifests(&manifest(), PeriodArg::Full, &FactorySettings::default())
                .unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].period_label, "full");
    }

    #[test]
    fn train_and_test_share_the_boundary() {
        let settings = FactorySettings::default();
        let m = manifest();
        let train = &cli::period_manifests(&m, PeriodArg::Train, &settings).unwrap()[0];
        let test = &cli::period_manifests(&m, PeriodArg::Test, &settings).unwrap()[0];
        assert_eq!(train.period_label, "train");
        assert_eq!(test.period_label, "test");
        assert_eq!(train.period.start, date("2015-01-01"));
        assert_eq!(test.period.end, date("2023-01-01"));
        assert_eq!(train.period.end, test.period.start);
        assert!(train.period.days() > test.period.days());
    }

    #[test]
    fn walk_forward_windows_cover_the_period() {
        let settings = FactorySettings {
            walk_forward_windows: 3,
            ..FactorySettings::default()
        };
        let manifests =
            cli::period_manifests(&manifest(), PeriodArg::WalkForward, &settings).unwrap();
        let labels: Vec<&str> = manifests.iter().map(|m| m.period_label.as_str()).collect();
        assert_eq!(labels, vec!["wf1", "wf2", "wf3"]);
        assert_eq!(manifests[0].period.start, date("2015-01-01"));
        assert_eq!(manifests[2].period.end, date("2023-01-01"));
        assert_eq!(manifests[0].period.end, manifests[1].period.start);
    }
}

mod submission {
    use super::*;

    #[test]
    fn run_submits_each_period_slice() {
        let store = MemoryStore::new().with_spec(sample_spec("trend"));
        let port = RecordingSubmission::new();
        let settings = FactorySettings::default();

        let manifests =
            cli::run_strategy(&store, &port, &settings, "trend", PeriodArg::WalkForward).unwrap();
        assert_eq!(manifests.len(), settings.walk_forward_windows);
        assert_eq!(port.submitted.borrow().len(), settings.walk_forward_windows);
        assert_eq!(port.submitted.borrow()[0].spec_id, "trend");
    }

    #[test]
    fn rejected_submission_is_remote_error() {
        let store = MemoryStore::new().with_spec(sample_spec("trend"));
        let port = RecordingSubmission::rejecting("queue offline");
        let err = cli::run_strategy(
            &store,
            &port,
            &FactorySettings::default(),
            "trend",
            PeriodArg::Full,
        )
        .unwrap_err();
        assert!(matches!(err, FactoryError::RemoteSubmission { ref reason } if reason == "queue offline"));
        assert_eq!(exit_code(&err), format!("{:?}", ExitCode::from(6u8)));
    }

    #[test]
    fn invalid_stored_spec_is_never_submitted() {
        let mut spec = sample_spec("trend");
        spec.risk.max_positions = 0;
        let store = MemoryStore::new().with_spec(spec);
        let port = RecordingSubmission::new();
        let err = cli::run_strategy(
            &store,
            &port,
            &FactorySettings::default(),
            "trend",
            PeriodArg::Full,
        )
        .unwrap_err();
        assert!(matches!(err, FactoryError::SpecValidation { .. }));
        assert!(port.submitted.borrow().is_empty());
    }

    #[test]
    fn one_day_period_cannot_be_split_and_submits_nothing() {
        let mut spec = sample_spec("short");
        spec.period = BacktestPeriod::new(date("2020-01-01"), date("2020-01-02"));
        let store = MemoryStore::new().with_spec(spec);
        let port = RecordingSubmission::new();
        let settings = FactorySettings {
            train_fraction: 0.7,
            ..FactorySettings::default()
        };

        for period in [PeriodArg::Train, PeriodArg::Test] {
            let err = cli::run_strategy(&store, &port, &settings, "short", period).unwrap_err();
            assert!(matches!(
                err,
                FactoryError::ConfigInvalid { ref key, .. } if key == "train_fraction"
            ));
            assert_eq!(exit_code(&err), format!("{:?}", ExitCode::from(7u8)));
        }
        assert!(port.submitted.borrow().is_empty());

        let windows =
            cli::run_strategy(&store, &port, &settings, "short", PeriodArg::WalkForward).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].period.days(), 1);
    }

    #[test]
    fn unknown_strategy_is_not_found() {
        let err = cli::run_strategy(
            &MemoryStore::new(),
            &RecordingSubmission::new(),
            &FactorySettings::default(),
            "nope",
            PeriodArg::Full,
        )
        .unwrap_err();
        assert_eq!(exit_code(&err), format!("{:?}", ExitCode::from(5u8)));
    }

    #[test]
    fn outbox_receives_manifest_files() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::new().with_spec(sample_spec("trend"));
        let outbox = OutboxAdapter::new(tmp.path());
        cli::run_strategy(
            &store,
            &outbox,
            &FactorySettings::default(),
            "trend",
            PeriodArg::Test,
        )
        .unwrap();
        let text = fs::read_to_string(tmp.path().join("trend__test.json")).unwrap();
        let manifest: StrategyManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(manifest.period_label, "test");
    }
}

mod compile_only {
    use super::*;

    #[test]
    fn writes_manifests_to_output_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("manifests");
        let store = MemoryStore::new().with_spec(sample_spec("trend"));
        let settings = FactorySettings {
            walk_forward_windows: 2,
            ..FactorySettings::default()
        };

        let manifests = cli::run_compile_only(
            &store,
            &settings,
            "trend",
            PeriodArg::WalkForward,
            Some(out.as_path()),
        )
        .unwrap();
        assert_eq!(manifests.len(), 2);
        assert!(out.join("trend__wf1.json").exists());
        assert!(out.join("trend__wf2.json").exists());
    }
}

mod compare_all {
    use super::*;

    fn summary(id: &str, sharpe: f64) -> BacktestSummary {
        BacktestSummary {
            strategy_id: id.into(),
            period_label: "full".into(),
            cagr: 0.1,
            sharpe,
            max_drawdown: -0.2,
            total_orders: 40,
        }
    }

    #[test]
    fn ranks_results_and_exports_csv() {
        let tmp = TempDir::new().unwrap();
        let results = ResultsDirAdapter::new(tmp.path().join("results"));
        results.save_summary(&summary("low", 0.2)).unwrap();
        results.save_summary(&summary("high", 1.8)).unwrap();
        let csv_path = tmp.path().join("compare.csv");

        let rows = cli::run_compare_all(&results, Some(csv_path.as_path())).unwrap();
        assert_eq!(rows[0].strategy_id, "high");
        assert_eq!(rows[1].strategy_id, "low");
        assert!(csv_path.exists());
    }

    #[test]
    fn no_results_is_empty_table() {
        let tmp = TempDir::new().unwrap();
        let results = ResultsDirAdapter::new(tmp.path());
        assert!(cli::run_compare_all(&results, None).unwrap().is_empty());
    }
}

mod store_commands {
    use super::*;

    #[test]
    fn list_includes_unreadable_specs() {
        let store = MemoryStore::new()
            .with_spec(sample_spec("trend"))
            .with_broken("zzz", "expected value");
        let lines = cli::list_specs(&store).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("trend"));
        assert!(lines[0].ends_with("trend crossover"));
        assert!(lines[1].contains("unreadable"));
    }

    #[test]
    fn show_describes_spec() {
        let store = MemoryStore::new().with_spec(sample_spec("trend"));
        let text = cli::show_spec(&store, "trend").unwrap();
        assert!(text.starts_with("trend crossover (trend)"));
        assert!(text.contains("universe:  SPY, QQQ"));
        assert!(text.contains("rsi = RSI[14]"));
        assert!(text.contains("entry:     ALL(CROSSES_ABOVE(fast, slow), LT(rsi, 70))"));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = MemoryStore::new().with_spec(sample_spec("trend"));
        cli::delete_spec(&store, "trend").unwrap();
        let err = cli::delete_spec(&store, "trend").unwrap_err();
        assert!(matches!(err, FactoryError::NotFound { ref id } if id == "trend"));
    }
}
