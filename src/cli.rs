//! CLI definition and dispatch.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_spec_store::JsonFileStore;
use crate::adapters::outbox_adapter::OutboxAdapter;
use crate::adapters::results_adapter::ResultsDirAdapter;
use crate::domain::compiler::{compile, StrategyManifest};
use crate::domain::config_validation::FactorySettings;
use crate::domain::error::FactoryError;
use crate::domain::spec::StrategySpec;
use crate::domain::summary::{rank_by_sharpe, ComparisonRow};
use crate::domain::validation::missing_indicators;
use crate::ports::result_port::ResultStore;
use crate::ports::spec_store::SpecStore;
use crate::ports::submission_port::SubmissionPort;

#[derive(Parser, Debug)]
#[command(
    name = "strategy-factory",
    about = "Validate, store and compile declarative trading strategy specs"
)]
pub struct Cli {
    /// INI settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    /// The spec's whole backtest period
    Full,
    /// Leading slice, `train_fraction` of the period
    Train,
    /// Trailing slice after the train boundary
    Test,
    /// Consecutive windows covering the period
    WalkForward,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a stored spec and queue it for backtesting
    Run {
        #[arg(
            short,
            long,
            required_unless_present = "compare_all",
            conflicts_with = "compare_all"
        )]
        strategy: Option<String>,
        #[arg(long, value_enum, default_value_t = PeriodArg::Full)]
        period: PeriodArg,
        /// Compile and print manifests without submitting
        #[arg(long)]
        compile_only: bool,
        /// Rank stored backtest results by Sharpe ratio
        #[arg(long)]
        compare_all: bool,
        /// Manifest directory, or CSV file with --compare-all
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report every validation error in a spec
    Validate {
        #[arg(short, long, required_unless_present = "file", conflicts_with = "file")]
        strategy: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Parse, validate and store a spec document
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// List stored spec ids
    List,
    /// Describe a stored spec
    Show {
        #[arg(short, long)]
        strategy: String,
    },
    /// Remove a stored spec
    Delete {
        #[arg(short, long)]
        strategy: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            (&e).into()
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("warn"));
    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false));
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn report_error(err: &FactoryError) {
    eprintln!("error: {err}");
    for problem in err.validation_errors() {
        eprintln!("  - {problem}");
    }
    let missing = err.missing_indicators();
    if !missing.is_empty() {
        eprintln!("undeclared indicators: {}", missing.join(", "));
    }
}

fn dispatch(cli: Cli) -> Result<(), FactoryError> {
    let settings = load_settings(cli.config.as_deref())?;
    let store = JsonFileStore::new(&settings.store_dir);
    match cli.command {
        Command::Run {
            strategy,
            period,
            compile_only,
            compare_all,
            output,
        } => {
            if compare_all {
                let results = ResultsDirAdapter::new(&settings.results_dir);
                run_compare_all(&results, output.as_deref())?;
                return Ok(());
            }
            let Some(id) = strategy else {
                missing_argument("run needs --strategy or --compare-all")
            };
            if compile_only {
                run_compile_only(&store, &settings, &id, period, output.as_deref())?;
            } else {
                let outbox =
                    OutboxAdapter::new(output.unwrap_or_else(|| settings.outbox_dir.clone()));
                run_strategy(&store, &outbox, &settings, &id, period)?;
            }
            Ok(())
        }
        Command::Validate { strategy, file } => {
            let spec = if let Some(path) = file {
                eprintln!("Validating {}", path.display());
                read_spec_file(&path)?
            } else if let Some(id) = strategy {
                eprintln!("Validating stored spec {id}");
                store.load(&id)?
            } else {
                missing_argument("validate needs --strategy or --file")
            };
            validate_spec(&spec)?;
            eprintln!("Spec {} is valid.", spec.id);
            Ok(())
        }
        Command::Import { file } => {
            let path = import_file(&store, &file)?;
            eprintln!("Stored {}", path.display());
            Ok(())
        }
        Command::List => {
            for line in list_specs(&store)? {
                println!("{line}");
            }
            Ok(())
        }
        Command::Show { strategy } => {
            println!("{}", show_spec(&store, &strategy)?);
            Ok(())
        }
        Command::Delete { strategy } => {
            delete_spec(&store, &strategy)?;
            eprintln!("Deleted {strategy}");
            Ok(())
        }
    }
}

/// Usage error in clap's own format; argument rules normally catch this first.
fn missing_argument(message: &str) -> ! {
    Cli::command()
        .error(ErrorKind::MissingRequiredArgument, message)
        .exit()
}

/// Settings from the config file, or defaults when none is given.
pub fn load_settings(path: Option<&Path>) -> Result<FactorySettings, FactoryError> {
    match path {
        None => Ok(FactorySettings::default()),
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            let adapter = FileConfigAdapter::from_file(path)?;
            FactorySettings::from_config(&adapter)
        }
    }
}

pub fn read_spec_file(path: &Path) -> Result<StrategySpec, FactoryError> {
    let text = fs::read_to_string(path)?;
    StrategySpec::from_json(&text)
}

/// Ok when the spec has no validation problems, otherwise every problem.
pub fn validate_spec(spec: &StrategySpec) -> Result<(), FactoryError> {
    let errors = spec.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let missing = missing_indicators(spec);
    if !missing.is_empty() {
        tracing::debug!(spec_id = %spec.id, missing = ?missing, "dangling references");
    }
    Err(FactoryError::SpecValidation {
        spec_id: spec.id.clone(),
        errors,
    })
}

pub fn import_file(store: &dyn SpecStore, path: &Path) -> Result<PathBuf, FactoryError> {
    let spec = read_spec_file(path)?;
    validate_spec(&spec)?;
    store.save(&spec)
}

/// One manifest per period slice requested.
pub fn period_manifests(
    manifest: &StrategyManifest,
    period: PeriodArg,
    settings: &FactorySettings,
) -> Result<Vec<StrategyManifest>, FactoryError> {
    let split = || {
        manifest
            .period
            .split(settings.train_fraction)
            .ok_or_else(|| FactoryError::ConfigInvalid {
                section: "periods".to_string(),
                key: "train_fraction".to_string(),
                reason: format!(
                    "cannot split {} at {}: each half needs at least one day",
                    manifest.period, settings.train_fraction
                ),
            })
    };
    match period {
        PeriodArg::Full => Ok(vec![manifest.clone()]),
        PeriodArg::Train => {
            let (train, _) = split()?;
            Ok(vec![manifest.for_period(train, "train")])
        }
        PeriodArg::Test => {
            let (_, test) = split()?;
            Ok(vec![manifest.for_period(test, "test")])
        }
        PeriodArg::WalkForward => Ok(manifest
            .period
            .walk_forward(settings.walk_forward_windows)
            .into_iter()
            .enumerate()
            .map(|(i, window)| manifest.for_period(window, format!("wf{}", i + 1)))
            .collect()),
    }
}

fn compile_manifests(
    store: &dyn SpecStore,
    settings: &FactorySettings,
    id: &str,
    period: PeriodArg,
) -> Result<Vec<StrategyManifest>, FactoryError> {
    let spec = store.load(id)?;
    let compiled = compile(&spec)?;
    eprintln!(
        "Compiled {} ({} indicators, warmup {} bars)",
        compiled.spec_id(),
        compiled.indicators().len(),
        compiled.warmup_bars()
    );
    period_manifests(&compiled.manifest(), period, settings)
}

/// Compile without submitting. Manifests go to `output` as files when
/// given, otherwise to stdout.
pub fn run_compile_only(
    store: &dyn SpecStore,
    settings: &FactorySettings,
    id: &str,
    period: PeriodArg,
    output: Option<&Path>,
) -> Result<Vec<StrategyManifest>, FactoryError> {
    let manifests = compile_manifests(store, settings, id, period)?;
    for manifest in &manifests {
        let json = manifest.to_json()?;
        match output {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = dir.join(format!(
                    "{}__{}.json",
                    manifest.spec_id, manifest.period_label
                ));
                fs::write(&path, json)?;
                eprintln!("Wrote {}", path.display());
            }
            None => println!("{json}"),
        }
    }
    Ok(manifests)
}

pub fn run_strategy(
    store: &dyn SpecStore,
    submission: &dyn SubmissionPort,
    settings: &FactorySettings,
    id: &str,
    period: PeriodArg,
) -> Result<Vec<StrategyManifest>, FactoryError> {
    let manifests = compile_manifests(store, settings, id, period)?;
    for manifest in &manifests {
        let receipt = submission.submit(manifest)?;
        eprintln!(
            "Submitted {} [{}] -> {}",
            receipt.spec_id, receipt.period_label, receipt.reference
        );
    }
    Ok(manifests)
}

pub fn run_compare_all(
    results: &dyn ResultStore,
    output: Option<&Path>,
) -> Result<Vec<ComparisonRow>, FactoryError> {
    let summaries = results.load_summaries()?;
    if summaries.is_empty() {
        eprintln!("No backtest results found");
        return Ok(Vec::new());
    }
    let rows = rank_by_sharpe(&summaries);
    println!(
        "{:>4}  {:<24} {:<8} {:>8} {:>7} {:>8} {:>7}",
        "rank", "strategy", "period", "cagr", "sharpe", "max_dd", "orders"
    );
    for row in &rows {
        println!(
            "{:>4}  {:<24} {:<8} {:>7.2}% {:>7.2} {:>7.2}% {:>7}",
            row.rank,
            row.strategy_id,
            row.period_label,
            row.cagr * 100.0,
            row.sharpe,
            row.max_drawdown * 100.0,
            row.total_orders
        );
    }
    if let Some(path) = output {
        results.export_comparison(&rows, path)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(rows)
}

/// `id  name` lines for every stored spec.
pub fn list_specs(store: &dyn SpecStore) -> Result<Vec<String>, FactoryError> {
    let ids = store.list_ids()?;
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let report = store.load_many(&id_refs);
    let mut lines: Vec<String> = report
        .specs
        .iter()
        .map(|(id, spec)| format!("{:<24} {}", id, spec.name))
        .collect();
    for (id, err) in &report.failed {
        lines.push(format!("{:<24} (unreadable: {})", id, err));
    }
    lines.sort();
    Ok(lines)
}

pub fn show_spec(store: &dyn SpecStore, id: &str) -> Result<String, FactoryError> {
    let spec = store.load(id)?;
    let mut lines = vec![
        format!("{} ({})", spec.display_name(), spec.id),
        format!("universe:  {}", spec.universe.describe()),
        "indicators:".to_string(),
    ];
    for indicator in &spec.indicators {
        lines.push(format!(
            "  {} (warmup {})",
            indicator,
            indicator.warmup()
        ));
    }
    lines.push(format!("entry:     {}", spec.entry_conditions));
    lines.push(format!("exit:      {}", spec.exit_conditions));
    lines.push(format!("sizing:    {}", spec.risk.sizing));
    lines.push(format!("positions: {}", spec.risk.max_positions));
    if let Some(stop) = spec.risk.stop_loss_pct {
        lines.push(format!("stop loss: {:.2}%", stop * 100.0));
    }
    if let Some(days) = spec.risk.max_holding_days {
        lines.push(format!("max hold:  {} days", days));
    }
    lines.push(format!("rebalance: {}", spec.rebalance));
    lines.push(format!("period:    {}", spec.period));
    if !spec.description.is_empty() {
        lines.push(String::new());
        lines.push(spec.description.clone());
    }
    Ok(lines.join("\n"))
}

pub fn delete_spec(store: &dyn SpecStore, id: &str) -> Result<(), FactoryError> {
    if store.delete(id)? {
        Ok(())
    } else {
        Err(FactoryError::NotFound { id: id.to_string() })
    }
}
