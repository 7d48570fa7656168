#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use strategy_factory::domain::compiler::StrategyManifest;
use strategy_factory::domain::condition_parser;
use strategy_factory::domain::error::FactoryError;
use strategy_factory::domain::evaluator::BarSnapshot;
use strategy_factory::domain::indicator::{IndicatorKind, IndicatorSet, IndicatorSpec};
use strategy_factory::domain::period::BacktestPeriod;
use strategy_factory::domain::risk::RiskSpec;
use strategy_factory::domain::schedule::RebalanceSchedule;
use strategy_factory::domain::sizing::SizingPolicy;
use strategy_factory::domain::spec::StrategySpec;
use strategy_factory::domain::universe::UniverseSpec;
use strategy_factory::ports::spec_store::SpecStore;
use strategy_factory::ports::submission_port::{SubmissionPort, SubmissionReceipt};

/// In-memory spec store. Ids listed in `broken` fail to load with a parse error.
pub struct MemoryStore {
    pub specs: RefCell<BTreeMap<String, StrategySpec>>,
    pub broken: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            specs: RefCell::new(BTreeMap::new()),
            broken: HashMap::new(),
        }
    }

    pub fn with_spec(self, spec: StrategySpec) -> Self {
        self.specs.borrow_mut().insert(spec.id.clone(), spec);
        self
    }

    pub fn with_broken(mut self, id: &str, message: &str) -> Self {
        self.broken.insert(id.to_string(), message.to_string());
        self
    }
}

impl SpecStore for MemoryStore {
    fn save(&self, spec: &StrategySpec) -> Result<PathBuf, FactoryError> {
        self.specs
            .borrow_mut()
            .insert(spec.id.clone(), spec.clone());
        Ok(PathBuf::from(format!("memory://{}", spec.id)))
    }

    fn load(&self, id: &str) -> Result<StrategySpec, FactoryError> {
        if let Some(message) = self.broken.get(id) {
            return Err(FactoryError::SpecParse {
                path: ".".to_string(),
                message: message.clone(),
            });
        }
        self.specs
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| FactoryError::NotFound { id: id.to_string() })
    }

    fn list_ids(&self) -> Result<BTreeSet<String>, FactoryError> {
        let mut ids: BTreeSet<String> = self.specs.borrow().keys().cloned().collect();
        ids.extend(self.broken.keys().cloned());
        Ok(ids)
    }

    fn delete(&self, id: &str) -> Result<bool, FactoryError> {
        Ok(self.specs.borrow_mut().remove(id).is_some())
    }
}

/// Submission port that records manifests, or rejects them all.
pub struct RecordingSubmission {
    pub submitted: RefCell<Vec<StrategyManifest>>,
    pub reject_with: Option<String>,
}

impl RecordingSubmission {
    pub fn new() -> Self {
        Self {
            submitted: RefCell::new(Vec::new()),
            reject_with: None,
        }
    }

    pub fn rejecting(reason: &str) -> Self {
        Self {
            submitted: RefCell::new(Vec::new()),
            reject_with: Some(reason.to_string()),
        }
    }
}

impl SubmissionPort for RecordingSubmission {
    fn submit(&self, manifest: &StrategyManifest) -> Result<SubmissionReceipt, FactoryError> {
        if let Some(reason) = &self.reject_with {
            return Err(FactoryError::RemoteSubmission {
                reason: reason.clone(),
            });
        }
        self.submitted.borrow_mut().push(manifest.clone());
        Ok(SubmissionReceipt {
            spec_id: manifest.spec_id.clone(),
            period_label: manifest.period_label.clone(),
            reference: format!("queue://{}", self.submitted.borrow().len()),
        })
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Trend-following spec over two ETFs with a moving-average crossover entry.
pub fn sample_spec(id: &str) -> StrategySpec {
    let mut indicators = IndicatorSet::new();
    indicators
        .insert(IndicatorSpec::new("fast", IndicatorKind::Ema, 20))
        .unwrap();
    indicators
        .insert(IndicatorSpec::new("slow", IndicatorKind::Sma, 50))
        .unwrap();
    indicators
        .insert(IndicatorSpec::new("rsi", IndicatorKind::Rsi, 14))
        .unwrap();
    StrategySpec {
        id: id.to_string(),
        name: format!("{} crossover", id),
        description: "EMA/SMA crossover with RSI filter".to_string(),
        universe: UniverseSpec::fixed(["SPY", "QQQ"]),
        indicators,
        entry_conditions: condition_parser::parse("ALL(CROSSES_ABOVE(fast, slow), LT(rsi, 70))")
            .unwrap(),
        exit_conditions: condition_parser::parse("ANY(CROSSES_BELOW(fast, slow), GT(rsi, 85))")
            .unwrap(),
        risk: RiskSpec::new(SizingPolicy::equal_weight(2), 2),
        rebalance: RebalanceSchedule::daily(),
        period: BacktestPeriod::new(date("2015-01-01"), date("2023-01-01")),
        version: 1,
    }
}

pub const SAMPLE_JSON: &str = r#"{
    "id": "sector_rotation",
    "name": "Sector rotation",
    "universe": {"base": "us_sector_etfs", "min_dollar_volume": 5000000, "max_size": 11},
    "indicators": [
        {"name": "mom", "kind": "roc", "lookback": 126},
        {"name": "trend", "kind": "sma", "lookback": 200},
        {"name": "bands", "kind": "bollinger", "multiplier": 2.0, "lookback": 20}
    ],
    "entry_conditions": "ALL(GT(mom, 0), GT(price, trend), LT(price, bands.upper))",
    "exit_conditions": {"any": [
        {"left": "price", "comparator": "<", "right": "trend"},
        {"left": "mom", "comparator": "crosses_below", "right": 0}
    ]},
    "risk": {
        "sizing": {"type": "tiered", "tiers": [{"count": 3, "weight": 0.15}, {"count": 7, "weight": 0.07}]},
        "max_positions": 10,
        "max_holding_days": 90
    },
    "rebalance": {"frequency": {"type": "monthly", "trading_day": 1}, "offset": {"anchor": "open", "minutes": 30}},
    "period": {"start": "2012-01-01", "end": "2024-01-01", "initial_capital": 500000}
}"#;

pub fn snapshot(price: f64, fast: f64, slow: f64, rsi: f64) -> BarSnapshot {
    BarSnapshot::new(price)
        .with("fast", fast)
        .with("slow", slow)
        .with("rsi", rsi)
}
