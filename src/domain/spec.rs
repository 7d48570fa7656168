//! The strategy spec document.
//!
//! A `StrategySpec` is the declarative root: universe, named indicators,
//! entry/exit condition trees, risk parameters, rebalance schedule and
//! backtest period. It round-trips through JSON losslessly.

use crate::domain::condition::{ConditionGroup, IndicatorRef};
use crate::domain::error::FactoryError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::period::BacktestPeriod;
use crate::domain::risk::RiskSpec;
use crate::domain::schedule::RebalanceSchedule;
use crate::domain::universe::UniverseSpec;
use crate::domain::validation::{self, ValidationError};
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;

fn default_version() -> u32 {
    CURRENT_VERSION
}

/// Exit tree for documents that declare none: an empty `ANY`, which never fires.
fn default_exit_conditions() -> ConditionGroup {
    ConditionGroup::any(Vec::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub universe: UniverseSpec,
    #[serde(default)]
    pub indicators: IndicatorSet,
    pub entry_conditions: ConditionGroup,
    #[serde(default = "default_exit_conditions")]
    pub exit_conditions: ConditionGroup,
    pub risk: RiskSpec,
    pub rebalance: RebalanceSchedule,
    pub period: BacktestPeriod,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl StrategySpec {
    /// Parse a JSON document. Failures carry the JSON path of the offending field.
    pub fn from_json(text: &str) -> Result<Self, FactoryError> {
        let mut de = serde_json::Deserializer::from_str(text);
        let spec: StrategySpec = serde_path_to_error::deserialize(&mut de).map_err(|err| {
            FactoryError::SpecParse {
                path: err.path().to_string(),
                message: err.inner().to_string(),
            }
        })?;
        de.end().map_err(|err| FactoryError::SpecParse {
            path: ".".to_string(),
            message: err.to_string(),
        })?;
        Ok(spec)
    }

    pub fn to_json(&self) -> Result<String, FactoryError> {
        serde_json::to_string_pretty(self).map_err(|err| FactoryError::Encode {
            what: format!("spec {}", self.id),
            reason: err.to_string(),
        })
    }

    /// Every problem in the document; empty when the spec is compilable.
    pub fn validate(&self) -> Vec<ValidationError> {
        validation::validate_spec(self)
    }

    /// Indicator references from entry then exit conditions, duplicates included.
    pub fn indicator_refs(&self) -> Vec<&IndicatorRef> {
        let mut refs = self.entry_conditions.indicator_refs();
        refs.extend(self.exit_conditions.indicator_refs());
        refs
    }

    /// Display name, falling back to the id for unnamed specs.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::{Comparator, Condition, GroupLogic, Operand};
    use crate::domain::indicator::{IndicatorField, IndicatorKind};
    use crate::domain::schedule::{Frequency, SessionAnchor};
    use crate::domain::sizing::SizingPolicy;

    const DOCUMENT: &str = r#"{
        "id": "sector_momentum",
        "name": "Sector momentum",
        "universe": ["XLK", "XLF", "XLE", "XLV"],
        "indicators": [
            {"name": "sma_200", "kind": "sma", "lookback": 200},
            {"name": "macd", "kind": "macd", "fast": 12, "slow": 26, "signal": 9, "lookback": 26},
            {"name": "spy_trend", "kind": "ema", "source": "SPY", "lookback": 50}
        ],
        "entry_conditions": {"all": [
            {"left": "price", "comparator": ">", "right": "sma_200"},
            {"left": "macd.line", "comparator": "crosses_above", "right": "macd.signal"}
        ]},
        "exit_conditions": "ANY(LT(price, sma_200), CROSSES_BELOW(macd.line, macd.signal))",
        "risk": {
            "sizing": {"type": "tiered", "tiers": [{"count": 1, "weight": 0.4}, {"count": 2, "weight": 0.3}]},
            "max_positions": 3,
            "stop_loss_pct": 0.08
        },
        "rebalance": {"frequency": {"type": "monthly", "trading_day": 1}},
        "period": {"start": "2010-01-01", "end": "2024-12-31", "initial_capital": 250000}
    }"#;

    #[test]
    fn parses_full_document() {
        let spec = StrategySpec::from_json(DOCUMENT).unwrap();
        assert_eq!(spec.id, "sector_momentum");
        assert_eq!(spec.indicators.len(), 3);
        assert_eq!(spec.indicators.get("spy_trend").unwrap().source, "SPY");
        assert_eq!(spec.entry_conditions.logic, GroupLogic::All);
        assert_eq!(spec.exit_conditions.logic, GroupLogic::Any);
        assert_eq!(spec.exit_conditions.children.len(), 2);
        assert_eq!(spec.rebalance.frequency, Frequency::Monthly { trading_day: 1 });
        assert_eq!(spec.rebalance.offset.anchor, SessionAnchor::Open);
        assert_eq!(spec.period.initial_capital, 250_000.0);
        assert_eq!(spec.version, CURRENT_VERSION);
        assert!(spec.validate().is_empty());
    }

    #[test]
    fn expression_and_structured_forms_agree() {
        let spec = StrategySpec::from_json(DOCUMENT).unwrap();
        let expected = ConditionGroup::any(vec![
            Condition::new(Operand::Price, Comparator::Lt, Operand::indicator("sma_200")).into(),
            Condition::new(
                Operand::indicator_field("macd", IndicatorField::Line),
                Comparator::CrossesBelow,
                Operand::indicator_field("macd", IndicatorField::Signal),
            )
            .into(),
        ]);
        assert_eq!(spec.exit_conditions, expected);
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let spec = StrategySpec::from_json(DOCUMENT).unwrap();
        let text = spec.to_json().unwrap();
        let back = StrategySpec::from_json(&text).unwrap();
        assert_eq!(spec, back);
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let spec = StrategySpec::from_json(
            r#"{
                "id": "minimal",
                "universe": ["SPY"],
                "entry_conditions": {"all": []},
                "risk": {"sizing": {"type": "fixed_weight", "weight": 1.0}, "max_positions": 1},
                "rebalance": {"frequency": {"type": "daily"}},
                "period": {"start": "2020-01-01", "end": "2021-01-01"}
            }"#,
        )
        .unwrap();
        assert_eq!(spec.name, "");
        assert_eq!(spec.display_name(), "minimal");
        assert!(spec.indicators.is_empty());
        assert_eq!(spec.exit_conditions, ConditionGroup::any(vec![]));
        assert_eq!(spec.version, 1);
        assert_eq!(spec.risk.sizing, SizingPolicy::FixedWeight { weight: 1.0 });
        assert!(spec.validate().is_empty());
    }

    #[test]
    fn parse_error_reports_field_path() {
        let text = DOCUMENT.replace(r#""max_positions": 3"#, r#""max_positions": "three""#);
        match StrategySpec::from_json(&text) {
            Err(FactoryError::SpecParse { path, .. }) => assert_eq!(path, "risk.max_positions"),
            other => panic!("expected SpecParse, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_indicator_names_fail_to_parse() {
        let text = DOCUMENT.replace(
            r#"{"name": "spy_trend", "kind": "ema""#,
            r#"{"name": "sma_200", "kind": "ema""#,
        );
        match StrategySpec::from_json(&text) {
            Err(FactoryError::SpecParse { path, message }) => {
                assert_eq!(path, "indicators");
                assert!(message.contains("sma_200"), "{message}");
            }
            other => panic!("expected SpecParse, got {other:?}"),
        }
    }

    #[test]
    fn unknown_indicator_kind_fails_to_parse() {
        let text = DOCUMENT.replace(r#""kind": "sma""#, r#""kind": "vwap""#);
        assert!(matches!(
            StrategySpec::from_json(&text),
            Err(FactoryError::SpecParse { .. })
        ));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let text = format!("{} {{", DOCUMENT);
        assert!(matches!(
            StrategySpec::from_json(&text),
            Err(FactoryError::SpecParse { .. })
        ));
    }

    #[test]
    fn indicator_refs_cover_both_trees() {
        let spec = StrategySpec::from_json(DOCUMENT).unwrap();
        let names: Vec<&str> = spec.indicator_refs().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["sma_200", "macd", "macd", "sma_200", "macd", "macd"]);
        assert!(spec.indicators.get("macd").is_some());
        assert!(matches!(
            spec.indicators.get("macd").unwrap().kind,
            IndicatorKind::Macd { .. }
        ));
    }
}
