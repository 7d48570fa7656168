//! Strategy spec validation.
//!
//! Validation collects every problem in a document instead of stopping at
//! the first one, so a single pass reports all defects to the author.

use crate::domain::condition::{Condition, ConditionGroup, ConditionNode, Operand, PRICE_KEYWORD};
use crate::domain::indicator::{IndicatorField, IndicatorSet, MAX_LOOKBACK};
use crate::domain::risk::RiskSpec;
use crate::domain::sizing::SizingPolicy;
use crate::domain::spec::StrategySpec;
use crate::domain::universe::UniverseSpec;
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("{location}: references undeclared indicator '{name}'")]
    DanglingIndicator { name: String, location: String },

    #[error("{location}: indicator '{name}' has no field '{field}'")]
    UnknownField {
        name: String,
        field: IndicatorField,
        location: String,
    },

    #[error("{location}: constant must be finite")]
    NonFiniteConstant { location: String },

    #[error("universe is empty")]
    EmptyUniverse,

    #[error("universe lists symbol '{symbol}' more than once")]
    DuplicateSymbol { symbol: String },

    #[error("invalid universe filter: {reason}")]
    InvalidUniverseFilter { reason: String },

    #[error("invalid indicator name '{name}'")]
    InvalidIndicatorName { name: String },

    #[error("indicator '{name}': {reason}")]
    InvalidIndicator { name: String, reason: String },

    #[error("period start {start} must be before end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("initial capital must be positive, got {capital}")]
    InvalidCapital { capital: f64 },

    #[error("max_positions must be at least 1")]
    ZeroMaxPositions,

    #[error("invalid sizing: {reason}")]
    InvalidSizing { reason: String },

    #[error("sizing selects up to {selected} positions but max_positions is {max_positions}")]
    TierCountExceedsPositions {
        selected: usize,
        max_positions: usize,
    },

    #[error("stop_loss_pct must be between 0 and 1 exclusive, got {value}")]
    InvalidStopLoss { value: f64 },

    #[error("max_holding_days must be at least 1")]
    ZeroHoldingDays,

    #[error("invalid rebalance schedule: {reason}")]
    InvalidSchedule { reason: String },
}

pub fn validate_spec(spec: &StrategySpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_id(&spec.id, &mut errors);
    validate_universe(&spec.universe, &mut errors);
    validate_indicators(&spec.indicators, &mut errors);
    validate_conditions(
        "entry_conditions",
        &spec.entry_conditions,
        &spec.indicators,
        &mut errors,
    );
    validate_conditions(
        "exit_conditions",
        &spec.exit_conditions,
        &spec.indicators,
        &mut errors,
    );
    validate_risk(&spec.risk, &mut errors);
    for reason in spec.rebalance.problems() {
        errors.push(ValidationError::InvalidSchedule { reason });
    }
    if spec.period.start >= spec.period.end {
        errors.push(ValidationError::InvalidPeriod {
            start: spec.period.start,
            end: spec.period.end,
        });
    }
    if !(spec.period.initial_capital > 0.0) || !spec.period.initial_capital.is_finite() {
        errors.push(ValidationError::InvalidCapital {
            capital: spec.period.initial_capital,
        });
    }
    errors
}

/// Indicator names referenced by entry or exit conditions but not declared,
/// sorted and deduplicated.
pub fn missing_indicators(spec: &StrategySpec) -> Vec<String> {
    let missing: BTreeSet<String> = spec
        .entry_conditions
        .indicator_refs()
        .into_iter()
        .chain(spec.exit_conditions.indicator_refs())
        .filter(|r| !spec.indicators.contains(&r.name))
        .map(|r| r.name.clone())
        .collect();
    missing.into_iter().collect()
}

/// Ids name files in the spec store, so they are restricted to a
/// filesystem-safe token.
pub fn id_problem(id: &str) -> Option<String> {
    if id.is_empty() {
        return Some("id must not be empty".to_string());
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Some(format!("character '{}' is not allowed", c));
    }
    None
}

fn validate_id(id: &str, errors: &mut Vec<ValidationError>) {
    if let Some(reason) = id_problem(id) {
        errors.push(ValidationError::InvalidId {
            id: id.to_string(),
            reason,
        });
    }
}

fn validate_universe(universe: &UniverseSpec, errors: &mut Vec<ValidationError>) {
    if universe.is_empty() {
        errors.push(ValidationError::EmptyUniverse);
    }
    for symbol in universe.duplicates() {
        errors.push(ValidationError::DuplicateSymbol { symbol });
    }
    match universe {
        UniverseSpec::Fixed(symbols) => {
            if symbols.iter().any(|s| s.trim().is_empty()) {
                errors.push(ValidationError::InvalidUniverseFilter {
                    reason: "symbols must not be blank".to_string(),
                });
            }
        }
        UniverseSpec::Filtered(filter) => {
            if filter.base.trim().is_empty() {
                errors.push(ValidationError::InvalidUniverseFilter {
                    reason: "base universe must not be empty".to_string(),
                });
            }
            if let Some(p) = filter.min_price {
                if !(p >= 0.0) {
                    errors.push(ValidationError::InvalidUniverseFilter {
                        reason: format!("min_price must be non-negative, got {}", p),
                    });
                }
            }
            if let Some(v) = filter.min_dollar_volume {
                if !(v >= 0.0) {
                    errors.push(ValidationError::InvalidUniverseFilter {
                        reason: format!("min_dollar_volume must be non-negative, got {}", v),
                    });
                }
            }
        }
    }
}

fn is_valid_indicator_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name != PRICE_KEYWORD && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_indicators(indicators: &IndicatorSet, errors: &mut Vec<ValidationError>) {
    for spec in indicators {
        if !is_valid_indicator_name(&spec.name) {
            errors.push(ValidationError::InvalidIndicatorName {
                name: spec.name.clone(),
            });
        }
        if spec.lookback == 0 {
            errors.push(ValidationError::InvalidIndicator {
                name: spec.name.clone(),
                reason: "lookback must be at least 1".to_string(),
            });
        } else if spec.lookback > MAX_LOOKBACK {
            errors.push(ValidationError::InvalidIndicator {
                name: spec.name.clone(),
                reason: format!("lookback must not exceed {} bars", MAX_LOOKBACK),
            });
        }
        if spec.source.trim().is_empty() {
            errors.push(ValidationError::InvalidIndicator {
                name: spec.name.clone(),
                reason: "source must not be empty".to_string(),
            });
        }
        for reason in spec.kind.parameter_problems() {
            errors.push(ValidationError::InvalidIndicator {
                name: spec.name.clone(),
                reason,
            });
        }
    }
}

fn validate_conditions(
    root: &str,
    group: &ConditionGroup,
    indicators: &IndicatorSet,
    errors: &mut Vec<ValidationError>,
) {
    for (i, child) in group.children.iter().enumerate() {
        let location = format!("{}[{}]", root, i);
        match child {
            ConditionNode::Group(g) => validate_conditions(&location, g, indicators, errors),
            ConditionNode::Condition(c) => validate_condition(&location, c, indicators, errors),
        }
    }
}

fn validate_condition(
    location: &str,
    condition: &Condition,
    indicators: &IndicatorSet,
    errors: &mut Vec<ValidationError>,
) {
    for (side, operand) in [("left", &condition.left), ("right", &condition.right)] {
        let location = format!("{}.{}", location, side);
        match operand {
            Operand::Price => {}
            Operand::Constant(v) => {
                if !v.is_finite() {
                    errors.push(ValidationError::NonFiniteConstant { location });
                }
            }
            Operand::Indicator(r) => match indicators.get(&r.name) {
                None => errors.push(ValidationError::DanglingIndicator {
                    name: r.name.clone(),
                    location,
                }),
                Some(spec) => {
                    if let Some(field) = r.field {
                        if !spec.kind.fields().contains(&field) {
                            errors.push(ValidationError::UnknownField {
                                name: r.name.clone(),
                                field,
                                location,
                            });
                        }
                    }
                }
            },
        }
    }
}

fn validate_weight(weight: f64, what: &str, errors: &mut Vec<ValidationError>) {
    if !(weight > 0.0 && weight <= 1.0) {
        errors.push(ValidationError::InvalidSizing {
            reason: format!("{} must be in (0, 1], got {}", what, weight),
        });
    }
}

fn validate_risk(risk: &RiskSpec, errors: &mut Vec<ValidationError>) {
    if risk.max_positions == 0 {
        errors.push(ValidationError::ZeroMaxPositions);
    }
    match &risk.sizing {
        SizingPolicy::FixedWeight { weight } => validate_weight(*weight, "fixed weight", errors),
        SizingPolicy::EqualWeight {
            count,
            total_exposure,
        } => {
            if *count == 0 {
                errors.push(ValidationError::InvalidSizing {
                    reason: "equal_weight count must be at least 1".to_string(),
                });
            }
            validate_weight(*total_exposure, "total_exposure", errors);
        }
        SizingPolicy::Tiered { tiers } => {
            if tiers.is_empty() {
                errors.push(ValidationError::InvalidSizing {
                    reason: "tiered sizing needs at least one tier".to_string(),
                });
            }
            for (i, tier) in tiers.iter().enumerate() {
                if tier.count == 0 {
                    errors.push(ValidationError::InvalidSizing {
                        reason: format!("tier {} count must be at least 1", i),
                    });
                }
                validate_weight(tier.weight, &format!("tier {} weight", i), errors);
            }
        }
    }
    if let Some(selected) = risk.sizing.capacity() {
        if risk.max_positions > 0 && selected > risk.max_positions {
            errors.push(ValidationError::TierCountExceedsPositions {
                selected,
                max_positions: risk.max_positions,
            });
        }
    }
    if let Some(stop) = risk.stop_loss_pct {
        if !(stop > 0.0 && stop < 1.0) {
            errors.push(ValidationError::InvalidStopLoss { value: stop });
        }
    }
    if risk.max_holding_days == Some(0) {
        errors.push(ValidationError::ZeroHoldingDays);
    }
}
