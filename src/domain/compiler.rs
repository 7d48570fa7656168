//! Strategy compilation.
//!
//! `compile` turns a validated [`StrategySpec`] into a [`CompiledStrategy`]:
//! an immutable unit the backtest runtime drives bar by bar. Crossing
//! conditions need the previous bar's operand values; that history lives in
//! a caller-owned [`EvalState`], one slot per distinct crossing condition.
//! Every slot is advanced on every bar before the boolean trees are
//! evaluated, so evaluation order and short-circuiting never change results.

use crate::domain::condition::{Comparator, Condition, ConditionGroup, ConditionNode, GroupLogic, Operand};
use crate::domain::error::FactoryError;
use crate::domain::evaluator::{compare, crossed, BarSnapshot};
use crate::domain::indicator::{IndicatorField, IndicatorSet, IndicatorSpec};
use crate::domain::period::BacktestPeriod;
use crate::domain::risk::{ExitReason, PositionState, RiskLimits};
use crate::domain::schedule::RebalanceSchedule;
use crate::domain::sizing::{SizingPolicy, TargetWeight};
use crate::domain::spec::StrategySpec;
use crate::domain::universe::UniverseSpec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
enum CompiledOperand {
    Price,
    Constant(f64),
    Indicator { name: String, field: IndicatorField },
}

impl CompiledOperand {
    fn resolve(&self, bar: &BarSnapshot) -> f64 {
        match self {
            CompiledOperand::Price => bar.price,
            CompiledOperand::Constant(v) => *v,
            CompiledOperand::Indicator { name, field } => bar.read(name, *field),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CrossingSlot {
    left: CompiledOperand,
    comparator: Comparator,
    right: CompiledOperand,
}

#[derive(Debug, Clone, PartialEq)]
enum CompiledNode {
    Compare {
        left: CompiledOperand,
        comparator: Comparator,
        right: CompiledOperand,
    },
    Cross {
        slot: usize,
    },
    All(Vec<CompiledNode>),
    Any(Vec<CompiledNode>),
}

impl CompiledNode {
    fn evaluate(&self, bar: &BarSnapshot, crossings: &[bool]) -> bool {
        match self {
            CompiledNode::Compare {
                left,
                comparator,
                right,
            } => compare(*comparator, left.resolve(bar), right.resolve(bar)),
            CompiledNode::Cross { slot } => crossings.get(*slot).copied().unwrap_or(false),
            CompiledNode::All(children) => children.iter().all(|c| c.evaluate(bar, crossings)),
            CompiledNode::Any(children) => children.iter().any(|c| c.evaluate(bar, crossings)),
        }
    }
}

/// Per-symbol evaluation history owned by the runtime.
///
/// Create one with [`CompiledStrategy::new_state`] for every symbol the
/// strategy evaluates and pass it to each `on_bar` call in bar order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalState {
    previous: Vec<Option<(f64, f64)>>,
    bars_seen: u64,
}

impl EvalState {
    pub fn bars_seen(&self) -> u64 {
        self.bars_seen
    }
}

/// Entry and exit predicate results for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub entry: bool,
    pub exit: bool,
}

/// What the runtime should do with one symbol after one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarDecision {
    pub enter: bool,
    pub exit: bool,
    pub exit_reason: Option<ExitReason>,
    /// Target weight for a new entry, before cross-sectional ranking.
    pub target_weight: Option<f64>,
}

impl BarDecision {
    fn hold() -> Self {
        Self {
            enter: false,
            exit: false,
            exit_reason: None,
            target_weight: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDeclaration {
    #[serde(flatten)]
    pub spec: IndicatorSpec,
    pub warmup: usize,
}

/// Declarative description of a compiled strategy, read once by the
/// runtime at setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyManifest {
    pub spec_id: String,
    pub name: String,
    pub version: u32,
    pub period_label: String,
    pub universe: UniverseSpec,
    pub indicators: Vec<IndicatorDeclaration>,
    pub warmup_bars: usize,
    pub entry: String,
    pub exit: String,
    pub sizing: SizingPolicy,
    pub limits: RiskLimits,
    pub rebalance: RebalanceSchedule,
    pub period: BacktestPeriod,
}

impl StrategyManifest {
    pub fn to_json(&self) -> Result<String, FactoryError> {
        serde_json::to_string_pretty(self).map_err(|err| FactoryError::Encode {
            what: format!("manifest {}", self.spec_id),
            reason: err.to_string(),
        })
    }

    /// Same strategy over a different date range, e.g. a train or test slice.
    pub fn for_period(&self, period: BacktestPeriod, label: impl Into<String>) -> Self {
        Self {
            period,
            period_label: label.into(),
            ..self.clone()
        }
    }
}

pub const FULL_PERIOD_LABEL: &str = "full";

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStrategy {
    spec_id: String,
    name: String,
    version: u32,
    universe: UniverseSpec,
    indicators: Vec<IndicatorDeclaration>,
    entry: CompiledNode,
    exit: CompiledNode,
    entry_expression: String,
    exit_expression: String,
    slots: Vec<CrossingSlot>,
    sizing: SizingPolicy,
    limits: RiskLimits,
    rebalance: RebalanceSchedule,
    period: BacktestPeriod,
}

/// Validate and compile a spec.
///
/// Any validation problem fails compilation with the complete list; see
/// [`FactoryError::missing_indicators`] for the undeclared indicator names.
pub fn compile(spec: &StrategySpec) -> Result<CompiledStrategy, FactoryError> {
    let errors = spec.validate();
    if !errors.is_empty() {
        debug!(spec_id = %spec.id, errors = errors.len(), "spec rejected");
        return Err(FactoryError::SpecValidation {
            spec_id: spec.id.clone(),
            errors,
        });
    }

    let mut builder = TreeBuilder {
        spec_id: &spec.id,
        indicators: &spec.indicators,
        slots: Vec::new(),
    };
    let entry = builder.group(&spec.entry_conditions)?;
    let exit = builder.group(&spec.exit_conditions)?;
    let slots = builder.slots;

    let indicators: Vec<IndicatorDeclaration> = spec
        .indicators
        .iter()
        .map(|s| IndicatorDeclaration {
            spec: s.clone(),
            warmup: s.warmup(),
        })
        .collect();

    debug!(
        spec_id = %spec.id,
        indicators = indicators.len(),
        crossing_slots = slots.len(),
        "compiled strategy"
    );

    Ok(CompiledStrategy {
        spec_id: spec.id.clone(),
        name: spec.display_name().to_string(),
        version: spec.version,
        universe: spec.universe.clone(),
        indicators,
        entry,
        exit,
        entry_expression: spec.entry_conditions.to_string(),
        exit_expression: spec.exit_conditions.to_string(),
        slots,
        sizing: spec.risk.sizing.clone(),
        limits: spec.risk.limits(),
        rebalance: spec.rebalance,
        period: spec.period.clone(),
    })
}

struct TreeBuilder<'a> {
    spec_id: &'a str,
    indicators: &'a IndicatorSet,
    slots: Vec<CrossingSlot>,
}

impl TreeBuilder<'_> {
    fn group(&mut self, group: &ConditionGroup) -> Result<CompiledNode, FactoryError> {
        let children = group
            .children
            .iter()
            .map(|child| match child {
                ConditionNode::Condition(c) => self.condition(c),
                ConditionNode::Group(g) => self.group(g),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match group.logic {
            GroupLogic::All => CompiledNode::All(children),
            GroupLogic::Any => CompiledNode::Any(children),
        })
    }

    fn condition(&mut self, condition: &Condition) -> Result<CompiledNode, FactoryError> {
        let left = self.operand(&condition.left)?;
        let right = self.operand(&condition.right)?;
        if !condition.comparator.is_crossing() {
            return Ok(CompiledNode::Compare {
                left,
                comparator: condition.comparator,
                right,
            });
        }
        let slot = CrossingSlot {
            left,
            comparator: condition.comparator,
            right,
        };
        let index = match self.slots.iter().position(|s| *s == slot) {
            Some(i) => i,
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        Ok(CompiledNode::Cross { slot: index })
    }

    fn operand(&self, operand: &Operand) -> Result<CompiledOperand, FactoryError> {
        match operand {
            Operand::Price => Ok(CompiledOperand::Price),
            Operand::Constant(v) => Ok(CompiledOperand::Constant(*v)),
            Operand::Indicator(r) => {
                let spec = self
                    .indicators
                    .get(&r.name)
                    .ok_or_else(|| FactoryError::CompilerInternal {
                        spec_id: self.spec_id.to_string(),
                        reason: format!("indicator '{}' vanished after validation", r.name),
                    })?;
                Ok(CompiledOperand::Indicator {
                    name: r.name.clone(),
                    field: r.field.unwrap_or_else(|| spec.kind.default_field()),
                })
            }
        }
    }
}

impl CompiledStrategy {
    pub fn spec_id(&self) -> &str {
        &self.spec_id
    }

    pub fn indicators(&self) -> &[IndicatorDeclaration] {
        &self.indicators
    }

    pub fn limits(&self) -> RiskLimits {
        self.limits
    }

    pub fn rebalance(&self) -> &RebalanceSchedule {
        &self.rebalance
    }

    pub fn period(&self) -> &BacktestPeriod {
        &self.period
    }

    /// Bars of history needed before every declared indicator is valid.
    pub fn warmup_bars(&self) -> usize {
        self.indicators.iter().map(|d| d.warmup).max().unwrap_or(0)
    }

    /// Number of distinct crossing conditions tracked per symbol.
    pub fn crossing_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn new_state(&self) -> EvalState {
        EvalState {
            previous: vec![None; self.slots.len()],
            bars_seen: 0,
        }
    }

    /// Advance every crossing slot to `bar` and return this bar's crossing results.
    fn advance(&self, state: &mut EvalState, bar: &BarSnapshot) -> Vec<bool> {
        if state.previous.len() != self.slots.len() {
            warn!(
                spec_id = %self.spec_id,
                expected = self.slots.len(),
                found = state.previous.len(),
                "evaluation state does not match strategy, resetting"
            );
            *state = self.new_state();
        }
        let crossings = self
            .slots
            .iter()
            .zip(state.previous.iter_mut())
            .map(|(slot, previous)| {
                let current = (slot.left.resolve(bar), slot.right.resolve(bar));
                let fired = match *previous {
                    Some(prev) => crossed(slot.comparator, prev, current),
                    None => false,
                };
                *previous = Some(current);
                fired
            })
            .collect();
        state.bars_seen += 1;
        crossings
    }

    /// Evaluate both predicates for one bar, advancing the crossing history.
    pub fn evaluate(&self, state: &mut EvalState, bar: &BarSnapshot) -> Signals {
        let crossings = self.advance(state, bar);
        Signals {
            entry: self.entry.evaluate(bar, &crossings),
            exit: self.exit.evaluate(bar, &crossings),
        }
    }

    /// Per-symbol decision for one bar.
    ///
    /// A held position is checked against the stop loss and holding period
    /// before the exit predicate. A flat symbol enters when the entry
    /// predicate holds, sized at the top-rank weight.
    pub fn on_bar(
        &self,
        state: &mut EvalState,
        bar: &BarSnapshot,
        position: &PositionState,
    ) -> BarDecision {
        let signals = self.evaluate(state, bar);
        let mut decision = BarDecision::hold();
        if position.held {
            if let Some(reason) = self.limits.breach(bar.price, position) {
                decision.exit = true;
                decision.exit_reason = Some(reason);
            } else if signals.exit {
                decision.exit = true;
                decision.exit_reason = Some(ExitReason::Signal);
            }
        } else if signals.entry {
            decision.enter = true;
            decision.target_weight = Some(self.sizing.weight_at_rank(0));
        }
        decision
    }

    /// Target weights for a ranked candidate list (best first). At most
    /// `max_positions` candidates receive a non-zero weight.
    pub fn target_weights<S: AsRef<str>>(&self, ranked: &[S]) -> Vec<TargetWeight> {
        let mut selected = 0usize;
        let mut weights = self.sizing.weights(ranked);
        for target in &mut weights {
            if target.weight > 0.0 {
                if selected >= self.limits.max_positions {
                    target.weight = 0.0;
                } else {
                    selected += 1;
                }
            }
        }
        weights
    }

    pub fn manifest(&self) -> StrategyManifest {
        StrategyManifest {
            spec_id: self.spec_id.clone(),
            name: self.name.clone(),
            version: self.version,
            period_label: FULL_PERIOD_LABEL.to_string(),
            universe: self.universe.clone(),
            indicators: self.indicators.clone(),
            warmup_bars: self.warmup_bars(),
            entry: self.entry_expression.clone(),
            exit: self.exit_expression.clone(),
            sizing: self.sizing.clone(),
            limits: self.limits,
            rebalance: self.rebalance,
            period: self.period.clone(),
        }
    }
}
