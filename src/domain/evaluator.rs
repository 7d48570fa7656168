//! Condition evaluation over explicit bar snapshots.
//!
//! # Evaluation Semantics
//!
//! - Threshold comparators read the current bar only
//! - `crosses_above(a, b)`: `prev_a <= prev_b && a > b`, false with no previous bar
//! - `crosses_below(a, b)`: `prev_a >= prev_b && a < b`, false with no previous bar
//! - A missing indicator or NaN operand makes the comparison false
//! - `ALL` over no children is true, `ANY` over no children is false
//!
//! [`evaluate_group`] is the stateless reference evaluation: the caller passes
//! the previous bar explicitly. The compiled form in
//! [`compiler`](crate::domain::compiler) keeps that history itself.

use crate::domain::condition::{Comparator, Condition, ConditionGroup, ConditionNode, GroupLogic, Operand};
use crate::domain::indicator::{IndicatorField, IndicatorSet, IndicatorValue};
use std::collections::HashMap;

/// Everything a condition may read for one symbol on one bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSnapshot {
    pub price: f64,
    values: HashMap<String, IndicatorValue>,
}

impl BarSnapshot {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            values: HashMap::new(),
        }
    }

    /// Builder form of [`set`](Self::set) for a single-valued indicator.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, IndicatorValue::Simple(value));
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: IndicatorValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: IndicatorValue) {
        self.values.insert(name.into(), value);
    }

    pub fn value(&self, name: &str) -> Option<&IndicatorValue> {
        self.values.get(name)
    }

    /// One field of a named indicator; NaN when the indicator is absent.
    pub fn read(&self, name: &str, field: IndicatorField) -> f64 {
        self.value(name).map_or(f64::NAN, |v| v.field(field))
    }
}

/// Resolve an operand to a number on `bar`. References without an explicit
/// field read the declared kind's default field.
pub fn resolve_operand(operand: &Operand, indicators: &IndicatorSet, bar: &BarSnapshot) -> f64 {
    match operand {
        Operand::Price => bar.price,
        Operand::Constant(v) => *v,
        Operand::Indicator(r) => {
            let field = r.field.unwrap_or_else(|| {
                indicators
                    .get(&r.name)
                    .map_or(IndicatorField::Value, |spec| spec.kind.default_field())
            });
            bar.read(&r.name, field)
        }
    }
}

/// Threshold comparison. Crossing comparators are never true here.
pub fn compare(comparator: Comparator, left: f64, right: f64) -> bool {
    match comparator {
        Comparator::Gt => left > right,
        Comparator::Lt => left < right,
        Comparator::Gte => left >= right,
        Comparator::Lte => left <= right,
        Comparator::CrossesAbove | Comparator::CrossesBelow => false,
    }
}

/// Crossing test from the previous and current `(left, right)` pairs.
pub fn crossed(comparator: Comparator, previous: (f64, f64), current: (f64, f64)) -> bool {
    let (prev_left, prev_right) = previous;
    let (left, right) = current;
    match comparator {
        Comparator::CrossesAbove => prev_left <= prev_right && left > right,
        Comparator::CrossesBelow => prev_left >= prev_right && left < right,
        _ => false,
    }
}

pub fn evaluate_condition(
    condition: &Condition,
    indicators: &IndicatorSet,
    current: &BarSnapshot,
    previous: Option<&BarSnapshot>,
) -> bool {
    let pair = |bar: &BarSnapshot| {
        (
            resolve_operand(&condition.left, indicators, bar),
            resolve_operand(&condition.right, indicators, bar),
        )
    };
    let (left, right) = pair(current);
    if condition.comparator.is_crossing() {
        match previous {
            Some(prev) => crossed(condition.comparator, pair(prev), (left, right)),
            None => false,
        }
    } else {
        compare(condition.comparator, left, right)
    }
}

pub fn evaluate_group(
    group: &ConditionGroup,
    indicators: &IndicatorSet,
    current: &BarSnapshot,
    previous: Option<&BarSnapshot>,
) -> bool {
    let mut children = group.children.iter().map(|child| match child {
        ConditionNode::Condition(c) => evaluate_condition(c, indicators, current, previous),
        ConditionNode::Group(g) => evaluate_group(g, indicators, current, previous),
    });
    match group.logic {
        GroupLogic::All => children.all(|v| v),
        GroupLogic::Any => children.any(|v| v),
    }
}
