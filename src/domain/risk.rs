//! Risk parameters and position-level limits.

use crate::domain::sizing::SizingPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSpec {
    pub sizing: SizingPolicy,
    pub max_positions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_holding_days: Option<u32>,
}

impl RiskSpec {
    pub fn new(sizing: SizingPolicy, max_positions: usize) -> Self {
        Self {
            sizing,
            max_positions,
            stop_loss_pct: None,
            max_holding_days: None,
        }
    }

    pub fn limits(&self) -> RiskLimits {
        RiskLimits {
            max_positions: self.max_positions,
            stop_loss_pct: self.stop_loss_pct,
            max_holding_days: self.max_holding_days,
        }
    }
}

/// Limits read by the runtime's position-management loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub max_positions: usize,
    pub stop_loss_pct: Option<f64>,
    pub max_holding_days: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    MaxHoldingPeriod,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "exit signal"),
            ExitReason::StopLoss => write!(f, "stop loss"),
            ExitReason::MaxHoldingPeriod => write!(f, "max holding period"),
        }
    }
}

/// Position state for one symbol, owned and updated by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionState {
    pub held: bool,
    pub entry_price: Option<f64>,
    pub holding_days: u32,
}

impl PositionState {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn held(entry_price: f64, holding_days: u32) -> Self {
        Self {
            held: true,
            entry_price: Some(entry_price),
            holding_days,
        }
    }
}

impl RiskLimits {
    /// Limit breached by a held position at `price`, stop loss first.
    pub fn breach(&self, price: f64, position: &PositionState) -> Option<ExitReason> {
        if !position.held {
            return None;
        }
        if let (Some(stop), Some(entry)) = (self.stop_loss_pct, position.entry_price) {
            if price <= entry * (1.0 - stop) {
                return Some(ExitReason::StopLoss);
            }
        }
        if let Some(max_days) = self.max_holding_days {
            if position.holding_days >= max_days {
                return Some(ExitReason::MaxHoldingPeriod);
            }
        }
        None
    }
}
