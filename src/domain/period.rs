//! Backtest date ranges and train/test/walk-forward slicing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

fn default_initial_capital() -> f64 {
    DEFAULT_INITIAL_CAPITAL
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
}

impl BacktestPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Train and test halves; both share the boundary date and each spans
    /// at least one day.
    ///
    /// Returns `None` when the period is shorter than two days or
    /// `train_fraction` is not strictly between 0 and 1.
    pub fn split(&self, train_fraction: f64) -> Option<(BacktestPeriod, BacktestPeriod)> {
        let days = self.days();
        if !(train_fraction > 0.0 && train_fraction < 1.0) || days < 2 {
            return None;
        }
        let train_days = (days as f64 * train_fraction).round() as i64;
        let boundary = self.start + chrono::Duration::days(train_days.clamp(1, days - 1));
        let train = BacktestPeriod {
            start: self.start,
            end: boundary,
            initial_capital: self.initial_capital,
        };
        let test = BacktestPeriod {
            start: boundary,
            end: self.end,
            initial_capital: self.initial_capital,
        };
        Some((train, test))
    }

    /// Consecutive windows of near-equal length covering the period.
    /// The last window absorbs any remainder. Never more windows than days,
    /// so no window is empty.
    pub fn walk_forward(&self, windows: usize) -> Vec<BacktestPeriod> {
        let total = self.days();
        if windows == 0 || total <= 0 {
            return Vec::new();
        }
        let windows = windows.min(total as usize);
        let step = total / windows as i64;
        (0..windows)
            .map(|i| {
                let start = self.start + chrono::Duration::days(step * i as i64);
                let end = if i + 1 == windows {
                    self.end
                } else {
                    self.start + chrono::Duration::days(step * (i as i64 + 1))
                };
                BacktestPeriod {
                    start,
                    end,
                    initial_capital: self.initial_capital,
                }
            })
            .collect()
    }
}

impl fmt::Display for BacktestPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {} (capital {:.2})",
            self.start, self.end, self.initial_capital
        )
    }
}
