//! Rebalance schedule descriptors.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes in a regular equity trading session.
pub const SESSION_MINUTES: u32 = 390;

/// Highest trading day a monthly schedule may name.
pub const MAX_MONTHLY_TRADING_DAY: u32 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly { weekday: Weekday },
    /// 1-based trading day of the month.
    Monthly { trading_day: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAnchor {
    /// Minutes after the open.
    Open,
    /// Minutes before the close.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOffset {
    pub anchor: SessionAnchor,
    pub minutes: u32,
}

impl Default for SessionOffset {
    fn default() -> Self {
        Self {
            anchor: SessionAnchor::Open,
            minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceSchedule {
    pub frequency: Frequency,
    #[serde(default)]
    pub offset: SessionOffset,
}

impl RebalanceSchedule {
    pub fn daily() -> Self {
        Self {
            frequency: Frequency::Daily,
            offset: SessionOffset::default(),
        }
    }

    pub fn weekly(weekday: Weekday) -> Self {
        Self {
            frequency: Frequency::Weekly { weekday },
            offset: SessionOffset::default(),
        }
    }

    pub fn monthly(trading_day: u32) -> Self {
        Self {
            frequency: Frequency::Monthly { trading_day },
            offset: SessionOffset::default(),
        }
    }

    /// Whether a rebalance falls on `date`, given the runtime's count of
    /// trading days elapsed in the month (1-based, including `date`).
    pub fn is_due(&self, date: NaiveDate, trading_day_of_month: u32) -> bool {
        match self.frequency {
            Frequency::Daily => true,
            Frequency::Weekly { weekday } => date.weekday() == weekday,
            Frequency::Monthly { trading_day } => trading_day_of_month == trading_day,
        }
    }

    /// Schedule problems; empty when the schedule is usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Frequency::Monthly { trading_day } = self.frequency {
            if trading_day == 0 || trading_day > MAX_MONTHLY_TRADING_DAY {
                problems.push(format!(
                    "monthly trading day must be between 1 and {}, got {}",
                    MAX_MONTHLY_TRADING_DAY, trading_day
                ));
            }
        }
        if self.offset.minutes > SESSION_MINUTES {
            problems.push(format!(
                "offset of {} minutes exceeds the {}-minute session",
                self.offset.minutes, SESSION_MINUTES
            ));
        }
        problems
    }
}

impl fmt::Display for RebalanceSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frequency {
            Frequency::Daily => write!(f, "daily")?,
            Frequency::Weekly { weekday } => write!(f, "weekly on {}", weekday)?,
            Frequency::Monthly { trading_day } => {
                write!(f, "monthly on trading day {}", trading_day)?
            }
        }
        match self.offset.anchor {
            SessionAnchor::Open => write!(f, ", {} min after open", self.offset.minutes),
            SessionAnchor::Close => write!(f, ", {} min before close", self.offset.minutes),
        }
    }
}
