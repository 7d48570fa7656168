//! Indicator declarations.
//!
//! This module provides types for declaring the indicators a strategy needs:
//! - `IndicatorKind`: closed set of indicator kinds with their kind-specific parameters
//! - `IndicatorSpec`: a named indicator declaration (kind, source, lookback)
//! - `IndicatorSet`: ordered, name-unique collection of declarations
//! - `IndicatorField`: which output of a multi-value indicator to read
//! - `IndicatorValue`: one materialised indicator reading supplied by the runtime

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source reference meaning "the symbol currently being evaluated".
pub const SELF_SOURCE: &str = "self";

/// Longest lookback or period, in bars, a declaration may ask for.
pub const MAX_LOOKBACK: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaType {
    Simple,
    Exponential,
}

fn default_keltner_ma() -> MaType {
    MaType::Exponential
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Atr,
    Bollinger {
        multiplier: f64,
    },
    Roc,
    RollingMax,
    RollingMin,
    Adx,
    Keltner {
        multiplier: f64,
        #[serde(default = "default_keltner_ma")]
        ma: MaType,
    },
}

impl IndicatorKind {
    /// Output fields a condition may read from this kind.
    pub fn fields(&self) -> &'static [IndicatorField] {
        match self {
            IndicatorKind::Macd { .. } => &[
                IndicatorField::Line,
                IndicatorField::Signal,
                IndicatorField::Histogram,
            ],
            IndicatorKind::Bollinger { .. } | IndicatorKind::Keltner { .. } => &[
                IndicatorField::Upper,
                IndicatorField::Middle,
                IndicatorField::Lower,
            ],
            IndicatorKind::Adx => &[
                IndicatorField::Value,
                IndicatorField::PlusDi,
                IndicatorField::MinusDi,
            ],
            IndicatorKind::Sma
            | IndicatorKind::Ema
            | IndicatorKind::Rsi
            | IndicatorKind::Atr
            | IndicatorKind::Roc
            | IndicatorKind::RollingMax
            | IndicatorKind::RollingMin => &[IndicatorField::Value],
        }
    }

    /// Field read when a condition names the indicator without a field.
    pub fn default_field(&self) -> IndicatorField {
        match self {
            IndicatorKind::Macd { .. } => IndicatorField::Line,
            IndicatorKind::Bollinger { .. } | IndicatorKind::Keltner { .. } => {
                IndicatorField::Middle
            }
            _ => IndicatorField::Value,
        }
    }

    /// Kind-specific parameter problems, independent of the lookback.
    pub fn parameter_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        match self {
            IndicatorKind::Macd { fast, slow, signal } => {
                if *fast == 0 || *slow == 0 || *signal == 0 {
                    problems.push("MACD periods must be at least 1".to_string());
                }
                if [fast, slow, signal].iter().any(|p| **p > MAX_LOOKBACK) {
                    problems.push(format!("MACD periods must not exceed {} bars", MAX_LOOKBACK));
                }
                if fast >= slow {
                    problems.push(format!(
                        "MACD fast period {} must be shorter than slow period {}",
                        fast, slow
                    ));
                }
            }
            IndicatorKind::Bollinger { multiplier } | IndicatorKind::Keltner { multiplier, .. } => {
                if !multiplier.is_finite() || *multiplier <= 0.0 {
                    problems.push(format!("multiplier must be positive, got {}", multiplier));
                }
            }
            _ => {}
        }
        problems
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma => write!(f, "SMA"),
            IndicatorKind::Ema => write!(f, "EMA"),
            IndicatorKind::Rsi => write!(f, "RSI"),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Atr => write!(f, "ATR"),
            IndicatorKind::Bollinger { multiplier } => write!(f, "BOLLINGER(x{})", multiplier),
            IndicatorKind::Roc => write!(f, "ROC"),
            IndicatorKind::RollingMax => write!(f, "ROLLING_MAX"),
            IndicatorKind::RollingMin => write!(f, "ROLLING_MIN"),
            IndicatorKind::Adx => write!(f, "ADX"),
            IndicatorKind::Keltner { multiplier, ma } => {
                let ma = match ma {
                    MaType::Simple => "SMA",
                    MaType::Exponential => "EMA",
                };
                write!(f, "KELTNER(x{},{})", multiplier, ma)
            }
        }
    }
}

fn default_source() -> String {
    SELF_SOURCE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: IndicatorKind,
    #[serde(default = "default_source")]
    pub source: String,
    pub lookback: usize,
}

impl IndicatorSpec {
    pub fn new(name: impl Into<String>, kind: IndicatorKind, lookback: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            source: default_source(),
            lookback,
        }
    }

    pub fn on_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Bars of history the runtime needs before this indicator reads valid.
    pub fn warmup(&self) -> usize {
        match self.kind {
            IndicatorKind::Rsi | IndicatorKind::Roc => self.lookback.saturating_add(1),
            IndicatorKind::Macd { slow, signal, .. } => {
                self.lookback.max(slow.saturating_add(signal))
            }
            IndicatorKind::Adx => self.lookback.saturating_mul(2),
            _ => self.lookback,
        }
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {}[{}] on {}",
            self.name, self.kind, self.lookback, self.source
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("duplicate indicator name: {0}")]
pub struct DuplicateIndicator(pub String);

/// Ordered mapping from indicator name to declaration.
///
/// Names are unique: inserting an existing name is an error rather than an
/// overwrite, and a document listing a name twice fails to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<IndicatorSpec>", into = "Vec<IndicatorSpec>")]
pub struct IndicatorSet {
    specs: Vec<IndicatorSpec>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: IndicatorSpec) -> Result<(), DuplicateIndicator> {
        if self.contains(&spec.name) {
            return Err(DuplicateIndicator(spec.name));
        }
        self.specs.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndicatorSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl TryFrom<Vec<IndicatorSpec>> for IndicatorSet {
    type Error = DuplicateIndicator;

    fn try_from(specs: Vec<IndicatorSpec>) -> Result<Self, Self::Error> {
        let mut set = IndicatorSet::new();
        for spec in specs {
            set.insert(spec)?;
        }
        Ok(set)
    }
}

impl From<IndicatorSet> for Vec<IndicatorSpec> {
    fn from(set: IndicatorSet) -> Self {
        set.specs
    }
}

impl<'a> IntoIterator for &'a IndicatorSet {
    type Item = &'a IndicatorSpec;
    type IntoIter = std::slice::Iter<'a, IndicatorSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorField {
    Value,
    Line,
    Signal,
    Histogram,
    Upper,
    Middle,
    Lower,
    PlusDi,
    MinusDi,
}

impl IndicatorField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorField::Value => "value",
            IndicatorField::Line => "line",
            IndicatorField::Signal => "signal",
            IndicatorField::Histogram => "histogram",
            IndicatorField::Upper => "upper",
            IndicatorField::Middle => "middle",
            IndicatorField::Lower => "lower",
            IndicatorField::PlusDi => "plus_di",
            IndicatorField::MinusDi => "minus_di",
        }
    }
}

impl fmt::Display for IndicatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value" => Ok(IndicatorField::Value),
            "line" => Ok(IndicatorField::Line),
            "signal" => Ok(IndicatorField::Signal),
            "histogram" => Ok(IndicatorField::Histogram),
            "upper" => Ok(IndicatorField::Upper),
            "middle" => Ok(IndicatorField::Middle),
            "lower" => Ok(IndicatorField::Lower),
            "plus_di" => Ok(IndicatorField::PlusDi),
            "minus_di" => Ok(IndicatorField::MinusDi),
            other => Err(format!("unknown indicator field '{}'", other)),
        }
    }
}

/// One materialised indicator reading for the current bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bands {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Adx {
        value: f64,
        plus_di: f64,
        minus_di: f64,
    },
}

impl IndicatorValue {
    /// Read one field; a field the value shape does not carry reads as NaN.
    pub fn field(&self, field: IndicatorField) -> f64 {
        match (self, field) {
            (IndicatorValue::Simple(v), IndicatorField::Value) => *v,
            (IndicatorValue::Macd { line, .. }, IndicatorField::Line) => *line,
            (IndicatorValue::Macd { signal, .. }, IndicatorField::Signal) => *signal,
            (IndicatorValue::Macd { histogram, .. }, IndicatorField::Histogram) => *histogram,
            (IndicatorValue::Bands { upper, .. }, IndicatorField::Upper) => *upper,
            (IndicatorValue::Bands { middle, .. }, IndicatorField::Middle) => *middle,
            (IndicatorValue::Bands { lower, .. }, IndicatorField::Lower) => *lower,
            (IndicatorValue::Adx { value, .. }, IndicatorField::Value) => *value,
            (IndicatorValue::Adx { plus_di, .. }, IndicatorField::PlusDi) => *plus_di,
            (IndicatorValue::Adx { minus_di, .. }, IndicatorField::MinusDi) => *minus_di,
            _ => f64::NAN,
        }
    }
}
