//! Universe selection.
//!
//! A strategy trades either a fixed list of symbols or a filtered slice of a
//! named base universe that the platform resolves at run time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseFilter {
    /// Platform universe to filter, e.g. `us_equities`.
    pub base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_dollar_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl UniverseFilter {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            min_price: None,
            min_dollar_volume: None,
            max_size: None,
            exclude: Vec::new(),
        }
    }
}

/// Either a plain JSON array of symbols or a filter object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniverseSpec {
    Fixed(Vec<String>),
    Filtered(UniverseFilter),
}

impl UniverseSpec {
    pub fn fixed<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UniverseSpec::Fixed(symbols.into_iter().map(Into::into).collect())
    }

    /// True when the universe cannot select any symbol.
    pub fn is_empty(&self) -> bool {
        match self {
            UniverseSpec::Fixed(symbols) => symbols.is_empty(),
            UniverseSpec::Filtered(filter) => filter.max_size == Some(0),
        }
    }

    pub fn symbols(&self) -> Option<&[String]> {
        match self {
            UniverseSpec::Fixed(symbols) => Some(symbols),
            UniverseSpec::Filtered(_) => None,
        }
    }

    /// Symbols listed more than once in a fixed universe, in first-repeat order.
    pub fn duplicates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        if let UniverseSpec::Fixed(symbols) = self {
            for symbol in symbols {
                let key = symbol.to_uppercase();
                if !seen.insert(key) && !dupes.contains(symbol) {
                    dupes.push(symbol.clone());
                }
            }
        }
        dupes
    }

    pub fn describe(&self) -> String {
        match self {
            UniverseSpec::Fixed(symbols) => symbols.join(", "),
            UniverseSpec::Filtered(filter) => {
                let mut parts = vec![filter.base.clone()];
                if let Some(p) = filter.min_price {
                    parts.push(format!("price >= {}", p));
                }
                if let Some(v) = filter.min_dollar_volume {
                    parts.push(format!("dollar volume >= {}", v));
                }
                if let Some(n) = filter.max_size {
                    parts.push(format!("top {}", n));
                }
                if !filter.exclude.is_empty() {
                    parts.push(format!("excluding {}", filter.exclude.join(", ")));
                }
                parts.join(", ")
            }
        }
    }
}
