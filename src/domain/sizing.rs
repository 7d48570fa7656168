//! Position sizing policies.
//!
//! Sizing consumes an externally ranked candidate list (best first) and
//! assigns each candidate a target portfolio weight. The ranking itself is
//! not defined here.

use serde::{Deserialize, Serialize};
use std::fmt;

fn default_total_exposure() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub count: usize,
    pub weight: f64,
}

impl Tier {
    pub fn new(count: usize, weight: f64) -> Self {
        Self { count, weight }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Every selected candidate gets `weight`; callers cap total exposure.
    FixedWeight { weight: f64 },
    /// The top `count` candidates each get `total_exposure / count`.
    EqualWeight {
        count: usize,
        #[serde(default = "default_total_exposure")]
        total_exposure: f64,
    },
    /// Rank bands with literal weights; ranks past the last band get 0.
    Tiered { tiers: Vec<Tier> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetWeight {
    pub symbol: String,
    pub weight: f64,
}

impl SizingPolicy {
    pub fn equal_weight(count: usize) -> Self {
        SizingPolicy::EqualWeight {
            count,
            total_exposure: default_total_exposure(),
        }
    }

    pub fn tiered(tiers: &[(usize, f64)]) -> Self {
        SizingPolicy::Tiered {
            tiers: tiers.iter().map(|&(c, w)| Tier::new(c, w)).collect(),
        }
    }

    /// Weight for the candidate at zero-based `rank`.
    pub fn weight_at_rank(&self, rank: usize) -> f64 {
        match self {
            SizingPolicy::FixedWeight { weight } => *weight,
            SizingPolicy::EqualWeight {
                count,
                total_exposure,
            } => {
                if rank < *count {
                    total_exposure / *count as f64
                } else {
                    0.0
                }
            }
            SizingPolicy::Tiered { tiers } => {
                let mut band_end = 0usize;
                for tier in tiers {
                    band_end = band_end.saturating_add(tier.count);
                    if rank < band_end {
                        return tier.weight;
                    }
                }
                0.0
            }
        }
    }

    /// Maximum number of candidates that can receive a non-zero weight,
    /// saturating at `usize::MAX`. `None` for fixed weights, which select
    /// every candidate.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            SizingPolicy::FixedWeight { .. } => None,
            SizingPolicy::EqualWeight { count, .. } => Some(*count),
            SizingPolicy::Tiered { tiers } => Some(
                tiers
                    .iter()
                    .fold(0usize, |total, t| total.saturating_add(t.count)),
            ),
        }
    }

    /// Weights for a ranked candidate list, in rank order. Excluded
    /// candidates are kept with weight 0.
    pub fn weights<S: AsRef<str>>(&self, ranked: &[S]) -> Vec<TargetWeight> {
        ranked
            .iter()
            .enumerate()
            .map(|(rank, symbol)| TargetWeight {
                symbol: symbol.as_ref().to_string(),
                weight: self.weight_at_rank(rank),
            })
            .collect()
    }

    /// Sum of weights when `n` candidates are available.
    pub fn gross_exposure(&self, n: usize) -> f64 {
        (0..n).map(|rank| self.weight_at_rank(rank)).sum()
    }
}

impl fmt::Display for SizingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizingPolicy::FixedWeight { weight } => write!(f, "fixed_weight({})", weight),
            SizingPolicy::EqualWeight {
                count,
                total_exposure,
            } => write!(f, "equal_weight({}, exposure {})", count, total_exposure),
            SizingPolicy::Tiered { tiers } => {
                let bands: Vec<String> = tiers
                    .iter()
                    .map(|t| format!("({}, {})", t.count, t.weight))
                    .collect();
                write!(f, "tiered([{}])", bands.join(", "))
            }
        }
    }
}
