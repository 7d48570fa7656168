//! Backtest result summaries pulled back from the platform.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub strategy_id: String,
    pub period_label: String,
    pub cagr: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub total_orders: u64,
}

/// One line of a strategy comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub rank: usize,
    pub strategy_id: String,
    pub period_label: String,
    pub cagr: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub total_orders: u64,
}

fn by_sharpe_desc(a: &BacktestSummary, b: &BacktestSummary) -> Ordering {
    match (a.sharpe.is_nan(), b.sharpe.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.sharpe.partial_cmp(&a.sharpe).unwrap_or(Ordering::Equal),
    }
}

/// Rank summaries best Sharpe first. NaN Sharpe ratios sort last and ties
/// keep strategy id order.
pub fn rank_by_sharpe(summaries: &[BacktestSummary]) -> Vec<ComparisonRow> {
    let mut sorted: Vec<&BacktestSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| {
        by_sharpe_desc(a, b)
            .then_with(|| a.strategy_id.cmp(&b.strategy_id))
            .then_with(|| a.period_label.cmp(&b.period_label))
    });
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, s)| ComparisonRow {
            rank: i + 1,
            strategy_id: s.strategy_id.clone(),
            period_label: s.period_label.clone(),
            cagr: s.cagr,
            sharpe: s.sharpe,
            max_drawdown: s.max_drawdown,
            total_orders: s.total_orders,
        })
        .collect()
}
