//! Aggregate statistics over backtest results, overall and per pattern type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backtest::BacktestResult;
use crate::PatternKind;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Performance summary for one group of simulated trades.
///
/// All ratio fields fall back to zero when the group is empty or the
/// return series has no variance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternStatistics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub success_rate: f64,
    pub target_hit_rate: f64,
    pub stop_hit_rate: f64,
    pub avg_return: f64,
    pub return_std_dev: f64,
    pub best_return: f64,
    pub worst_return: f64,
    pub avg_days_held: f64,
    pub avg_confidence: f64,
    /// Pearson correlation between confidence and realized return.
    pub confidence_correlation: f64,
    /// Mean return per unit of return volatility.
    pub risk_adjusted_return: f64,
    /// Annualized excess return over volatility.
    pub sharpe_ratio: f64,
    /// Deepest peak-to-trough loss of the compounded return curve.
    pub max_drawdown: f64,
}

/// Summarize one slice of results into a single statistics block.
pub fn summarize(results: &[BacktestResult], risk_free_rate: f64) -> PatternStatistics {
    if results.is_empty() {
        return PatternStatistics::default();
    }

    let n = results.len() as f64;
    let returns: Vec<f64> = results.iter().map(|r| r.actual_return).collect();
    let confidences: Vec<f64> = results.iter().map(|r| r.confidence).collect();

    let avg_return = returns.iter().sum::<f64>() / n;
    let return_std_dev = std_dev(&returns, avg_return);

    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let sharpe_ratio = if return_std_dev > 0.0 {
        (avg_return - daily_rf) / return_std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };
    let risk_adjusted_return = if return_std_dev > 0.0 {
        avg_return / return_std_dev
    } else {
        0.0
    };

    PatternStatistics {
        total_trades: results.len(),
        winning_trades: results.iter().filter(|r| r.success).count(),
        success_rate: results.iter().filter(|r| r.success).count() as f64 / n,
        target_hit_rate: results.iter().filter(|r| r.hit_target).count() as f64 / n,
        stop_hit_rate: results.iter().filter(|r| r.hit_stop).count() as f64 / n,
        avg_return,
        return_std_dev,
        best_return: returns.iter().copied().fold(f64::MIN, f64::max),
        worst_return: returns.iter().copied().fold(f64::MAX, f64::min),
        avg_days_held: results.iter().map(|r| r.days_held as f64).sum::<f64>() / n,
        avg_confidence: confidences.iter().sum::<f64>() / n,
        confidence_correlation: pearson(&confidences, &returns),
        risk_adjusted_return,
        sharpe_ratio,
        max_drawdown: max_drawdown(&returns),
    }
}

/// Group results by pattern type and summarize each group. The map is
/// ordered so iteration (and serialization) is deterministic.
pub fn aggregate(
    results: &[BacktestResult],
    risk_free_rate: f64,
) -> BTreeMap<PatternKind, PatternStatistics> {
    let mut groups: BTreeMap<PatternKind, Vec<BacktestResult>> = BTreeMap::new();
    for r in results {
        groups.entry(r.pattern_type).or_default().push(r.clone());
    }
    groups
        .into_iter()
        .map(|(kind, group)| (kind, summarize(&group, risk_free_rate)))
        .collect()
}

/// Sample standard deviation; zero for fewer than two observations.
fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Pearson correlation coefficient; zero when either series is constant.
fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    let den = (vx * vy).sqrt();
    if den > 0.0 {
        cov / den
    } else {
        0.0
    }
}

/// Largest fractional decline of the compounded equity curve from its
/// running peak, reported as a positive number.
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut worst = 0.0f64;
    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::ExitReason;
    use crate::Direction;
    use chrono::{TimeZone, Utc};

    fn result(kind: PatternKind, ret: f64, confidence: f64, success: bool) -> BacktestResult {
        BacktestResult {
            pattern_type: kind,
            direction: Direction::Bullish,
            entry_date: Utc.timestamp_opt(0, 0).single().unwrap(),
            entry_price: 100.0,
            exit_date: Utc.timestamp_opt(86_400, 0).single().unwrap(),
            exit_price: 100.0 * (1.0 + ret),
            target_price: 110.0,
            stop_loss: 95.0,
            actual_return: ret,
            expected_return: 0.10,
            exit_reason: if ret >= 0.10 {
                ExitReason::Target
            } else if ret <= -0.05 {
                ExitReason::Stop
            } else {
                ExitReason::TimeExit
            },
            hit_target: ret >= 0.10,
            hit_stop: ret <= -0.05,
            days_held: 1,
            confidence,
            pattern_height: 10.0,
            success,
        }
    }

    #[test]
    fn empty_input_gives_all_zeros() {
        let s = summarize(&[], 0.04);
        assert_eq!(s.total_trades, 0);
        assert_eq!(s.success_rate, 0.0);
        assert_eq!(s.sharpe_ratio, 0.0);
        assert_eq!(s.max_drawdown, 0.0);
        assert!(aggregate(&[], 0.04).is_empty());
    }

    #[test]
    fn groups_by_pattern_type() {
        let results = vec![
            result(PatternKind::DoubleTop, 0.10, 0.8, true),
            result(PatternKind::DoubleTop, -0.05, 0.4, false),
            result(PatternKind::CupAndHandle, 0.02, 0.6, true),
        ];
        let by_kind = aggregate(&results, 0.04);
        assert_eq!(by_kind.len(), 2);
        let dt = &by_kind[&PatternKind::DoubleTop];
        assert_eq!(dt.total_trades, 2);
        assert_eq!(dt.winning_trades, 1);
        assert!((dt.success_rate - 0.5).abs() < 1e-12);
        assert!((dt.avg_return - 0.025).abs() < 1e-12);
    }

    #[test]
    fn constant_returns_zero_out_ratios() {
        let results = vec![
            result(PatternKind::DoubleTop, 0.02, 0.5, true),
            result(PatternKind::DoubleTop, 0.02, 0.7, true),
        ];
        let s = summarize(&results, 0.04);
        assert_eq!(s.return_std_dev, 0.0);
        assert_eq!(s.sharpe_ratio, 0.0);
        assert_eq!(s.risk_adjusted_return, 0.0);
        assert_eq!(s.confidence_correlation, 0.0);
    }

    #[test]
    fn confidence_correlation_tracks_returns() {
        let results = vec![
            result(PatternKind::DoubleTop, 0.01, 0.3, true),
            result(PatternKind::DoubleTop, 0.05, 0.5, true),
            result(PatternKind::DoubleTop, 0.09, 0.7, true),
        ];
        let s = summarize(&results, 0.0);
        // Perfectly linear relation.
        assert!((s.confidence_correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_measures_peak_to_trough() {
        // Equity: 1.1, then 0.88 (down 20% from the 1.1 peak), then 0.968.
        let results = vec![
            result(PatternKind::DoubleTop, 0.10, 0.5, true),
            result(PatternKind::DoubleTop, -0.20, 0.5, false),
            result(PatternKind::DoubleTop, 0.10, 0.5, true),
        ];
        let s = summarize(&results, 0.0);
        assert!((s.max_drawdown - 0.20).abs() < 1e-12);
    }
}
