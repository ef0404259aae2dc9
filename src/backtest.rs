//! Forward-trade simulation for detected formations.
//!
//! Each match is traded once: enter at the open of the bar after the
//! formation completes, then walk forward bar by bar until the target or
//! stop level is touched or the holding period runs out. When one bar
//! spans both levels the target is credited first.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{AnalyzerConfig, Direction, Ohlcv, PatternKind, PatternMatch};

/// Why a simulated trade closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Target,
    Stop,
    TimeExit,
}

/// Lifecycle of a single simulated trade.
#[derive(Debug, Clone, Copy)]
enum TradeState {
    Open,
    Closed {
        exit_index: usize,
        exit_price: f64,
        reason: ExitReason,
    },
}

/// Outcome of one simulated trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub pattern_type: PatternKind,
    pub direction: Direction,
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_date: DateTime<Utc>,
    pub exit_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    /// Realized fractional return, net of commission.
    pub actual_return: f64,
    /// Entry-to-target fractional return the formation promised.
    pub expected_return: f64,
    pub exit_reason: ExitReason,
    pub hit_target: bool,
    pub hit_stop: bool,
    pub days_held: i64,
    pub confidence: f64,
    pub pattern_height: f64,
    pub success: bool,
}

/// Simulate every match against the same bar series.
pub fn run<T: Ohlcv>(
    bars: &[T],
    matches: &[PatternMatch],
    config: &AnalyzerConfig,
) -> Vec<BacktestResult> {
    matches
        .iter()
        .filter_map(|m| simulate(bars, m, config))
        .collect()
}

/// Trade one match forward. Returns `None` when the match carries no
/// target/stop levels or the series ends before a single forward bar.
pub fn simulate<T: Ohlcv>(
    bars: &[T],
    m: &PatternMatch,
    config: &AnalyzerConfig,
) -> Option<BacktestResult> {
    let target = m.target_price?;
    let stop = m.stop_loss?;

    let entry_index = m.end_point.index + 1;
    // Need the entry bar plus at least one bar to trade through.
    if entry_index + 1 >= bars.len() {
        return None;
    }

    let slippage = config.slippage;
    let entry_price = match m.direction {
        Direction::Bullish => bars[entry_index].open() * (1.0 + slippage),
        Direction::Bearish => bars[entry_index].open() * (1.0 - slippage),
    };
    if !(entry_price.is_finite() && entry_price > 0.0) {
        return None;
    }

    let last_index = (entry_index + config.holding_period_days).min(bars.len() - 1);
    let mut state = TradeState::Open;

    for i in entry_index + 1..=last_index {
        let bar = &bars[i];
        let touched = match m.direction {
            Direction::Bullish if bar.high() >= target => Some((target, ExitReason::Target)),
            Direction::Bullish if bar.low() <= stop => Some((stop, ExitReason::Stop)),
            Direction::Bearish if bar.low() <= target => Some((target, ExitReason::Target)),
            Direction::Bearish if bar.high() >= stop => Some((stop, ExitReason::Stop)),
            _ => None,
        };
        if let Some((price, reason)) = touched {
            state = TradeState::Closed {
                exit_index: i,
                exit_price: price,
                reason,
            };
            break;
        }
    }

    let (exit_index, exit_price, reason) = match state {
        TradeState::Closed {
            exit_index,
            exit_price,
            reason,
        } => (exit_index, exit_price, reason),
        TradeState::Open => {
            let close = bars[last_index].close();
            let price = match m.direction {
                Direction::Bullish => close * (1.0 - slippage),
                Direction::Bearish => close * (1.0 + slippage),
            };
            (last_index, price, ExitReason::TimeExit)
        }
    };

    let gross = match m.direction {
        Direction::Bullish => (exit_price - entry_price) / entry_price,
        Direction::Bearish => (entry_price - exit_price) / entry_price,
    };
    let actual_return = gross - 2.0 * config.commission;
    let expected_return = match m.direction {
        Direction::Bullish => (target - entry_price) / entry_price,
        Direction::Bearish => (entry_price - target) / entry_price,
    };

    let hit_target = reason == ExitReason::Target;
    let hit_stop = reason == ExitReason::Stop;
    let success =
        actual_return > 0.0 && (hit_target || actual_return >= 0.5 * expected_return);

    Some(BacktestResult {
        pattern_type: m.pattern_type,
        direction: m.direction,
        entry_date: date_at(bars, entry_index),
        entry_price,
        exit_date: date_at(bars, exit_index),
        exit_price,
        target_price: target,
        stop_loss: stop,
        actual_return,
        expected_return,
        exit_reason: reason,
        hit_target,
        hit_stop,
        days_held: (exit_index - entry_index) as i64,
        confidence: m.confidence,
        pattern_height: m.pattern_height,
        success,
    })
}

/// Bar timestamp, or a synthetic daily calendar from the epoch when the
/// feed carries none.
fn date_at<T: Ohlcv>(bars: &[T], index: usize) -> DateTime<Utc> {
    bars[index]
        .timestamp()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(|| {
            Utc.timestamp_opt(86_400 * index as i64, 0)
                .single()
                .unwrap_or_default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::flat_bar;
    use crate::PatternPoint;

    fn match_with_levels(
        bars: &[crate::test_support::FlatBar],
        direction: Direction,
        end: usize,
        target: f64,
        stop: f64,
    ) -> PatternMatch {
        let key_points = vec![
            PatternPoint::at(bars, 0, bars[0].close()),
            PatternPoint::at(bars, end, bars[end].close()),
        ];
        PatternMatch::from_key_points(
            PatternKind::DoubleBottom,
            direction,
            0.7,
            key_points,
            Some(target),
            Some(stop),
            None,
        )
        .unwrap()
    }

    fn frictionless() -> AnalyzerConfig {
        AnalyzerConfig {
            commission: 0.0,
            slippage: 0.0,
            ..AnalyzerConfig::default()
        }
    }

    #[test]
    fn bullish_target_exit() {
        // Entry bar opens at 100; the next bar touches the 110 target.
        let mut bars: Vec<_> = (0..11).map(|_| flat_bar(100.0)).collect();
        bars.push(flat_bar(111.0));
        bars.push(flat_bar(112.0));
        let m = match_with_levels(&bars, Direction::Bullish, 9, 110.0, 95.0);
        let config = frictionless();

        let r = simulate(&bars, &m, &config).unwrap();
        assert!(r.hit_target);
        assert!(!r.hit_stop);
        assert_eq!(r.exit_price, 110.0);
        assert!((r.actual_return - 0.10).abs() < 1e-12);
        assert!(r.success);
        assert!(r.exit_date > r.entry_date);
    }

    #[test]
    fn stop_exit_is_a_loss() {
        let mut bars: Vec<_> = (0..11).map(|_| flat_bar(100.0)).collect();
        bars.push(flat_bar(94.0)); // through the 95 stop
        bars.push(flat_bar(93.0));
        let m = match_with_levels(&bars, Direction::Bullish, 9, 110.0, 95.0);
        let config = frictionless();

        let r = simulate(&bars, &m, &config).unwrap();
        assert!(r.hit_stop);
        assert!(!r.hit_target);
        assert!((r.actual_return - (-0.05)).abs() < 1e-12);
        assert!(!r.success);
    }

    #[test]
    fn time_exit_after_holding_period() {
        let mut config = frictionless();
        config.holding_period_days = 5;
        let bars: Vec<_> = (0..30).map(|_| flat_bar(100.0)).collect();
        let m = match_with_levels(&bars, Direction::Bullish, 9, 110.0, 95.0);

        let r = simulate(&bars, &m, &config).unwrap();
        assert!(!r.hit_target && !r.hit_stop);
        assert_eq!(r.days_held, 5);
        assert!((r.actual_return).abs() < 1e-12);
    }

    #[test]
    fn no_forward_bars_yields_none() {
        let bars: Vec<_> = (0..10).map(|_| flat_bar(100.0)).collect();
        let m = match_with_levels(&bars, Direction::Bullish, 9, 110.0, 95.0);
        assert!(simulate(&bars, &m, &frictionless()).is_none());
    }

    #[test]
    fn bearish_trade_profits_from_decline() {
        let mut bars: Vec<_> = (0..11).map(|_| flat_bar(100.0)).collect();
        bars.push(flat_bar(89.0)); // through the 90 target
        let m = match_with_levels(&bars, Direction::Bearish, 9, 90.0, 105.0);
        let config = frictionless();

        let r = simulate(&bars, &m, &config).unwrap();
        assert!(r.hit_target);
        assert!((r.actual_return - 0.10).abs() < 1e-12);
        assert!(r.success);
    }

    #[test]
    fn commission_drags_the_return() {
        let mut config = frictionless();
        config.commission = 0.01;
        let mut bars: Vec<_> = (0..11).map(|_| flat_bar(100.0)).collect();
        bars.push(flat_bar(111.0));
        let m = match_with_levels(&bars, Direction::Bullish, 9, 110.0, 95.0);

        let r = simulate(&bars, &m, &config).unwrap();
        assert!((r.actual_return - 0.08).abs() < 1e-12);
    }
}
