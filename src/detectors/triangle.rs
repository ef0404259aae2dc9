//! Triangle formations: ascending, descending and symmetrical.
//!
//! Ascending: a flat resistance line (two or more high pivots equal within
//! tolerance) over rising support lows, with a convergence check between the
//! two trendlines. Descending is the mirror. Symmetrical: a falling
//! resistance fit against a rising support fit, both beyond a minimum slope
//! magnitude.

use crate::detectors::helpers::{
    fit_relative_slope, line_fit_quality, mean, prior_trend_return, rel_diff,
};
use crate::detectors::scoring::{self, ScoreParts};
use crate::pivots::{PivotPoint, Pivots};
use crate::{
    AnalyzerConfig, Direction, FormationDetector, Ohlcv, PatternError, PatternKind, PatternMatch,
    PatternPoint, Result,
};

impl_with_defaults!(TriangleDetector);

/// Detector for the triangle family.
#[derive(Debug, Clone)]
pub struct TriangleDetector {
    /// Minimum low (resp. high) pivots required on the sloped side.
    pub min_trend_pivots: usize,
    /// Minimum relative slope (fraction of price per bar) for a trendline to
    /// count as rising/falling rather than flat.
    pub min_relative_slope: f64,
    /// Minimum relative-slope difference between the two lines for them to
    /// be considered converging.
    pub convergence_epsilon: f64,
}

impl Default for TriangleDetector {
    fn default() -> Self {
        Self {
            min_trend_pivots: 2,
            min_relative_slope: 5e-4,
            convergence_epsilon: 1e-4,
        }
    }
}

impl FormationDetector for TriangleDetector {
    fn family(&self) -> &'static str {
        "triangle"
    }

    fn min_bars(&self) -> usize {
        20
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        pivots: &Pivots,
        config: &AnalyzerConfig,
    ) -> Vec<PatternMatch> {
        let mut out = Vec::new();
        self.detect_flat_line(bars, pivots, config, Direction::Bullish, &mut out);
        self.detect_flat_line(bars, pivots, config, Direction::Bearish, &mut out);
        self.detect_symmetrical(bars, pivots, &mut out, config);
        out
    }

    fn validate_config(&self) -> Result<()> {
        if self.min_trend_pivots < 2 {
            return Err(PatternError::InvalidConfig(
                "triangle: min_trend_pivots must be >= 2".into(),
            ));
        }
        if !(self.min_relative_slope.is_finite() && self.min_relative_slope > 0.0) {
            return Err(PatternError::InvalidConfig(
                "triangle: min_relative_slope must be positive".into(),
            ));
        }
        if !(self.convergence_epsilon.is_finite() && self.convergence_epsilon > 0.0) {
            return Err(PatternError::InvalidConfig(
                "triangle: convergence_epsilon must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl TriangleDetector {
    /// Ascending (flat resistance over rising lows) when `direction` is
    /// bullish, descending (flat support under falling highs) when bearish.
    /// One maximal match per flat pivot run.
    fn detect_flat_line<T: Ohlcv>(
        &self,
        bars: &[T],
        pivots: &Pivots,
        config: &AnalyzerConfig,
        direction: Direction,
        out: &mut Vec<PatternMatch>,
    ) {
        let (flat_side, kind) = match direction {
            Direction::Bullish => (&pivots.highs, PatternKind::AscendingTriangle),
            Direction::Bearish => (&pivots.lows, PatternKind::DescendingTriangle),
        };

        for run in flat_runs(flat_side, config.tolerance) {
            if run.len() < 2 {
                continue;
            }
            let first = run[0];
            let last = run[run.len() - 1];

            let trend: Vec<PivotPoint> = match direction {
                Direction::Bullish => pivots.lows_between(first.index, last.index),
                Direction::Bearish => pivots.highs_between(first.index, last.index),
            };
            if trend.len() < self.min_trend_pivots {
                continue;
            }
            let monotone = match direction {
                Direction::Bullish => trend.windows(2).all(|w| w[1].price > w[0].price),
                Direction::Bearish => trend.windows(2).all(|w| w[1].price < w[0].price),
            };
            if !monotone {
                continue;
            }

            let trend_slope = match fit_relative_slope(&trend) {
                Some(s) => s,
                None => continue,
            };
            let sloped_enough = match direction {
                Direction::Bullish => trend_slope > self.min_relative_slope,
                Direction::Bearish => trend_slope < -self.min_relative_slope,
            };
            if !sloped_enough {
                continue;
            }
            let flat_slope = fit_relative_slope(&run).unwrap_or(0.0);
            if (trend_slope - flat_slope).abs() <= self.convergence_epsilon {
                continue;
            }

            let breakout = match mean(run.iter().map(|p| p.price)) {
                Some(b) => b,
                None => continue,
            };

            let mut prices: Vec<f64> = run.iter().map(|p| p.price).collect();
            prices.extend(trend.iter().map(|p| p.price));
            let hi = prices.iter().cloned().fold(f64::MIN, f64::max);
            let lo = prices.iter().cloned().fold(f64::MAX, f64::min);
            let height = hi - lo;
            if height <= 0.0 {
                continue;
            }

            // Flat-line quality: worst deviation of the run from its mean,
            // relative to the allowed tolerance.
            let worst_dev = run
                .iter()
                .filter_map(|p| rel_diff(breakout, p.price))
                .fold(0.0, f64::max);
            let flat_quality = if config.tolerance > 0.0 {
                (1.0 - worst_dev / config.tolerance).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let trend_quality = line_fit_quality(&trend, height).unwrap_or(0.0);
            let balance =
                run.len().min(trend.len()) as f64 / run.len().max(trend.len()) as f64;

            let parts = ScoreParts {
                quality: 0.5 * flat_quality + 0.5 * trend_quality,
                symmetry: balance,
            };
            let confidence = scoring::confidence(bars, kind, first.index, last.index, parts);
            let (target, stop) = scoring::project_targets(direction, breakout, height, config);

            let mut key_points: Vec<PatternPoint> = run
                .iter()
                .chain(trend.iter())
                .map(|p| PatternPoint::at(bars, p.index, p.price))
                .collect();
            key_points.sort_by_key(|p| p.index);

            if let Some(m) = PatternMatch::from_key_points(
                kind,
                direction,
                confidence,
                key_points,
                Some(target),
                Some(stop),
                Some(breakout),
            ) {
                out.push(m);
            }
        }
    }

    /// Symmetrical: falling resistance against rising support, fit over
    /// three successive pivots per side.
    fn detect_symmetrical<T: Ohlcv>(
        &self,
        bars: &[T],
        pivots: &Pivots,
        out: &mut Vec<PatternMatch>,
        config: &AnalyzerConfig,
    ) {
        for (highs, lows) in pivot_triples(pivots) {
            let high_slope = match fit_relative_slope(&highs) {
                Some(s) => s,
                None => continue,
            };
            let low_slope = match fit_relative_slope(&lows) {
                Some(s) => s,
                None => continue,
            };
            if high_slope >= -self.min_relative_slope || low_slope <= self.min_relative_slope {
                continue;
            }

            let mut key_points: Vec<PatternPoint> = highs
                .iter()
                .chain(lows.iter())
                .map(|p| PatternPoint::at(bars, p.index, p.price))
                .collect();
            key_points.sort_by_key(|p| p.index);
            let start = key_points[0].index;
            let end = key_points[key_points.len() - 1].index;

            let hi = highs.iter().map(|p| p.price).fold(f64::MIN, f64::max);
            let lo = lows.iter().map(|p| p.price).fold(f64::MAX, f64::min);
            let height = hi - lo;
            if height <= 0.0 {
                continue;
            }

            // A symmetrical triangle breaks with the prior trend.
            let direction = match prior_trend_return(bars, start, end - start) {
                Some(r) if r < 0.0 => Direction::Bearish,
                _ => Direction::Bullish,
            };

            let quality = 0.5 * line_fit_quality(&highs, height).unwrap_or(0.0)
                + 0.5 * line_fit_quality(&lows, height).unwrap_or(0.0);
            let (a, b) = (high_slope.abs(), low_slope.abs());
            let symmetry = if a.max(b) > 0.0 { a.min(b) / a.max(b) } else { 0.0 };

            let parts = ScoreParts { quality, symmetry };
            let kind = PatternKind::SymmetricalTriangle;
            let confidence = scoring::confidence(bars, kind, start, end, parts);

            // Entry at the midpoint of the converging lines.
            let entry = (hi + lo) / 2.0;
            let (target, stop) = scoring::project_targets(direction, entry, height, config);

            if let Some(m) = PatternMatch::from_key_points(
                kind,
                direction,
                confidence,
                key_points,
                Some(target),
                Some(stop),
                None,
            ) {
                out.push(m);
            }
        }
    }
}

/// Maximal runs of consecutive pivots whose prices all sit within `tol` of
/// the run's first price.
fn flat_runs(pivots: &[PivotPoint], tol: f64) -> Vec<Vec<PivotPoint>> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < pivots.len() {
        let anchor = pivots[i].price;
        let mut j = i + 1;
        while j < pivots.len() && rel_diff(anchor, pivots[j].price).is_some_and(|d| d <= tol) {
            j += 1;
        }
        if j - i >= 2 {
            runs.push(pivots[i..j].to_vec());
        }
        i = if j > i + 1 { j } else { i + 1 };
    }
    runs
}

/// Windows of three successive high pivots paired with the low pivots lying
/// in (a slightly widened copy of) the same index span. Used by both the
/// symmetrical triangle and the wedge detector.
pub(crate) fn pivot_triples(pivots: &Pivots) -> Vec<(Vec<PivotPoint>, Vec<PivotPoint>)> {
    let mut windows = Vec::new();
    if pivots.highs.len() < 3 {
        return windows;
    }
    for w in pivots.highs.windows(3) {
        let span = w[2].index - w[0].index;
        let margin = span / 4;
        let from = w[0].index.saturating_sub(margin);
        let to = w[2].index + margin;
        let lows: Vec<PivotPoint> = pivots
            .lows
            .iter()
            .copied()
            .filter(|p| p.index >= from && p.index <= to)
            .collect();
        if lows.len() >= 3 {
            windows.push((w.to_vec(), lows));
        }
    }
    windows
}
