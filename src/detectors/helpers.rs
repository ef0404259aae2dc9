//! Shared geometry helpers for formation detectors.
//!
//! Every ratio or slope computed here fails closed: a zero or non-finite
//! denominator returns `None` (or `false` for predicates) and the candidate
//! pattern is rejected, never a panic.

use crate::pivots::PivotPoint;
use crate::Ohlcv;

/// Relative difference `|a - b| / |a|`. `None` when `a` is zero/non-finite.
#[inline]
pub fn rel_diff(a: f64, b: f64) -> Option<f64> {
    if !a.is_finite() || !b.is_finite() || a.abs() <= f64::EPSILON {
        return None;
    }
    Some((a - b).abs() / a.abs())
}

/// True when `a` and `b` are equal within the relative tolerance `tol`.
#[inline]
pub fn within_tolerance(a: f64, b: f64, tol: f64) -> bool {
    matches!(rel_diff(a, b), Some(d) if d <= tol)
}

/// Least-squares slope of price against bar index over a pivot set.
///
/// Returns price units per bar. `None` for fewer than two points or when all
/// points share one index.
pub fn fit_slope(points: &[PivotPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.index as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.price).sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for p in points {
        let dx = p.index as f64 - mean_x;
        num += dx * (p.price - mean_y);
        den += dx * dx;
    }
    if den <= f64::EPSILON {
        return None;
    }
    Some(num / den)
}

/// Least-squares slope normalized by the mean pivot price: fraction of price
/// per bar, comparable across symbols.
pub fn fit_relative_slope(points: &[PivotPoint]) -> Option<f64> {
    let slope = fit_slope(points)?;
    let mean = mean(points.iter().map(|p| p.price))?;
    if mean.abs() <= f64::EPSILON {
        return None;
    }
    Some(slope / mean)
}

/// Arithmetic mean. `None` on an empty iterator.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Fractional close-to-close change over the `lookback` well-formed bars
/// immediately before `start`. `None` when there is no usable history.
pub fn prior_trend_return<T: Ohlcv>(bars: &[T], start: usize, lookback: usize) -> Option<f64> {
    use crate::OhlcvExt;

    if start == 0 || lookback == 0 {
        return None;
    }
    let from = start.saturating_sub(lookback);
    let window = &bars[from..start];
    let first = window.iter().find(|b| b.is_well_formed())?.close();
    let last = window.iter().rev().find(|b| b.is_well_formed())?.close();
    if first.abs() <= f64::EPSILON {
        return None;
    }
    Some((last - first) / first)
}

/// How tightly a pivot set hugs a straight line: 1.0 for a perfect fit,
/// falling toward 0.0 as the mean absolute residual approaches `scale`
/// (typically the pattern height). `None` when the fit itself fails.
pub fn line_fit_quality(points: &[PivotPoint], scale: f64) -> Option<f64> {
    if scale <= f64::EPSILON {
        return None;
    }
    let slope = fit_slope(points)?;
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.index as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.price).sum::<f64>() / n;

    let residual: f64 = points
        .iter()
        .map(|p| {
            let fitted = mean_y + slope * (p.index as f64 - mean_x);
            (p.price - fitted).abs()
        })
        .sum::<f64>()
        / n;

    Some((1.0 - residual / scale).clamp(0.0, 1.0))
}
