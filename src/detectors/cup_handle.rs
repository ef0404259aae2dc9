//! Cup-and-handle formation.
//!
//! A rounded base (the cup) whose two rims sit within a few percent of each
//! other, followed by a short, shallow pullback (the handle) that holds
//! 10-15% below the right rim while staying in the upper half of the base.
//! Works directly on bar windows rather than
//! pivots, because the cup bottom is rarely a clean pivot.

use crate::detectors::scoring::{self, ScoreParts};
use crate::pivots::Pivots;
use crate::{
    AnalyzerConfig, Direction, FormationDetector, Ohlcv, OhlcvExt, PatternError, PatternKind,
    PatternMatch, PatternPoint, Period, Ratio, Result,
};

impl_with_defaults!(CupHandleDetector);

/// Detector for cup-and-handle bases.
#[derive(Debug, Clone)]
pub struct CupHandleDetector {
    /// Smallest cup window, in bars.
    pub min_cup_bars: Period,
    /// Largest cup window, in bars.
    pub max_cup_bars: Period,
    /// Step between tried cup windows.
    pub window_step: Period,
    /// Longest allowed handle, in bars.
    pub max_handle_bars: Period,
    /// Cup depth bounds as a fraction of the rim average.
    pub min_depth: Ratio,
    pub max_depth: Ratio,
    /// Allowed relative mismatch between the two rims.
    pub rim_tolerance: Ratio,
    /// Handle pullback bounds below the right rim.
    pub min_handle_pullback: Ratio,
    pub max_handle_pullback: Ratio,
}

impl Default for CupHandleDetector {
    fn default() -> Self {
        Self {
            min_cup_bars: Period::new_const(20),
            max_cup_bars: Period::new_const(60),
            window_step: Period::new_const(4),
            max_handle_bars: Period::new_const(10),
            min_depth: Ratio::new_const(0.15),
            max_depth: Ratio::new_const(0.50),
            rim_tolerance: Ratio::new_const(0.05),
            min_handle_pullback: Ratio::new_const(0.10),
            max_handle_pullback: Ratio::new_const(0.15),
        }
    }
}

impl FormationDetector for CupHandleDetector {
    fn family(&self) -> &'static str {
        "cup_and_handle"
    }

    fn min_bars(&self) -> usize {
        self.min_cup_bars.get() + 3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        _pivots: &Pivots,
        config: &AnalyzerConfig,
    ) -> Vec<PatternMatch> {
        let mut out = Vec::new();
        let min_w = self.min_cup_bars.get();
        let max_w = self.max_cup_bars.get().min(bars.len().saturating_sub(3));

        let mut w = min_w;
        while w <= max_w {
            for cup_end in w..bars.len() {
                if let Some(m) = self.try_window(bars, cup_end - w, cup_end, config) {
                    out.push(m);
                }
            }
            w += self.window_step.get();
        }
        out
    }

    fn validate_config(&self) -> Result<()> {
        if self.min_cup_bars.get() >= self.max_cup_bars.get() {
            return Err(PatternError::InvalidConfig(
                "cup_and_handle: min_cup_bars must be < max_cup_bars".into(),
            ));
        }
        if self.min_depth.get() >= self.max_depth.get() {
            return Err(PatternError::InvalidConfig(
                "cup_and_handle: min_depth must be < max_depth".into(),
            ));
        }
        if self.min_handle_pullback.get() >= self.max_handle_pullback.get() {
            return Err(PatternError::InvalidConfig(
                "cup_and_handle: handle pullback bounds are inverted".into(),
            ));
        }
        Ok(())
    }
}

impl CupHandleDetector {
    /// Evaluate one candidate cup `[cup_start, cup_end)` plus a following
    /// handle of at most `max_handle_bars` bars.
    fn try_window<T: Ohlcv>(
        &self,
        bars: &[T],
        cup_start: usize,
        cup_end: usize,
        config: &AnalyzerConfig,
    ) -> Option<PatternMatch> {
        let cup = &bars[cup_start..cup_end];
        let mid = cup.len() / 2;

        let (left_rim_off, left_rim) = max_high(&cup[..mid])?;
        let (right_rim_off, right_rim) = max_high(&cup[mid..])?;
        let (bottom_off, bottom) = min_low(cup)?;

        let rim_avg = (left_rim + right_rim) / 2.0;
        if rim_avg <= f64::EPSILON || bottom <= 0.0 {
            return None;
        }
        let depth = (rim_avg - bottom) / rim_avg;
        if depth < self.min_depth.get() || depth > self.max_depth.get() {
            return None;
        }
        let rim_diff = (left_rim - right_rim).abs() / left_rim.max(right_rim);
        if rim_diff > self.rim_tolerance.get() {
            return None;
        }

        // Handle: the pullback after the cup must hold 10-15% below the
        // right rim and resolve within max_handle_bars.
        let handle_end = (cup_end + self.max_handle_bars.get()).min(bars.len());
        if handle_end <= cup_end + 1 {
            return None;
        }
        let handle = &bars[cup_end..handle_end];
        let (handle_low_off, handle_low) = min_low(handle)?;
        let pullback = (right_rim - handle_low) / right_rim;
        if pullback < self.min_handle_pullback.get() || pullback > self.max_handle_pullback.get() {
            return None;
        }
        // The handle must hold the upper half of the base; a dip back toward
        // the cup bottom is a failed breakout, not a handle.
        if handle_low < bottom + 0.5 * (rim_avg - bottom) {
            return None;
        }

        let height = rim_avg - bottom;
        let direction = Direction::Bullish;
        let kind = PatternKind::CupAndHandle;

        let left_idx = cup_start + left_rim_off;
        let right_idx = cup_start + mid + right_rim_off;
        let bottom_idx = cup_start + bottom_off;
        let handle_idx = cup_end + handle_low_off;
        if !(left_idx < bottom_idx && bottom_idx < right_idx && right_idx < handle_idx) {
            return None;
        }

        // Quality: rim match plus depth sitting inside its band.
        let rim_quality = (1.0 - rim_diff / self.rim_tolerance.get()).clamp(0.0, 1.0);
        let band_mid = (self.min_depth.get() + self.max_depth.get()) / 2.0;
        let band_half = (self.max_depth.get() - self.min_depth.get()) / 2.0;
        let depth_quality = (1.0 - (depth - band_mid).abs() / band_half).clamp(0.0, 1.0);
        // Symmetry: bottom centered in time within the cup.
        let left_span = (bottom_idx - left_idx) as f64;
        let right_span = (right_idx - bottom_idx) as f64;
        let symmetry = if left_span.max(right_span) > 0.0 {
            left_span.min(right_span) / left_span.max(right_span)
        } else {
            0.0
        };

        let parts = ScoreParts {
            quality: 0.6 * rim_quality + 0.4 * depth_quality,
            symmetry,
        };
        let confidence = scoring::confidence(bars, kind, left_idx, handle_idx, parts);
        let (target, stop) = scoring::project_targets(direction, right_rim, height, config);

        let key_points = vec![
            PatternPoint::at(bars, left_idx, left_rim),
            PatternPoint::at(bars, bottom_idx, bottom),
            PatternPoint::at(bars, right_idx, right_rim),
            PatternPoint::at(bars, handle_idx, handle_low),
        ];

        PatternMatch::from_key_points(
            kind,
            direction,
            confidence,
            key_points,
            Some(target),
            Some(stop),
            Some(right_rim),
        )
    }
}

fn max_high<T: Ohlcv>(bars: &[T]) -> Option<(usize, f64)> {
    bars.iter()
        .enumerate()
        .filter(|(_, b)| b.is_well_formed())
        .map(|(i, b)| (i, b.high()))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

fn min_low<T: Ohlcv>(bars: &[T]) -> Option<(usize, f64)> {
    bars.iter()
        .enumerate()
        .filter(|(_, b)| b.is_well_formed())
        .map(|(i, b)| (i, b.low()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivots::find_pivots;
    use crate::test_support::{flat_bar, FlatBar};

    /// Rounded cup from 100 down to 75 and back, then a ~12% handle dip.
    fn cup_series() -> Vec<FlatBar> {
        let mut bars = Vec::new();
        let cup_len = 40usize;
        for i in 0..cup_len {
            // Cosine bowl: rims at 100, bottom at 75.
            let t = i as f64 / (cup_len - 1) as f64;
            let price = 100.0 - 25.0 * (std::f64::consts::PI * t).sin();
            bars.push(flat_bar(price));
        }
        // Handle: dip to ~88 (12% below the 100 rim) and recover.
        for &p in &[96.0, 92.0, 88.0, 90.0, 94.0, 99.0] {
            bars.push(flat_bar(p));
        }
        // Breakout continuation.
        for i in 0..10 {
            bars.push(flat_bar(101.0 + i as f64));
        }
        bars
    }

    #[test]
    fn detects_cup_and_handle() {
        let bars = cup_series();
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, config.pivot_radius);
        let matches = CupHandleDetector::with_defaults().detect(&bars, &pivots, &config);

        let m = matches
            .iter()
            .find(|m| m.pattern_type == PatternKind::CupAndHandle)
            .expect("cup and handle expected");
        assert_eq!(m.direction, Direction::Bullish);
        assert_eq!(m.key_points.len(), 4);
        assert!(m.target_price.unwrap() > 100.0);
        // Depth ~25% of the rim.
        assert!(m.pattern_height > 20.0 && m.pattern_height < 30.0);
    }

    #[test]
    fn too_shallow_cup_is_rejected() {
        let mut bars = Vec::new();
        for i in 0..40usize {
            let t = i as f64 / 39.0;
            // Only ~8% deep.
            bars.push(flat_bar(100.0 - 8.0 * (std::f64::consts::PI * t).sin()));
        }
        for &p in &[96.0, 90.0, 88.0, 92.0, 96.0] {
            bars.push(flat_bar(p));
        }
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, config.pivot_radius);
        let matches = CupHandleDetector::with_defaults().detect(&bars, &pivots, &config);
        assert!(matches.is_empty());
    }

    #[test]
    fn deep_handle_is_rejected() {
        let mut bars = Vec::new();
        for i in 0..40usize {
            let t = i as f64 / 39.0;
            bars.push(flat_bar(100.0 - 25.0 * (std::f64::consts::PI * t).sin()));
        }
        // Handle collapses 25% below the rim, all the way to the cup bottom.
        // Some shorter cup windows see this dip as an in-band pullback, but
        // a handle that leaves the upper half of the base never confirms.
        for &p in &[95.0, 85.0, 75.0, 80.0, 85.0] {
            bars.push(flat_bar(p));
        }
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, config.pivot_radius);
        let matches = CupHandleDetector::with_defaults().detect(&bars, &pivots, &config);
        assert!(matches.is_empty());
    }
}
