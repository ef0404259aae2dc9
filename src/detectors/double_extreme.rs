//! Double top / double bottom formations.
//!
//! Two same-side pivots equal within tolerance, separated by an
//! opposite-side pivot at least `min_depth` away from the pair. The target
//! projects the pattern height through the middle pivot.

use crate::detectors::helpers::rel_diff;
use crate::detectors::scoring::{self, ScoreParts};
use crate::pivots::{PivotPoint, Pivots};
use crate::{
    AnalyzerConfig, Direction, FormationDetector, Ohlcv, PatternKind, PatternMatch, PatternPoint,
    Ratio, Result,
};

impl_with_defaults!(DoubleExtremeDetector);

/// Detector for double tops and double bottoms.
#[derive(Debug, Clone)]
pub struct DoubleExtremeDetector {
    /// Minimum distance of the middle pivot from the pair, as a fraction of
    /// the pair price.
    pub min_depth: Ratio,
}

impl Default for DoubleExtremeDetector {
    fn default() -> Self {
        Self {
            min_depth: Ratio::new_const(0.05),
        }
    }
}

impl FormationDetector for DoubleExtremeDetector {
    fn family(&self) -> &'static str {
        "double_extreme"
    }

    fn min_bars(&self) -> usize {
        15
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        pivots: &Pivots,
        config: &AnalyzerConfig,
    ) -> Vec<PatternMatch> {
        let mut out = Vec::new();
        self.detect_side(bars, pivots, config, Direction::Bearish, &mut out);
        self.detect_side(bars, pivots, config, Direction::Bullish, &mut out);
        out
    }

    fn validate_config(&self) -> Result<()> {
        // Ratio is validated at construction; nothing further to check.
        Ok(())
    }
}

impl DoubleExtremeDetector {
    fn detect_side<T: Ohlcv>(
        &self,
        bars: &[T],
        pivots: &Pivots,
        config: &AnalyzerConfig,
        direction: Direction,
        out: &mut Vec<PatternMatch>,
    ) {
        let (side, kind) = match direction {
            Direction::Bearish => (&pivots.highs, PatternKind::DoubleTop),
            Direction::Bullish => (&pivots.lows, PatternKind::DoubleBottom),
        };

        for w in side.windows(2) {
            let (first, second) = (w[0], w[1]);
            let diff = match rel_diff(first.price, second.price) {
                Some(d) => d,
                None => continue,
            };
            if diff > config.tolerance {
                continue;
            }
            let pair = (first.price + second.price) / 2.0;
            if pair <= f64::EPSILON {
                continue;
            }

            let middle = match deepest_between(pivots, direction, first.index, second.index) {
                Some(p) => p,
                None => continue,
            };
            let height = match direction {
                Direction::Bearish => pair - middle.price,
                Direction::Bullish => middle.price - pair,
            };
            if height / pair < self.min_depth.get() {
                continue;
            }

            let target = match direction {
                Direction::Bearish => middle.price - height * config.target_multiple,
                Direction::Bullish => middle.price + height * config.target_multiple,
            };
            let stop = match direction {
                Direction::Bearish => middle.price + height * config.stop_loss_multiple,
                Direction::Bullish => middle.price - height * config.stop_loss_multiple,
            };

            // Quality: how closely the two extremes match, against tolerance.
            let quality = if config.tolerance > 0.0 {
                (1.0 - diff / config.tolerance).clamp(0.0, 1.0)
            } else {
                0.0
            };
            // Symmetry: middle pivot centered in time between the extremes.
            let left = (middle.index - first.index) as f64;
            let right = (second.index - middle.index) as f64;
            let symmetry = if left.max(right) > 0.0 {
                left.min(right) / left.max(right)
            } else {
                0.0
            };

            let parts = ScoreParts { quality, symmetry };
            let confidence = scoring::confidence(bars, kind, first.index, second.index, parts);

            let key_points = vec![
                PatternPoint::at(bars, first.index, first.price),
                PatternPoint::at(bars, middle.index, middle.price),
                PatternPoint::at(bars, second.index, second.price),
            ];

            if let Some(m) = PatternMatch::from_key_points(
                kind,
                direction,
                confidence,
                key_points,
                Some(target),
                Some(stop),
                Some(middle.price),
            ) {
                out.push(m);
            }
        }
    }
}

/// Most extreme opposite-side pivot strictly between two indices.
fn deepest_between(
    pivots: &Pivots,
    direction: Direction,
    start: usize,
    end: usize,
) -> Option<PivotPoint> {
    let between = match direction {
        Direction::Bearish => pivots.lows_between(start, end),
        Direction::Bullish => pivots.highs_between(start, end),
    };
    match direction {
        Direction::Bearish => between
            .into_iter()
            .min_by(|a, b| a.price.total_cmp(&b.price)),
        Direction::Bullish => between
            .into_iter()
            .max_by(|a, b| a.price.total_cmp(&b.price)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivots::find_pivots;
    use crate::test_support::{flat_bar, ramp, FlatBar};

    fn double_top_series() -> Vec<FlatBar> {
        let mut closes = Vec::new();
        closes.extend(ramp(90.0, 110.0, 10)); // up into first top
        closes.extend(ramp(110.0, 100.0, 5)); // valley at 100
        closes.extend(ramp(100.0, 110.5, 5)); // second top within tolerance
        closes.extend(ramp(110.5, 92.0, 10)); // breakdown
        closes.into_iter().map(flat_bar).collect()
    }

    #[test]
    fn detects_double_top() {
        let bars = double_top_series();
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, 2);
        let matches = DoubleExtremeDetector::with_defaults().detect(&bars, &pivots, &config);

        let m = matches
            .iter()
            .find(|m| m.pattern_type == PatternKind::DoubleTop)
            .expect("double top expected");
        assert_eq!(m.direction, Direction::Bearish);
        assert_eq!(m.key_points.len(), 3);
        // Valley 100, pair ~110.25: target one height below the valley.
        let height = m.pattern_height;
        assert!((m.target_price.unwrap() - (100.0 - height)).abs() < 1.0);
        assert!(m.target_price.unwrap() < 100.0);
    }

    #[test]
    fn shallow_valley_is_rejected() {
        let bars: Vec<FlatBar> = {
            let mut closes = Vec::new();
            closes.extend(ramp(90.0, 110.0, 10));
            closes.extend(ramp(110.0, 107.0, 5)); // valley only ~3% deep
            closes.extend(ramp(107.0, 110.0, 5));
            closes.extend(ramp(110.0, 92.0, 10));
            closes.into_iter().map(flat_bar).collect()
        };
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, 2);
        let matches = DoubleExtremeDetector::with_defaults().detect(&bars, &pivots, &config);
        assert!(matches
            .iter()
            .all(|m| m.pattern_type != PatternKind::DoubleTop));
    }

    #[test]
    fn detects_double_bottom() {
        let bars: Vec<FlatBar> = {
            let mut closes = Vec::new();
            closes.extend(ramp(120.0, 100.0, 10));
            closes.extend(ramp(100.0, 110.0, 5));
            closes.extend(ramp(110.0, 100.5, 5));
            closes.extend(ramp(100.5, 118.0, 10));
            closes.into_iter().map(flat_bar).collect()
        };
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, 2);
        let matches = DoubleExtremeDetector::with_defaults().detect(&bars, &pivots, &config);

        let m = matches
            .iter()
            .find(|m| m.pattern_type == PatternKind::DoubleBottom)
            .expect("double bottom expected");
        assert_eq!(m.direction, Direction::Bullish);
        assert!(m.target_price.unwrap() > 110.0);
    }
}
