//! Rising and falling wedge formations.
//!
//! Same converging-trendline fit as the symmetrical triangle, but both lines
//! slope in the same direction: a rising wedge (support climbing faster than
//! resistance) breaks bearish, a falling wedge (support falling slower than
//! resistance) breaks bullish.

use crate::detectors::helpers::{fit_relative_slope, line_fit_quality};
use crate::detectors::scoring::{self, ScoreParts};
use crate::detectors::triangle::pivot_triples;
use crate::pivots::Pivots;
use crate::{
    AnalyzerConfig, Direction, FormationDetector, Ohlcv, PatternError, PatternKind, PatternMatch,
    PatternPoint, Result,
};

impl_with_defaults!(WedgeDetector);

/// Detector for rising and falling wedges.
#[derive(Debug, Clone)]
pub struct WedgeDetector {
    /// Minimum relative slope magnitude for both trendlines.
    pub min_relative_slope: f64,
}

impl Default for WedgeDetector {
    fn default() -> Self {
        Self {
            min_relative_slope: 5e-4,
        }
    }
}

impl FormationDetector for WedgeDetector {
    fn family(&self) -> &'static str {
        "wedge"
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

        for (highs, lows) in pivot_triples(pivots) {
            let resistance = match fit_relative_slope(&highs) {
                Some(s) => s,
                None => continue,
            };
            let support = match fit_relative_slope(&lows) {
                Some(s) => s,
                None => continue,
            };

            // Converging same-sign lines: support above resistance in slope.
            let kind = if resistance > self.min_relative_slope
                && support > self.min_relative_slope
                && support > resistance
            {
                PatternKind::RisingWedge
            } else if resistance < -self.min_relative_slope
                && support < -self.min_relative_slope
                && support > resistance
            {
                PatternKind::FallingWedge
            } else {
                continue;
            };
            let direction = match kind {
                PatternKind::RisingWedge => Direction::Bearish,
                _ => Direction::Bullish,
            };

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

            let quality = 0.5 * line_fit_quality(&highs, height).unwrap_or(0.0)
                + 0.5 * line_fit_quality(&lows, height).unwrap_or(0.0);
            // Symmetry: slope balance between the two lines.
            let (a, b) = (resistance.abs(), support.abs());
            let symmetry = if a.max(b) > 0.0 { a.min(b) / a.max(b) } else { 0.0 };

            let parts = ScoreParts { quality, symmetry };
            let confidence = scoring::confidence(bars, kind, start, end, parts);

            // A wedge breaks through its counter-trend line: the last pivot
            // on the side price is expected to pierce.
            let entry = match direction {
                Direction::Bearish => lows[lows.len() - 1].price,
                Direction::Bullish => highs[highs.len() - 1].price,
            };
            let (target, stop) = scoring::project_targets(direction, entry, height, config);

            if let Some(m) = PatternMatch::from_key_points(
                kind,
                direction,
                confidence,
                key_points,
                Some(target),
                Some(stop),
                Some(entry),
            ) {
                out.push(m);
            }
        }

        out
    }

    fn validate_config(&self) -> Result<()> {
        if !(self.min_relative_slope.is_finite() && self.min_relative_slope > 0.0) {
            return Err(PatternError::InvalidConfig(
                "wedge: min_relative_slope must be positive".into(),
            ));
        }
        Ok(())
    }
}
