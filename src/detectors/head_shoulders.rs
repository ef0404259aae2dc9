//! Head-and-shoulders (regular and inverse).
//!
//! Three consecutive same-side pivots where the middle one dominates both
//! shoulders, with the neckline built from the opposite-side pivots lying
//! between them. The measured-move target mirrors the head-to-neckline
//! distance through the neckline.

use crate::detectors::helpers::{mean, rel_diff};
use crate::detectors::scoring::{self, ScoreParts};
use crate::pivots::{PivotPoint, Pivots};
use crate::{
    AnalyzerConfig, Direction, FormationDetector, Ohlcv, PatternError, PatternKind, PatternMatch,
    PatternPoint, Result,
};

impl_with_defaults!(HeadShouldersDetector);

/// Detector for regular and inverse head-and-shoulders formations.
#[derive(Debug, Clone)]
pub struct HeadShouldersDetector {
    /// Shoulder price mismatch allowance, as a multiple of the shared
    /// geometric tolerance.
    pub shoulder_tolerance_multiple: f64,
}

impl Default for HeadShouldersDetector {
    fn default() -> Self {
        Self {
            shoulder_tolerance_multiple: 2.0,
        }
    }
}

impl FormationDetector for HeadShouldersDetector {
    fn family(&self) -> &'static str {
        "head_and_shoulders"
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
        self.detect_side(bars, pivots, config, Direction::Bearish, &mut out);
        self.detect_side(bars, pivots, config, Direction::Bullish, &mut out);
        out
    }

    fn validate_config(&self) -> Result<()> {
        if !(self.shoulder_tolerance_multiple.is_finite() && self.shoulder_tolerance_multiple > 0.0)
        {
            return Err(PatternError::InvalidConfig(
                "head_and_shoulders: shoulder_tolerance_multiple must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl HeadShouldersDetector {
    /// Bearish scans high pivots (regular pattern after an uptrend),
    /// bullish scans low pivots (inverse pattern).
    fn detect_side<T: Ohlcv>(
        &self,
        bars: &[T],
        pivots: &Pivots,
        config: &AnalyzerConfig,
        direction: Direction,
        out: &mut Vec<PatternMatch>,
    ) {
        let (side, kind) = match direction {
            Direction::Bearish => (&pivots.highs, PatternKind::HeadAndShoulders),
            Direction::Bullish => (&pivots.lows, PatternKind::InverseHeadAndShoulders),
        };

        for w in side.windows(3) {
            let (left, head, right) = (w[0], w[1], w[2]);
            let dominates = match direction {
                Direction::Bearish => head.price > left.price && head.price > right.price,
                Direction::Bullish => head.price < left.price && head.price < right.price,
            };
            if !dominates {
                continue;
            }
            let shoulder_diff = match rel_diff(left.price, right.price) {
                Some(d) => d,
                None => continue,
            };
            let max_diff = self.shoulder_tolerance_multiple * config.tolerance;
            if shoulder_diff >= max_diff {
                continue;
            }

            let left_troughs = neck_pivots(pivots, direction, left.index, head.index);
            let right_troughs = neck_pivots(pivots, direction, head.index, right.index);
            if left_troughs.is_empty() || right_troughs.is_empty() {
                continue;
            }
            let neckline = match mean(
                left_troughs
                    .iter()
                    .chain(right_troughs.iter())
                    .map(|p| p.price),
            ) {
                Some(n) => n,
                None => continue,
            };

            let height = match direction {
                Direction::Bearish => head.price - neckline,
                Direction::Bullish => neckline - head.price,
            };
            if height <= 0.0 {
                continue;
            }
            let target = match direction {
                Direction::Bearish => neckline - height,
                Direction::Bullish => neckline + height,
            };
            let stop = match direction {
                Direction::Bearish => neckline + height * config.stop_loss_multiple,
                Direction::Bullish => neckline - height * config.stop_loss_multiple,
            };

            // Neckline flatness between the first and last trough.
            let neck_first = left_troughs[0].price;
            let neck_last = right_troughs[right_troughs.len() - 1].price;
            let quality = (1.0 - (neck_first - neck_last).abs() / height).clamp(0.0, 1.0);

            // Shoulder symmetry in both price and time.
            let price_sym = (1.0 - shoulder_diff / max_diff).clamp(0.0, 1.0);
            let left_span = (head.index - left.index) as f64;
            let right_span = (right.index - head.index) as f64;
            let time_sym = if left_span.max(right_span) > 0.0 {
                left_span.min(right_span) / left_span.max(right_span)
            } else {
                0.0
            };
            let parts = ScoreParts {
                quality,
                symmetry: 0.5 * price_sym + 0.5 * time_sym,
            };
            let confidence = scoring::confidence(bars, kind, left.index, right.index, parts);

            let mut key_points: Vec<PatternPoint> = [left, head, right]
                .iter()
                .chain(left_troughs.iter())
                .chain(right_troughs.iter())
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
                Some(neckline),
            ) {
                out.push(m);
            }
        }
    }
}

/// Opposite-side pivots strictly between two anchor indices.
fn neck_pivots(
    pivots: &Pivots,
    direction: Direction,
    start: usize,
    end: usize,
) -> Vec<PivotPoint> {
    match direction {
        Direction::Bearish => pivots.lows_between(start, end),
        Direction::Bullish => pivots.highs_between(start, end),
    }
}
