//! Harmonic XABCD formations (Gartley, Butterfly, Bat, Crab).
//!
//! Five alternating pivots define four legs; each named pattern is a table
//! of Fibonacci retracement bands the leg ratios must fall into. Bands are
//! widened by a configurable slack so near-misses still qualify. When one
//! window satisfies several tables, the first table in priority order wins.

use crate::detectors::scoring::{self, ScoreParts};
use crate::pivots::{PivotKind, PivotPoint, Pivots};
use crate::{
    AnalyzerConfig, Direction, FormationDetector, Ohlcv, PatternError, PatternKind, PatternMatch,
    PatternPoint, Result,
};

impl_with_defaults!(HarmonicDetector);

/// Inclusive ratio band for one leg.
#[derive(Debug, Clone, Copy)]
struct Band {
    min: f64,
    max: f64,
}

impl Band {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn contains(&self, ratio: f64, slack: f64) -> bool {
        ratio >= self.min * (1.0 - slack) && ratio <= self.max * (1.0 + slack)
    }

    /// Distance of a ratio from the band center, normalized to the widened
    /// half-width. 1.0 at the center, 0.0 at the edge.
    fn closeness(&self, ratio: f64, slack: f64) -> f64 {
        let lo = self.min * (1.0 - slack);
        let hi = self.max * (1.0 + slack);
        let mid = (lo + hi) / 2.0;
        let half = (hi - lo) / 2.0;
        if half <= 0.0 {
            return if ratio == mid { 1.0 } else { 0.0 };
        }
        (1.0 - (ratio - mid).abs() / half).clamp(0.0, 1.0)
    }
}

/// One named harmonic pattern: bands for AB/XA, BC/AB, CD/BC and the
/// terminal AD/XA retracement.
struct RatioTable {
    ab_xa: Band,
    bc_ab: Band,
    cd_bc: Band,
    ad_xa: Band,
    bullish: PatternKind,
    bearish: PatternKind,
}

/// Checked in order; the first table a window satisfies names the pattern.
const TABLES: &[RatioTable] = &[
    RatioTable {
        ab_xa: Band::new(0.618, 0.618),
        bc_ab: Band::new(0.382, 0.886),
        cd_bc: Band::new(1.13, 1.618),
        ad_xa: Band::new(0.786, 0.786),
        bullish: PatternKind::BullishGartley,
        bearish: PatternKind::BearishGartley,
    },
    RatioTable {
        ab_xa: Band::new(0.786, 0.786),
        bc_ab: Band::new(0.382, 0.886),
        cd_bc: Band::new(1.618, 2.24),
        ad_xa: Band::new(1.27, 1.618),
        bullish: PatternKind::BullishButterfly,
        bearish: PatternKind::BearishButterfly,
    },
    RatioTable {
        ab_xa: Band::new(0.382, 0.5),
        bc_ab: Band::new(0.382, 0.886),
        cd_bc: Band::new(1.618, 2.618),
        ad_xa: Band::new(0.886, 0.886),
        bullish: PatternKind::BullishBat,
        bearish: PatternKind::BearishBat,
    },
    RatioTable {
        ab_xa: Band::new(0.382, 0.618),
        bc_ab: Band::new(0.382, 0.886),
        cd_bc: Band::new(2.24, 3.618),
        ad_xa: Band::new(1.618, 1.618),
        bullish: PatternKind::BullishCrab,
        bearish: PatternKind::BearishCrab,
    },
];

/// Detector for the four classic XABCD harmonic patterns.
#[derive(Debug, Clone)]
pub struct HarmonicDetector {
    /// Fractional widening applied to every ratio band.
    pub ratio_slack: f64,
}

impl Default for HarmonicDetector {
    fn default() -> Self {
        Self { ratio_slack: 0.05 }
    }
}

impl FormationDetector for HarmonicDetector {
    fn family(&self) -> &'static str {
        "harmonic"
    }

    fn min_bars(&self) -> usize {
        25
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        pivots: &Pivots,
        config: &AnalyzerConfig,
    ) -> Vec<PatternMatch> {
        let seq = pivots.alternating();
        let mut out = Vec::new();

        for w in seq.windows(5) {
            if let Some(m) = self.try_window(bars, w, config) {
                out.push(m);
            }
        }
        out
    }

    fn validate_config(&self) -> Result<()> {
        if !(self.ratio_slack.is_finite() && (0.0..0.5).contains(&self.ratio_slack)) {
            return Err(PatternError::InvalidConfig(
                "harmonic: ratio_slack must be in [0, 0.5)".into(),
            ));
        }
        Ok(())
    }
}

impl HarmonicDetector {
    fn try_window<T: Ohlcv>(
        &self,
        bars: &[T],
        w: &[PivotPoint],
        config: &AnalyzerConfig,
    ) -> Option<PatternMatch> {
        let (x, a, b, c, d) = (w[0], w[1], w[2], w[3], w[4]);

        let xa = (a.price - x.price).abs();
        let ab = (b.price - a.price).abs();
        let bc = (c.price - b.price).abs();
        let cd = (d.price - c.price).abs();
        let ad = (d.price - a.price).abs();
        if xa <= f64::EPSILON || ab <= f64::EPSILON || bc <= f64::EPSILON {
            return None;
        }

        let r_ab = ab / xa;
        let r_bc = bc / ab;
        let r_cd = cd / bc;
        let r_ad = ad / xa;
        let slack = self.ratio_slack;

        let table = TABLES.iter().find(|t| {
            t.ab_xa.contains(r_ab, slack)
                && t.bc_ab.contains(r_bc, slack)
                && t.cd_bc.contains(r_cd, slack)
                && t.ad_xa.contains(r_ad, slack)
        })?;

        // D at a low means price is expected to reverse upward from it.
        let (kind, direction) = match d.kind {
            PivotKind::Low => (table.bullish, Direction::Bullish),
            PivotKind::High => (table.bearish, Direction::Bearish),
        };

        // Quality: how close each leg sits to its band center.
        let quality = (table.ab_xa.closeness(r_ab, slack)
            + table.bc_ab.closeness(r_bc, slack)
            + table.cd_bc.closeness(r_cd, slack)
            + table.ad_xa.closeness(r_ad, slack))
            / 4.0;
        // Symmetry: even leg durations across the four swings.
        let spans = [
            (a.index - x.index) as f64,
            (b.index - a.index) as f64,
            (c.index - b.index) as f64,
            (d.index - c.index) as f64,
        ];
        let longest = spans.iter().copied().fold(f64::MIN, f64::max);
        let shortest = spans.iter().copied().fold(f64::MAX, f64::min);
        let symmetry = if longest > 0.0 { shortest / longest } else { 0.0 };

        let parts = ScoreParts { quality, symmetry };
        let confidence = scoring::confidence(bars, kind, x.index, d.index, parts);

        // The reversal trades from D; size the move off the final leg.
        let (target, stop) = scoring::project_targets(direction, d.price, cd, config);

        let key_points = vec![
            PatternPoint::at(bars, x.index, x.price),
            PatternPoint::at(bars, a.index, a.price),
            PatternPoint::at(bars, b.index, b.price),
            PatternPoint::at(bars, c.index, c.price),
            PatternPoint::at(bars, d.index, d.price),
        ];

        PatternMatch::from_key_points(
            kind,
            direction,
            confidence,
            key_points,
            Some(target),
            Some(stop),
            Some(d.price),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivots::find_pivots;
    use crate::test_support::{flat_bar, ramp, FlatBar};

    /// Zig-zag hitting exact Gartley ratios: X=100, A=150 (XA=50),
    /// B=119.1 (AB=30.9=0.618*XA), C=138.2 (BC=19.1), D=110.7
    /// (CD=27.5, CD/BC=1.44; AD=39.3=0.786*XA).
    fn gartley_series() -> Vec<FlatBar> {
        let mut closes = Vec::new();
        closes.extend(ramp(120.0, 100.0, 5)); // descent into X
        closes.extend(ramp(100.0, 150.0, 10)); // X -> A
        closes.extend(ramp(150.0, 119.1, 10)); // A -> B
        closes.extend(ramp(119.1, 138.2, 10)); // B -> C
        closes.extend(ramp(138.2, 110.7, 10)); // C -> D
        closes.extend(ramp(110.7, 125.0, 10)); // reversal off D
        closes.into_iter().map(flat_bar).collect()
    }

    #[test]
    fn detects_bullish_gartley() {
        let bars = gartley_series();
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, 3);
        let matches = HarmonicDetector::with_defaults().detect(&bars, &pivots, &config);

        let m = matches
            .iter()
            .find(|m| m.pattern_type == PatternKind::BullishGartley)
            .expect("bullish gartley expected");
        assert_eq!(m.direction, Direction::Bullish);
        assert_eq!(m.key_points.len(), 5);
        // Entry is the D pivot; target sits above it.
        assert!((m.breakout_level.unwrap() - 110.7).abs() < 0.5);
        assert!(m.target_price.unwrap() > m.breakout_level.unwrap());
    }

    #[test]
    fn mirrored_window_is_bearish() {
        // Same ratios upside down: D is a high, so the reversal is down.
        let bars: Vec<FlatBar> = {
            let mut closes = Vec::new();
            closes.extend(ramp(130.0, 150.0, 5)); // ascent into X
            closes.extend(ramp(150.0, 100.0, 10));
            closes.extend(ramp(100.0, 130.9, 10));
            closes.extend(ramp(130.9, 111.8, 10));
            closes.extend(ramp(111.8, 139.3, 10));
            closes.extend(ramp(139.3, 125.0, 10));
            closes.into_iter().map(flat_bar).collect()
        };
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, 3);
        let matches = HarmonicDetector::with_defaults().detect(&bars, &pivots, &config);

        let m = matches
            .iter()
            .find(|m| m.pattern_type == PatternKind::BearishGartley)
            .expect("bearish gartley expected");
        assert_eq!(m.direction, Direction::Bearish);
        assert!(m.target_price.unwrap() < m.breakout_level.unwrap());
    }

    #[test]
    fn off_ratio_zigzag_matches_nothing() {
        // AB retraces 90% of XA: outside every table.
        let bars: Vec<FlatBar> = {
            let mut closes = Vec::new();
            closes.extend(ramp(120.0, 100.0, 5));
            closes.extend(ramp(100.0, 150.0, 10));
            closes.extend(ramp(150.0, 105.0, 10));
            closes.extend(ramp(105.0, 140.0, 10));
            closes.extend(ramp(140.0, 102.0, 10));
            closes.extend(ramp(102.0, 120.0, 10));
            closes.into_iter().map(flat_bar).collect()
        };
        let config = AnalyzerConfig::default();
        let pivots = find_pivots(&bars, 3);
        let matches = HarmonicDetector::with_defaults().detect(&bars, &pivots, &config);
        assert!(matches.is_empty());
    }
}
