//! Confidence scoring and target/stop projection shared by all detectors.
//!
//! A detector supplies the two components only it can judge (technical
//! quality of the defining geometry and structural symmetry); the trend and
//! volume components are computed here from the bars surrounding the
//! formation. Components are weighted, summed and clamped to `[0, 1]`.

use crate::detectors::helpers::{mean, prior_trend_return};
use crate::{AnalyzerConfig, Direction, Ohlcv, PatternKind};

/// Weight of the geometry-quality component.
pub const W_QUALITY: f64 = 0.40;
/// Weight of the prior-trend alignment component.
pub const W_TREND: f64 = 0.25;
/// Weight of the volume-confirmation component.
pub const W_VOLUME: f64 = 0.20;
/// Weight of the structural-symmetry component.
pub const W_SYMMETRY: f64 = 0.15;

/// Detector-supplied score components, each already in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct ScoreParts {
    /// How tightly price tracked the pattern's defining geometry.
    pub quality: f64,
    /// Time/price symmetry between mirrored anchor points.
    pub symmetry: f64,
}

/// Combine detector-supplied components with trend alignment and volume
/// confirmation into a final confidence score.
///
/// When the feed carries no volume the volume weight is dropped and the
/// remaining weights renormalized, so volume-less data is not penalized.
pub fn confidence<T: Ohlcv>(
    bars: &[T],
    kind: PatternKind,
    start: usize,
    end: usize,
    parts: ScoreParts,
) -> f64 {
    let trend = trend_alignment(bars, kind, start, end);
    let volume = volume_confirmation(bars, start, end);

    let mut score = W_QUALITY * parts.quality.clamp(0.0, 1.0)
        + W_TREND * trend
        + W_SYMMETRY * parts.symmetry.clamp(0.0, 1.0);
    let mut weight = W_QUALITY + W_TREND + W_SYMMETRY;

    if let Some(v) = volume {
        score += W_VOLUME * v;
        weight += W_VOLUME;
    }

    (score / weight).clamp(0.0, 1.0)
}

/// Default target and stop levels for a match that does not project its own:
/// one pattern height (times the configured multiple) beyond entry for the
/// target, a fraction of the height against it for the stop.
pub fn project_targets(
    direction: Direction,
    entry: f64,
    height: f64,
    config: &AnalyzerConfig,
) -> (f64, f64) {
    match direction {
        Direction::Bullish => (
            entry + height * config.target_multiple,
            entry - height * config.stop_loss_multiple,
        ),
        Direction::Bearish => (
            entry - height * config.target_multiple,
            entry + height * config.stop_loss_multiple,
        ),
    }
}

/// Score how well the trend before the formation matches the context the
/// pattern kind expects (an uptrend into a head-and-shoulders, a downtrend
/// into a double bottom, ...). 0.5 is neutral; a ±4% prior move saturates.
fn trend_alignment<T: Ohlcv>(bars: &[T], kind: PatternKind, start: usize, end: usize) -> f64 {
    let expected = match kind.expected_prior_trend() {
        Some(d) => d,
        None => return 0.5,
    };
    // At least five bars of history when available, never more than exist
    // before the formation. With no history the trend reads neutral below.
    let lookback = end.saturating_sub(start).max(5).min(start);
    let prior = match prior_trend_return(bars, start, lookback) {
        Some(r) => r,
        None => return 0.5,
    };
    let signed = match expected {
        Direction::Bullish => prior,
        Direction::Bearish => -prior,
    };
    (0.5 + signed * 12.5).clamp(0.0, 1.0)
}

/// Volume behavior during the formation: contracting volume through the body
/// of the pattern and a spike on the final bar both raise the score.
/// `None` when any bar in the span lacks volume.
fn volume_confirmation<T: Ohlcv>(bars: &[T], start: usize, end: usize) -> Option<f64> {
    if end <= start || end >= bars.len() {
        return None;
    }
    let volumes: Option<Vec<f64>> = bars[start..=end].iter().map(|b| b.volume()).collect();
    let volumes = volumes?;

    let overall = mean(volumes.iter().copied())?;
    if overall <= f64::EPSILON {
        return None;
    }
    let mid = volumes.len() / 2;
    let first = mean(volumes[..mid].iter().copied())?;
    let second = mean(volumes[mid..].iter().copied())?;
    if first <= f64::EPSILON {
        return None;
    }

    let contraction = ((first - second) / first).clamp(-0.5, 0.5);
    let mut score = 0.5 + contraction * 0.6;
    if volumes[volumes.len() - 1] > overall * 1.5 {
        score += 0.2;
    }
    Some(score.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Bar {
        c: f64,
        v: Option<f64>,
    }

    impl Ohlcv for Bar {
        fn open(&self) -> f64 {
            self.c
        }

        fn high(&self) -> f64 {
            self.c + 1.0
        }

        fn low(&self) -> f64 {
            self.c - 1.0
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn volume(&self) -> Option<f64> {
            self.v
        }
    }

    fn uptrend_bars(n: usize, volume: Option<f64>) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar {
                c: 100.0 + i as f64,
                v: volume,
            })
            .collect()
    }

    #[test]
    fn targets_project_by_direction() {
        let config = AnalyzerConfig::default();
        let (t, s) = project_targets(Direction::Bullish, 100.0, 10.0, &config);
        assert!(t > 100.0 && s < 100.0);

        let (t, s) = project_targets(Direction::Bearish, 100.0, 10.0, &config);
        assert!(t < 100.0 && s > 100.0);
    }

    #[test]
    fn aligned_trend_raises_confidence() {
        let bars = uptrend_bars(60, Some(1000.0));
        let parts = ScoreParts {
            quality: 0.8,
            symmetry: 0.8,
        };
        // Head-and-shoulders expects a prior uptrend.
        let aligned = confidence(&bars, PatternKind::HeadAndShoulders, 30, 55, parts);
        // Inverse expects a downtrend, which this series does not have.
        let opposed = confidence(&bars, PatternKind::InverseHeadAndShoulders, 30, 55, parts);
        assert!(aligned > opposed);
    }

    #[test]
    fn missing_volume_does_not_penalize() {
        let with_volume = uptrend_bars(60, Some(1000.0));
        let without = uptrend_bars(60, None);
        let parts = ScoreParts {
            quality: 1.0,
            symmetry: 1.0,
        };
        let a = confidence(&with_volume, PatternKind::AscendingTriangle, 30, 55, parts);
        let b = confidence(&without, PatternKind::AscendingTriangle, 30, 55, parts);
        // Flat volume scores ~0.5, so dropping the component entirely should
        // not push the volume-less score below the flat-volume one.
        assert!(b >= a - 1e-9);
        assert!(b <= 1.0);
    }

    #[test]
    fn formations_at_the_series_start_score_without_history() {
        let bars = uptrend_bars(60, None);
        let parts = ScoreParts {
            quality: 0.5,
            symmetry: 0.5,
        };
        // Anchors with little or no history before them must still score.
        for start in 0..6 {
            let c = confidence(&bars, PatternKind::DoubleTop, start, start + 20, parts);
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn confidence_is_clamped() {
        let bars = uptrend_bars(60, Some(1000.0));
        let parts = ScoreParts {
            quality: 5.0,
            symmetry: 5.0,
        };
        let c = confidence(&bars, PatternKind::AscendingTriangle, 30, 55, parts);
        assert!((0.0..=1.0).contains(&c));
    }
}
