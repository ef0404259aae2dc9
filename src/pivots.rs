//! Pivot extraction: local price extrema over a symmetric bar window.
//!
//! Every detector in this crate works on pivots rather than raw bars, so the
//! extractor is deliberately conservative: a bar only qualifies when its full
//! window fits inside the series, and malformed bars can neither become
//! pivots nor dominate a window.

use crate::{Ohlcv, OhlcvExt};

/// Which side of the price action a pivot marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

/// A confirmed local extremum.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PivotPoint {
    pub index: usize,
    pub kind: PivotKind,
    pub price: f64,
}

/// High and low pivots of one bar series, each sorted ascending by index.
#[derive(Debug, Clone, Default)]
pub struct Pivots {
    pub highs: Vec<PivotPoint>,
    pub lows: Vec<PivotPoint>,
}

impl Pivots {
    /// Merged pivot sequence, sorted by index and reduced to strict
    /// High/Low alternation. When two same-kind pivots are adjacent the more
    /// extreme one survives (higher High, lower Low).
    pub fn alternating(&self) -> Vec<PivotPoint> {
        let mut merged: Vec<PivotPoint> = Vec::with_capacity(self.highs.len() + self.lows.len());
        let (mut hi, mut lo) = (0, 0);
        while hi < self.highs.len() || lo < self.lows.len() {
            let take_high = match (self.highs.get(hi), self.lows.get(lo)) {
                (Some(h), Some(l)) => h.index < l.index,
                (Some(_), None) => true,
                _ => false,
            };
            if take_high {
                merged.push(self.highs[hi]);
                hi += 1;
            } else {
                merged.push(self.lows[lo]);
                lo += 1;
            }
        }

        let mut out: Vec<PivotPoint> = Vec::with_capacity(merged.len());
        for p in merged {
            match out.last_mut() {
                Some(last) if last.kind == p.kind => {
                    let replace = match p.kind {
                        PivotKind::High => p.price > last.price,
                        PivotKind::Low => p.price < last.price,
                    };
                    if replace {
                        *last = p;
                    }
                }
                _ => out.push(p),
            }
        }
        out
    }

    /// Low pivots strictly between two bar indices.
    pub fn lows_between(&self, start: usize, end: usize) -> Vec<PivotPoint> {
        self.lows
            .iter()
            .copied()
            .filter(|p| p.index > start && p.index < end)
            .collect()
    }

    /// High pivots strictly between two bar indices.
    pub fn highs_between(&self, start: usize, end: usize) -> Vec<PivotPoint> {
        self.highs
            .iter()
            .copied()
            .filter(|p| p.index > start && p.index < end)
            .collect()
    }
}

/// Find all pivot highs and lows of `bars` using a symmetric window of
/// `radius` bars on each side.
///
/// A bar is a pivot high when its high is >= every other high in the window,
/// with ties broken toward the earliest bar of a plateau. Lows are the
/// mirror. Series shorter than `2 * radius + 1` bars yield no pivots, and
/// bars that fail [`OhlcvExt::is_well_formed`] are ignored entirely.
pub fn find_pivots<T: Ohlcv>(bars: &[T], radius: usize) -> Pivots {
    let mut pivots = Pivots::default();
    if radius == 0 || bars.len() < 2 * radius + 1 {
        return pivots;
    }

    for i in radius..bars.len() - radius {
        if !bars[i].is_well_formed() {
            continue;
        }
        let h = bars[i].high();
        let l = bars[i].low();

        let mut is_high = true;
        let mut is_low = true;
        for j in i - radius..=i + radius {
            if j == i || !bars[j].is_well_formed() {
                continue;
            }
            // Left side strict, right side allows ties: exactly one pivot
            // per flat plateau.
            if j < i {
                if bars[j].high() >= h {
                    is_high = false;
                }
                if bars[j].low() <= l {
                    is_low = false;
                }
            } else {
                if bars[j].high() > h {
                    is_high = false;
                }
                if bars[j].low() < l {
                    is_low = false;
                }
            }
            if !is_high && !is_low {
                break;
            }
        }

        if is_high {
            pivots.highs.push(PivotPoint {
                index: i,
                kind: PivotKind::High,
                price: h,
            });
        }
        if is_low {
            pivots.lows.push(PivotPoint {
                index: i,
                kind: PivotKind::Low,
                price: l,
            });
        }
    }

    pivots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Bar {
        h: f64,
        l: f64,
    }

    impl Ohlcv for Bar {
        fn open(&self) -> f64 {
            (self.h + self.l) / 2.0
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            (self.h + self.l) / 2.0
        }
    }

    fn bar(h: f64, l: f64) -> Bar {
        Bar { h, l }
    }

    #[test]
    fn short_series_yields_nothing() {
        let bars: Vec<Bar> = (0..6).map(|i| bar(100.0 + i as f64, 99.0)).collect();
        let pivots = find_pivots(&bars, 3);
        assert!(pivots.highs.is_empty());
        assert!(pivots.lows.is_empty());
    }

    #[test]
    fn detects_single_peak_and_trough() {
        // Peak at index 3, trough at index 7.
        let highs = [100.0, 101.0, 102.0, 105.0, 102.0, 101.0, 100.0, 99.0, 100.5, 101.0, 102.0];
        let bars: Vec<Bar> = highs.iter().map(|&h| bar(h, h - 2.0)).collect();
        let pivots = find_pivots(&bars, 2);

        assert_eq!(pivots.highs.len(), 1);
        assert_eq!(pivots.highs[0].index, 3);
        assert_eq!(pivots.highs[0].price, 105.0);

        assert_eq!(pivots.lows.len(), 1);
        assert_eq!(pivots.lows[0].index, 7);
    }

    #[test]
    fn plateau_produces_one_pivot() {
        let highs = [100.0, 101.0, 104.0, 104.0, 104.0, 101.0, 100.0];
        let bars: Vec<Bar> = highs.iter().map(|&h| bar(h, h - 2.0)).collect();
        let pivots = find_pivots(&bars, 2);

        assert_eq!(pivots.highs.len(), 1);
        assert_eq!(pivots.highs[0].index, 2);
    }

    #[test]
    fn malformed_bar_is_skipped() {
        let mut bars: Vec<Bar> = [100.0, 101.0, 105.0, 101.0, 100.0]
            .iter()
            .map(|&h| bar(h, h - 2.0))
            .collect();
        // NaN bar would otherwise dominate the window.
        bars[1] = Bar {
            h: f64::NAN,
            l: f64::NAN,
        };
        let pivots = find_pivots(&bars, 2);
        assert_eq!(pivots.highs.len(), 1);
        assert_eq!(pivots.highs[0].index, 2);
    }

    #[test]
    fn alternating_collapses_same_kind_runs() {
        let pivots = Pivots {
            highs: vec![
                PivotPoint { index: 2, kind: PivotKind::High, price: 110.0 },
                PivotPoint { index: 5, kind: PivotKind::High, price: 112.0 },
                PivotPoint { index: 12, kind: PivotKind::High, price: 109.0 },
            ],
            lows: vec![
                PivotPoint { index: 8, kind: PivotKind::Low, price: 100.0 },
                PivotPoint { index: 15, kind: PivotKind::Low, price: 98.0 },
            ],
        };

        let seq = pivots.alternating();
        assert_eq!(seq.len(), 4);
        // The two leading highs collapse to the higher one at index 5.
        assert_eq!(seq[0].index, 5);
        assert_eq!(seq[1].index, 8);
        assert_eq!(seq[2].index, 12);
        assert_eq!(seq[3].index, 15);
    }
}
