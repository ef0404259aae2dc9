#![allow(dead_code)]

use chartscan::Ohlcv;

/// Full OHLCV bar for integration tests.
#[derive(Debug, Clone, Copy)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub ts: Option<i64>,
}

impl Ohlcv for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> Option<f64> {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        self.ts
    }
}

/// Bar whose four prices coincide.
pub fn candle(price: f64) -> Candle {
    Candle {
        open: price,
        high: price,
        low: price,
        close: price,
        volume: None,
        ts: None,
    }
}

/// Bar with an explicit intraday range around its open/close.
pub fn spanning(open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        open,
        high,
        low,
        close,
        volume: None,
        ts: None,
    }
}

/// `n` evenly spaced values from `from` toward (but excluding) `to`.
pub fn ramp(from: f64, to: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|k| from + (to - from) * k as f64 / n as f64)
        .collect()
}

/// Flagpole up into an oscillation pinned to a flat 120 resistance over
/// rising support, then a breakout.
pub fn ascending_triangle_series() -> Vec<Candle> {
    let mut bars = Vec::new();
    for i in 0..18 {
        bars.push(candle(100.0 + 0.5 * i as f64));
    }
    for i in 18..70 {
        let support = 110.0 + (i - 18) as f64 * 0.1;
        let phase = (i - 18) % 8;
        let f = 1.0 - (phase.min(8 - phase) as f64) / 4.0;
        bars.push(candle(support + (120.0 - support) * f));
    }
    for i in 70..100 {
        bars.push(candle(122.0 + 0.2 * (i - 70) as f64));
    }
    bars
}

/// Shoulders near 110/111, head at 130, neckline at 100, breakdown after.
pub fn head_shoulders_series() -> Vec<Candle> {
    let mut closes = Vec::new();
    closes.extend(ramp(100.0, 110.0, 10));
    closes.extend(ramp(110.0, 100.0, 5));
    closes.extend(ramp(100.0, 130.0, 5));
    closes.extend(ramp(130.0, 100.0, 5));
    closes.extend(ramp(100.0, 111.0, 5));
    closes.extend(ramp(111.0, 95.0, 10));
    closes.into_iter().map(candle).collect()
}
