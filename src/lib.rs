//! Geometric chart-formation detection, backtesting, and statistics.
//!
//! The crate scans OHLCV bar series for multi-bar price formations
//! (triangles, head-and-shoulders, double tops and bottoms, wedges,
//! cup-and-handle bases, harmonic XABCD patterns), scores each match
//! with a confidence in `[0, 1]`, projects target and stop levels, and
//! can trade every match forward through the same series to measure how
//! the formations actually performed.
//!
//! Bring your own bar type: implement [`Ohlcv`] for it and hand a slice
//! to an [`Analyzer`].
//!
//! ```
//! use chartscan::{Analyzer, Ohlcv};
//!
//! struct Day(f64);
//!
//! impl Ohlcv for Day {
//!     fn open(&self) -> f64 {
//!         self.0
//!     }
//!     fn high(&self) -> f64 {
//!         self.0
//!     }
//!     fn low(&self) -> f64 {
//!         self.0
//!     }
//!     fn close(&self) -> f64 {
//!         self.0
//!     }
//! }
//!
//! # fn main() -> chartscan::Result<()> {
//! let bars: Vec<Day> = (0..60).map(|i| Day(100.0 + (i % 7) as f64)).collect();
//! let analyzer = Analyzer::builder().with_all_defaults().build()?;
//! let scan = analyzer.scan(&bars);
//! println!("{} formations found", scan.matches.len());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

pub mod aggregate;
pub mod backtest;
pub mod detectors;
pub mod pivots;
pub mod stats;

use backtest::BacktestResult;
use detectors::cup_handle::CupHandleDetector;
use detectors::double_extreme::DoubleExtremeDetector;
use detectors::harmonic::HarmonicDetector;
use detectors::head_shoulders::HeadShouldersDetector;
use detectors::triangle::TriangleDetector;
use detectors::wedge::WedgeDetector;
use pivots::{find_pivots, Pivots};
use stats::PatternStatistics;

/// Commonly used items, importable in one line.
pub mod prelude {
    pub use crate::backtest::{BacktestResult, ExitReason};
    pub use crate::detectors::cup_handle::CupHandleDetector;
    pub use crate::detectors::double_extreme::DoubleExtremeDetector;
    pub use crate::detectors::harmonic::HarmonicDetector;
    pub use crate::detectors::head_shoulders::HeadShouldersDetector;
    pub use crate::detectors::triangle::TriangleDetector;
    pub use crate::detectors::wedge::WedgeDetector;
    pub use crate::pivots::{find_pivots, PivotKind, PivotPoint, Pivots};
    pub use crate::stats::PatternStatistics;
    pub use crate::{
        Analyzer, AnalyzerBuilder, AnalyzerConfig, BuiltinDetector, Direction, FormationDetector,
        Ohlcv, OhlcvExt, PatternError, PatternKind, PatternMatch, PatternPoint, Period, Ratio,
        Result, SymbolReport, SymbolScan,
    };
}

/// Errors produced by configuration validation and scanning.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid value: {0}")]
    InvalidValue(f64),

    #[error("{field} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PatternError>;

/// A fraction validated to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(PatternError::InvalidValue(value));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Compile-time constructor for literals; panics on an invalid value.
    pub const fn new_const(value: f64) -> Self {
        assert!(value >= 0.0 && value <= 1.0);
        Self(value)
    }

    pub const fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// A positive bar count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::OutOfRange {
                field: "period",
                value: 0.0,
                min: 1.0,
                max: usize::MAX as f64,
            });
        }
        Ok(Self(value))
    }

    /// Compile-time constructor for literals; panics on zero.
    pub const fn new_const(value: usize) -> Self {
        assert!(value > 0);
        Self(value)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0 as u64)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(deserializer)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

/// Minimal interface a bar type must provide.
///
/// Volume and timestamps are optional; detectors that use them degrade
/// gracefully when a feed carries neither.
pub trait Ohlcv {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    /// Traded volume, if the feed carries it.
    fn volume(&self) -> Option<f64> {
        None
    }

    /// Unix timestamp in seconds, if the feed carries it.
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Derived helpers available on every [`Ohlcv`] implementor.
pub trait OhlcvExt: Ohlcv {
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    fn midpoint(&self) -> f64 {
        (self.high() + self.low()) / 2.0
    }

    /// All four prices finite and positive, with the high/low actually
    /// bracketing the open and close.
    fn is_well_formed(&self) -> bool {
        let (o, h, l, c) = (self.open(), self.high(), self.low(), self.close());
        o.is_finite()
            && h.is_finite()
            && l.is_finite()
            && c.is_finite()
            && o > 0.0
            && h > 0.0
            && l > 0.0
            && c > 0.0
            && h >= l
            && h >= o.max(c)
            && l <= o.min(c)
    }
}

impl<T: Ohlcv> OhlcvExt for T {}

/// Expected direction of the move a formation precedes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
}

/// Every formation the built-in detectors can report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    HeadAndShoulders,
    InverseHeadAndShoulders,
    DoubleTop,
    DoubleBottom,
    RisingWedge,
    FallingWedge,
    CupAndHandle,
    BullishGartley,
    BearishGartley,
    BullishButterfly,
    BearishButterfly,
    BullishBat,
    BearishBat,
    BullishCrab,
    BearishCrab,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::AscendingTriangle => "ascending_triangle",
            PatternKind::DescendingTriangle => "descending_triangle",
            PatternKind::SymmetricalTriangle => "symmetrical_triangle",
            PatternKind::HeadAndShoulders => "head_and_shoulders",
            PatternKind::InverseHeadAndShoulders => "inverse_head_and_shoulders",
            PatternKind::DoubleTop => "double_top",
            PatternKind::DoubleBottom => "double_bottom",
            PatternKind::RisingWedge => "rising_wedge",
            PatternKind::FallingWedge => "falling_wedge",
            PatternKind::CupAndHandle => "cup_and_handle",
            PatternKind::BullishGartley => "bullish_gartley",
            PatternKind::BearishGartley => "bearish_gartley",
            PatternKind::BullishButterfly => "bullish_butterfly",
            PatternKind::BearishButterfly => "bearish_butterfly",
            PatternKind::BullishBat => "bullish_bat",
            PatternKind::BearishBat => "bearish_bat",
            PatternKind::BullishCrab => "bullish_crab",
            PatternKind::BearishCrab => "bearish_crab",
        }
    }

    /// Direction the formation usually resolves in; `None` where the
    /// breakout direction depends on context.
    pub fn typical_direction(&self) -> Option<Direction> {
        use PatternKind::*;
        match self {
            AscendingTriangle | InverseHeadAndShoulders | DoubleBottom | FallingWedge
            | CupAndHandle | BullishGartley | BullishButterfly | BullishBat | BullishCrab => {
                Some(Direction::Bullish)
            }
            DescendingTriangle | HeadAndShoulders | DoubleTop | RisingWedge | BearishGartley
            | BearishButterfly | BearishBat | BearishCrab => Some(Direction::Bearish),
            SymmetricalTriangle => None,
        }
    }

    /// Historical base rate of the formation resolving in its typical
    /// direction, used as a prior alongside the fitted confidence.
    pub fn base_probability(&self) -> f64 {
        use PatternKind::*;
        match self {
            AscendingTriangle => 0.72,
            DescendingTriangle => 0.70,
            SymmetricalTriangle => 0.55,
            HeadAndShoulders => 0.81,
            InverseHeadAndShoulders => 0.83,
            DoubleTop => 0.75,
            DoubleBottom => 0.78,
            RisingWedge => 0.68,
            FallingWedge => 0.71,
            CupAndHandle => 0.65,
            BullishGartley | BearishGartley => 0.62,
            BullishButterfly | BearishButterfly => 0.60,
            BullishBat | BearishBat => 0.64,
            BullishCrab | BearishCrab => 0.59,
        }
    }

    /// Trend the market should be in before the formation for it to
    /// carry its textbook meaning.
    pub fn expected_prior_trend(&self) -> Option<Direction> {
        use PatternKind::*;
        match self {
            AscendingTriangle | HeadAndShoulders | DoubleTop | RisingWedge | CupAndHandle
            | BearishGartley | BearishButterfly | BearishBat | BearishCrab => {
                Some(Direction::Bullish)
            }
            DescendingTriangle | InverseHeadAndShoulders | DoubleBottom | FallingWedge
            | BullishGartley | BullishButterfly | BullishBat | BullishCrab => {
                Some(Direction::Bearish)
            }
            SymmetricalTriangle => None,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One anchor of a formation: a bar index, the price level at it, and
/// the bar's timestamp when the feed has one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternPoint {
    pub index: usize,
    pub price: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PatternPoint {
    pub fn at<T: Ohlcv>(bars: &[T], index: usize, price: f64) -> Self {
        let timestamp = bars
            .get(index)
            .and_then(|b| b.timestamp())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        Self {
            index,
            price,
            timestamp,
        }
    }
}

/// A detected formation with its geometry and trade levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern_type: PatternKind,
    pub direction: Direction,
    /// Fit quality in `[0, 1]`.
    pub confidence: f64,
    /// Base rate prior for the pattern type.
    pub probability: f64,
    /// Anchor points in bar order.
    pub key_points: Vec<PatternPoint>,
    pub start_point: PatternPoint,
    pub end_point: PatternPoint,
    /// Price span between the highest and lowest anchor.
    pub pattern_height: f64,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    /// Level whose break confirms the formation.
    pub breakout_level: Option<f64>,
}

impl PatternMatch {
    /// Assemble a match from its anchors. Returns `None` when fewer than
    /// two anchors are given, any price is non-finite, or all anchors
    /// share one bar.
    pub fn from_key_points(
        pattern_type: PatternKind,
        direction: Direction,
        confidence: f64,
        mut key_points: Vec<PatternPoint>,
        target_price: Option<f64>,
        stop_loss: Option<f64>,
        breakout_level: Option<f64>,
    ) -> Option<Self> {
        if key_points.len() < 2 || key_points.iter().any(|p| !p.price.is_finite()) {
            return None;
        }
        key_points.sort_by_key(|p| p.index);
        let start_point = key_points[0];
        let end_point = key_points[key_points.len() - 1];
        if end_point.index <= start_point.index {
            return None;
        }

        let hi = key_points.iter().map(|p| p.price).fold(f64::MIN, f64::max);
        let lo = key_points.iter().map(|p| p.price).fold(f64::MAX, f64::min);

        Some(Self {
            pattern_type,
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            probability: pattern_type.base_probability(),
            key_points,
            start_point,
            end_point,
            pattern_height: hi - lo,
            target_price,
            stop_loss,
            breakout_level,
        })
    }

    /// Formation length in bars, inclusive of both ends.
    pub fn duration(&self) -> usize {
        self.end_point.index - self.start_point.index + 1
    }
}

/// Shared geometric and trading parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Bars a series must have before scanning is attempted.
    pub min_bars: usize,
    /// Relative tolerance for "equal" price levels.
    pub tolerance: f64,
    /// Matches scoring below this are dropped.
    pub min_confidence: f64,
    /// Bars on each side a pivot must dominate.
    pub pivot_radius: usize,
    /// Forward-trade horizon, in bars.
    pub holding_period_days: usize,
    /// Per-side commission as a fraction of notional.
    pub commission: f64,
    /// Fractional price slippage applied at entry and time exit.
    pub slippage: f64,
    /// Stop distance as a multiple of the pattern height.
    pub stop_loss_multiple: f64,
    /// Target distance as a multiple of the pattern height.
    pub target_multiple: f64,
    /// Minimum pattern height as a fraction of the mean anchor price;
    /// zero disables the gate.
    pub min_pattern_height: f64,
    /// Annual risk-free rate used by the statistics layer.
    pub risk_free_rate: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_bars: 30,
            tolerance: 0.02,
            min_confidence: 0.3,
            pivot_radius: 3,
            holding_period_days: 30,
            commission: 0.0005,
            slippage: 0.0005,
            stop_loss_multiple: 0.5,
            target_multiple: 1.0,
            min_pattern_height: 0.0,
            risk_free_rate: 0.04,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        Ratio::new(self.tolerance)?;
        Ratio::new(self.min_confidence)?;
        Ratio::new(self.commission)?;
        Ratio::new(self.slippage)?;
        Ratio::new(self.min_pattern_height)?;
        Period::new(self.pivot_radius)?;
        Period::new(self.holding_period_days)?;
        if self.tolerance == 0.0 {
            return Err(PatternError::InvalidConfig(
                "tolerance must be positive".into(),
            ));
        }
        if self.min_bars < 2 * self.pivot_radius + 1 {
            return Err(PatternError::InvalidConfig(format!(
                "min_bars {} cannot cover a pivot window of radius {}",
                self.min_bars, self.pivot_radius
            )));
        }
        for (field, value) in [
            ("stop_loss_multiple", self.stop_loss_multiple),
            ("target_multiple", self.target_multiple),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PatternError::OutOfRange {
                    field,
                    value,
                    min: f64::MIN_POSITIVE,
                    max: f64::MAX,
                });
            }
        }
        if !self.risk_free_rate.is_finite() || self.risk_free_rate < 0.0 {
            return Err(PatternError::InvalidValue(self.risk_free_rate));
        }
        Ok(())
    }
}

/// A single family of formations.
///
/// Detectors receive the precomputed pivots and the shared config; they
/// return every candidate they see and leave overlap resolution to the
/// aggregator.
pub trait FormationDetector {
    /// Stable identifier for the family.
    fn family(&self) -> &'static str;

    /// Fewest bars the family can make sense of.
    fn min_bars(&self) -> usize;

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        pivots: &Pivots,
        config: &AnalyzerConfig,
    ) -> Vec<PatternMatch>;

    /// Check the detector's own parameters.
    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

macro_rules! define_builtin_detectors {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        /// Enum dispatch over the built-in detector families, so an
        /// [`Analyzer`] can hold a heterogeneous set without boxing the
        /// generic [`FormationDetector::detect`] method.
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($ty),)+
        }

        $(
            impl From<$ty> for BuiltinDetector {
                fn from(detector: $ty) -> Self {
                    BuiltinDetector::$variant(detector)
                }
            }
        )+

        impl BuiltinDetector {
            /// One instance of every family, with default parameters.
            pub fn all_defaults() -> Vec<BuiltinDetector> {
                vec![$(BuiltinDetector::$variant(<$ty>::default()),)+]
            }

            pub fn family(&self) -> &'static str {
                match self {
                    $(BuiltinDetector::$variant(d) => d.family(),)+
                }
            }

            pub fn min_bars(&self) -> usize {
                match self {
                    $(BuiltinDetector::$variant(d) => d.min_bars(),)+
                }
            }

            pub fn detect<T: Ohlcv>(
                &self,
                bars: &[T],
                pivots: &Pivots,
                config: &AnalyzerConfig,
            ) -> Vec<PatternMatch> {
                match self {
                    $(BuiltinDetector::$variant(d) => d.detect(bars, pivots, config),)+
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(BuiltinDetector::$variant(d) => d.validate_config(),)+
                }
            }
        }
    };
}

define_builtin_detectors! {
    Triangle => TriangleDetector,
    HeadShoulders => HeadShouldersDetector,
    DoubleExtreme => DoubleExtremeDetector,
    Wedge => WedgeDetector,
    CupHandle => CupHandleDetector,
    Harmonic => HarmonicDetector,
}

/// Result of scanning one bar series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolScan {
    /// Deduplicated matches, strongest first.
    pub matches: Vec<PatternMatch>,
    /// Bars skipped for malformed prices.
    pub dropped_bars: usize,
}

/// One symbol's outcome from a parallel scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub scan: SymbolScan,
}

/// Scans bar series with a fixed set of detectors and configuration.
///
/// Built through [`Analyzer::builder`]; the builder validates the whole
/// setup once so scanning itself never fails on configuration.
#[derive(Debug, Clone)]
pub struct Analyzer {
    detectors: Vec<BuiltinDetector>,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Detect, filter, and rank formations in one series.
    ///
    /// Never fails: a series shorter than `min_bars` yields an empty scan,
    /// and malformed bars are counted in `dropped_bars` rather than
    /// aborting the symbol.
    pub fn scan<T: Ohlcv>(&self, bars: &[T]) -> SymbolScan {
        let dropped_bars = bars.iter().filter(|b| !b.is_well_formed()).count();
        if bars.len() < self.config.min_bars {
            debug!(
                bars = bars.len(),
                min_bars = self.config.min_bars,
                "series below min_bars"
            );
            return SymbolScan {
                matches: Vec::new(),
                dropped_bars,
            };
        }

        let pivots = find_pivots(bars, self.config.pivot_radius);

        let mut matches = Vec::new();
        for detector in &self.detectors {
            if bars.len() < detector.min_bars() {
                continue;
            }
            let found = detector.detect(bars, &pivots, &self.config);
            debug!(
                family = detector.family(),
                candidates = found.len(),
                "detector pass"
            );
            matches.extend(found);
        }
        matches.retain(|m| self.should_include(m));
        let matches = aggregate::dedupe_ranked(matches);
        debug!(
            matches = matches.len(),
            dropped_bars,
            bars = bars.len(),
            "scan complete"
        );

        SymbolScan {
            matches,
            dropped_bars,
        }
    }

    /// Scan many symbols on the rayon pool; reports come back sorted by
    /// symbol so output order does not depend on scheduling.
    pub fn scan_parallel<T>(&self, series: &[(String, Vec<T>)]) -> Vec<SymbolReport>
    where
        T: Ohlcv + Sync,
    {
        let mut reports: Vec<SymbolReport> = series
            .par_iter()
            .map(|(symbol, bars)| SymbolReport {
                symbol: symbol.clone(),
                scan: self.scan(bars),
            })
            .collect();
        reports.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        reports
    }

    /// Trade every match of a scan forward through the same series.
    pub fn backtest<T: Ohlcv>(&self, bars: &[T], scan: &SymbolScan) -> Vec<BacktestResult> {
        backtest::run(bars, &scan.matches, &self.config)
    }

    /// Per-pattern-type performance statistics for a set of results.
    pub fn statistics(
        &self,
        results: &[BacktestResult],
    ) -> BTreeMap<PatternKind, PatternStatistics> {
        stats::aggregate(results, self.config.risk_free_rate)
    }

    fn should_include(&self, m: &PatternMatch) -> bool {
        if m.confidence < self.config.min_confidence {
            return false;
        }
        if self.config.min_pattern_height > 0.0 {
            let mean_price =
                m.key_points.iter().map(|p| p.price).sum::<f64>() / m.key_points.len() as f64;
            if mean_price > 0.0 && m.pattern_height < self.config.min_pattern_height * mean_price {
                return false;
            }
        }
        true
    }
}

/// Configures and validates an [`Analyzer`].
#[derive(Debug, Default)]
pub struct AnalyzerBuilder {
    detectors: Vec<BuiltinDetector>,
    config: AnalyzerConfig,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
            config: AnalyzerConfig::default(),
        }
    }

    /// Register every built-in family with default parameters.
    pub fn with_all_defaults(mut self) -> Self {
        self.detectors = BuiltinDetector::all_defaults();
        self
    }

    /// Register one detector, keeping those already added.
    pub fn add(mut self, detector: impl Into<BuiltinDetector>) -> Self {
        self.detectors.push(detector.into());
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn min_confidence(mut self, min_confidence: f64) -> Self {
        self.config.min_confidence = min_confidence;
        self
    }

    pub fn pivot_radius(mut self, radius: usize) -> Self {
        self.config.pivot_radius = radius;
        self
    }

    pub fn build(self) -> Result<Analyzer> {
        if self.detectors.is_empty() {
            return Err(PatternError::InvalidConfig(
                "at least one detector must be registered".into(),
            ));
        }
        self.config.validate()?;
        for detector in &self.detectors {
            detector.validate_config()?;
        }
        Ok(Analyzer {
            detectors: self.detectors,
            config: self.config,
        })
    }
}
