//! Chart formation detectors.
//!
//! One module per pattern family, all pure functions over bars + pivots:
//!
//! - **Triangle**: ascending, descending, symmetrical
//! - **Head-and-Shoulders**: regular and inverse
//! - **Double extreme**: double top, double bottom
//! - **Wedge**: rising (bearish), falling (bullish)
//! - **Cup-and-Handle**
//! - **Harmonic**: Gartley, Butterfly, Bat, Crab (Fibonacci leg ratios)

pub mod helpers;
pub mod scoring;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
    ($($detector:ty),* $(,)?) => {
        $(impl $detector {
            pub fn with_defaults() -> Self { Self::default() }
        })*
    };
}

pub mod cup_handle;
pub mod double_extreme;
pub mod harmonic;
pub mod head_shoulders;
pub mod triangle;
pub mod wedge;

pub use cup_handle::*;
pub use double_extreme::*;
pub use harmonic::*;
pub use head_shoulders::*;
pub use triangle::*;
pub use wedge::*;
