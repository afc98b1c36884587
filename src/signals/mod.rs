//! Index-level indicators
//!
//! Each indicator transforms one date-aligned input series (normally the
//! benchmark index) into a named raw column. Warm-up dates are `None`.

pub mod core;
pub mod momentum;
pub mod price_breadth;
pub mod rsi;
pub mod volatility;

pub use self::core::{Indicator, IndicatorColumn};
pub use momentum::Momentum;
pub use price_breadth::PriceBreadth;
pub use rsi::Rsi;
pub use volatility::VolatilityRegime;
