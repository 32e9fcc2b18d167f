//! Portfolio analytics: allocation, drift, suitability and goal math.
//!
//! Every function here is pure: it reads the client graph and returns a
//! report. Nothing in this module touches storage or the network.

pub mod allocation;
pub mod drift;
pub mod goals;
pub mod optimize;
pub mod suitability;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::dec_to_f64;

/// `part / whole` as a percentage. A non-positive whole yields 0.
pub fn pct(part: Decimal, whole: Decimal) -> f64 {
    if whole <= Decimal::ZERO {
        return 0.0;
    }
    dec_to_f64(part * dec!(100) / whole)
}
