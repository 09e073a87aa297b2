//! Slippage calculations between an approved quote and a fresh one.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::Quote;

const BPS_PER_UNIT: Decimal = dec!(10000);

/// Pure comparison of an approved quote against a fresh one.
///
/// The tolerance is read from the original quote, so each operation kind
/// carries whatever tolerance its issuer chose.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlippagePolicy;

impl SlippagePolicy {
    /// Absolute price movement in basis points.
    ///
    /// Returns `None` when the original output is zero, which valid quotes
    /// never carry.
    #[must_use]
    pub fn bps(original: &Quote, fresh: &Quote) -> Option<Decimal> {
        let expected = original.output_amount();
        if expected.is_zero() {
            return None;
        }
        let moved = (fresh.output_amount() - expected).abs();
        Some(moved / expected * BPS_PER_UNIT)
    }

    /// Whether the movement exceeds the original quote's tolerance.
    ///
    /// An unmeasurable movement counts as exceeded.
    #[must_use]
    pub fn exceeded(original: &Quote, fresh: &Quote) -> bool {
        match Self::bps(original, fresh) {
            Some(bps) => bps > Decimal::from(original.slippage_tolerance_bps()),
            None => true,
        }
    }
}
