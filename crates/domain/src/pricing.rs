//! Order pricing.

use common::Money;
use serde::{Deserialize, Serialize};

/// Flat shipping fee charged on every order, in minor units.
pub const SHIPPING_FEE_CENTS: i64 = 100;

/// Tax charged as a whole-number percentage of the subtotal.
pub const TAX_RATE_PERCENT: u32 = 12;

/// Pricing breakdown computed once at checkout and stored on the order.
///
/// Never recomputed from the lines afterwards; later fee or rate changes
/// must not retroactively alter placed orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub tax: Money,
    pub total: Money,
}

impl Pricing {
    /// Computes the breakdown for a subtotal: flat shipping fee, tax at
    /// [`TAX_RATE_PERCENT`] rounded half-up to the minor unit, and the sum.
    pub fn compute(subtotal: Money) -> Self {
        let shipping_fee = Money::from_cents(SHIPPING_FEE_CENTS);
        let tax = subtotal.percentage(TAX_RATE_PERCENT);
        Self {
            subtotal,
            shipping_fee,
            tax,
            total: subtotal + shipping_fee + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_breakdown() {
        let pricing = Pricing::compute(Money::from_cents(2000));
        assert_eq!(pricing.subtotal.cents(), 2000);
        assert_eq!(pricing.shipping_fee.cents(), 100);
        assert_eq!(pricing.tax.cents(), 240);
        assert_eq!(pricing.total.cents(), 2340);
    }

    #[test]
    fn tax_rounds_to_minor_unit() {
        // 12% of 1999 is 239.88, rounds to 240.
        let pricing = Pricing::compute(Money::from_cents(1999));
        assert_eq!(pricing.tax.cents(), 240);
        assert_eq!(pricing.total.cents(), 1999 + 100 + 240);
    }

    #[test]
    fn zero_subtotal_still_charges_shipping() {
        let pricing = Pricing::compute(Money::zero());
        assert_eq!(pricing.tax.cents(), 0);
        assert_eq!(pricing.total.cents(), SHIPPING_FEE_CENTS);
    }
}
