//! Cart totals.

use serde::Serialize;

use crate::cart::Cart;
use crate::coupon::Coupon;
use crate::money::Amount;

/// Subtotal, discount and total of a cart before shipping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Sum of line subtotals
    pub subtotal: Amount,
    /// Coupon discount
    pub discount: Amount,
    /// `max(0, subtotal - discount)`
    pub total: Amount,
}

impl Totals {
    /// Computes totals for a cart with an optional coupon.
    ///
    /// # Examples
    ///
    /// ```
    /// use storefront_core::{Cart, CartLine, Coupon, CouponKind, Totals};
    ///
    /// let mut cart = Cart::new();
    /// cart.add(CartLine::new("A", "Ayam", 10_000).with_qty(2), 10);
    /// let coupon = Coupon::new("POTONG5", CouponKind::Flat, 5_000);
    ///
    /// let t = Totals::compute(&cart, Some(&coupon));
    /// assert_eq!((t.subtotal, t.discount, t.total), (20_000, 5_000, 15_000));
    /// ```
    pub fn compute(cart: &Cart, coupon: Option<&Coupon>) -> Self {
        Self::from_subtotal(cart.subtotal(), coupon)
    }

    /// Computes totals from a known subtotal.
    pub fn from_subtotal(subtotal: Amount, coupon: Option<&Coupon>) -> Self {
        let discount = coupon.map(|c| c.discount(subtotal)).unwrap_or(0);
        Self {
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount).max(0),
        }
    }
}

/// Snapshot published to observers after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Total quantity in the cart
    pub count: u32,
    /// Totals before shipping
    pub totals: Totals,
    /// Shipping fee counted in the grand total
    pub shipping_fee: Amount,
    /// `totals.total + shipping_fee`
    pub grand_total: Amount,
    /// Applied coupon code
    pub coupon_code: Option<String>,
}

impl CartSummary {
    /// Builds a summary. The shipping fee is ignored for an empty cart.
    pub fn new(cart: &Cart, coupon: Option<&Coupon>, shipping_fee: Amount) -> Self {
        let totals = Totals::compute(cart, coupon);
        let shipping_fee = if cart.is_empty() {
            0
        } else {
            shipping_fee.max(0)
        };
        Self {
            count: cart.count(),
            totals,
            shipping_fee,
            grand_total: totals.total.saturating_add(shipping_fee),
            coupon_code: coupon.map(|c| c.code.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{Addon, CartLine, LineOption};
    use crate::coupon::CouponKind;

    #[test]
    fn test_totals_without_coupon() {
        let mut cart = Cart::new();
        cart.add(CartLine::new("A", "A", 12000).with_qty(3), 10);
        let t = Totals::compute(&cart, None);
        assert_eq!(t, Totals { subtotal: 36000, discount: 0, total: 36000 });
    }

    #[test]
    fn test_totals_with_options_and_addons() {
        let mut cart = Cart::new();
        let line = CartLine::new("B", "Burger", 20000)
            .with_qty(2)
            .with_option(Some(LineOption::new("l", "Large", 3000)))
            .with_addons(vec![Addon::new("c", "Cheese", 2000, 1)]);
        cart.add(line, 10);
        let t = Totals::compute(&cart, Some(&Coupon::new("P", CouponKind::Percent, 10)));
        assert_eq!(t.subtotal, 50000);
        assert_eq!(t.discount, 5000);
        assert_eq!(t.total, 45000);
    }

    #[test]
    fn test_summary_ignores_fee_for_empty_cart() {
        let s = CartSummary::new(&Cart::new(), None, 12000);
        assert_eq!(s.shipping_fee, 0);
        assert_eq!(s.grand_total, 0);
    }

    #[test]
    fn test_summary_grand_total() {
        let mut cart = Cart::new();
        cart.add(CartLine::new("A", "A", 10000).with_qty(2), 10);
        let coupon = Coupon::new("potong5", CouponKind::Flat, 5000);
        let s = CartSummary::new(&cart, Some(&coupon), 8000);
        assert_eq!(s.count, 2);
        assert_eq!(s.totals.total, 15000);
        assert_eq!(s.grand_total, 23000);
        assert_eq!(s.coupon_code.as_deref(), Some("POTONG5"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::cart::{Addon, CartLine, LineOption};
    use crate::coupon::CouponKind;
    use proptest::prelude::*;

    fn line_strategy() -> impl Strategy<Value = (u8, i64, u32, i64, Vec<(i64, u32)>)> {
        (
            0u8..20,
            0i64..200_000,
            1u32..20,
            -5_000i64..5_000,
            prop::collection::vec((0i64..20_000, 1u32..4), 0..3),
        )
    }

    proptest! {
        #[test]
        fn subtotal_matches_line_formula(lines in prop::collection::vec(line_strategy(), 0..8)) {
            let mut cart = Cart::new();
            for (i, (id, price, qty, delta, addons)) in lines.iter().enumerate() {
                let addons = addons
                    .iter()
                    .enumerate()
                    .map(|(j, (p, q))| Addon::new(format!("a{j}"), format!("Addon {j}"), *p, *q))
                    .collect();
                let line = CartLine::new(format!("M{id}"), "Menu", *price)
                    .with_qty(*qty)
                    .with_option(Some(LineOption::new(format!("o{i}"), "Opt", *delta)))
                    .with_addons(addons);
                cart.add(line, 1_000);
            }

            let expected: i64 = cart
                .lines()
                .iter()
                .map(|l| {
                    let delta = l.opt.as_ref().map(|o| o.price_delta).unwrap_or(0);
                    let addons: i64 = l.addons.iter().map(|a| a.price * i64::from(a.qty)).sum();
                    (l.price + delta + addons) * i64::from(l.qty)
                })
                .sum();
            prop_assert_eq!(cart.subtotal(), expected);
        }

        #[test]
        fn extreme_prices_saturate(
            lines in prop::collection::vec(
                (i64::MAX / 4..=i64::MAX, 0i64..=i64::MAX, 0i64..=i64::MAX, 1u32..1_000),
                1..4,
            ),
            percent in 0i64..=100,
            fee in 0i64..=i64::MAX,
        ) {
            let mut cart = Cart::new();
            for (i, (price, delta, addon, qty)) in lines.iter().enumerate() {
                let line = CartLine::new(format!("X{i}"), "Mahal", *price)
                    .with_qty(*qty)
                    .with_option(Some(LineOption::new("o", "Opt", *delta)))
                    .with_addons(vec![Addon::new("a", "Addon", *addon, 2)]);
                cart.add(line, i64::MAX);
            }

            let subtotal = cart.subtotal();
            let max_price = lines.iter().map(|l| l.0).max().unwrap_or(0);
            prop_assert!(subtotal >= max_price);
            for line in cart.lines() {
                let t = line.totals();
                prop_assert!(t.unit_total >= t.unit_base);
                prop_assert!(t.line_subtotal >= t.unit_total);
            }

            let coupon = Coupon::new("P", CouponKind::Percent, percent);
            let summary = CartSummary::new(&cart, Some(&coupon), fee);
            prop_assert!(summary.totals.discount >= 0);
            prop_assert!(summary.totals.total >= 0);
            prop_assert!(summary.totals.total <= subtotal);
            prop_assert!(summary.grand_total >= summary.totals.total);
        }

        #[test]
        fn total_never_negative(subtotal in 0i64..10_000_000, value in 1i64..20_000_000, percent in any::<bool>()) {
            let coupon = if percent {
                Coupon::new("P", CouponKind::Percent, value % 101)
            } else {
                Coupon::new("F", CouponKind::Flat, value)
            };
            let t = Totals::from_subtotal(subtotal, Some(&coupon));
            prop_assert!(t.total >= 0);
            prop_assert!(t.discount >= 0);
            prop_assert!(t.discount <= subtotal);
            prop_assert_eq!(t.total, subtotal - t.discount);
        }
    }
}
