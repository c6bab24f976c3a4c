//! Rupiah amounts.

use serde_json::Value;

use crate::fields;

/// A whole-Rupiah amount.
pub type Amount = i64;

/// Coerces a backend value to an amount, rounding fractional input.
/// Malformed input is zero.
pub fn coerce_amount(value: &Value) -> Amount {
    fields::as_f64(value).round() as Amount
}

/// Formats an amount as `Rp12.345`.
///
/// # Examples
///
/// ```
/// use storefront_core::format_rupiah;
///
/// assert_eq!(format_rupiah(15000), "Rp15.000");
/// assert_eq!(format_rupiah(-5000), "-Rp5.000");
/// assert_eq!(format_rupiah(0), "Rp0");
/// ```
pub fn format_rupiah(amount: Amount) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-Rp{grouped}")
    } else {
        format!("Rp{grouped}")
    }
}
