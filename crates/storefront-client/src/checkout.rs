//! Checkout form and order payload.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use storefront_core::shipping::{ShippingMode, ShippingState, format_hhmm};
use storefront_core::store::CustomerProfile;
use storefront_core::{Cart, Coupon, Error, Result, Totals};

/// Error code the payment backend uses when the gateway is down.
pub const MIDTRANS_ERROR: &str = "midtrans_error";

/// Customer fields of the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Customer name
    pub name: String,
    /// Phone as typed
    pub phone: String,
    /// Address or pickup note
    pub address: String,
    /// Free-form note
    #[serde(default)]
    pub note: String,
}

impl CustomerDetails {
    /// Creates a form with an empty note.
    pub fn new(name: impl Into<String>, phone: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            phone: phone.into().trim().to_string(),
            address: address.into().trim().to_string(),
            note: String::new(),
        }
    }

    /// Sets the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into().trim().to_string();
        self
    }

    /// Prefills from a saved profile.
    pub fn from_profile(profile: &CustomerProfile) -> Self {
        Self::new(&profile.name, &profile.phone, &profile.addr)
    }

    /// First missing required field, in form order.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation_field("name", "Nama wajib diisi"));
        }
        if self.phone.trim().is_empty() {
            return Err(Error::validation_field("phone", "No. HP wajib diisi"));
        }
        if self.address.trim().is_empty() {
            return Err(Error::validation_field("address", "Alamat wajib diisi"));
        }
        Ok(())
    }

    /// Phone reduced to digits, or as typed when it has none.
    pub fn normalized_phone(&self) -> String {
        let digits: String = self.phone.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            self.phone.trim().to_string()
        } else {
            digits
        }
    }

    /// Profile saved after a successful checkout.
    pub fn to_profile(&self) -> CustomerProfile {
        CustomerProfile {
            name: self.name.trim().to_string(),
            phone: self.normalized_phone(),
            addr: self.address.trim().to_string(),
        }
    }
}

/// Everything an order is built from.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'a> {
    /// Cart lines
    pub cart: &'a Cart,
    /// Applied coupon, already checked against the minimum
    pub coupon: Option<&'a Coupon>,
    /// Shipping state
    pub shipping: &'a ShippingState,
    /// Local time of the order
    pub now: NaiveDateTime,
    /// Pickup lead time in minutes
    pub pickup_lead_minutes: i64,
    /// Where the payment page sends the customer afterwards
    pub finish_redirect_url: &'a str,
}

/// Builds the `create-order` payload.
pub fn order_payload(customer: &CustomerDetails, ctx: &OrderContext<'_>) -> Value {
    let totals = Totals::compute(ctx.cart, ctx.coupon);
    let shipping_fee = ctx.shipping.effective_fee();
    let items: Vec<Value> = ctx
        .cart
        .lines()
        .iter()
        .map(|l| json!({"id": l.id, "name": l.name, "qty": l.qty, "price": l.price}))
        .collect();
    let pickup_time = match ctx.shipping.mode {
        ShippingMode::Pickup => Value::String(format_hhmm(
            ctx.shipping
                .pickup_time_or_earliest(ctx.now, ctx.pickup_lead_minutes),
        )),
        ShippingMode::Delivery => Value::Null,
    };

    json!({
        "customer_name": customer.name.trim(),
        "phone": customer.normalized_phone(),
        "address": customer.address.trim(),
        "note": customer.note.trim(),
        "info": "",
        "items": items,
        "coupon_code": ctx.coupon.map(|c| c.code.as_str()).unwrap_or(""),
        "discount_value": totals.discount,
        "subtotal": totals.subtotal,
        "total": totals.total,
        "grand_total": totals.total + shipping_fee,
        "shipping_mode": ctx.shipping.mode.as_str(),
        "shipping_fee": shipping_fee,
        "shipping_dest": ctx.shipping.dest,
        "shipping_eta_min": ctx.shipping.order_eta_min(),
        "shipping_distance_km": ctx.shipping.order_distance_km(),
        "shipping_breakdown": ctx.shipping.breakdown,
        "shipping_quote": ctx.shipping.quote.as_ref().map(|q| &q.raw),
        "shipping_address": ctx.shipping.order_address(),
        "pickup_time": pickup_time,
        "finish_redirect_url": ctx.finish_redirect_url,
    })
}

/// Payment URL of a `create-order` answer.
pub fn payment_url(response: &Value) -> Option<String> {
    ["paymentUrl", "payment_url", "redirect_url"]
        .iter()
        .filter_map(|k| response.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Notice text for a failed `create-order` answer.
pub fn order_failure_message(response: &Value) -> String {
    match crate::envelope::error_of(response).as_deref() {
        Some(MIDTRANS_ERROR) => "Pembayaran tidak tersedia. Coba lagi.".to_string(),
        Some(crate::envelope::NETWORK_TIMEOUT) => "Terjadi kesalahan jaringan".to_string(),
        Some(other) => other.to_string(),
        None => "Gagal membuat transaksi".to_string(),
    }
}
