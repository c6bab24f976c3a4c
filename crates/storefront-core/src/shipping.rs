//! Shipping state and the checkout gate.
//!
//! Delivery orders need a destination, an address label and a quote from
//! the shipping worker. Any change to the destination or the parcel weight
//! drops the current quote, so a quote held in [`ShippingState`] is always
//! fresh for the current inputs.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::fields;
use crate::money::{Amount, coerce_amount, format_rupiah};

/// Earth radius used for great-circle distances, in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default parcel weight in kg.
pub const DEFAULT_WEIGHT_KG: f64 = 1.0;

/// Smallest accepted parcel weight in kg.
pub const MIN_WEIGHT_KG: f64 = 0.1;

/// Reason shown when the worker refuses a destination without one.
pub const DEFAULT_UNDELIVERABLE_REASON: &str = "Di luar jangkauan";

/// Address label sent for pickup orders without an address.
pub const PICKUP_ADDRESS: &str = "Ambil di Toko";

/// Delivery or pickup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMode {
    /// Courier delivery to a destination
    #[default]
    Delivery,
    /// Customer collects the order at the store
    Pickup,
}

impl ShippingMode {
    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Pickup => "pickup",
        }
    }
}

impl fmt::Display for ShippingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShippingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivery" | "antar" => Ok(Self::Delivery),
            "pickup" | "ambil" => Ok(Self::Pickup),
            other => Err(Error::validation_field(
                "mode",
                format!("Unknown shipping mode: {other}"),
            )),
        }
    }
}

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl LatLng {
    /// Creates a point.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in km.
    ///
    /// # Examples
    ///
    /// ```
    /// use storefront_core::LatLng;
    ///
    /// let a = LatLng::new(3.574856, 98.702053);
    /// assert!(a.haversine_km(&a) < 1e-9);
    /// ```
    pub fn haversine_km(&self, other: &LatLng) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Whether two points are the same pick (within 1e-6 degrees).
    pub fn same_point(&self, other: &LatLng) -> bool {
        (self.lat - other.lat).abs() < 1e-6 && (self.lng - other.lng).abs() < 1e-6
    }

    /// Coordinate label used when no address is known.
    pub fn coord_label(&self) -> String {
        format!("{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Driving route from the store to the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Road distance in km
    pub distance_km: f64,
    /// Estimated driving time in minutes
    #[serde(default)]
    pub eta_min: Option<i64>,
    /// Route geometry (GeoJSON), kept for map display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
}

/// Shipping worker quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Fee, absent when the worker sent none
    pub price: Option<Amount>,
    /// `false` only when the worker explicitly refused the destination
    pub deliverable: bool,
    /// Distance the worker priced, in km
    pub distance_km: Option<f64>,
    /// Worker ETA in minutes
    pub eta_min: Option<i64>,
    /// Fee breakdown as sent by the worker
    pub breakdown: Option<Value>,
    /// Refusal reason
    pub reason: Option<String>,
    /// The response as received, forwarded with the order
    pub raw: Value,
}

impl Quote {
    /// Reads a `quote` response.
    pub fn from_value(value: &Value) -> Self {
        let get = |key: &str| value.get(key).filter(|v| !v.is_null());
        Self {
            price: get("price").map(coerce_amount),
            deliverable: get("deliverable") != Some(&Value::Bool(false)),
            distance_km: get("distance_km").map(fields::as_f64),
            eta_min: get("eta_min").map(|v| fields::as_f64(v).round() as i64),
            breakdown: get("breakdown").filter(|v| fields::is_truthy(v)).cloned(),
            reason: get("reason")
                .map(fields::as_text)
                .filter(|s| !s.is_empty()),
            raw: value.clone(),
        }
    }
}

/// What applying a quote did.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    /// A fee was set
    Priced {
        /// The fee
        fee: Amount,
    },
    /// The destination is outside the delivery area
    Undeliverable {
        /// Reason to show the customer
        reason: String,
    },
}

/// Payload of a `quote` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRequest {
    /// Store location
    pub origin: LatLng,
    /// Destination
    pub dest: LatLng,
    /// Parcel weight in kg
    pub weight_kg: f64,
    /// Local order time, `HH:MM`
    pub order_time_local: String,
    /// Rain surcharge flag; always `false`
    pub rain: bool,
    /// Route distance rounded to 2 decimals, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km_override: Option<f64>,
    /// Destination label
    pub address_text: String,
}

/// Why checkout is blocked by shipping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateBlock {
    /// Delivery without a destination or address label
    NoDestination,
    /// Delivery without a quote for the current destination and weight
    QuotePending,
    /// The worker refused the destination
    Undeliverable {
        /// Reason to show the customer
        reason: String,
    },
    /// The quote carries no usable fee
    InvalidFee,
    /// Pickup time earlier than the lead time allows
    PickupTooEarly {
        /// Required lead time in minutes
        lead_minutes: i64,
        /// Earliest acceptable time
        earliest: NaiveTime,
    },
}

impl GateBlock {
    /// User-facing message.
    pub fn message(&self) -> String {
        match self {
            Self::NoDestination => "Pilih lokasi pengantaran terlebih dahulu".to_string(),
            Self::QuotePending => "Ongkir belum dihitung".to_string(),
            Self::Undeliverable { reason } => reason.clone(),
            Self::InvalidFee => "Ongkir tidak valid".to_string(),
            Self::PickupTooEarly { lead_minutes, .. } => {
                format!("Waktu ambil minimal {lead_minutes} menit dari sekarang")
            }
        }
    }
}

impl fmt::Display for GateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Earliest pickup moment: `now + lead_minutes`, truncated to the minute.
/// May fall on the next day.
pub fn earliest_pickup(now: NaiveDateTime, lead_minutes: i64) -> NaiveDateTime {
    let t = now
        .checked_add_signed(Duration::minutes(lead_minutes))
        .unwrap_or(now);
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Formats a time as `HH:MM`.
pub fn format_hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Parses `HH:MM` (or `HH:MM:SS`).
pub fn parse_hhmm(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| Error::validation_field("pickup_time", format!("Waktu tidak valid: {raw}")))
}

fn clamp_weight(kg: f64) -> f64 {
    let kg = if kg.is_finite() && kg != 0.0 {
        kg
    } else {
        DEFAULT_WEIGHT_KG
    };
    kg.max(MIN_WEIGHT_KG)
}

/// Shipping choices and the latest quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingState {
    /// Delivery or pickup
    #[serde(default)]
    pub mode: ShippingMode,
    /// Destination point
    #[serde(default)]
    pub dest: Option<LatLng>,
    /// Destination label
    #[serde(default)]
    pub address: Option<String>,
    /// Parcel weight in kg
    #[serde(default = "default_weight")]
    pub weight_kg: f64,
    /// Route to the destination
    #[serde(default)]
    pub route: Option<Route>,
    /// Quote for the current destination and weight
    #[serde(default)]
    pub quote: Option<Quote>,
    /// Fee from the quote
    #[serde(default)]
    pub fee: Option<Amount>,
    /// ETA from the quote or the route
    #[serde(default)]
    pub eta_min: Option<i64>,
    /// Distance from the quote or the route
    #[serde(default)]
    pub distance_km: Option<f64>,
    /// Fee breakdown from the quote
    #[serde(default)]
    pub breakdown: Option<Value>,
    /// Requested pickup time
    #[serde(default)]
    pub pickup_time: Option<NaiveTime>,
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT_KG
}

impl Default for ShippingState {
    fn default() -> Self {
        Self {
            mode: ShippingMode::Delivery,
            dest: None,
            address: None,
            weight_kg: DEFAULT_WEIGHT_KG,
            route: None,
            quote: None,
            fee: None,
            eta_min: None,
            distance_km: None,
            breakdown: None,
            pickup_time: None,
        }
    }
}

impl ShippingState {
    /// Creates a delivery state with the default weight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches between delivery and pickup.
    pub fn set_mode(&mut self, mode: ShippingMode) {
        self.mode = mode;
    }

    /// Sets the destination and its label. The route is kept only if the
    /// point did not move; the quote is always dropped.
    pub fn set_destination(&mut self, dest: LatLng, address: impl Into<String>) {
        let same = self.dest.is_some_and(|prev| prev.same_point(&dest));
        if !same {
            self.route = None;
        }
        self.dest = Some(dest);
        let address = address.into();
        self.address = if address.trim().is_empty() {
            Some(dest.coord_label())
        } else {
            Some(address)
        };
        self.invalidate_quote();
    }

    /// Sets the parcel weight (at least 0.1 kg; zero or non-finite input
    /// means the default). Returns `true` if the weight changed, in which
    /// case the quote is dropped.
    pub fn set_weight(&mut self, kg: f64) -> bool {
        let kg = clamp_weight(kg);
        if (kg - self.weight_kg).abs() < f64::EPSILON {
            return false;
        }
        self.weight_kg = kg;
        self.invalidate_quote();
        true
    }

    /// Records the route to the current destination.
    pub fn set_route(&mut self, route: Route) {
        self.route = Some(route);
    }

    /// Sets the requested pickup time.
    pub fn set_pickup_time(&mut self, time: Option<NaiveTime>) {
        self.pickup_time = time;
    }

    /// Drops the quote and everything derived from it.
    pub fn invalidate_quote(&mut self) {
        self.quote = None;
        self.fee = None;
        self.eta_min = None;
        self.distance_km = None;
        self.breakdown = None;
    }

    /// Builds the quote request for the current destination, or `None`
    /// when no destination is set.
    pub fn quote_request(&self, origin: LatLng, now: NaiveTime) -> Option<QuoteRequest> {
        let dest = self.dest?;
        let distance = self.route.as_ref().map(|r| r.distance_km).unwrap_or(0.0);
        Some(QuoteRequest {
            origin,
            dest,
            weight_kg: self.weight_kg,
            order_time_local: format_hhmm(now),
            rain: false,
            distance_km_override: (distance > 0.0).then(|| (distance * 100.0).round() / 100.0),
            address_text: self.address.clone().unwrap_or_default(),
        })
    }

    /// Applies a worker quote.
    pub fn apply_quote(&mut self, quote: Quote) -> QuoteOutcome {
        if !quote.deliverable {
            let reason = quote
                .reason
                .clone()
                .unwrap_or_else(|| DEFAULT_UNDELIVERABLE_REASON.to_string());
            self.invalidate_quote();
            self.fee = Some(0);
            self.quote = Some(quote);
            return QuoteOutcome::Undeliverable { reason };
        }

        let route_eta = self.route.as_ref().and_then(|r| r.eta_min);
        let route_distance = self.route.as_ref().map(|r| r.distance_km);
        self.fee = quote.price;
        self.eta_min = quote.eta_min.or(route_eta);
        self.distance_km = quote.distance_km.or(route_distance);
        self.breakdown = quote.breakdown.clone();
        let fee = quote.price.unwrap_or(0);
        self.quote = Some(quote);
        QuoteOutcome::Priced { fee }
    }

    /// Fee counted in the order: zero for pickup, the quoted fee otherwise.
    pub fn effective_fee(&self) -> Amount {
        match self.mode {
            ShippingMode::Pickup => 0,
            ShippingMode::Delivery => self.fee.filter(|f| *f >= 0).unwrap_or(0),
        }
    }

    /// ETA sent with the order.
    pub fn order_eta_min(&self) -> Option<i64> {
        self.eta_min
            .or_else(|| self.route.as_ref().and_then(|r| r.eta_min))
    }

    /// Distance sent with the order.
    pub fn order_distance_km(&self) -> Option<f64> {
        self.distance_km
            .or_else(|| self.route.as_ref().map(|r| r.distance_km).filter(|d| *d > 0.0))
    }

    /// Address sent with the order.
    pub fn order_address(&self) -> String {
        match (&self.address, self.mode) {
            (Some(a), _) if !a.is_empty() => a.clone(),
            (_, ShippingMode::Pickup) => PICKUP_ADDRESS.to_string(),
            _ => String::new(),
        }
    }

    /// Pickup time sent with the order, defaulting to the earliest allowed.
    pub fn pickup_time_or_earliest(&self, now: NaiveDateTime, lead_minutes: i64) -> NaiveTime {
        self.pickup_time
            .unwrap_or_else(|| earliest_pickup(now, lead_minutes).time())
    }

    /// Checks whether shipping allows checkout at `now`.
    ///
    /// A requested pickup time is taken on the day of `now`, so once the
    /// lead time crosses midnight every requested time is too early.
    pub fn checkout_gate(&self, now: NaiveDateTime, lead_minutes: i64) -> std::result::Result<(), GateBlock> {
        match self.mode {
            ShippingMode::Pickup => {
                let earliest = earliest_pickup(now, lead_minutes);
                let Some(time) = self.pickup_time else {
                    return Ok(());
                };
                if now.date().and_time(time) < earliest {
                    return Err(GateBlock::PickupTooEarly {
                        lead_minutes,
                        earliest: earliest.time(),
                    });
                }
                Ok(())
            }
            ShippingMode::Delivery => {
                let has_address = self.address.as_deref().is_some_and(|a| !a.trim().is_empty());
                if self.dest.is_none() || !has_address {
                    return Err(GateBlock::NoDestination);
                }
                let quote = self.quote.as_ref().ok_or(GateBlock::QuotePending)?;
                if !quote.deliverable {
                    return Err(GateBlock::Undeliverable {
                        reason: quote
                            .reason
                            .clone()
                            .unwrap_or_else(|| DEFAULT_UNDELIVERABLE_REASON.to_string()),
                    });
                }
                match self.fee {
                    Some(fee) if fee >= 0 => Ok(()),
                    _ => Err(GateBlock::InvalidFee),
                }
            }
        }
    }

    /// One-line status, e.g. `≈ 3.21 km • Rp12.000`.
    pub fn pill(&self) -> String {
        let km = self
            .route
            .as_ref()
            .filter(|r| r.distance_km > 0.0)
            .map(|r| format!("≈ {:.2} km", r.distance_km));
        let fee = self.fee.map(|f| format!("• {}", format_rupiah(f)));
        [km, fee].into_iter().flatten().collect::<Vec<_>>().join(" ")
    }
}
