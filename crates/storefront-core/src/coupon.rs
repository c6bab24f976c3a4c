//! Promo coupons.
//!
//! A [`Coupon`] is what the cart carries once a code has been accepted.
//! [`PromoRecord`] is the admin-side row behind a code.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::fields;
use crate::ids::ItemId;
use crate::money::{Amount, coerce_amount, format_rupiah};

/// How a coupon value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    /// Whole percent of the subtotal, rounded down
    Percent,
    /// Fixed Rupiah amount, capped at the subtotal
    Flat,
}

impl CouponKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for CouponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CouponKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(Self::Percent),
            "flat" => Ok(Self::Flat),
            other => Err(Error::validation_field(
                "type",
                format!("Unknown promo type: {other}"),
            )),
        }
    }
}

/// An accepted promo code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Upper-cased code
    pub code: String,
    /// Percent or flat
    #[serde(rename = "type")]
    pub kind: CouponKind,
    /// Percent (whole number) or Rupiah amount
    pub value: Amount,
    /// Subtotal required for the coupon to stay applied; 0 means none
    #[serde(default, alias = "min")]
    pub min_subtotal: Amount,
}

impl Coupon {
    /// Creates a coupon with no minimum. The code is trimmed and upper-cased.
    pub fn new(code: impl AsRef<str>, kind: CouponKind, value: Amount) -> Self {
        Self {
            code: code.as_ref().trim().to_uppercase(),
            kind,
            value,
            min_subtotal: 0,
        }
    }

    /// Sets the minimum subtotal.
    pub fn with_min(mut self, min_subtotal: Amount) -> Self {
        self.min_subtotal = min_subtotal.max(0);
        self
    }

    /// Discount for a subtotal. Never negative.
    ///
    /// # Examples
    ///
    /// ```
    /// use storefront_core::{Coupon, CouponKind};
    ///
    /// assert_eq!(Coupon::new("hemat10", CouponKind::Percent, 10).discount(25_005), 2_500);
    /// assert_eq!(Coupon::new("potong5", CouponKind::Flat, 5_000).discount(3_000), 3_000);
    /// ```
    pub fn discount(&self, subtotal: Amount) -> Amount {
        let subtotal = subtotal.max(0);
        let raw = match self.kind {
            CouponKind::Percent => subtotal.saturating_mul(self.value).div_euclid(100),
            CouponKind::Flat => subtotal.min(self.value),
        };
        raw.max(0)
    }

    /// Whether `subtotal` satisfies the coupon minimum.
    pub fn meets_minimum(&self, subtotal: Amount) -> bool {
        self.min_subtotal <= 0 || subtotal >= self.min_subtotal
    }

    /// Short label such as `HEMAT10 (10%)` or `POTONG5 (Rp5.000)`.
    pub fn label(&self) -> String {
        match self.kind {
            CouponKind::Percent => format!("{} ({}%)", self.code, self.value),
            CouponKind::Flat => format!("{} ({})", self.code, format_rupiah(self.value)),
        }
    }

    /// Interprets a `promo-validate` response for `code`.
    ///
    /// The response is accepted when `ok` or `valid` is truthy or `status`
    /// is `"ok"`. Terms are read from `data` when present, else from the
    /// response itself.
    pub fn from_validation(code: &str, response: &Value) -> std::result::Result<Self, CouponRejection> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CouponRejection::EmptyCode);
        }

        let empty = Map::new();
        let map = response.as_object().unwrap_or(&empty);
        let accepted = map.get("ok").is_some_and(fields::is_truthy)
            || map.get("valid").is_some_and(fields::is_truthy)
            || map.get("status").and_then(Value::as_str) == Some("ok");
        if !accepted {
            let error = map
                .get("error")
                .filter(|v| fields::is_truthy(v))
                .map(fields::as_text);
            return Err(CouponRejection::Invalid(error));
        }

        let data = map
            .get("data")
            .filter(|v| fields::is_truthy(v))
            .and_then(Value::as_object)
            .unwrap_or(map);
        let kind = data
            .get("type")
            .map(fields::as_text)
            .and_then(|t| t.parse::<CouponKind>().ok())
            .ok_or(CouponRejection::Malformed)?;
        let value = data.get("value").map(coerce_amount).unwrap_or(0);
        if value <= 0 {
            return Err(CouponRejection::Malformed);
        }
        let min = ["min_subtotal", "min_total", "minimum", "min"]
            .iter()
            .filter_map(|key| data.get(*key))
            .map(coerce_amount)
            .find(|m| *m > 0)
            .unwrap_or(0);

        Ok(Self::new(code, kind, value).with_min(min))
    }

    /// Built-in codes used when the promo backend is unreachable and the
    /// local fallback is enabled.
    pub fn local_fallback(code: &str) -> Option<Self> {
        let code = code.trim().to_uppercase();
        match code.as_str() {
            "HEMAT10" => Some(Self::new(code, CouponKind::Percent, 10)),
            "POTONG5" => Some(Self::new(code, CouponKind::Flat, 5000)),
            _ => None,
        }
    }
}

/// Why a code was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    /// No code was entered
    EmptyCode,
    /// The backend refused the code, with its error if it sent one
    Invalid(Option<String>),
    /// The backend accepted the code but sent unusable terms
    Malformed,
    /// The cart subtotal is below the coupon minimum
    BelowMinimum {
        /// Required subtotal
        min_subtotal: Amount,
    },
}

impl CouponRejection {
    /// User-facing message.
    pub fn message(&self) -> String {
        match self {
            Self::EmptyCode => "Masukkan kode promo".to_string(),
            Self::Invalid(Some(error)) => error.clone(),
            Self::Invalid(None) => "Kode promo tidak valid".to_string(),
            Self::Malformed => "Respon promo tidak valid".to_string(),
            Self::BelowMinimum { min_subtotal } => {
                format!("Minimal belanja {} untuk kode ini", format_rupiah(*min_subtotal))
            }
        }
    }
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

// ============================================================================
// PromoRecord
// ============================================================================

/// Admin-side promo row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoRecord {
    /// Backend row id; absent for a new promo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    /// Upper-cased code without whitespace
    pub code: String,
    /// Percent or flat
    #[serde(rename = "type")]
    pub kind: CouponKind,
    /// Percent or Rupiah amount
    pub value: Amount,
    /// Minimum subtotal, 0 for none
    #[serde(default)]
    pub min_subtotal: Amount,
    /// First valid day, `YYYY-MM-DD` or empty
    #[serde(default)]
    pub start: String,
    /// Last valid day, `YYYY-MM-DD` or empty
    #[serde(default)]
    pub end: String,
    /// Whether the code is currently usable
    #[serde(default)]
    pub active: bool,
    /// Free-form note
    #[serde(default)]
    pub note: String,
}

impl PromoRecord {
    /// Creates an active record with no period and no minimum.
    pub fn new(code: impl AsRef<str>, kind: CouponKind, value: Amount) -> Self {
        Self {
            id: None,
            code: normalize_code(code.as_ref()),
            kind,
            value,
            min_subtotal: 0,
            start: String::new(),
            end: String::new(),
            active: true,
            note: String::new(),
        }
    }

    /// Reads a row from a `promo-list` response. Unknown types default to
    /// percent; malformed numbers become zero.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let text = |key: &str| map.get(key).map(fields::as_text).unwrap_or_default();
        let kind = text("type").parse().unwrap_or(CouponKind::Percent);
        Some(Self {
            id: map.get("id").and_then(ItemId::from_value).filter(|id| !id.is_empty()),
            code: normalize_code(&text("code")),
            kind,
            value: map.get("value").map(coerce_amount).unwrap_or(0),
            min_subtotal: map.get("min_subtotal").map(coerce_amount).unwrap_or(0),
            start: text("start").trim().to_string(),
            end: text("end").trim().to_string(),
            active: map
                .get("active")
                .map(|v| fields::as_flag(v).unwrap_or_else(|| fields::is_truthy(v)))
                .unwrap_or(false),
            note: text("note").trim().to_string(),
        })
    }

    /// Checks the record before it is saved.
    pub fn validate(&self) -> Result<()> {
        if self.code.is_empty() {
            return Err(Error::validation_field("code", "Kode wajib diisi"));
        }
        if self.value <= 0 {
            return Err(Error::validation_field("value", "Nilai promo harus > 0"));
        }
        if self.kind == CouponKind::Percent && self.value > 100 {
            return Err(Error::validation_field("value", "Persentase promo maksimal 100"));
        }
        if self.min_subtotal < 0 {
            return Err(Error::validation_field("min_subtotal", "Minimal belanja tidak boleh negatif"));
        }

        let start = parse_day(&self.start, "start")?;
        let end = parse_day(&self.end, "end")?;
        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            return Err(Error::validation_field("end", "Periode tidak valid (akhir < mulai)"));
        }
        Ok(())
    }

    /// Human-readable period, `start → end` with `-` for open ends.
    pub fn period(&self) -> String {
        if self.start.is_empty() && self.end.is_empty() {
            return "-".to_string();
        }
        let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
        format!("{} → {}", or_dash(&self.start), or_dash(&self.end))
    }

    /// The coupon this record grants.
    pub fn to_coupon(&self) -> Coupon {
        Coupon::new(&self.code, self.kind, self.value).with_min(self.min_subtotal)
    }
}

fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

fn parse_day(raw: &str, field: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| Error::validation_field(field, format!("Tanggal tidak valid: {raw}")))
}
