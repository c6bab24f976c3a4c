//! Typed wrappers over the backend routes.
//!
//! [`StoreApi`] talks to the order backend (menu, categories, stock, promos,
//! orders). [`ShipApi`] talks to the shipping worker (quotes and
//! geocoding). Both sit on a [`BackendClient`] and turn explicit failure
//! envelopes into [`Error::Api`].

use serde::Serialize;
use serde_json::{Value, json};
use storefront_core::fields;
use storefront_core::shipping::{LatLng, Quote, QuoteRequest};
use storefront_core::{Cart, ItemId, PromoRecord};

use crate::client::BackendClient;
use crate::envelope;
use crate::error::{Error, Result};

/// Route names.
pub mod routes {
    /// Category list
    pub const CAT_LIST: &str = "cat-list";
    /// Menu list
    pub const MENU_LIST: &str = "menu-list";
    /// Create or update a menu item (admin)
    pub const MENU_SAVE: &str = "menu-save";
    /// Delete a menu item (admin)
    pub const MENU_DEL: &str = "menu-del";
    /// Create or update a category (admin)
    pub const CAT_SAVE: &str = "cat-save";
    /// Delete a category (admin)
    pub const CAT_DEL: &str = "cat-del";
    /// Upload an image as a data URL (admin)
    pub const UPLOAD_IMAGE: &str = "upload-image";
    /// Adjust stock by a delta (admin)
    pub const STOCK_ADJUST: &str = "stock-adjust";
    /// Promo list (admin)
    pub const PROMO_LIST: &str = "promo-list";
    /// Create or update a promo (admin)
    pub const PROMO_SAVE: &str = "promo-save";
    /// Delete a promo (admin)
    pub const PROMO_DEL: &str = "promo-del";
    /// Validate a promo code against a cart
    pub const PROMO_VALIDATE: &str = "promo-validate";
    /// Create an order and payment session
    pub const CREATE_ORDER: &str = "create-order";
    /// Shipping quote
    pub const QUOTE: &str = "quote";
    /// Forward geocoding
    pub const GEOCODE: &str = "geocode";
    /// Reverse geocoding
    pub const REVERSE: &str = "reverse";
}

/// Fails with [`Error::Api`] unless the envelope reports `ok`.
fn require_ok(route: &str, value: Value) -> Result<Value> {
    if envelope::is_ok(&value) && envelope::error_of(&value).is_none() {
        Ok(value)
    } else {
        tracing::debug!(route, error = ?envelope::error_of(&value), "Backend refused request");
        Err(Error::api_from(route, &value))
    }
}

/// Fails only on an explicit failure envelope; list endpoints often answer
/// with a bare array.
fn reject_failure(route: &str, value: Value) -> Result<Value> {
    if envelope::is_failure(&value) {
        Err(Error::api_from(route, &value))
    } else {
        Ok(value)
    }
}

/// Item in a `promo-validate` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoItem {
    /// Item id
    pub id: ItemId,
    /// Quantity
    pub qty: u32,
    /// Base unit price
    pub price: i64,
}

/// Builds the `promo-validate` payload for a cart.
pub fn promo_payload(code: &str, cart: &Cart) -> Value {
    let items: Vec<PromoItem> = cart
        .lines()
        .iter()
        .map(|l| PromoItem {
            id: l.id.clone(),
            qty: l.qty,
            price: l.price,
        })
        .collect();
    json!({"code": code.trim(), "items": items})
}

/// Menu fields sent by `menu-save`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuRecord {
    /// Row id; absent for a new item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Category name
    pub category: String,
    /// Base price, never negative
    pub price: i64,
    /// Stock, never negative
    pub stock: i64,
    /// Whether the item is listed
    pub active: bool,
    /// Image URL
    pub image_url: String,
}

/// Order backend API.
#[derive(Debug, Clone)]
pub struct StoreApi {
    client: BackendClient,
}

impl StoreApi {
    /// Wraps a client pointed at the order backend.
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    async fn rows(&self, route: &str, admin: bool) -> Result<Vec<Value>> {
        let value = reject_failure(route, self.client.post(route, Value::Null, admin).await)?;
        Ok(envelope::rows_of(&value).unwrap_or_default())
    }

    /// Raw category rows.
    pub async fn categories(&self) -> Result<Vec<Value>> {
        self.rows(routes::CAT_LIST, false).await
    }

    /// Raw menu rows.
    pub async fn menu(&self) -> Result<Vec<Value>> {
        self.rows(routes::MENU_LIST, false).await
    }

    /// Creates or updates a menu item.
    pub async fn menu_save(&self, record: &MenuRecord) -> Result<Value> {
        let payload = serde_json::to_value(record).map_err(storefront_core::Error::from)?;
        self.menu_save_raw(payload).await
    }

    /// Saves a full item row, keeping fields this client does not model.
    pub async fn menu_save_raw(&self, row: Value) -> Result<Value> {
        require_ok(routes::MENU_SAVE, self.client.post(routes::MENU_SAVE, row, true).await)
    }

    /// Deletes a menu item.
    pub async fn menu_delete(&self, id: &ItemId) -> Result<()> {
        let res = self.client.post(routes::MENU_DEL, json!({"id": id}), true).await;
        require_ok(routes::MENU_DEL, res).map(drop)
    }

    /// Creates (`id = None`) or renames a category.
    pub async fn category_save(&self, id: Option<&str>, name: &str) -> Result<()> {
        let mut payload = json!({"name": name});
        if let Some(id) = id.filter(|s| !s.is_empty()) {
            payload["id"] = Value::String(id.to_string());
        }
        let res = self.client.post(routes::CAT_SAVE, payload, true).await;
        require_ok(routes::CAT_SAVE, res).map(drop)
    }

    /// Deletes a category.
    pub async fn category_delete(&self, id: &str) -> Result<()> {
        let res = self.client.post(routes::CAT_DEL, json!({"id": id}), true).await;
        require_ok(routes::CAT_DEL, res).map(drop)
    }

    /// Uploads an image given as a data URL and returns its public URL.
    pub async fn upload_image(&self, data_url: &str, name: &str) -> Result<String> {
        let res = self
            .client
            .post(routes::UPLOAD_IMAGE, json!({"data_url": data_url, "name": name}), true)
            .await;
        let value = require_ok(routes::UPLOAD_IMAGE, res)?;
        value
            .get("url")
            .map(fields::as_text)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::invalid_response(routes::UPLOAD_IMAGE, "missing url"))
    }

    /// Adds `delta` (may be negative) to an item's stock.
    pub async fn stock_adjust(&self, item_id: &ItemId, delta: i64, note: &str) -> Result<()> {
        let payload = json!({"item_id": item_id, "delta": delta, "note": note});
        let res = self.client.post(routes::STOCK_ADJUST, payload, true).await;
        require_ok(routes::STOCK_ADJUST, res).map(drop)
    }

    /// Promo rows, sorted by code.
    pub async fn promo_list(&self) -> Result<Vec<PromoRecord>> {
        let rows = self.rows(routes::PROMO_LIST, true).await?;
        let mut promos: Vec<PromoRecord> = rows.iter().filter_map(PromoRecord::from_value).collect();
        promos.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(promos)
    }

    /// Creates or updates a promo. The record is validated first.
    pub async fn promo_save(&self, record: &PromoRecord) -> Result<()> {
        record.validate()?;
        let payload = serde_json::to_value(record).map_err(storefront_core::Error::from)?;
        let res = self.client.post(routes::PROMO_SAVE, payload, true).await;
        require_ok(routes::PROMO_SAVE, res).map(drop)
    }

    /// Deletes a promo.
    pub async fn promo_delete(&self, id: &ItemId) -> Result<()> {
        let res = self.client.post(routes::PROMO_DEL, json!({"id": id}), true).await;
        require_ok(routes::PROMO_DEL, res).map(drop)
    }

    /// Raw `promo-validate` envelope for `code` against `cart`.
    pub async fn promo_validate(&self, code: &str, cart: &Cart) -> Value {
        self.client
            .post(routes::PROMO_VALIDATE, promo_payload(code, cart), false)
            .await
    }

    /// Raw `create-order` envelope.
    pub async fn create_order(&self, payload: Value) -> Value {
        self.client.post(routes::CREATE_ORDER, payload, false).await
    }
}

/// A geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPlace {
    /// Display label
    pub label: String,
    /// Coordinates
    pub point: LatLng,
}

impl GeoPlace {
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let lat = map.get("lat").map(fields::as_f64)?;
        let lng = fields::pick(map, &["lng", "lon"]).map(fields::as_f64)?;
        let point = LatLng::new(lat, lng);
        if !point.lat.is_finite() || !point.lng.is_finite() {
            return None;
        }
        let label = fields::pick(map, &["label", "display_name", "name"])
            .map(fields::as_text)
            .unwrap_or_else(|| point.coord_label());
        Some(Self { label, point })
    }
}

/// Number of geocoding hits requested.
pub const GEOCODE_LIMIT: u32 = 8;

/// Language hint sent to the geocoder.
pub const GEOCODE_LANG: &str = "id";

/// Shipping worker API.
#[derive(Debug, Clone)]
pub struct ShipApi {
    client: BackendClient,
    origin: LatLng,
    radius_km: f64,
}

impl ShipApi {
    /// Wraps a client pointed at the shipping worker. Geocoding results
    /// farther than `radius_km` from `origin` are dropped.
    pub fn new(client: BackendClient, origin: LatLng, radius_km: f64) -> Self {
        Self {
            client,
            origin,
            radius_km,
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Store location used as the quote origin.
    pub fn origin(&self) -> LatLng {
        self.origin
    }

    /// Requests a quote.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote> {
        let payload = serde_json::to_value(request).map_err(storefront_core::Error::from)?;
        let value = self.client.post(routes::QUOTE, payload, false).await;
        let value = reject_failure(routes::QUOTE, value)?;
        Ok(Quote::from_value(&value))
    }

    /// Searches addresses near the store.
    pub async fn geocode(&self, query: &str) -> Result<Vec<GeoPlace>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let payload = json!({
            "q": query,
            "limit": GEOCODE_LIMIT,
            "lang": GEOCODE_LANG,
            "lat": self.origin.lat,
            "lon": self.origin.lng,
            "radius_km": self.radius_km,
        });
        let value = self.client.post(routes::GEOCODE, payload, false).await;
        let value = reject_failure(routes::GEOCODE, value)?;
        let rows = envelope::rows_of(&value)
            .or_else(|| value.get("results").and_then(Value::as_array).cloned())
            .unwrap_or_default();

        Ok(rows
            .iter()
            .filter_map(GeoPlace::from_value)
            .filter(|p| self.radius_km <= 0.0 || self.origin.haversine_km(&p.point) <= self.radius_km)
            .collect())
    }

    /// Label for a point, when the worker knows one.
    pub async fn reverse(&self, at: LatLng) -> Result<Option<String>> {
        let payload = json!({"lat": at.lat, "lon": at.lng, "lang": GEOCODE_LANG});
        let value = self.client.post(routes::REVERSE, payload, false).await;
        let value = reject_failure(routes::REVERSE, value)?;
        let map = value.get("data").filter(|d| d.is_object()).unwrap_or(&value);
        Ok(["label", "display_name", "address"]
            .iter()
            .filter_map(|k| map.get(*k))
            .map(fields::as_text)
            .find(|s| !s.trim().is_empty()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockReply, MockTransport};
    use std::sync::Arc;
    use storefront_core::CartLine;
    use storefront_core::config::HttpSettings;

    fn store(mock: &Arc<MockTransport>) -> StoreApi {
        let settings = HttpSettings {
            backoff_ms: 1,
            ..HttpSettings::default()
        };
        StoreApi::new(BackendClient::new(mock.clone(), "https://a.test", settings).with_admin_token("tok"))
    }

    fn ship(mock: &Arc<MockTransport>) -> ShipApi {
        let settings = HttpSettings {
            backoff_ms: 1,
            ..HttpSettings::default()
        };
        ShipApi::new(
            BackendClient::new(mock.clone(), "https://s.test", settings),
            LatLng::new(3.574856, 98.702053),
            10.0,
        )
    }

    #[tokio::test]
    async fn test_menu_rows_from_data() {
        let mock = Arc::new(MockTransport::with_json(json!({"ok": true, "data": [{"id": 1}], "ver": 3})));
        let rows = store(&mock).menu().await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_list_failure_is_error() {
        let mock = Arc::new(MockTransport::with_json(json!({"ok": false, "error": "sheet_missing"})));
        let err = store(&mock).categories().await.unwrap_err();
        assert_eq!(err.backend_message(), Some("sheet_missing"));
    }

    #[tokio::test]
    async fn test_admin_calls_carry_token() {
        let mock = Arc::new(MockTransport::with_json(json!({"ok": true})));
        store(&mock).menu_delete(&ItemId::new("M1")).await.unwrap();
        let body = mock.requests()[0].json();
        assert_eq!(body["id"], "M1");
        assert_eq!(body["admin_token"], "tok");
    }

    #[tokio::test]
    async fn test_mutation_without_ok_fails() {
        let mock = Arc::new(MockTransport::with_json(json!({})));
        let err = store(&mock).category_save(None, "Minuman").await.unwrap_err();
        assert!(matches!(err, Error::Api { ref route, message: None } if route == "cat-save"));
    }

    #[tokio::test]
    async fn test_upload_returns_url() {
        let mock = Arc::new(MockTransport::with_json(json!({"ok": true, "url": "https://img.test/a.png"})));
        let url = store(&mock).upload_image("data:image/png;base64,AA==", "a.png").await.unwrap();
        assert_eq!(url, "https://img.test/a.png");

        let mock = Arc::new(MockTransport::with_json(json!({"ok": true})));
        let err = store(&mock).upload_image("data:,", "a.png").await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_promo_list_sorted() {
        let mock = Arc::new(MockTransport::with_json(json!({"ok": true, "data": [
            {"id": "2", "code": "zeta", "type": "flat", "value": 5000, "active": true},
            {"id": "1", "code": "alpha", "type": "percent", "value": 10, "active": "FALSE"},
        ]})));
        let promos = store(&mock).promo_list().await.unwrap();
        let codes: Vec<&str> = promos.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["ALPHA", "ZETA"]);
        assert!(!promos[0].active);
    }

    #[tokio::test]
    async fn test_promo_save_validates_before_sending() {
        let mock = Arc::new(MockTransport::default());
        let record = PromoRecord::new("BIG", storefront_core::CouponKind::Percent, 150);
        assert!(store(&mock).promo_save(&record).await.is_err());
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_promo_payload() {
        let mut cart = Cart::new();
        cart.add(CartLine::new("A", "Ayam", 10_000).with_qty(2), 10);
        let payload = promo_payload(" hemat10 ", &cart);
        assert_eq!(payload, json!({"code": "hemat10", "items": [{"id": "A", "qty": 2, "price": 10000}]}));
    }

    #[tokio::test]
    async fn test_quote_error_field() {
        let mock = Arc::new(MockTransport::with_json(json!({"error": "bad_dest"})));
        let req = QuoteRequest {
            origin: LatLng::new(3.57, 98.70),
            dest: LatLng::new(3.58, 98.71),
            weight_kg: 1.0,
            order_time_local: "10:00".into(),
            rain: false,
            distance_km_override: None,
            address_text: String::new(),
        };
        let err = ship(&mock).quote(&req).await.unwrap_err();
        assert_eq!(err.backend_message(), Some("bad_dest"));
    }

    #[tokio::test]
    async fn test_geocode_filters_by_radius() {
        let mock = Arc::new(MockTransport::with_json(json!([
            {"label": "Dekat", "lat": 3.58, "lon": 98.70},
            {"label": "Jakarta", "lat": -6.2, "lon": 106.8},
            {"label": "Rusak"},
        ])));
        let places = ship(&mock).geocode("jalan").await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].label, "Dekat");
        let body = mock.requests()[0].json();
        assert_eq!(body["limit"], 8);
        assert_eq!(body["lang"], "id");
    }

    #[tokio::test]
    async fn test_reverse_label() {
        let mock = Arc::new(MockTransport::default());
        mock.push(MockReply::json(200, json!({"display_name": "Jl. Merdeka 1"})));
        let label = ship(&mock).reverse(LatLng::new(3.58, 98.70)).await.unwrap();
        assert_eq!(label.as_deref(), Some("Jl. Merdeka 1"));
    }
}
