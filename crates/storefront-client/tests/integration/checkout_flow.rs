//! Shopping session flows: cart, coupon, shipping quote and checkout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use storefront_client::session::{CART_ADJUSTED, COUPON_BELOW_MINIMUM};
use storefront_client::transport::mock::{MockReply, MockTransport};
use storefront_client::transport::{HttpResponse, Transport};
use storefront_client::{CheckoutOutcome, CustomerDetails, MenuSource, Storefront};
use storefront_core::product::{AddonPick, Selection};
use storefront_core::shipping::{GateBlock, LatLng, ShippingMode};
use storefront_core::{ItemId, LocalStore};

use crate::common::{TestHarness, categories, test_config};

fn jumbo_with_cheese(qty: u32, cheese: u32) -> Selection {
    Selection {
        option: Some("jumbo".into()),
        addons: vec![AddonPick::parse(&format!("KJ={cheese}")).unwrap()],
        qty,
    }
}

#[tokio::test]
async fn test_delivery_checkout_end_to_end() {
    let h = TestHarness::new();
    let shop = h.loaded_shop().await;

    // Cheese is capped at 2 per unit: (20000 + 5000 + 2 * 3000) * 2
    shop.add_to_cart(&ItemId::new("NG"), &jumbo_with_cheese(2, 5))
        .await
        .unwrap();
    assert_eq!(shop.summary().totals.subtotal, 62_000);

    h.mock.push_for(
        "promo-validate",
        MockReply::json(200, json!({"ok": true, "data": {"type": "percent", "value": 10, "min_subtotal": 50000}})),
    );
    shop.apply_coupon("hemat").await.unwrap();
    assert_eq!(shop.summary().totals.discount, 6_200);

    assert_eq!(shop.checkout_gate().await, Err(GateBlock::NoDestination));
    h.mock.push_for(
        "quote",
        MockReply::json(200, json!({"price": 12000, "eta_min": 30, "distance_km": 2.4})),
    );
    shop.set_destination(LatLng::new(3.59, 98.69), Some("Jl. Kenanga 5"))
        .await
        .unwrap();
    shop.flush_pending().await;
    assert_eq!(shop.checkout_gate().await, Ok(()));
    assert_eq!(shop.summary().grand_total, 67_800);

    h.mock.push_for(
        "create-order",
        MockReply::json(200, json!({"ok": true, "paymentUrl": "https://pay.test/abc"})),
    );
    let outcome = shop
        .checkout(&CustomerDetails::new("Sari", "+62 811 222", "Jl. Kenanga 5").with_note("tanpa sambal"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::Redirect {
            payment_url: "https://pay.test/abc".into()
        }
    );

    let order = h.bodies_for("create-order").pop().unwrap();
    assert_eq!(order["phone"], "62811222");
    assert_eq!(order["subtotal"], 62_000);
    assert_eq!(order["discount_value"], 6_200);
    assert_eq!(order["total"], 55_800);
    assert_eq!(order["grand_total"], 67_800);
    assert_eq!(order["shipping_fee"], 12_000);
    assert_eq!(order["shipping_distance_km"], 2.4);
    assert_eq!(order["shipping_address"], "Jl. Kenanga 5");
    assert_eq!(order["coupon_code"], "HEMAT");
    assert_eq!(order["items"][0]["qty"], 2);
    assert!(order["__meta__"]["t"].is_number());
}

#[tokio::test]
async fn test_pickup_bypasses_quote() {
    let h = TestHarness::new();
    let shop = h.loaded_shop().await;
    shop.add_to_cart(&ItemId::new("ET"), &Selection::default())
        .await
        .unwrap();

    assert_eq!(shop.checkout_gate().await, Err(GateBlock::NoDestination));
    shop.set_shipping_mode(ShippingMode::Pickup).await;
    assert_eq!(shop.checkout_gate().await, Ok(()));

    shop.set_pickup_time(chrono::NaiveTime::from_hms_opt(10, 15, 0))
        .await;
    assert!(matches!(
        shop.checkout_gate().await,
        Err(GateBlock::PickupTooEarly { lead_minutes: 30, .. })
    ));
}

#[tokio::test]
async fn test_reload_trims_cart_to_stock() {
    let h = TestHarness::new();
    let shop = h.loaded_shop().await;
    shop.add_to_cart(&ItemId::new("ET"), &Selection { qty: 2, ..Selection::default() })
        .await
        .unwrap();

    h.mock.push_for("cat-list", MockReply::json(200, categories()));
    h.mock.push_for(
        "menu-list",
        MockReply::json(200, json!([{"id": "ET", "name": "Es Teh", "cat_id": 2, "price": 5000, "stock": 1, "active": "Y"}])),
    );
    assert_eq!(shop.reload(true).await.unwrap(), MenuSource::Network);
    assert_eq!(shop.summary().count, 1);
    assert!(h.notices.contains(CART_ADJUSTED));
}

#[tokio::test]
async fn test_cart_restored_by_next_session() {
    let h = TestHarness::new();
    {
        let shop = h.loaded_shop().await;
        shop.add_to_cart(&ItemId::new("AG"), &Selection { qty: 3, ..Selection::default() })
            .await
            .unwrap();
    }

    let shop = h.shop();
    assert_eq!(shop.summary().count, 3);
    // The menu cache is still fresh, so only categories hit the network.
    h.mock.push_for("cat-list", MockReply::json(200, categories()));
    assert_eq!(shop.reload(false).await.unwrap(), MenuSource::Cache);
    assert_eq!(shop.snapshot().await.catalog.stock_of(&ItemId::new("AG")), 4);
}

#[tokio::test(start_paused = true)]
async fn test_revalidation_is_debounced() {
    let h = TestHarness::new();
    let shop = h.loaded_shop().await;
    shop.add_to_cart(&ItemId::new("NG"), &Selection::default())
        .await
        .unwrap();
    h.mock.push_for(
        "promo-validate",
        MockReply::json(200, json!({"ok": true, "type": "flat", "value": 2000})),
    );
    shop.apply_coupon("POTONG").await.unwrap();

    h.mock.push_for(
        "promo-validate",
        MockReply::json(200, json!({"ok": false, "error": "Kode kadaluarsa"})),
    );
    shop.set_qty(0, 2).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    shop.set_qty(0, 3).await.unwrap();
    assert!(shop.summary().coupon_code.is_some());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.bodies_for("promo-validate").len(), 2);
    assert_eq!(shop.summary().coupon_code, None);
    assert!(h.notices.contains("Kode kadaluarsa"));

    let last = h.bodies_for("promo-validate").pop().unwrap();
    assert_eq!(last["items"][0]["qty"], 3);
}

#[tokio::test]
async fn test_minimum_enforced_before_checkout() {
    let h = TestHarness::new();
    let shop = h.loaded_shop().await;
    shop.add_to_cart(&ItemId::new("NG"), &Selection { qty: 3, ..Selection::default() })
        .await
        .unwrap();
    h.mock.push_for(
        "promo-validate",
        MockReply::json(200, json!({"ok": true, "type": "percent", "value": 10, "min": 60000})),
    );
    shop.apply_coupon("MIN60").await.unwrap();

    shop.set_qty(0, 1).await.unwrap();
    assert!(h.notices.contains(COUPON_BELOW_MINIMUM));
    assert_eq!(shop.summary().totals.discount, 0);
}

/// Transport that answers from a mock after a delay.
struct SlowTransport {
    inner: MockTransport,
    delay: Duration,
}

#[async_trait]
impl Transport for SlowTransport {
    async fn post(&self, url: &str, body: String) -> storefront_client::Result<HttpResponse> {
        tokio::time::sleep(self.delay).await;
        self.inner.post(url, body).await
    }

    async fn get(&self, url: &str) -> storefront_client::Result<HttpResponse> {
        self.inner.get(url).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_checkout_while_in_flight_is_ignored() {
    let h = TestHarness::new();
    let slow = Arc::new(SlowTransport {
        inner: MockTransport::default(),
        delay: Duration::from_millis(200),
    });
    slow.inner.push_for("cat-list", MockReply::json(200, categories()));
    slow.inner.push_for("menu-list", MockReply::json(200, crate::common::menu()));
    slow.inner.push_for(
        "create-order",
        MockReply::json(200, json!({"paymentUrl": "https://pay.test/1"})),
    );

    let shop = Storefront::builder(test_config())
        .transport(slow.clone())
        .without_routes()
        .store(LocalStore::open(h.dir.path()).unwrap())
        .notifier(h.notices.clone())
        .clock(h.clock.clone())
        .build()
        .unwrap();
    shop.reload(true).await.unwrap();
    shop.add_to_cart(&ItemId::new("ET"), &Selection::default())
        .await
        .unwrap();
    shop.set_shipping_mode(ShippingMode::Pickup).await;

    let customer = CustomerDetails::new("Sari", "0811", "Ambil");
    let (a, b) = tokio::join!(shop.checkout(&customer), shop.checkout(&customer));
    let outcomes = [a.unwrap(), b.unwrap()];
    assert!(outcomes.contains(&CheckoutOutcome::Busy));
    assert!(outcomes.iter().any(|o| matches!(o, CheckoutOutcome::Redirect { .. })));
    let orders = slow
        .inner
        .requests()
        .into_iter()
        .filter(|r| r.url.contains("create-order"))
        .count();
    assert_eq!(orders, 1);
}
