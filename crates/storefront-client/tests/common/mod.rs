//! Common test utilities and harness for storefront-client integration tests.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Value, json};
use storefront_client::transport::mock::{MockReply, MockTransport};
use storefront_client::{FixedClock, Storefront};
use storefront_core::LocalStore;
use storefront_core::StorefrontConfig;
use storefront_core::notice::CollectingNotifier;
use tempfile::TempDir;

/// Test harness for integration tests.
///
/// Holds a scripted transport, a collecting notifier, a fixed clock at
/// 2026-03-01 10:00 and a temporary store directory.
pub struct TestHarness {
    /// Scripted transport
    pub mock: Arc<MockTransport>,
    /// Notices emitted by the session
    pub notices: Arc<CollectingNotifier>,
    /// Session clock
    pub clock: Arc<FixedClock>,
    /// Store directory, removed on drop
    pub dir: TempDir,
    /// Configuration the session is built from
    pub config: StorefrontConfig,
}

impl TestHarness {
    /// Creates a harness with the default test configuration.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Creates a harness with a custom configuration.
    pub fn with_config(config: StorefrontConfig) -> Self {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Self {
            mock: Arc::new(MockTransport::default()),
            notices: Arc::new(CollectingNotifier::new()),
            clock: Arc::new(FixedClock::new(start)),
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
            config,
        }
    }

    /// Builds a session over the harness.
    pub fn shop(&self) -> Storefront {
        Storefront::builder(self.config.clone())
            .transport(self.mock.clone())
            .without_routes()
            .store(LocalStore::open(self.dir.path()).unwrap())
            .notifier(self.notices.clone())
            .clock(self.clock.clone())
            .build()
            .expect("Session should build")
    }

    /// Queues category and menu replies for one reload.
    pub fn script_catalog(&self) {
        self.mock
            .push_for("cat-list", MockReply::json(200, categories()));
        self.mock.push_for("menu-list", MockReply::json(200, menu()));
    }

    /// Builds a session and loads the catalog from the network.
    pub async fn loaded_shop(&self) -> Storefront {
        let shop = self.shop();
        self.script_catalog();
        shop.reload(true).await.expect("Catalog should load");
        shop
    }

    /// Bodies of requests sent to `route`.
    pub fn bodies_for(&self, route: &str) -> Vec<Value> {
        self.mock
            .requests()
            .into_iter()
            .filter(|r| r.url.contains(route))
            .map(|r| r.json())
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration pointing at fake hosts, with a 1 ms backoff.
pub fn test_config() -> StorefrontConfig {
    let mut config = StorefrontConfig {
        base: "https://order.test/exec".into(),
        ship_base: "https://ship.test".into(),
        admin_pin: "4321".into(),
        admin_token: "secret".into(),
        ..StorefrontConfig::default()
    };
    config.http.backoff_ms = 1;
    config
}

/// `cat-list` answer.
pub fn categories() -> Value {
    json!({"ok": true, "data": [
        {"id": 1, "name": "Makanan"},
        {"id": 2, "name": "Minuman"},
        {"id": 3, "name": "Best Seller"},
    ]})
}

/// `menu-list` answer: a cheese add-on limited to 2, a size option, and a
/// low-stock drink.
pub fn menu() -> Value {
    json!({"ok": true, "ver": 7, "data": [
        {
            "id": "NG", "name": "Nasi Goreng", "cat_id": 1, "price": 20000, "stock": 10, "active": "Y",
            "options": [{"key": "reg", "label": "Reguler"}, {"key": "jumbo", "label": "Jumbo", "price_delta": 5000}],
            "addons": [{"id": "KJ", "name": "Keju", "price": 3000, "max": 2}]
        },
        {"id": "ET", "name": "Es Teh", "cat_id": 2, "price": 5000, "stock": 2, "active": "Y"},
        {"id": "AG", "name": "Ayam Geprek", "cat_id": 3, "price": 18000, "stock": 4, "active": "Y"},
    ]})
}
