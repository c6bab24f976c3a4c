//! Command-level tests for storefront-cli over a scripted backend.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use serde_json::{Value, json};
use storefront_cli::cli::Cli;
use storefront_cli::commands::App;
use storefront_client::transport::mock::{MockReply, MockTransport};
use storefront_client::{FixedClock, Storefront};
use storefront_core::notice::CollectingNotifier;
use storefront_core::{LocalStore, StorefrontConfig};
use tempfile::TempDir;

struct Harness {
    mock: Arc<MockTransport>,
    notices: Arc<CollectingNotifier>,
    _dir: TempDir,
    shop: Storefront,
}

impl Harness {
    async fn new() -> Self {
        let mut config = StorefrontConfig {
            base: "https://order.test/exec".into(),
            admin_pin: "4321".into(),
            ..StorefrontConfig::default()
        };
        config.http.backoff_ms = 1;

        let mock = Arc::new(MockTransport::default());
        let notices = Arc::new(CollectingNotifier::new());
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let now = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let shop = Storefront::builder(config)
            .transport(mock.clone())
            .without_routes()
            .store(LocalStore::open(dir.path()).unwrap())
            .notifier(notices.clone())
            .clock(Arc::new(FixedClock::new(now)))
            .build()
            .expect("Session should build");

        mock.push_for("cat-list", MockReply::json(200, categories()));
        mock.push_for("menu-list", MockReply::json(200, menu()));
        shop.reload(true).await.expect("Catalog should load");
        notices.take();

        Self {
            mock,
            notices,
            _dir: dir,
            shop,
        }
    }

    /// Runs one command line; returns stdout, stderr and the result.
    async fn run(&self, args: &[&str]) -> (String, String, storefront_cli::Result<()>) {
        let cli = Cli::try_parse_from(std::iter::once("storefront").chain(args.iter().copied())).unwrap();
        let app = App::with_session(self.shop.clone(), self.notices.clone(), cli.json);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = app.execute(cli.command, &mut out, &mut err).await;
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap(), result)
    }
}

fn categories() -> Value {
    json!({"ok": true, "data": [
        {"id": 1, "name": "Makanan"},
        {"id": 3, "name": "Best Seller"},
    ]})
}

fn menu() -> Value {
    json!({"ok": true, "data": [
        {
            "id": "NG", "name": "Nasi Goreng", "cat_id": 1, "price": 20000, "stock": 10, "active": "Y",
            "options": [{"key": "reg", "label": "Reguler"}, {"key": "jumbo", "label": "Jumbo", "price_delta": 5000}],
            "addons": [{"id": "KJ", "name": "Keju", "price": 3000, "max": 2}]
        },
        {"id": "AG", "name": "Ayam Geprek", "cat_id": 3, "price": 18000, "stock": 4, "active": "Y"},
    ]})
}

#[tokio::test]
async fn test_menu_lists_sections_from_cache() {
    let h = Harness::new().await;
    let before = h.mock.request_count();

    let (out, _, result) = h.run(&["menu"]).await;
    result.unwrap();
    assert!(out.starts_with("Best Seller\n"));
    assert!(out.contains("Ayam Geprek"));
    assert!(out.contains("Menu\n"));
    assert!(out.contains("Nasi Goreng"));
    assert_eq!(h.mock.request_count(), before);
}

#[tokio::test]
async fn test_cart_add_prints_totals_and_notice() {
    let h = Harness::new().await;

    let (out, err, result) = h
        .run(&["cart", "add", "NG", "--option", "jumbo", "--addon", "KJ=1", "--qty", "2"])
        .await;
    result.unwrap();
    assert!(out.contains("Rp56.000"));
    assert!(out.ends_with("Total    : Rp56.000\n"));
    assert!(err.starts_with("info: "));
}

#[tokio::test]
async fn test_cart_line_zero_is_rejected() {
    let h = Harness::new().await;
    let (_, _, result) = h.run(&["cart", "remove", "0"]).await;
    assert!(matches!(result, Err(storefront_cli::Error::Usage(_))));
}

#[tokio::test]
async fn test_json_cart_output() {
    let h = Harness::new().await;
    h.run(&["cart", "add", "AG"]).await.2.unwrap();

    let (out, _, result) = h.run(&["--json", "cart"]).await;
    result.unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["lines"].as_array().unwrap().len(), 1);
    assert_eq!(value["summary"]["grand_total"], 18000);
}

#[tokio::test]
async fn test_pickup_mode_status() {
    let h = Harness::new().await;
    let (out, _, result) = h.run(&["ship", "mode", "pickup"]).await;
    result.unwrap();
    assert!(out.starts_with("Ambil di toko, jam secepatnya\n"));
}

#[tokio::test]
async fn test_admin_wrong_pin() {
    let h = Harness::new().await;
    let (_, err, result) = h.run(&["admin", "--pin", "0000", "menu", "list"]).await;
    assert!(matches!(
        result,
        Err(storefront_cli::Error::Client(storefront_client::Error::NotAuthorized))
    ));
    assert!(err.contains("error: PIN salah"));
}

#[tokio::test]
async fn test_admin_menu_table_sorted() {
    let h = Harness::new().await;
    h.mock.push_for("cat-list", MockReply::json(200, categories()));
    h.mock.push_for("menu-list", MockReply::json(200, menu()));

    let (out, _, result) = h
        .run(&["admin", "--pin", "4321", "menu", "list", "--sort", "price", "--desc"])
        .await;
    result.unwrap();
    let ids: Vec<&str> = out.lines().filter_map(|l| l.split_whitespace().next()).collect();
    assert_eq!(ids, vec!["NG", "AG"]);
}

#[tokio::test]
async fn test_cart_add_over_stock_warns_with_shortfall() {
    let h = Harness::new().await;

    let (out, err, result) = h.run(&["cart", "add", "AG", "--qty", "9"]).await;
    result.unwrap();
    assert!(err.contains("warn: Stok tidak cukup. Ditambahkan 4 (sisa 0)"));
    assert!(!err.contains("Ditambahkan ke keranjang"));
    assert!(out.starts_with(" 1. Ayam Geprek x4 @ Rp18.000 = Rp72.000\n"));
}

#[tokio::test]
async fn test_cart_set_zero_removes_line() {
    let h = Harness::new().await;
    h.run(&["cart", "add", "NG"]).await.2.unwrap();
    h.run(&["cart", "add", "AG"]).await.2.unwrap();

    let (out, _, result) = h.run(&["cart", "set", "1", "0"]).await;
    result.unwrap();
    assert!(out.starts_with(" 1. Ayam Geprek x1"));
    assert!(!out.contains("Nasi Goreng"));
    assert_eq!(h.shop.snapshot().await.cart.len(), 1);
}
