//! Admin panel flows against a scripted backend.

use serde_json::json;
use storefront_client::transport::mock::MockReply;
use storefront_client::{AdminPanel, Error, ImageUpload, MenuForm};
use storefront_core::catalog::{MenuSort, SortKey};
use storefront_core::{CouponKind, ItemId, PromoRecord};

use crate::common::TestHarness;

async fn logged_in(h: &TestHarness) -> AdminPanel {
    let panel = AdminPanel::new(h.loaded_shop().await);
    assert!(panel.login("4321"));
    panel
}

#[tokio::test]
async fn test_mutations_require_login() {
    let h = TestHarness::new();
    let panel = AdminPanel::new(h.loaded_shop().await);

    let err = panel.save_category(None, "Snack").await.unwrap_err();
    assert!(matches!(err, Error::NotAuthorized));

    assert!(!panel.login("0000"));
    assert!(h.notices.contains("PIN salah"));
    assert!(!panel.is_authorized());

    assert!(panel.login(" 4321 "));
    panel.logout();
    assert!(panel.adjust_stock(&ItemId::new("NG"), 1, "").await.is_err());
    assert!(h.bodies_for("stock-adjust").is_empty());
}

#[tokio::test]
async fn test_menu_save_uploads_image_first() {
    let h = TestHarness::new();
    let panel = logged_in(&h).await;

    h.mock.push_for(
        "upload-image",
        MockReply::json(200, json!({"ok": true, "url": "https://img.test/bakso.png"})),
    );
    h.mock.push_for("menu-save", MockReply::json(200, json!({"ok": true, "id": "BK"})));
    h.script_catalog();

    let form = MenuForm {
        name: "  Bakso ".into(),
        category: "Makanan".into(),
        price: 15_000,
        stock: -3,
        image: Some(ImageUpload::new("bakso.png", vec![0x89, 0x50]).unwrap()),
        ..MenuForm::default()
    };
    panel.save_menu(form).await.unwrap();

    let upload = h.bodies_for("upload-image").pop().unwrap();
    assert_eq!(upload["name"], "bakso.png");
    assert!(upload["data_url"].as_str().unwrap().starts_with("data:image/png;base64,"));
    assert_eq!(upload["admin_token"], "secret");

    let saved = h.bodies_for("menu-save").pop().unwrap();
    assert_eq!(saved["name"], "Bakso");
    assert_eq!(saved["stock"], 0);
    assert_eq!(saved["image_url"], "https://img.test/bakso.png");
    assert_eq!(saved["admin_token"], "secret");
    assert!(saved.get("id").is_none());
    assert!(h.notices.contains("Menu tersimpan"));
}

#[tokio::test]
async fn test_failed_upload_skips_save() {
    let h = TestHarness::new();
    let panel = logged_in(&h).await;
    h.mock.push_for(
        "upload-image",
        MockReply::json(200, json!({"ok": false, "error": "quota"})),
    );

    let form = MenuForm {
        name: "Bakso".into(),
        image: Some(ImageUpload::new("bakso.webp", vec![1]).unwrap()),
        ..MenuForm::default()
    };
    assert!(panel.save_menu(form).await.is_err());
    assert!(h.notices.contains("Upload foto gagal: quota"));
    assert!(h.bodies_for("menu-save").is_empty());
}

#[tokio::test]
async fn test_toggle_keeps_extra_columns() {
    let h = TestHarness::new();
    let panel = logged_in(&h).await;
    h.mock.push_for("menu-save", MockReply::json(200, json!({"ok": true})));
    h.script_catalog();

    assert!(!panel.toggle_menu_active(&ItemId::new("NG")).await.unwrap());

    let row = h.bodies_for("menu-save").pop().unwrap();
    assert_eq!(row["id"], "NG");
    assert_eq!(row["active"], false);
    assert_eq!(row["addons"][0]["id"], "KJ");
}

#[tokio::test]
async fn test_stock_adjust() {
    let h = TestHarness::new();
    let panel = logged_in(&h).await;

    assert!(panel.adjust_stock(&ItemId::new("ET"), 0, "").await.is_err());
    assert!(h.notices.contains("Pilih item & isi delta"));
    assert!(h.bodies_for("stock-adjust").is_empty());

    h.mock.push_for("stock-adjust", MockReply::json(200, json!({"ok": true})));
    h.script_catalog();
    panel.adjust_stock(&ItemId::new("ET"), 5, " restock ").await.unwrap();
    let body = h.bodies_for("stock-adjust").pop().unwrap();
    assert_eq!(body["item_id"], "ET");
    assert_eq!(body["delta"], 5);
    assert_eq!(body["note"], "restock");
    assert!(h.notices.contains("Stok diperbarui"));
}

#[tokio::test]
async fn test_backend_refusal_reported() {
    let h = TestHarness::new();
    let panel = logged_in(&h).await;
    h.mock.push_for("menu-del", MockReply::json(200, json!({"ok": false})));

    let err = panel.delete_menu(&ItemId::new("AG")).await.unwrap_err();
    assert_eq!(err.to_string(), "menu-del: request failed");
    assert!(h.notices.contains("Gagal hapus"));
}

#[tokio::test]
async fn test_menu_table_sorting() {
    let h = TestHarness::new();
    let panel = logged_in(&h).await;

    let by_price = panel
        .menu_table(
            "",
            MenuSort {
                key: SortKey::Price,
                descending: true,
            },
        )
        .await;
    let ids: Vec<String> = by_price.iter().map(|m| m.id.to_string()).collect();
    assert_eq!(ids, vec!["NG", "AG", "ET"]);

    let filtered = panel.menu_table("teh", MenuSort::default()).await;
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
async fn test_promo_management() {
    let h = TestHarness::new();
    let panel = logged_in(&h).await;
    h.mock.push_for(
        "promo-list",
        MockReply::json(200, json!({"ok": true, "data": [
            {"id": 2, "code": "potong5", "type": "flat", "value": 5000, "active": "Y"},
            {"id": 1, "code": "HEMAT10", "type": "percent", "value": 10, "active": "N"},
        ]})),
    );

    let promos = panel.promos().await.unwrap();
    let codes: Vec<&str> = promos.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["HEMAT10", "POTONG5"]);
    assert!(!promos[0].active);

    let invalid = PromoRecord::new("BIG", CouponKind::Percent, 150);
    assert!(panel.save_promo(&invalid).await.is_err());
    assert!(h.notices.contains("Persentase promo maksimal 100"));
    assert!(h.bodies_for("promo-save").is_empty());

    h.mock.push_for("promo-save", MockReply::json(200, json!({"ok": true})));
    h.script_catalog();
    assert!(panel.toggle_promo(&promos[0]).await.unwrap());
    let saved = h.bodies_for("promo-save").pop().unwrap();
    assert_eq!(saved["code"], "HEMAT10");
    assert_eq!(saved["active"], true);
    assert_eq!(saved["admin_token"], "secret");
}
