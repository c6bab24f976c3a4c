//! Terminal rendering.
//!
//! Every view is a plain function returning a `String` so commands can
//! print it and tests can compare it.

use std::fmt::Write as _;

use storefront_core::catalog::{Catalog, MenuItem};
use storefront_core::notice::{Notice, NoticeLevel};
use storefront_core::product::{Preview, ProductSheet};
use storefront_core::shipping::{GateBlock, ShippingMode, ShippingState, format_hhmm};
use storefront_core::{Cart, CartSummary, PromoRecord, format_rupiah};

const NAME_WIDTH: usize = 28;

fn item_row(out: &mut String, item: &MenuItem) {
    let _ = writeln!(
        out,
        "  {:<8} {:<w$} {:>12}  {}",
        item.id.as_str(),
        item.name,
        format_rupiah(item.price),
        item.stock_label(),
        w = NAME_WIDTH
    );
}

fn section(out: &mut String, title: &str, items: &[&MenuItem]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}");
    for item in items {
        item_row(out, item);
    }
}

/// Menu as shown to customers: the best-seller rail, the promo strip, then
/// the regular list.
pub fn menu(catalog: &Catalog, category: Option<&str>, query: &str) -> String {
    let mut out = String::new();
    let best = catalog.best(category);
    let strip = catalog.strip(category);
    let regular = catalog.regular(category, query);

    if query.trim().is_empty() {
        section(&mut out, &catalog.special().best, &best);
        section(&mut out, &catalog.special().strip, &strip);
    }
    section(&mut out, "Menu", &regular);
    if out.is_empty() {
        out.push_str("Tidak ada menu yang cocok\n");
    }
    out
}

/// Product sheet with its choices and the price of a selection.
pub fn product(sheet: &ProductSheet, preview: &Preview, qty: u32, image: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", sheet.name, sheet.id);
    let _ = writeln!(out, "  Harga: {}", format_rupiah(sheet.price));
    let _ = writeln!(
        out,
        "  {}",
        if sheet.stock > 0 {
            format!("Sisa stok: {}", sheet.stock)
        } else {
            "Stok habis".to_string()
        }
    );
    if let Some(url) = image {
        let _ = writeln!(out, "  Foto: {url}");
    }
    if !sheet.options.is_empty() {
        let _ = writeln!(out, "Pilihan:");
        for opt in &sheet.options {
            let delta = match opt.price_delta {
                0 => String::new(),
                d => format!(" (+{})", format_rupiah(d)),
            };
            let _ = writeln!(out, "  {:<10} {}{delta}", opt.key, opt.label);
        }
    }
    if !sheet.addons.is_empty() {
        let _ = writeln!(out, "Tambahan:");
        for addon in &sheet.addons {
            let max = addon.max.map(|m| format!(" maks {m}")).unwrap_or_default();
            let _ = writeln!(
                out,
                "  {:<10} {} {}{max}",
                addon.id.as_str(),
                addon.name,
                format_rupiah(addon.price)
            );
        }
    }
    let _ = writeln!(
        out,
        "{} x {} = {}",
        qty,
        format_rupiah(preview.per_unit),
        format_rupiah(preview.total)
    );
    out
}

/// Numbered cart lines followed by the totals.
pub fn cart(cart: &Cart, summary: &CartSummary) -> String {
    if cart.is_empty() {
        return "Keranjang kosong\n".to_string();
    }
    let mut out = String::new();
    for (i, line) in cart.lines().iter().enumerate() {
        let totals = line.totals();
        let _ = writeln!(
            out,
            "{:>2}. {} x{} @ {} = {}",
            i + 1,
            line.describe(),
            line.qty,
            format_rupiah(totals.unit_total),
            format_rupiah(totals.line_subtotal)
        );
    }
    out.push_str(&totals(summary));
    out
}

/// Subtotal, discount, shipping and grand total.
pub fn totals(summary: &CartSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Subtotal : {}", format_rupiah(summary.totals.subtotal));
    if let Some(code) = &summary.coupon_code {
        let _ = writeln!(out, "Diskon   : -{} ({code})", format_rupiah(summary.totals.discount));
    }
    if summary.shipping_fee > 0 {
        let _ = writeln!(out, "Ongkir   : {}", format_rupiah(summary.shipping_fee));
    }
    let _ = writeln!(out, "Total    : {}", format_rupiah(summary.grand_total));
    out
}

/// Shipping status and whether checkout is allowed.
pub fn shipping(state: &ShippingState, gate: &Result<(), GateBlock>) -> String {
    let mut out = String::new();
    match state.mode {
        ShippingMode::Pickup => {
            let when = state
                .pickup_time
                .map(format_hhmm)
                .unwrap_or_else(|| "secepatnya".to_string());
            let _ = writeln!(out, "Ambil di toko, jam {when}");
        }
        ShippingMode::Delivery => {
            match (&state.dest, &state.address) {
                (Some(_), Some(address)) if !address.is_empty() => {
                    let _ = writeln!(out, "Antar ke {address}");
                }
                (Some(dest), _) => {
                    let _ = writeln!(out, "Antar ke {}", dest.coord_label());
                }
                (None, _) => {
                    let _ = writeln!(out, "Belum ada alamat tujuan");
                }
            }
            let _ = writeln!(out, "Berat {} kg", state.weight_kg);
            let pill = state.pill();
            if !pill.is_empty() {
                let _ = writeln!(out, "{pill}");
            }
            if let Some(eta) = state.eta_min {
                let _ = writeln!(out, "Estimasi {eta} menit");
            }
        }
    }
    if let Err(block) = gate {
        let _ = writeln!(out, "{}", block.message());
    }
    out
}

/// Admin menu table.
pub fn menu_table(items: &[MenuItem]) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "{:<8} {:<w$} {:<14} {:>12} {:>5}  {}",
            item.id.as_str(),
            item.name,
            item.category,
            format_rupiah(item.price),
            item.stock,
            if item.active { "aktif" } else { "nonaktif" },
            w = NAME_WIDTH
        );
    }
    out
}

/// Admin promo table.
pub fn promos(records: &[PromoRecord]) -> String {
    let mut out = String::new();
    for p in records {
        let value = match p.kind {
            storefront_core::CouponKind::Percent => format!("{}%", p.value),
            storefront_core::CouponKind::Flat => format_rupiah(p.value),
        };
        let _ = writeln!(
            out,
            "{:<12} {:>10}  min {:>10}  {:<25} {}",
            p.code,
            value,
            format_rupiah(p.min_subtotal),
            p.period(),
            if p.active { "aktif" } else { "nonaktif" }
        );
    }
    out
}

/// One notice line, prefixed by its level.
pub fn notice(notice: &Notice) -> String {
    let level = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warn => "warn",
        NoticeLevel::Error => "error",
    };
    format!("{level}: {}", notice.message)
}
