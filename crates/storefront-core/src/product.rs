//! Product choices: variants and add-ons offered on a menu item, and turning
//! a customer's selection into a cart line.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cart::{Addon, CartLine, LineOption, LineTotals};
use crate::catalog::MenuItem;
use crate::error::{Error, Result};
use crate::fields;
use crate::ids::ItemId;
use crate::money::{Amount, coerce_amount};

const OPTION_LIST_KEYS: &[&str] = &["options", "opts", "variants", "levels", "pilihan", "opsi"];
const ADDON_LIST_KEYS: &[&str] = &[
    "addons",
    "add_ons",
    "extras",
    "toppings",
    "additional",
    "tambahan",
];

/// An add-on offered on a menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAddon {
    /// Add-on id
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Price per unit
    pub price: Amount,
    /// Maximum quantity per unit of the main item
    pub max: Option<u32>,
}

/// First list among `keys`. Sheet cells may hold the list as JSON text.
fn choice_list(item: &MenuItem, keys: &[&str]) -> Vec<Value> {
    let Some(value) = keys.iter().find_map(|k| item.field(k).filter(|v| !v.is_null())) else {
        return Vec::new();
    };
    match value {
        Value::Array(list) => list.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(Value::Array(list)) => list,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn text_of(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    fields::pick(map, keys).map(fields::as_text)
}

/// Variants offered on `item`, in listed order.
pub fn extract_options(item: &MenuItem) -> Vec<LineOption> {
    choice_list(item, OPTION_LIST_KEYS)
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::String(s) => LineOption::new(s.clone(), s.clone(), 0),
            other => {
                let empty = Map::new();
                let map = other.as_object().unwrap_or(&empty);
                let key = text_of(map, &["key", "id", "value", "label"])
                    .unwrap_or_else(|| format!("opt{}", i + 1));
                let label = text_of(map, &["label", "name", "title"]).unwrap_or_else(|| key.clone());
                let delta = fields::pick(map, &["price_delta", "priceDelta", "delta", "plus"])
                    .map(coerce_amount)
                    .unwrap_or(0);
                LineOption::new(key, label, delta)
            }
        })
        .collect()
}

/// Add-ons offered on `item`, in listed order.
pub fn extract_addons(item: &MenuItem) -> Vec<ProductAddon> {
    choice_list(item, ADDON_LIST_KEYS)
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let empty = Map::new();
            let map = entry.as_object().unwrap_or(&empty);
            let fallback_id = [map.get("name"), map.get("label")]
                .into_iter()
                .flatten()
                .map(fields::as_text)
                .find(|s| !s.is_empty())
                .unwrap_or_else(|| format!("addon{}", i + 1));
            let id = fields::pick(map, &["id", "code", "key"])
                .and_then(ItemId::from_value)
                .unwrap_or_else(|| ItemId::new(fallback_id));
            let name = text_of(map, &["name", "label", "title"])
                .unwrap_or_else(|| format!("Addon {}", i + 1));
            let price = fields::pick(map, &["price", "harga", "cost"])
                .map(coerce_amount)
                .unwrap_or(0);
            let max = map
                .get("max")
                .filter(|v| !v.is_null())
                .map(|v| u32::try_from(fields::as_int(v).max(0)).unwrap_or(u32::MAX));
            ProductAddon { id, name, price, max }
        })
        .collect()
}

/// Whether `item` needs the product sheet (it has variants or add-ons).
pub fn has_choices(item: &MenuItem) -> bool {
    !extract_options(item).is_empty() || !extract_addons(item).is_empty()
}

/// An add-on quantity picked by the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonPick {
    /// Add-on id
    pub id: String,
    /// Quantity per unit of the main item
    pub qty: u32,
}

impl AddonPick {
    /// Parses `id` or `id=qty`.
    pub fn parse(raw: &str) -> Result<Self> {
        let (id, qty) = match raw.split_once('=') {
            Some((id, qty)) => {
                let qty = qty
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| Error::validation_field("addon", format!("Jumlah add-on tidak valid: {raw}")))?;
                (id, qty)
            }
            None => (raw, 1),
        };
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::validation_field("addon", "Add-on kosong"));
        }
        Ok(Self {
            id: id.to_string(),
            qty,
        })
    }
}

/// What the customer chose on the product sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Option key; the first option when absent
    pub option: Option<String>,
    /// Add-on quantities
    pub addons: Vec<AddonPick>,
    /// Quantity of the main item
    pub qty: u32,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            option: None,
            addons: Vec::new(),
            qty: 1,
        }
    }
}

/// Price preview of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview {
    /// Base price, option delta and add-ons for one unit
    pub per_unit: Amount,
    /// `per_unit × qty`
    pub total: Amount,
}

/// A menu item together with its choices.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSheet {
    /// Item id
    pub id: ItemId,
    /// Item name
    pub name: String,
    /// Base price
    pub price: Amount,
    /// Units in stock
    pub stock: i64,
    /// Offered variants
    pub options: Vec<LineOption>,
    /// Offered add-ons
    pub addons: Vec<ProductAddon>,
}

impl ProductSheet {
    /// Builds the sheet for a menu item.
    pub fn from_item(item: &MenuItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            stock: item.stock,
            options: extract_options(item),
            addons: extract_addons(item),
        }
    }

    /// Turns a selection into a cart line. The option defaults to the
    /// first one; add-on quantities are clamped to their maximum and
    /// zero quantities dropped. The main quantity is kept as requested
    /// (at least 1) so the cart can report a stock shortfall.
    pub fn resolve(&self, selection: &Selection) -> Result<CartLine> {
        self.line_with_qty(selection, selection.qty.max(1))
    }

    fn line_with_qty(&self, selection: &Selection, qty: u32) -> Result<CartLine> {
        let option = match &selection.option {
            Some(key) => Some(
                self.options
                    .iter()
                    .find(|o| o.key == *key || o.label.eq_ignore_ascii_case(key))
                    .cloned()
                    .ok_or_else(|| Error::validation_field("option", format!("Pilihan tidak dikenal: {key}")))?,
            ),
            None => self.options.first().cloned(),
        };

        let mut addons = Vec::with_capacity(selection.addons.len());
        for pick in &selection.addons {
            let offered = self
                .addons
                .iter()
                .find(|a| a.id.as_str() == pick.id || a.name.eq_ignore_ascii_case(&pick.id))
                .ok_or_else(|| Error::validation_field("addon", format!("Add-on tidak dikenal: {}", pick.id)))?;
            let per_unit = offered.max.map_or(pick.qty, |max| pick.qty.min(max));
            if per_unit > 0 {
                addons.push(Addon::new(offered.id.clone(), offered.name.clone(), offered.price, per_unit));
            }
        }

        Ok(CartLine::new(self.id.clone(), self.name.clone(), self.price)
            .with_qty(qty)
            .with_option(option)
            .with_addons(addons))
    }

    /// Per-unit and total price of a selection, with the quantity capped
    /// at `[1, max(stock, 1)]` as on the product sheet.
    pub fn preview(&self, selection: &Selection) -> Result<Preview> {
        let ceiling = u32::try_from(self.stock.max(1)).unwrap_or(u32::MAX);
        let LineTotals {
            unit_total,
            line_subtotal,
            ..
        } = self
            .line_with_qty(selection, selection.qty.clamp(1, ceiling))?
            .totals();
        Ok(Preview {
            per_unit: unit_total,
            total: line_subtotal,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::CategoryIndex;
    use serde_json::json;

    fn burger() -> MenuItem {
        MenuItem::from_value(
            &json!({
                "id": "B1", "name": "Burger", "price": 25000, "stock": 4, "active": "Y",
                "Variants": [
                    {"label": "Original"},
                    {"key": "dbl", "name": "Double", "plus": 10000}
                ],
                "toppings": [
                    {"code": "chs", "label": "Cheese", "harga": 4000, "max": 2},
                    {"name": "Egg", "cost": "3000"},
                    {}
                ]
            }),
            &CategoryIndex::default(),
        )
    }

    #[test]
    fn test_extract_options() {
        let opts = extract_options(&burger());
        assert_eq!(opts.len(), 2);
        assert_eq!(opts[0], LineOption::new("Original", "Original", 0));
        assert_eq!(opts[1], LineOption::new("dbl", "Double", 10000));
    }

    #[test]
    fn test_extract_addons_fallbacks() {
        let addons = extract_addons(&burger());
        assert_eq!(addons[0].id.as_str(), "chs");
        assert_eq!(addons[0].max, Some(2));
        assert_eq!(addons[1].id.as_str(), "Egg");
        assert_eq!(addons[1].price, 3000);
        assert_eq!(addons[2].id.as_str(), "addon3");
        assert_eq!(addons[2].name, "Addon 3");
    }

    #[test]
    fn test_options_from_json_text_and_strings() {
        let item = MenuItem::from_value(
            &json!({"id": 1, "name": "Mie", "opsi": "[\"Pedas\", \"Sedang\"]"}),
            &CategoryIndex::default(),
        );
        let opts = extract_options(&item);
        assert_eq!(opts[1].key, "Sedang");
        assert!(has_choices(&item));
    }

    #[test]
    fn test_no_choices() {
        let item = MenuItem::from_value(&json!({"id": 1, "name": "Teh"}), &CategoryIndex::default());
        assert!(!has_choices(&item));
    }

    #[test]
    fn test_resolve_defaults_to_first_option() {
        let sheet = ProductSheet::from_item(&burger());
        let line = sheet.resolve(&Selection::default()).unwrap();
        assert_eq!(line.opt.unwrap().key, "Original");
        assert_eq!(line.qty, 1);
    }

    #[test]
    fn test_resolve_clamps_quantities() {
        let sheet = ProductSheet::from_item(&burger());
        let selection = Selection {
            option: Some("dbl".into()),
            addons: vec![
                AddonPick { id: "chs".into(), qty: 5 },
                AddonPick { id: "egg".into(), qty: 0 },
            ],
            qty: 9,
        };
        let line = sheet.resolve(&selection).unwrap();
        assert_eq!(line.qty, 9, "stock is enforced by the cart");
        assert_eq!(line.addons.len(), 1);
        assert_eq!(line.addons[0].qty, 2, "clamped to max");

        let preview = sheet.preview(&selection).unwrap();
        assert_eq!(preview.per_unit, 25000 + 10000 + 8000);
        assert_eq!(preview.total, 43000 * 4, "preview capped at stock");
    }

    #[test]
    fn test_resolve_unknown_choice() {
        let sheet = ProductSheet::from_item(&burger());
        let bad_opt = Selection {
            option: Some("triple".into()),
            ..Selection::default()
        };
        assert!(sheet.resolve(&bad_opt).is_err());

        let bad_addon = Selection {
            addons: vec![AddonPick { id: "bacon".into(), qty: 1 }],
            ..Selection::default()
        };
        assert!(sheet.resolve(&bad_addon).is_err());
    }

    #[test]
    fn test_addon_pick_parse() {
        assert_eq!(AddonPick::parse("chs=2").unwrap(), AddonPick { id: "chs".into(), qty: 2 });
        assert_eq!(AddonPick::parse("egg").unwrap().qty, 1);
        assert!(AddonPick::parse("=2").is_err());
        assert!(AddonPick::parse("chs=x").is_err());
    }
}
