//! Cart line items and the cart.
//!
//! A line is one menu item with an optional variant (`opt`) and a list of
//! add-ons. Add-on quantities are *per unit* of the main item, so a line of
//! 2 × burger with 1 × cheese per burger carries two cheeses in total.
//!
//! Lines whose id, option key and add-on set agree share a signature and are
//! merged instead of appended.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::fields;
use crate::ids::ItemId;
use crate::money::{Amount, coerce_amount};

// ============================================================================
// LineOption / Addon
// ============================================================================

/// Selected variant of a menu item, e.g. a spice level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineOption {
    /// Stable key of the option
    pub key: String,
    /// Display label
    pub label: String,
    /// Price added to the base unit price (may be negative)
    #[serde(default)]
    pub price_delta: Amount,
}

impl LineOption {
    /// Creates an option.
    pub fn new(key: impl Into<String>, label: impl Into<String>, price_delta: Amount) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            price_delta,
        }
    }

    /// Normalizes a stored or submitted option. A bare string is both key
    /// and label; an empty string means no option.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self::new(s.clone(), s.clone(), 0)),
            Value::Object(map) => {
                let label = map.get("label").map(fields::as_text).unwrap_or_default();
                let key = match map.get("key").filter(|v| !v.is_null()) {
                    Some(k) => fields::as_text(k),
                    None => label.clone(),
                };
                let label = if label.is_empty() { key.clone() } else { label };
                let price_delta = fields::pick(map, &["price_delta", "priceDelta"])
                    .map(coerce_amount)
                    .unwrap_or(0);
                Some(Self::new(key, label, price_delta))
            }
            _ => None,
        }
    }
}

/// Extra attached to a line, priced per unit of the main item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    /// Add-on identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Unit price of the add-on
    pub price: Amount,
    /// Quantity per one unit of the main item
    pub qty: u32,
}

impl Addon {
    /// Creates an add-on.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, price: Amount, qty: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            qty,
        }
    }

    /// Normalizes a stored add-on; entries without a name or with a
    /// non-positive quantity are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let name = fields::pick(map, &["name", "label"])
            .map(fields::as_text)
            .unwrap_or_default();
        let id = fields::pick(map, &["id", "code"])
            .and_then(ItemId::from_value)
            .unwrap_or_else(|| ItemId::new(name.clone()));
        let qty = map.get("qty").map(fields::as_int).unwrap_or(0).max(0);
        if name.is_empty() || qty == 0 {
            return None;
        }
        let price = map.get("price").map(coerce_amount).unwrap_or(0);
        Some(Self::new(id, name, price, u32::try_from(qty).unwrap_or(u32::MAX)))
    }
}

fn normalize_addons(mut addons: Vec<Addon>) -> Vec<Addon> {
    addons.retain(|a| !a.name.is_empty() && a.qty > 0);
    addons.sort_by(|a, b| a.id.cmp(&b.id));
    addons
}

// ============================================================================
// CartLine
// ============================================================================

/// Price breakdown of one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    /// Base unit price including the option delta
    pub unit_base: Amount,
    /// Add-on cost per unit of the main item
    pub addons_per_unit: Amount,
    /// `unit_base + addons_per_unit`
    pub unit_total: Amount,
    /// Quantity of the main item
    pub qty: u32,
    /// `addons_per_unit × qty`
    pub addons_total: Amount,
    /// `unit_total × qty`
    pub line_subtotal: Amount,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Menu item identifier
    pub id: ItemId,
    /// Item name at the time it was added
    pub name: String,
    /// Base unit price
    pub price: Amount,
    /// Quantity, at least 1
    pub qty: u32,
    /// Selected variant
    #[serde(default)]
    pub opt: Option<LineOption>,
    /// Selected add-ons, sorted by id
    #[serde(default)]
    pub addons: Vec<Addon>,
}

impl CartLine {
    /// Creates a line of quantity 1 without option or add-ons.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, price: Amount) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            qty: 1,
            opt: None,
            addons: Vec::new(),
        }
    }

    /// Sets the quantity, clamped to at least 1.
    pub fn with_qty(mut self, qty: u32) -> Self {
        self.qty = qty.max(1);
        self
    }

    /// Sets the selected option.
    pub fn with_option(mut self, opt: Option<LineOption>) -> Self {
        self.opt = opt;
        self
    }

    /// Sets the add-ons, dropping empty entries and sorting by id.
    pub fn with_addons(mut self, addons: Vec<Addon>) -> Self {
        self.addons = normalize_addons(addons);
        self
    }

    /// Normalizes a stored line. Older stored carts carry only
    /// `{id, name, price, qty}`; those load with no option and no add-ons.
    pub fn from_value(value: &Value) -> Self {
        let empty = serde_json::Map::new();
        let map = value.as_object().unwrap_or(&empty);

        let id = map
            .get("id")
            .and_then(ItemId::from_value)
            .unwrap_or_default();
        let name = map.get("name").map(fields::as_text).unwrap_or_default();
        let price = map.get("price").map(coerce_amount).unwrap_or(0);
        let qty = map.get("qty").map(fields::as_int).unwrap_or(1).max(1);
        let opt = map.get("opt").and_then(LineOption::from_value);
        let addons = map
            .get("addons")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Addon::from_value).collect())
            .unwrap_or_default();

        Self::new(id, name, price)
            .with_qty(u32::try_from(qty).unwrap_or(u32::MAX))
            .with_option(opt)
            .with_addons(addons)
    }

    /// Merge signature: `"<id>|opt:<key>|a:<id>x<qty>,..."`.
    pub fn signature(&self) -> String {
        let opt_key = self.opt.as_ref().map(|o| o.key.as_str()).unwrap_or("-");
        let mut addons: Vec<&Addon> = self.addons.iter().collect();
        addons.sort_by(|a, b| a.id.cmp(&b.id));
        let addon_sig = addons
            .iter()
            .filter(|a| !a.id.is_empty() && a.qty > 0)
            .map(|a| format!("{}x{}", a.id, a.qty))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}|opt:{}|a:{}", self.id, opt_key, addon_sig)
    }

    /// Computes the price breakdown of the line. Arithmetic saturates at
    /// the `Amount` bounds.
    pub fn totals(&self) -> LineTotals {
        let delta = self.opt.as_ref().map(|o| o.price_delta).unwrap_or(0);
        let unit_base = self.price.saturating_add(delta);
        let addons_per_unit = self
            .addons
            .iter()
            .map(|a| a.price.saturating_mul(Amount::from(a.qty)))
            .fold(0, Amount::saturating_add);
        let unit_total = unit_base.saturating_add(addons_per_unit);
        let qty = self.qty.max(1);
        LineTotals {
            unit_base,
            addons_per_unit,
            unit_total,
            qty,
            addons_total: addons_per_unit.saturating_mul(Amount::from(qty)),
            line_subtotal: unit_total.saturating_mul(Amount::from(qty)),
        }
    }

    /// Human-readable description: name, option label and add-ons.
    pub fn describe(&self) -> String {
        let mut out = self.name.clone();
        if let Some(opt) = &self.opt {
            out.push_str(&format!(" ({})", opt.label));
        }
        for addon in &self.addons {
            out.push_str(&format!(" + {} x{}", addon.name, addon.qty));
        }
        out
    }
}

// ============================================================================
// Cart
// ============================================================================

/// Result of adding a line to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The full requested quantity was added.
    Added {
        /// Quantity added
        qty: u32,
    },
    /// Only part of the requested quantity fit into the remaining stock.
    Clamped {
        /// Quantity actually added
        added: u32,
        /// Quantity that was asked for
        requested: u32,
        /// Stock left after this add
        remaining: u32,
    },
    /// The item has no stock at all.
    SoldOut,
    /// The cart already holds all available stock.
    Exhausted,
}

impl AddOutcome {
    /// Returns `true` if anything was added.
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added { .. } | Self::Clamped { .. })
    }

    /// User-facing message for this outcome.
    pub fn message(&self) -> String {
        match self {
            Self::Added { .. } => "Ditambahkan ke keranjang".to_string(),
            Self::Clamped {
                added, remaining, ..
            } => format!("Stok tidak cukup. Ditambahkan {added} (sisa {remaining})"),
            Self::SoldOut => "Stok habis".to_string(),
            Self::Exhausted => "Stok tidak cukup (tersisa 0)".to_string(),
        }
    }
}

/// Result of changing a line quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QtyUpdate {
    /// Quantity now on the line
    pub qty: u32,
    /// Whether the quantity changed
    pub changed: bool,
    /// Whether the request was cut down to the available stock
    pub exceeded_stock: bool,
}

/// The shopping cart: an ordered list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cart from stored values, normalizing each line.
    pub fn from_values(values: &[Value]) -> Self {
        Self {
            lines: values.iter().map(CartLine::from_value).collect(),
        }
    }

    /// Returns the lines in order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns `true` when the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across lines (the badge count).
    pub fn count(&self) -> u32 {
        self.lines.iter().map(|l| l.qty).fold(0, u32::saturating_add)
    }

    /// Quantity of an item across all its lines.
    pub fn qty_of(&self, id: &ItemId) -> u32 {
        self.lines
            .iter()
            .filter(|l| &l.id == id)
            .map(|l| l.qty)
            .sum()
    }

    /// Sum of line subtotals.
    pub fn subtotal(&self) -> Amount {
        self.lines
            .iter()
            .map(|l| l.totals().line_subtotal)
            .fold(0, Amount::saturating_add)
    }

    /// Adds a line, clamping its quantity to the stock not yet in the cart.
    pub fn add(&mut self, mut line: CartLine, stock: i64) -> AddOutcome {
        let requested = line.qty.max(1);
        if stock <= 0 {
            return AddOutcome::SoldOut;
        }

        let already = i64::from(self.qty_of(&line.id));
        let remaining = stock - already;
        if remaining <= 0 {
            return AddOutcome::Exhausted;
        }

        let added = i64::from(requested).min(remaining);
        let added = u32::try_from(added).unwrap_or(requested);
        let signature = line.signature();
        match self.lines.iter_mut().find(|l| l.signature() == signature) {
            Some(existing) => existing.qty = existing.qty.saturating_add(added),
            None => {
                line.qty = added;
                self.lines.push(line);
            }
        }

        if added < requested {
            let left = remaining - i64::from(added);
            AddOutcome::Clamped {
                added,
                requested,
                remaining: u32::try_from(left).unwrap_or(0),
            }
        } else {
            AddOutcome::Added { qty: added }
        }
    }

    /// Sets the quantity of a line, clamped to `[1, max(stock, 1)]`.
    pub fn set_qty_at(&mut self, index: usize, qty: i64, stock: i64) -> Result<QtyUpdate> {
        let len = self.lines.len();
        let line = self
            .lines
            .get_mut(index)
            .ok_or(Error::LineOutOfRange { index, len })?;

        let clamped = qty.clamp(1, stock.max(1));
        let clamped = u32::try_from(clamped).unwrap_or(line.qty);
        let changed = clamped != line.qty;
        line.qty = clamped;
        Ok(QtyUpdate {
            qty: clamped,
            changed,
            exceeded_stock: i64::from(clamped) < qty,
        })
    }

    /// Removes and returns the line at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<CartLine> {
        if index >= self.lines.len() {
            return Err(Error::LineOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        Ok(self.lines.remove(index))
    }

    /// Removes every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Drops lines whose item has no stock left and trims quantities that
    /// exceed it. Stock is shared between lines of the same item, in cart
    /// order. Returns `true` if the cart changed.
    pub fn validate_against_stock<F>(&mut self, stock_of: F) -> bool
    where
        F: Fn(&ItemId) -> i64,
    {
        let mut used: HashMap<ItemId, i64> = HashMap::new();
        let mut changed = false;
        let mut kept = Vec::with_capacity(self.lines.len());

        for mut line in self.lines.drain(..) {
            let taken = used.entry(line.id.clone()).or_insert(0);
            let available = stock_of(&line.id).max(0) - *taken;
            if available <= 0 {
                changed = true;
                continue;
            }
            if i64::from(line.qty) > available {
                line.qty = u32::try_from(available).unwrap_or(line.qty);
                changed = true;
            }
            *taken += i64::from(line.qty);
            kept.push(line);
        }

        self.lines = kept;
        changed
    }
}
