//! Menu catalog: categories, menu items and the storefront views over them.
//!
//! Rows come from a spreadsheet, so field names vary in case and spelling.
//! [`Category::from_value`] and [`MenuItem::from_value`] fold those variants
//! into one shape while keeping every original field of a menu row (options,
//! add-ons, image URL) for later use.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::fields;
use crate::ids::ItemId;
use crate::money::{Amount, coerce_amount};

/// Default name of the best-seller rail category.
pub const DEFAULT_BEST_CATEGORY: &str = "Best Seller";

/// Default name of the bundles-and-promos strip category.
pub const DEFAULT_STRIP_CATEGORY: &str = "Paket & Promo";

const CATEGORY_ID_KEYS: &[&str] = &[
    "id",
    "cat_id",
    "kategori_id",
    "categoryid",
    "kode",
    "code",
    "name",
    "nama",
];
const CATEGORY_NAME_KEYS: &[&str] = &["name", "nama", "category", "kategori"];
const ITEM_CATEGORY_NAME_KEYS: &[&str] =
    &["category", "kategori", "cat", "category_name", "namakategori"];
const ITEM_CATEGORY_ID_KEYS: &[&str] =
    &["category_id", "cat_id", "kategori_id", "catid", "categoryid"];
const ITEM_IMAGE_KEYS: &[&str] = &["image_url", "image", "img", "gambar", "foto"];
const ITEM_CANONICAL_KEYS: &[&str] = &[
    "id",
    "name",
    "category",
    "price",
    "stock",
    "active",
    "image_url",
];

// ============================================================================
// Categories
// ============================================================================

/// A menu category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category id (falls back to the name)
    pub id: String,
    /// Display name
    pub name: String,
}

impl Category {
    /// Normalizes a `cat-list` row.
    pub fn from_value(value: &Value) -> Self {
        let low = value.as_object().map(fields::lower_keys).unwrap_or_default();
        let id = fields::pick(&low, CATEGORY_ID_KEYS).map(fields::as_text);
        let name = fields::pick(&low, CATEGORY_NAME_KEYS)
            .map(fields::as_text)
            .or_else(|| id.clone())
            .unwrap_or_default()
            .trim()
            .to_string();
        let id = match id {
            Some(id) if !id.trim().is_empty() => id,
            _ => name.clone(),
        };
        Self { id, name }
    }
}

/// Lookup from category id to category name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    by_id: HashMap<String, String>,
}

impl CategoryIndex {
    /// Builds the index from normalized categories.
    pub fn build(categories: &[Category]) -> Self {
        Self {
            by_id: categories
                .iter()
                .map(|c| (c.id.clone(), c.name.clone()))
                .collect(),
        }
    }

    /// Name of the category with `id`.
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// Number of indexed categories.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` when the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ============================================================================
// Menu items
// ============================================================================

/// A normalized menu row.
///
/// Fields without a typed counterpart are kept as received and written back
/// by [`MenuItem::to_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    /// Item id
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Category name (never an id)
    pub category: String,
    /// Base price
    pub price: Amount,
    /// Units in stock
    pub stock: i64,
    /// Whether the item is on sale
    pub active: bool,
    /// Image URL or Drive id as entered by the admin
    pub image_url: String,
    raw: Map<String, Value>,
}

impl MenuItem {
    /// Normalizes a `menu-list` row, resolving category ids through `index`.
    pub fn from_value(value: &Value, index: &CategoryIndex) -> Self {
        let original = value.as_object().cloned().unwrap_or_default();
        let low = fields::lower_keys(&original);

        let mut category = fields::pick(&low, ITEM_CATEGORY_NAME_KEYS)
            .map(fields::as_text)
            .unwrap_or_default()
            .trim()
            .to_string();
        if category.is_empty()
            && let Some(cat_id) = fields::pick(&low, ITEM_CATEGORY_ID_KEYS)
        {
            category = index
                .name_of(&fields::as_text(cat_id))
                .unwrap_or_default()
                .to_string();
        }

        let active = low
            .get("active")
            .and_then(fields::as_flag)
            .or_else(|| low.get("status").and_then(fields::as_flag))
            .unwrap_or(false);
        let price = low.get("price").map(coerce_amount).unwrap_or(0);
        let stock = fields::pick(&low, &["stock", "stok"])
            .map(|v| fields::as_f64(v).trunc() as i64)
            .unwrap_or(0);

        let mut raw = original;
        raw.retain(|key, _| !ITEM_CANONICAL_KEYS.contains(&key.to_lowercase().as_str()));

        Self {
            id: low.get("id").and_then(ItemId::from_value).unwrap_or_default(),
            name: fields::pick(&low, &["name", "nama"])
                .map(fields::as_text)
                .unwrap_or_default(),
            category,
            price,
            stock,
            active,
            image_url: fields::pick(&low, ITEM_IMAGE_KEYS)
                .map(fields::as_text)
                .unwrap_or_default(),
            raw,
        }
    }

    /// Fields of the row this type does not model (options, add-ons, ...).
    pub fn extra(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Looks up a field of the row case-insensitively.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.raw
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// The row as JSON with normalized values, suitable for the menu cache
    /// and for `menu-save`.
    pub fn to_value(&self) -> Value {
        let mut map = self.raw.clone();
        map.insert("id".into(), Value::String(self.id.to_string()));
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("category".into(), Value::String(self.category.clone()));
        map.insert("price".into(), Value::from(self.price));
        map.insert("stock".into(), Value::from(self.stock));
        map.insert("active".into(), Value::Bool(self.active));
        map.insert("image_url".into(), Value::String(self.image_url.clone()));
        Value::Object(map)
    }

    /// Stock label: `Sisa stok: N` or `Stok habis`.
    pub fn stock_label(&self) -> String {
        if self.stock > 0 {
            format!("Sisa stok: {}", self.stock)
        } else {
            "Stok habis".to_string()
        }
    }

    /// Returns `true` for 1..=3 units left.
    pub fn is_low_stock(&self) -> bool {
        (1..=3).contains(&self.stock)
    }
}

impl Serialize for MenuItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MenuItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value, &CategoryIndex::default()))
    }
}

// ============================================================================
// Views
// ============================================================================

/// Names of the categories with a dedicated layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCategories {
    /// Best-seller rail
    pub best: String,
    /// Bundles-and-promos strip
    pub strip: String,
}

impl Default for SpecialCategories {
    fn default() -> Self {
        Self {
            best: DEFAULT_BEST_CATEGORY.to_string(),
            strip: DEFAULT_STRIP_CATEGORY.to_string(),
        }
    }
}

impl SpecialCategories {
    /// Whether `category` is the best-seller category.
    pub fn is_best(&self, category: &str) -> bool {
        category.to_lowercase() == self.best.to_lowercase()
    }

    /// Whether `category` is the strip category.
    pub fn is_strip(&self, category: &str) -> bool {
        category.to_lowercase() == self.strip.to_lowercase()
    }

    /// Whether `category` is either special category.
    pub fn is_special(&self, category: &str) -> bool {
        self.is_best(category) || self.is_strip(category)
    }

    /// Badge for a category.
    pub fn badge(&self, category: &str) -> BadgeKind {
        if self.is_best(category) {
            BadgeKind::Best
        } else if self.is_strip(category) {
            BadgeKind::Strip
        } else if category.to_lowercase().contains("promo") {
            BadgeKind::Promo
        } else {
            BadgeKind::Plain
        }
    }
}

/// Category badge style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeKind {
    /// Best seller
    Best,
    /// Bundles and promos strip
    Strip,
    /// Any other category mentioning "promo"
    Promo,
    /// Everything else
    Plain,
}

impl BadgeKind {
    /// CSS class of the badge.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Best => "badge badge--best",
            Self::Strip => "badge badge--strip",
            Self::Promo => "badge badge--promo",
            Self::Plain => "badge",
        }
    }
}

/// Column the admin menu table is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Name, case-insensitive
    #[default]
    Name,
    /// Category, case-insensitive
    Category,
    /// Price
    Price,
    /// Stock
    Stock,
    /// Inactive before active
    Active,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "category" => Ok(Self::Category),
            "price" => Ok(Self::Price),
            "stock" => Ok(Self::Stock),
            "active" => Ok(Self::Active),
            other => Err(Error::validation_field("sort", format!("Unknown sort key: {other}"))),
        }
    }
}

/// Sort order of the admin menu table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuSort {
    /// Column
    pub key: SortKey,
    /// Descending instead of ascending
    pub descending: bool,
}

impl MenuSort {
    fn compare(&self, a: &MenuItem, b: &MenuItem) -> Ordering {
        let ord = match self.key {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Category => a.category.to_lowercase().cmp(&b.category.to_lowercase()),
            SortKey::Price => a.price.cmp(&b.price),
            SortKey::Stock => a.stock.cmp(&b.stock),
            SortKey::Active => a.active.cmp(&b.active),
        };
        if self.descending { ord.reverse() } else { ord }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Categories and menu items as last loaded.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: Vec<Category>,
    index: CategoryIndex,
    items: Vec<MenuItem>,
    special: SpecialCategories,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new(special: SpecialCategories) -> Self {
        Self {
            special,
            ..Self::default()
        }
    }

    /// Replaces the categories from raw `cat-list` rows.
    pub fn load_categories(&mut self, rows: &[Value]) {
        self.set_categories(rows.iter().map(Category::from_value).collect());
    }

    /// Replaces the categories and rebuilds the id index.
    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.index = CategoryIndex::build(&categories);
        self.categories = categories;
    }

    /// Replaces the items from raw `menu-list` rows.
    pub fn load_items(&mut self, rows: &[Value]) {
        let items = rows
            .iter()
            .map(|row| MenuItem::from_value(row, &self.index))
            .collect();
        self.set_items(items);
    }

    /// Replaces the items.
    pub fn set_items(&mut self, items: Vec<MenuItem>) {
        self.items = items;
    }

    /// Special category names.
    pub fn special(&self) -> &SpecialCategories {
        &self.special
    }

    /// Categories in backend order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Category index.
    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    /// Every item, active or not.
    pub fn items_admin(&self) -> &[MenuItem] {
        &self.items
    }

    /// Items on sale.
    pub fn active_items(&self) -> impl Iterator<Item = &MenuItem> {
        self.items.iter().filter(|m| m.active)
    }

    /// Returns `true` when no items are loaded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an item by id.
    pub fn item(&self, id: &ItemId) -> Option<&MenuItem> {
        self.items.iter().find(|m| &m.id == id)
    }

    /// Looks up an item by id, failing with [`Error::ItemNotFound`].
    pub fn require(&self, id: &ItemId) -> Result<&MenuItem> {
        self.item(id).ok_or_else(|| Error::ItemNotFound { id: id.to_string() })
    }

    /// Stock of an item; unknown items have none.
    pub fn stock_of(&self, id: &ItemId) -> i64 {
        self.item(id).map(|m| m.stock).unwrap_or(0)
    }

    fn shows_section(&self, selected: Option<&str>, matches: impl Fn(&str) -> bool) -> bool {
        match selected.map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(sel) => matches(sel),
        }
    }

    /// Best-seller rail. Shown when no category or the best-seller category
    /// is selected.
    pub fn best(&self, selected: Option<&str>) -> Vec<&MenuItem> {
        if !self.shows_section(selected, |s| self.special.is_best(s)) {
            return Vec::new();
        }
        self.active_items()
            .filter(|m| self.special.is_best(&m.category))
            .collect()
    }

    /// Bundles-and-promos strip. Shown when no category or the strip
    /// category is selected.
    pub fn strip(&self, selected: Option<&str>) -> Vec<&MenuItem> {
        if !self.shows_section(selected, |s| self.special.is_strip(s)) {
            return Vec::new();
        }
        self.active_items()
            .filter(|m| self.special.is_strip(&m.category))
            .collect()
    }

    /// Regular grid: active items of the selected category matching the
    /// query, without either special category. Empty when a special
    /// category is selected.
    pub fn regular(&self, selected: Option<&str>, query: &str) -> Vec<&MenuItem> {
        let selected = selected.map(str::trim).filter(|s| !s.is_empty());
        if selected.is_some_and(|s| self.special.is_special(s)) {
            return Vec::new();
        }
        let selected = selected.map(str::to_lowercase);
        let query = query.trim().to_lowercase();

        self.active_items()
            .filter(|m| {
                selected
                    .as_ref()
                    .is_none_or(|sel| &m.category.to_lowercase() == sel)
            })
            .filter(|m| {
                query.is_empty()
                    || m.name.to_lowercase().contains(&query)
                    || m.category.to_lowercase().contains(&query)
            })
            .filter(|m| !self.special.is_special(&m.category))
            .collect()
    }

    /// Admin menu table: every item whose name or category contains
    /// `filter`, in the requested order.
    pub fn admin_view(&self, filter: &str, sort: MenuSort) -> Vec<&MenuItem> {
        let q = filter.trim().to_lowercase();
        let mut list: Vec<&MenuItem> = self
            .items
            .iter()
            .filter(|m| {
                q.is_empty()
                    || m.name.to_lowercase().contains(&q)
                    || m.category.to_lowercase().contains(&q)
            })
            .collect();
        list.sort_by(|a, b| sort.compare(a, b));
        list
    }
}
