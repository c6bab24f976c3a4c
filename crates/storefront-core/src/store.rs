//! Local key-value persistence.
//!
//! Each key is one JSON file under the store directory. Reads of missing or
//! corrupt entries yield `None`; the storefront treats local state as a
//! cache and never fails an operation because it could not be restored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::cart::Cart;
use crate::coupon::Coupon;
use crate::error::{Error, Result};
use crate::shipping::ShippingState;

/// Key holding the cart lines.
pub const CART_KEY: &str = "adm_cart";
/// Key holding the applied coupon and shipping state.
pub const CHECKOUT_KEY: &str = "adm_checkout";
/// Key holding the last customer details.
pub const CUSTOMER_KEY: &str = "adm_customer";
/// Key holding the cached raw menu rows.
pub const MENU_CACHE_KEY: &str = "adm_menu_cache_v6";
/// Schema tag written into the menu cache.
pub const MENU_CACHE_VERSION: &str = "v6";

/// Cached menu rows as fetched from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuCache {
    /// Unix milliseconds when the rows were fetched
    pub ts: i64,
    /// Cache schema tag
    pub ver: String,
    /// Raw rows
    pub data: Vec<Value>,
}

impl MenuCache {
    /// Wraps freshly fetched rows.
    pub fn new(data: Vec<Value>, now_ms: i64) -> Self {
        Self {
            ts: now_ms,
            ver: MENU_CACHE_VERSION.to_string(),
            data,
        }
    }

    /// Whether the rows are younger than `ttl_ms`.
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        self.ver == MENU_CACHE_VERSION && now_ms - self.ts < ttl_ms
    }
}

/// Customer details remembered between orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Name
    #[serde(default)]
    pub name: String,
    /// Phone number
    #[serde(default)]
    pub phone: String,
    /// Free-text address
    #[serde(default)]
    pub addr: String,
}

/// Checkout state that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedCheckout {
    /// Applied coupon
    #[serde(default)]
    pub coupon: Option<Coupon>,
    /// Shipping selection and quote
    #[serde(default)]
    pub shipping: ShippingState,
}

/// Directory-backed JSON store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| Error::io_with_path(e, &dir))?;
        }
        Ok(Self { dir })
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    /// Reads a key. Missing or unparsable entries return `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring corrupt store entry");
                None
            }
        }
    }

    /// Writes a key, replacing the file atomically.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string(value)?;
        std::fs::write(&tmp, content).map_err(|e| Error::io_with_path(e, &tmp))?;
        std::fs::rename(&tmp, &path).map_err(|e| Error::io_with_path(e, &path))?;
        Ok(())
    }

    /// Deletes a key. Missing keys are not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io_with_path(e, &path)),
        }
    }

    /// Restores the cart; anything unreadable becomes an empty cart.
    pub fn load_cart(&self) -> Cart {
        self.get::<Vec<Value>>(CART_KEY)
            .map(|rows| Cart::from_values(&rows))
            .unwrap_or_default()
    }

    /// Persists the cart. Failures are logged and swallowed.
    pub fn save_cart(&self, cart: &Cart) {
        if let Err(e) = self.set(CART_KEY, cart) {
            tracing::warn!(error = %e, "Failed to persist cart");
        }
    }

    /// Restores coupon and shipping state.
    pub fn load_checkout(&self) -> SavedCheckout {
        self.get(CHECKOUT_KEY).unwrap_or_default()
    }

    /// Persists coupon and shipping state. Failures are logged and swallowed.
    pub fn save_checkout(&self, saved: &SavedCheckout) {
        if let Err(e) = self.set(CHECKOUT_KEY, saved) {
            tracing::warn!(error = %e, "Failed to persist checkout state");
        }
    }

    /// Last customer details, if any.
    pub fn load_customer(&self) -> Option<CustomerProfile> {
        self.get(CUSTOMER_KEY)
    }

    /// Remembers customer details for the next order.
    pub fn save_customer(&self, profile: &CustomerProfile) -> Result<()> {
        self.set(CUSTOMER_KEY, profile)
    }

    /// Cached menu rows when still fresh.
    pub fn fresh_menu(&self, now_ms: i64, ttl_ms: i64) -> Option<Vec<Value>> {
        self.get::<MenuCache>(MENU_CACHE_KEY)
            .filter(|c| c.is_fresh(now_ms, ttl_ms))
            .map(|c| c.data)
    }

    /// Caches menu rows.
    pub fn save_menu(&self, rows: Vec<Value>, now_ms: i64) {
        if let Err(e) = self.set(MENU_CACHE_KEY, &MenuCache::new(rows, now_ms)) {
            tracing::warn!(error = %e, "Failed to cache menu");
        }
    }

    /// Drops the menu cache so the next load hits the backend.
    pub fn invalidate_menu(&self) -> Result<()> {
        self.remove(MENU_CACHE_KEY)
    }
}
