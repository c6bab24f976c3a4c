//! Storefront configuration.
//!
//! Values resolve in three layers: built-in defaults, a TOML file, then
//! `STOREFRONT_*` environment variables.
//!
//! ```toml
//! base = "https://order-proxy.example.workers.dev|https://script.google.com/macros/s/X/exec"
//! ship_base = "https://ship-proxy.example.workers.dev"
//! admin_pin = "1234"
//!
//! [http]
//! timeout_ms = 9000
//! retries_per_target = 2
//!
//! [shipping]
//! store_lat = 3.574856
//! store_lng = 98.702053
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{DEFAULT_BEST_CATEGORY, DEFAULT_STRIP_CATEGORY, SpecialCategories};
use crate::error::{Error, Result};
use crate::images::ImageProxy;
use crate::shipping::LatLng;
use crate::traits::ConfigManager;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "STOREFRONT_";

/// Default order backends: Worker proxy first, Apps Script fallback.
pub const DEFAULT_BASE: &str = "https://midtrans-proxy.msabiq-stan.workers.dev|https://script.google.com/macros/s/AKfycbzKtWlxd_I4x-o7gnPy7spjSoMxDZm01VtrRlHPD5yd3tvKq6X3t19ZM4-qUVT6dF8K/exec";

/// Default shipping backends: Worker proxy first, Apps Script fallback.
pub const DEFAULT_SHIP_BASE: &str = "https://adamentai-ongkir-proxy.msabiq-stan.workers.dev|https://script.google.com/macros/s/AKfycbyTeheUEt75izR3zxlhNJ84ce0P0dBdaXvtQ_YtlzjrLnCM7Ib1AuqOFs0Ys0uBx9s/exec";

/// Default admin PIN.
pub const DEFAULT_ADMIN_PIN: &str = "1234";

/// Default public routing service.
pub const DEFAULT_ROUTE_BASE: &str = "https://router.project-osrm.org";

/// Splits a base list on `|` or `,`, trims entries, drops trailing slashes
/// and duplicates. Order is preserved.
///
/// # Examples
///
/// ```
/// use storefront_core::config::normalize_base;
///
/// let bases = normalize_base(" https://a.test/ | https://b.test,https://a.test ");
/// assert_eq!(bases, vec!["https://a.test", "https://b.test"]);
/// ```
pub fn normalize_base(input: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in input.split(['|', ',']) {
        let t = token.trim().trim_end_matches('/');
        if !t.is_empty() && !out.iter().any(|b| b == t) {
            out.push(t.to_string());
        }
    }
    out
}

/// HTTP behaviour of the backend client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-attempt timeout
    pub timeout_ms: u64,
    /// Attempts per URL before moving to the next
    pub retries_per_target: u32,
    /// Fixed delay between attempts
    pub backoff_ms: u64,
    /// Randomize the delay
    pub jitter: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 9_000,
            retries_per_target: 2,
            backoff_ms: 400,
            jitter: false,
        }
    }
}

/// Shipping and pickup parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingSettings {
    /// Store latitude
    pub store_lat: f64,
    /// Store longitude
    pub store_lng: f64,
    /// OSRM-compatible routing service; empty disables routing
    pub route_base: String,
    /// Quiet period before a quote is requested
    pub quote_debounce_ms: u64,
    /// Minimum minutes between now and a pickup
    pub pickup_lead_minutes: i64,
    /// Radius for address search around the store
    pub geocode_radius_km: f64,
}

impl Default for ShippingSettings {
    fn default() -> Self {
        Self {
            store_lat: 3.574856,
            store_lng: 98.702053,
            route_base: DEFAULT_ROUTE_BASE.to_string(),
            quote_debounce_ms: 400,
            pickup_lead_minutes: 30,
            geocode_radius_km: 10.0,
        }
    }
}

/// Top-level storefront configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Order backend list
    pub base: String,
    /// Shipping backend list
    #[serde(alias = "base_ongkir", alias = "ongkir_base")]
    pub ship_base: String,
    /// PIN for admin login
    #[serde(alias = "pin")]
    pub admin_pin: String,
    /// Token merged into admin requests
    pub admin_token: String,
    /// Image proxy base or `${url}` template
    pub image_proxy: String,
    /// Best-seller category name
    pub best_category: String,
    /// Promo strip category name
    pub strip_category: String,
    /// Menu cache lifetime
    pub menu_cache_ttl_secs: u64,
    /// Local state directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Accept built-in promo codes when the promo backend is unreachable
    pub promo_local_fallback: bool,
    /// Quiet period before a coupon is revalidated
    pub revalidate_debounce_ms: u64,
    /// Page the payment gateway returns to
    pub finish_redirect_url: String,
    /// HTTP client
    pub http: HttpSettings,
    /// Shipping
    pub shipping: ShippingSettings,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            ship_base: DEFAULT_SHIP_BASE.to_string(),
            admin_pin: DEFAULT_ADMIN_PIN.to_string(),
            admin_token: String::new(),
            image_proxy: String::new(),
            best_category: DEFAULT_BEST_CATEGORY.to_string(),
            strip_category: DEFAULT_STRIP_CATEGORY.to_string(),
            menu_cache_ttl_secs: 60,
            data_dir: None,
            promo_local_fallback: false,
            revalidate_debounce_ms: 400,
            finish_redirect_url: String::new(),
            http: HttpSettings::default(),
            shipping: ShippingSettings::default(),
        }
    }
}

impl StorefrontConfig {
    /// Parses TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Invalid config: {e}")))
    }

    /// Reads a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Order backends, normalized.
    pub fn bases(&self) -> Vec<String> {
        normalize_base(&self.base)
    }

    /// Shipping backends, normalized.
    pub fn ship_bases(&self) -> Vec<String> {
        normalize_base(&self.ship_base)
    }

    /// Image proxy with trailing slashes removed.
    pub fn image_proxy(&self) -> ImageProxy {
        ImageProxy::new(self.image_proxy.trim().trim_end_matches('/'))
    }

    /// Special category names.
    pub fn special_categories(&self) -> SpecialCategories {
        SpecialCategories {
            best: self.best_category.clone(),
            strip: self.strip_category.clone(),
        }
    }

    /// Menu cache lifetime in milliseconds.
    pub fn menu_cache_ttl_ms(&self) -> i64 {
        i64::try_from(self.menu_cache_ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    /// Store coordinates.
    pub fn store_location(&self) -> LatLng {
        LatLng::new(self.shipping.store_lat, self.shipping.store_lng)
    }

    /// Directory for local state: `data_dir` (tilde-expanded), else the
    /// platform data directory, else `./.storefront`.
    pub fn data_dir_path(&self) -> PathBuf {
        if let Some(dir) = self.data_dir.as_deref().filter(|d| !d.trim().is_empty()) {
            return PathBuf::from(shellexpand::tilde(dir.trim()).as_ref());
        }
        dirs::data_local_dir()
            .map(|d| d.join("storefront"))
            .unwrap_or_else(|| PathBuf::from(".storefront"))
    }

    /// Applies `STOREFRONT_*` overrides from `vars`.
    ///
    /// Unknown variables are ignored; malformed numbers are errors.
    pub fn apply_env_overrides_from<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match name {
                "BASE" => self.base = value.to_string(),
                "SHIP_BASE" | "BASE_ONGKIR" | "ONGKIR_BASE" => self.ship_base = value.to_string(),
                "ADMIN_PIN" | "PIN" => self.admin_pin = value.to_string(),
                "ADMIN_TOKEN" => self.admin_token = value.to_string(),
                "IMAGE_PROXY" => self.image_proxy = value.to_string(),
                "BEST_CATEGORY" => self.best_category = value.to_string(),
                "STRIP_CATEGORY" => self.strip_category = value.to_string(),
                "MENU_CACHE_TTL_SECS" => self.menu_cache_ttl_secs = parse_env(name, value)?,
                "DATA_DIR" => self.data_dir = Some(value.to_string()),
                "PROMO_LOCAL_FALLBACK" => self.promo_local_fallback = parse_env_bool(name, value)?,
                "REVALIDATE_DEBOUNCE_MS" => self.revalidate_debounce_ms = parse_env(name, value)?,
                "FINISH_REDIRECT_URL" => self.finish_redirect_url = value.to_string(),
                "HTTP_TIMEOUT_MS" => self.http.timeout_ms = parse_env(name, value)?,
                "HTTP_RETRIES_PER_TARGET" => self.http.retries_per_target = parse_env(name, value)?,
                "HTTP_BACKOFF_MS" => self.http.backoff_ms = parse_env(name, value)?,
                "HTTP_JITTER" => self.http.jitter = parse_env_bool(name, value)?,
                "SHIPPING_STORE_LAT" => self.shipping.store_lat = parse_env(name, value)?,
                "SHIPPING_STORE_LNG" => self.shipping.store_lng = parse_env(name, value)?,
                "SHIPPING_ROUTE_BASE" => self.shipping.route_base = value.to_string(),
                "SHIPPING_QUOTE_DEBOUNCE_MS" => {
                    self.shipping.quote_debounce_ms = parse_env(name, value)?
                }
                "SHIPPING_PICKUP_LEAD_MINUTES" => {
                    self.shipping.pickup_lead_minutes = parse_env(name, value)?
                }
                "SHIPPING_GEOCODE_RADIUS_KM" => {
                    self.shipping.geocode_radius_km = parse_env(name, value)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Checks ranges the client relies on.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_ms == 0 {
            return Err(Error::config("http.timeout_ms must be > 0"));
        }
        if self.http.retries_per_target == 0 {
            return Err(Error::config("http.retries_per_target must be >= 1"));
        }
        let s = &self.shipping;
        if !(-90.0..=90.0).contains(&s.store_lat) || !(-180.0..=180.0).contains(&s.store_lng) {
            return Err(Error::config("shipping.store_lat/store_lng out of range"));
        }
        if s.pickup_lead_minutes < 0 {
            return Err(Error::config("shipping.pickup_lead_minutes must be >= 0"));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::config(format!("{ENV_PREFIX}{name}: invalid value '{value}'")))
}

fn parse_env_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" | "" => Ok(false),
        _ => Err(Error::config(format!(
            "{ENV_PREFIX}{name}: invalid boolean '{value}'"
        ))),
    }
}

impl ConfigManager for StorefrontConfig {
    fn project_name() -> &'static str {
        "storefront"
    }

    fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(config_path) {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading config");
                Self::from_file(&path)?
            }
            Some(path) if config_path.is_some() => {
                return Err(Error::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            _ => Self::default(),
        };
        config.apply_env_overrides_from(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let var = |name: &str, value: String| (format!("{ENV_PREFIX}{name}"), value);
        let mut vars = vec![
            var("BASE", self.base.clone()),
            var("SHIP_BASE", self.ship_base.clone()),
            var("ADMIN_PIN", self.admin_pin.clone()),
            var("ADMIN_TOKEN", self.admin_token.clone()),
            var("IMAGE_PROXY", self.image_proxy.clone()),
            var("BEST_CATEGORY", self.best_category.clone()),
            var("STRIP_CATEGORY", self.strip_category.clone()),
            var("MENU_CACHE_TTL_SECS", self.menu_cache_ttl_secs.to_string()),
            var("PROMO_LOCAL_FALLBACK", self.promo_local_fallback.to_string()),
            var("REVALIDATE_DEBOUNCE_MS", self.revalidate_debounce_ms.to_string()),
            var("FINISH_REDIRECT_URL", self.finish_redirect_url.clone()),
            var("HTTP_TIMEOUT_MS", self.http.timeout_ms.to_string()),
            var("HTTP_RETRIES_PER_TARGET", self.http.retries_per_target.to_string()),
            var("HTTP_BACKOFF_MS", self.http.backoff_ms.to_string()),
            var("HTTP_JITTER", self.http.jitter.to_string()),
            var("SHIPPING_STORE_LAT", self.shipping.store_lat.to_string()),
            var("SHIPPING_STORE_LNG", self.shipping.store_lng.to_string()),
            var("SHIPPING_ROUTE_BASE", self.shipping.route_base.clone()),
            var("SHIPPING_QUOTE_DEBOUNCE_MS", self.shipping.quote_debounce_ms.to_string()),
            var("SHIPPING_PICKUP_LEAD_MINUTES", self.shipping.pickup_lead_minutes.to_string()),
            var("SHIPPING_GEOCODE_RADIUS_KM", self.shipping.geocode_radius_km.to_string()),
        ];
        if let Some(dir) = &self.data_dir {
            vars.push(var("DATA_DIR", dir.clone()));
        }
        Ok(vars)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base() {
        assert!(normalize_base("").is_empty());
        assert!(normalize_base(" | , ").is_empty());
        assert_eq!(
            normalize_base("https://a.test//|https://b.test/x/"),
            vec!["https://a.test", "https://b.test/x"]
        );
    }

    #[test]
    fn test_defaults() {
        let c = StorefrontConfig::default();
        assert_eq!(c.bases().len(), 2);
        assert!(c.bases()[0].ends_with(".workers.dev"));
        assert_eq!(c.ship_bases().len(), 2);
        assert_eq!(c.admin_pin, "1234");
        assert_eq!(c.menu_cache_ttl_ms(), 60_000);
        assert_eq!(c.http.retries_per_target, 2);
        assert_eq!(c.shipping.pickup_lead_minutes, 30);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_toml_aliases() {
        let c = StorefrontConfig::from_toml_str(
            r#"
            base_ongkir = "https://ship.test/"
            pin = "4321"

            [http]
            timeout_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(c.ship_bases(), vec!["https://ship.test"]);
        assert_eq!(c.admin_pin, "4321");
        assert_eq!(c.http.timeout_ms, 5000);
        assert_eq!(c.http.retries_per_target, 2);
        assert_eq!(c.base, DEFAULT_BASE);
    }

    #[test]
    fn test_toml_round_trip() {
        let c = StorefrontConfig::default();
        let text = c.to_toml_string().unwrap();
        assert!(text.contains("[shipping]"));
        assert_eq!(StorefrontConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn test_env_overrides() {
        let mut c = StorefrontConfig::default();
        c.apply_env_overrides_from([
            ("STOREFRONT_BASE", "https://x.test"),
            ("STOREFRONT_ONGKIR_BASE", "https://s.test"),
            ("STOREFRONT_PIN", "9999"),
            ("STOREFRONT_HTTP_JITTER", "yes"),
            ("STOREFRONT_SHIPPING_PICKUP_LEAD_MINUTES", "45"),
            ("HOME", "/root"),
        ])
        .unwrap();
        assert_eq!(c.bases(), vec!["https://x.test"]);
        assert_eq!(c.ship_bases(), vec!["https://s.test"]);
        assert_eq!(c.admin_pin, "9999");
        assert!(c.http.jitter);
        assert_eq!(c.shipping.pickup_lead_minutes, 45);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut c = StorefrontConfig::default();
        let err = c
            .apply_env_overrides_from([("STOREFRONT_HTTP_TIMEOUT_MS", "soon")])
            .unwrap_err();
        assert!(err.to_string().contains("STOREFRONT_HTTP_TIMEOUT_MS"));
    }

    #[test]
    fn test_validate() {
        let mut c = StorefrontConfig::default();
        c.http.retries_per_target = 0;
        assert!(c.validate().is_err());

        let mut c = StorefrontConfig::default();
        c.shipping.store_lat = 123.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_image_proxy_and_special() {
        let mut c = StorefrontConfig::default();
        assert!(!c.image_proxy().is_enabled());
        c.image_proxy = "https://img.test///".into();
        assert_eq!(c.image_proxy().wrap("a"), "https://img.test/a");
        c.best_category = "Favorit".into();
        assert!(c.special_categories().is_best("favorit"));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let err = StorefrontConfig::load(Some("/nonexistent/storefront.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "admin_token = \"secret\"\n").unwrap();
        let c = StorefrontConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(c.admin_token, "secret");
    }

    #[test]
    fn test_data_dir_and_env_export() {
        let mut c = StorefrontConfig::default();
        c.data_dir = Some("/tmp/sf".into());
        assert_eq!(c.data_dir_path(), PathBuf::from("/tmp/sf"));
        let vars = c.to_env_vars().unwrap();
        assert!(vars.iter().any(|(k, v)| k == "STOREFRONT_DATA_DIR" && v == "/tmp/sf"));
    }
}
