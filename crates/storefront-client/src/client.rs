//! Backend client with timeout, retry and multi-base failover.
//!
//! A call walks every configured base in order. Each base yields one or
//! two URLs (a Worker path route, then the `?route=` form every backend
//! understands). Each URL gets a fixed number of attempts:
//!
//! - a non-ok 5xx answer is retried and, after the last attempt, returned;
//! - any other answer is returned at once;
//! - a transport failure or timeout is retried and, after the last attempt,
//!   abandoned in favour of the next URL.
//!
//! When every URL failed the caller receives `{ok:false,error:"network_timeout"}`.
//! [`BackendClient::post`] never returns an error.

use std::sync::Arc;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use serde_json::{Map, Value, json};
use storefront_core::config::{HttpSettings, normalize_base};

use crate::envelope::{self, NETWORK_TIMEOUT, NO_BASE_CONFIG};
use crate::error::Error;
use crate::transport::Transport;

/// Routes that Worker proxies also expose as a path.
pub const WORKER_PATH_ROUTES: &[&str] = &["create-order", "promo-validate", "quote", "geocode", "reverse"];

/// Whether a base points at a Cloudflare Worker.
pub fn is_worker_base(base: &str) -> bool {
    let trimmed = base.trim_end_matches('/').to_ascii_lowercase();
    trimmed.ends_with(".workers.dev")
        || trimmed.ends_with("-workers.dev")
        || base.to_ascii_lowercase().contains("workers.dev/")
}

/// URLs to try for `route` on one base, in order.
///
/// # Examples
///
/// ```
/// use storefront_client::client::route_urls;
///
/// assert_eq!(
///     route_urls("https://p.example.workers.dev/", "quote"),
///     vec![
///         "https://p.example.workers.dev/quote".to_string(),
///         "https://p.example.workers.dev?route=quote".to_string(),
///     ]
/// );
/// assert_eq!(route_urls("https://s.test/exec", "menu-list"), vec!["https://s.test/exec?route=menu-list".to_string()]);
/// ```
pub fn route_urls(base: &str, route: &str) -> Vec<String> {
    let b = base.trim_end_matches('/');
    let mut urls = Vec::with_capacity(2);
    if is_worker_base(base) && WORKER_PATH_ROUTES.contains(&route) {
        urls.push(format!("{b}/{route}"));
    }
    urls.push(format!(
        "{b}?route={}",
        storefront_core::images::encode_component(route)
    ));
    urls
}

/// Why one attempt did not produce a final answer.
#[derive(Debug)]
enum AttemptError {
    /// Non-ok answer with a 5xx status; kept so it can be returned
    Server(Value),
    /// Nothing usable came back
    Transport(Error),
}

impl AttemptError {
    fn describe(&self) -> String {
        match self {
            AttemptError::Server(v) => envelope::error_of(v).unwrap_or_else(|| "server error".into()),
            AttemptError::Transport(e) => e.to_string(),
        }
    }
}

/// POSTs JSON envelopes to a list of equivalent backends.
#[derive(Clone)]
pub struct BackendClient {
    transport: Arc<dyn Transport>,
    bases: Vec<String>,
    admin_token: String,
    settings: HttpSettings,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("bases", &self.bases)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Creates a client for a pipe/comma separated base list.
    pub fn new(transport: Arc<dyn Transport>, bases: &str, settings: HttpSettings) -> Self {
        Self {
            transport,
            bases: normalize_base(bases),
            admin_token: String::new(),
            settings,
        }
    }

    /// Sets the token merged into admin calls.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = token.into();
        self
    }

    /// Normalized bases, in failover order.
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Serializes the request body: the admin token is merged into admin
    /// calls and object bodies gain `__meta__: {t}` unless already set.
    pub fn prepare_body(&self, payload: Value, admin: bool, now_ms: i64) -> String {
        let mut payload = match payload {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        if let Value::Object(map) = &mut payload {
            if admin && !self.admin_token.is_empty() {
                map.insert("admin_token".into(), Value::String(self.admin_token.clone()));
            }
            if map.get("__meta__").is_none_or(Value::is_null) {
                map.insert("__meta__".into(), json!({"t": now_ms}));
            }
        }
        payload.to_string()
    }

    /// POSTs to `route` with failover. Always returns an envelope.
    pub async fn post(&self, route: &str, payload: Value, admin: bool) -> Value {
        if self.bases.is_empty() {
            tracing::warn!(route, "No backend base configured");
            return envelope::failure(NO_BASE_CONFIG);
        }
        let body = self.prepare_body(payload, admin, chrono::Utc::now().timestamp_millis());

        for base in &self.bases {
            for url in route_urls(base, route) {
                match self.post_with_retry(&url, &body).await {
                    Ok(value) => return value,
                    Err(AttemptError::Server(value)) => return value,
                    Err(AttemptError::Transport(e)) => {
                        tracing::warn!(route, url = %url, error = %e, "Backend unreachable, trying next");
                    }
                }
            }
        }

        tracing::warn!(route, bases = self.bases.len(), "All backends failed");
        envelope::failure(NETWORK_TIMEOUT)
    }

    async fn post_with_retry(&self, url: &str, body: &str) -> Result<Value, AttemptError> {
        let mut policy = ConstantBuilder::default()
            .with_delay(Duration::from_millis(self.settings.backoff_ms))
            .with_max_times(self.settings.retries_per_target.saturating_sub(1) as usize);
        if self.settings.jitter {
            policy = policy.with_jitter();
        }

        (|| self.attempt(url, body))
            .retry(policy)
            .notify(|err: &AttemptError, delay: Duration| {
                tracing::debug!(url, error = %err.describe(), ?delay, "Retrying backend call");
            })
            .await
    }

    async fn attempt(&self, url: &str, body: &str) -> Result<Value, AttemptError> {
        let timeout_ms = self.settings.timeout_ms;
        let sent = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.transport.post(url, body.to_string()),
        )
        .await;

        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(AttemptError::Transport(e)),
            Err(_) => return Err(AttemptError::Transport(Error::Timeout { ms: timeout_ms })),
        };

        let value = envelope::parse_body(response.status, &response.body);
        if response.status >= 500 && !envelope::is_ok(&value) {
            return Err(AttemptError::Server(value));
        }
        tracing::trace!(url, status = response.status, "Backend answered");
        Ok(value)
    }
}
