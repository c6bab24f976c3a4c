//! Order-monitor push display policy.
//!
//! When a push arrives and a monitor window is visible, the windows are
//! pinged instead of raising a system notification. Otherwise one
//! notification is shown, at most once per throttle window, always under
//! the same tag so a newer one replaces the older.

use serde::Serialize;
use serde_json::Value;

use crate::fields;

/// Default notification title.
pub const DEFAULT_TITLE: &str = "Monitor Pesanan";
/// Default notification body.
pub const DEFAULT_BODY: &str = "Ada update pesanan.";
/// Default click target.
pub const DEFAULT_URL: &str = "/monitor.html";
/// Notification tag shared by all order pings.
pub const ORDER_PING_TAG: &str = "order-ping";
/// Message posted to visible windows.
pub const ORDER_PING_MESSAGE: &str = "ORDER_PING";
/// Minimum gap between two shown notifications, in milliseconds.
pub const DEFAULT_THROTTLE_MS: i64 = 3000;

/// A notification to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushNotification {
    /// Title
    pub title: String,
    /// Body text
    pub body: String,
    /// Page opened on click
    pub url: String,
    /// Replacement tag
    pub tag: String,
    /// Whether a replacement alerts again; always `false`
    pub renotify: bool,
}

/// What to do with a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushAction {
    /// Post [`ORDER_PING_MESSAGE`] to the visible windows
    PingClients,
    /// Show a notification
    Show(PushNotification),
    /// Dropped by the throttle
    Throttled,
}

/// Push handling state.
#[derive(Debug, Clone)]
pub struct PushPolicy {
    throttle_ms: i64,
    last_shown_ms: Option<i64>,
    last_target: Option<String>,
}

impl Default for PushPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_MS)
    }
}

impl PushPolicy {
    /// Creates a policy with the given throttle window.
    pub fn new(throttle_ms: i64) -> Self {
        Self {
            throttle_ms,
            last_shown_ms: None,
            last_target: None,
        }
    }

    /// Decides how to handle a push with an optional JSON payload
    /// `{title?, body?, url?}`.
    pub fn on_push(&mut self, payload: Option<&Value>, has_visible_client: bool, now_ms: i64) -> PushAction {
        if has_visible_client {
            return PushAction::PingClients;
        }

        let text = |key: &str| {
            payload
                .and_then(|p| p.get(key))
                .filter(|v| fields::is_truthy(v))
                .map(fields::as_text)
        };
        let title = text("title").unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let body = text("body").unwrap_or_else(|| DEFAULT_BODY.to_string());
        let url = text("url").unwrap_or_else(|| DEFAULT_URL.to_string());

        if let Some(last) = self.last_shown_ms
            && now_ms - last < self.throttle_ms
        {
            return PushAction::Throttled;
        }
        self.last_shown_ms = Some(now_ms);
        self.last_target = Some(url.clone());

        PushAction::Show(PushNotification {
            title,
            body,
            url,
            tag: ORDER_PING_TAG.to_string(),
            renotify: false,
        })
    }

    /// Page to open when the notification is clicked.
    pub fn click_target(&self) -> &str {
        self.last_target.as_deref().unwrap_or(DEFAULT_URL)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_visible_client_gets_ping() {
        let mut p = PushPolicy::default();
        assert_eq!(p.on_push(None, true, 0), PushAction::PingClients);
        assert_eq!(p.click_target(), DEFAULT_URL);
    }

    #[test]
    fn test_defaults_applied() {
        let mut p = PushPolicy::default();
        let PushAction::Show(n) = p.on_push(None, false, 1_000) else {
            unreachable!("expected a notification");
        };
        assert_eq!(n.title, DEFAULT_TITLE);
        assert_eq!(n.body, DEFAULT_BODY);
        assert_eq!(n.tag, ORDER_PING_TAG);
        assert!(!n.renotify);
    }

    #[test]
    fn test_payload_and_throttle() {
        let mut p = PushPolicy::default();
        let payload = json!({"title": "Order #12", "url": "/monitor.html?o=12"});
        assert!(matches!(p.on_push(Some(&payload), false, 10_000), PushAction::Show(_)));
        assert_eq!(p.click_target(), "/monitor.html?o=12");
        assert_eq!(p.on_push(Some(&payload), false, 12_999), PushAction::Throttled);
        assert!(matches!(p.on_push(None, false, 13_000), PushAction::Show(_)));
        assert_eq!(p.click_target(), DEFAULT_URL);
    }
}
