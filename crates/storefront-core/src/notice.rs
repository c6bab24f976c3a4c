//! Transient user notices.
//!
//! Operations report outcomes the customer should see ("Stok habis",
//! "Kode promo diterapkan") through a [`Notifier`]. The CLI prints them;
//! library users may log them or collect them.

use std::fmt;
use std::sync::Mutex;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    /// Confirmation or neutral information
    Info,
    /// Something was adjusted or refused
    Warn,
    /// An operation failed
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Text shown to the user
    pub message: String,
}

impl Notice {
    /// Creates an info notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Creates a warning notice.
    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warn,
            message: message.into(),
        }
    }

    /// Creates an error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives notices.
pub trait Notifier: Send + Sync {
    /// Delivers one notice.
    fn notify(&self, notice: Notice);
}

/// Writes notices to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(target: "storefront::notice", "{}", notice.message),
            NoticeLevel::Warn => tracing::warn!(target: "storefront::notice", "{}", notice.message),
            NoticeLevel::Error => tracing::error!(target: "storefront::notice", "{}", notice.message),
        }
    }
}

/// Keeps notices in memory until taken.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything collected so far.
    pub fn take(&self) -> Vec<Notice> {
        let mut guard = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    /// Messages collected so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    /// Whether a notice with exactly `message` was collected.
    pub fn contains(&self, message: &str) -> bool {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|n| n.message == message)
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_notifier() {
        let n = CollectingNotifier::new();
        n.notify(Notice::info("Ditambahkan ke keranjang"));
        n.notify(Notice::warn("Stok habis"));
        assert!(n.contains("Stok habis"));
        assert_eq!(n.messages().len(), 2);

        let taken = n.take();
        assert_eq!(taken[1].level, NoticeLevel::Warn);
        assert!(n.messages().is_empty());
    }

    #[test]
    fn test_tracing_notifier_does_not_panic() {
        TracingNotifier.notify(Notice::error("Gagal membuat transaksi"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Notice::info("ok").to_string(), "ok");
    }
}
