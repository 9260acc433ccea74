//! User-visible notification channel

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Severity of a notification. Only errors are emitted today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
}

/// A single notification for the host to surface to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    /// Short title
    pub title: String,
    /// Message identifying what failed (e.g. the certificate path)
    pub detail: String,
    /// Underlying failure, if any
    pub cause: Option<String>,
}

impl Notification {
    pub fn error(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            title: title.into(),
            detail: detail.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// Sink for notifications, owned by the host.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Emits notifications as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            Level::Error => tracing::error!(
                title = %n.title,
                cause = n.cause.as_deref().unwrap_or(""),
                "{}",
                n.detail
            ),
        }
    }
}

/// Keeps notifications in memory until the host drains them.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of everything recorded so far
    pub fn entries(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.lock().push(notification);
    }
}
