//! Transient user notifications.
//!
//! Each notification removes itself after a fixed time-to-live. Nothing is
//! queued: concurrent notifications coexist until their own timers fire.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::models::Severity;

/// Default lifetime of a notification.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct NotificationReporter {
    active: Arc<Mutex<Vec<Notification>>>,
    next_id: Arc<AtomicU64>,
    ttl: Duration,
}

impl Default for NotificationReporter {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl NotificationReporter {
    pub fn new(ttl: Duration) -> Self {
        NotificationReporter {
            active: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            ttl,
        }
    }

    fn lock(active: &Mutex<Vec<Notification>>) -> MutexGuard<'_, Vec<Notification>> {
        active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Show a notification; returns its id.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> u64 {
        let message = message.into();
        match severity {
            Severity::Error => log::error!("[Notify] {}", message),
            Severity::Warning => log::warn!("[Notify] {}", message),
            Severity::Info | Severity::Success => log::info!("[Notify] {}", message),
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let expires_at = Instant::now() + self.ttl;
        Self::lock(&self.active).push(Notification {
            id,
            message,
            severity,
            expires_at,
        });

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let active = Arc::clone(&self.active);
                handle.spawn(async move {
                    tokio::time::sleep_until(expires_at).await;
                    Self::lock(&active).retain(|n| n.id != id);
                });
            }
            // Outside a runtime, expiry happens lazily in active()
            Err(_) => log::debug!("[Notify] no runtime, notification {} expires lazily", id),
        }

        id
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.notify(message, Severity::Info)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.notify(message, Severity::Success)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.notify(message, Severity::Warning)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.notify(message, Severity::Error)
    }

    /// Notifications currently on screen, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        let now = Instant::now();
        let mut active = Self::lock(&self.active);
        active.retain(|n| n.expires_at > now);
        active.clone()
    }
}
