use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Errors disappear on their own after this long
pub const ERROR_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user about something that happened outside the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// `None` for notifications that stay until dismissed
    pub dismiss_after: Option<Duration>,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            dismiss_after: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
            dismiss_after: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            dismiss_after: Some(ERROR_DISMISS_AFTER),
        }
    }
}

/// Currently visible notifications, oldest first
#[derive(Debug, Default)]
pub struct NotificationCenter {
    active: Vec<(Notification, Instant)>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification, now: Instant) {
        self.active.push((notification, now));
    }

    /// Drop notifications whose display time has run out
    pub fn prune(&mut self, now: Instant) {
        self.active.retain(|(n, shown)| {
            n.dismiss_after
                .map_or(true, |after| now.saturating_duration_since(*shown) < after)
        });
    }

    pub fn dismiss(&mut self, index: usize) -> Option<Notification> {
        (index < self.active.len()).then(|| self.active.remove(index).0)
    }

    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.active.iter().map(|(n, _)| n)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
