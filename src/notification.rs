//! Notification System
//!
//! Toast messages and history for mutation outcomes and operator warnings.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;
use washpro::core::{Notice, Notifier, Severity};

/// A single notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
    pub created_at: Instant,
    pub timestamp: DateTime<Local>,
}

impl Notification {
    pub fn new(notice: Notice) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity: notice.severity,
            message: notice.message,
            created_at: Instant::now(),
            timestamp: Local::now(),
        }
    }

    /// Format notification for toast display (short form)
    pub fn toast_message(&self) -> String {
        format!("{} {}", self.severity.icon(), self.message)
    }

    /// Format for the history panel
    pub fn history_line(&self) -> String {
        format!(
            "{} {} {}",
            self.timestamp.format("%H:%M:%S"),
            self.severity.icon(),
            self.message
        )
    }
}

/// Notification manager
pub struct NotificationManager {
    /// All notifications (recent first)
    pub notifications: VecDeque<Notification>,
    /// Maximum notifications to keep in history
    pub max_history: usize,
    /// Toast display duration
    pub toast_duration: Duration,
    /// Last toast notification (for display)
    last_toast_time: Option<Instant>,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationManager {
    pub fn new() -> Self {
        Self {
            notifications: VecDeque::new(),
            max_history: 50,
            toast_duration: Duration::from_secs(5),
            last_toast_time: None,
        }
    }

    pub fn with_settings(max_history: usize, toast_duration: Duration) -> Self {
        Self {
            max_history: max_history.max(1),
            toast_duration,
            ..Self::new()
        }
    }

    pub fn push(&mut self, notice: Notice) -> Uuid {
        let notification = Notification::new(notice);
        let id = notification.id;
        self.notifications.push_front(notification);
        self.last_toast_time = Some(Instant::now());
        self.trim_history();
        id
    }

    /// Get notification by ID
    pub fn get(&self, id: Uuid) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Get the most recent notification while its toast is still visible
    pub fn current_toast(&self) -> Option<&Notification> {
        let last_time = self.last_toast_time?;
        if last_time.elapsed() > self.toast_duration {
            return None;
        }
        self.notifications.front()
    }

    /// Hide the current toast without touching history
    pub fn dismiss_toast(&mut self) {
        self.last_toast_time = None;
    }

    /// Clear all notifications
    pub fn clear(&mut self) {
        self.notifications.clear();
        self.last_toast_time = None;
    }

    fn trim_history(&mut self) {
        self.notifications.truncate(self.max_history);
    }

    /// Check if there are any notifications to show
    pub fn has_notifications(&self) -> bool {
        !self.notifications.is_empty()
    }

    /// Count of errors in the last 5 minutes
    pub fn recent_error_count(&self) -> usize {
        let cutoff = Duration::from_secs(300);
        self.notifications
            .iter()
            .filter(|n| n.severity == Severity::Error && n.created_at.elapsed() < cutoff)
            .count()
    }
}

impl Notifier for NotificationManager {
    fn notify(&mut self, notice: Notice) {
        tracing::debug!("notify {}: {}", notice.severity, notice.message);
        self.push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_shows_latest() {
        let mut manager = NotificationManager::new();
        manager.notify(Notice::success("Gutter created successfully"));
        manager.notify(Notice::error("Failed to delete gutter: Network error: down"));

        let toast = manager.current_toast().unwrap();
        assert_eq!(toast.severity, Severity::Error);
        assert!(toast.toast_message().starts_with("✗ Failed to delete gutter"));
        assert_eq!(manager.recent_error_count(), 1);
    }

    #[test]
    fn test_toast_expires() {
        let mut manager = NotificationManager::with_settings(10, Duration::ZERO);
        manager.push(Notice::info("Refreshing"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(manager.current_toast().is_none());
        assert!(manager.has_notifications());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut manager = NotificationManager::with_settings(3, Duration::from_secs(5));
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(manager.push(Notice::info(format!("notice {i}"))));
        }
        assert_eq!(manager.notifications.len(), 3);
        assert!(manager.get(ids[0]).is_none());
        assert_eq!(manager.notifications.front().unwrap().message, "notice 4");
    }

    #[test]
    fn test_dismiss_and_clear() {
        let mut manager = NotificationManager::new();
        manager.push(Notice::warning("Read-only mode: Add is disabled"));
        manager.dismiss_toast();
        assert!(manager.current_toast().is_none());
        assert_eq!(manager.notifications.len(), 1);
        manager.clear();
        assert!(!manager.has_notifications());
    }
}
