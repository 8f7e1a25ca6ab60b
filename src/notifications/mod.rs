//! Notifications - cap warnings, reminders and cycle announcements.
//!
//! Delivery is abstracted behind [`Notifier`]; the daemon uses [`TracingNotifier`], which
//! writes notifications to the log. The service and scheduler are plain values built by the
//! caller and passed where needed.

pub mod scheduler;
pub mod service;

pub use scheduler::{NotificationScheduler, Reminder, ReminderState, due_reminders};
pub use service::{NotificationService, notify_cap_status};

use serde::{Deserialize, Serialize};
use tracing::info;

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Headline
    pub title: String,
    /// Message text
    pub body: String,
    /// Kind of notification, e.g. `cap-warning`
    pub tag: String,
}

/// Something that can show a notification to the user.
pub trait Notifier: Send + Sync + 'static {
    /// Delivers one notification.
    fn notify(&self, notification: &Notification);
}

/// Delivers notifications as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        info!(
            tag = %notification.tag,
            "{}: {}",
            notification.title,
            notification.body
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    #![allow(clippy::unwrap_used)]
    use super::{Notification, Notifier};
    use std::sync::Mutex;

    /// Keeps every notification for inspection.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn tags(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|n| n.tag.clone()).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) {
            self.sent.lock().unwrap().push(notification.clone());
        }
    }
}
