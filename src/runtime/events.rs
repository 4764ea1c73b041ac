//! Notification channel payloads.

use tokio::sync::mpsc;

use crate::types::EventId;

/// A reminder that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Event the reminder belongs to.
    pub event_id: EventId,
    /// Reminder text.
    pub message: String,
}

/// Receiving half of the notification channel. Exactly one consumer drains it.
pub type NotificationStream = mpsc::UnboundedReceiver<Notification>;

/// Cloneable sending half handed to every armed reminder.
///
/// The channel closes once the calendar and all of its reminders have dropped
/// their notifiers.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Queues a notification. Returns `false` when the consumer is gone.
    pub fn notify(&self, event_id: &str, message: &str) -> bool {
        let sent = self
            .tx
            .send(Notification {
                event_id: event_id.to_string(),
                message: message.to_string(),
            })
            .is_ok();
        if !sent {
            log::warn!("notification for event {event_id} dropped: channel closed");
        }
        sent
    }

    /// True when the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Creates a connected notifier/stream pair.
pub fn notification_channel() -> (Notifier, NotificationStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier { tx }, rx)
}
