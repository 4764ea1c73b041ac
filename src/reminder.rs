//! One-shot reminder with its own timer.
//!
//! A reminder is a tiny state machine: `Pending` moves to either `Fired`
//! (the message was delivered) or `Cancelled` (stopped first). Both exits are
//! taken with a compare-and-swap so a timer firing on a runtime worker and a
//! `stop` from the control thread can never both win.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::{
    event::EventError,
    runtime::{events::Notifier, scheduler::Scheduler},
    types::{EventId, format_date},
};

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn with_state(state: u8) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(state),
            timer: Mutex::new(None),
        })
    }
}

/// What a delivery needs once the timer elapses.
#[derive(Debug, Clone)]
struct Delivery {
    event_id: EventId,
    message: String,
    notifier: Notifier,
}

impl Delivery {
    fn fire(&self, shared: &Shared) -> bool {
        if shared
            .state
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.notifier.notify(&self.event_id, &self.message);
        log::debug!("reminder for event {} delivered", self.event_id);
        true
    }
}

/// Serialized form: `{message, at, sent}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRecord {
    /// Reminder text.
    pub message: String,
    /// Fire time.
    pub at: DateTime<Utc>,
    /// Whether it already fired.
    pub sent: bool,
}

/// A scheduled notification owned by one event.
#[derive(Serialize, Deserialize)]
#[serde(try_from = "ReminderRecord", into = "ReminderRecord")]
pub struct Reminder {
    message: String,
    at: DateTime<Utc>,
    shared: Arc<Shared>,
    delivery: Option<Delivery>,
}

impl Reminder {
    /// Builds a pending reminder. Nothing is armed until [`Reminder::start`].
    pub fn new(
        event_id: &str,
        message: &str,
        at: DateTime<Utc>,
        notifier: Notifier,
    ) -> Result<Self, EventError> {
        if message.trim().is_empty() {
            return Err(EventError::EmptyMessage);
        }
        Ok(Self {
            message: message.to_string(),
            at,
            shared: Shared::with_state(PENDING),
            delivery: Some(Delivery {
                event_id: event_id.to_string(),
                message: message.to_string(),
                notifier,
            }),
        })
    }

    /// Arms the timer, or delivers right away when `at` is not in the future.
    pub fn start(&self, scheduler: &Scheduler) {
        if !self.is_pending() {
            return;
        }
        let Some(delivery) = self.delivery.clone() else {
            log::warn!("reminder {:?} has no notifier; not armed", self.message);
            return;
        };

        let delay = (self.at - scheduler.now())
            .to_std()
            .ok()
            .filter(|d| !d.is_zero());
        let Some(delay) = delay else {
            delivery.fire(&self.shared);
            return;
        };

        log::info!(
            "reminder for event {} fires in {}s",
            delivery.event_id,
            delay.as_secs()
        );
        let shared = Arc::clone(&self.shared);
        let handle = scheduler.spawn_after(delay, move || {
            delivery.fire(&shared);
        });

        let previous = self.shared.timer.lock().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Delivers the message unless this reminder already fired or was stopped.
    ///
    /// Returns `true` only for the call that actually delivered.
    pub fn send(&self) -> bool {
        match &self.delivery {
            Some(delivery) => delivery.fire(&self.shared),
            None => false,
        }
    }

    /// Cancels a pending reminder and aborts its timer if one is armed.
    ///
    /// Returns `false` when there was nothing to cancel.
    pub fn stop(&self) -> bool {
        let cancelled = self
            .shared
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        let timer = self.shared.timer.lock().take();
        if let Some(timer) = timer {
            timer.abort();
        }
        if cancelled {
            log::info!("reminder {:?} stopped", self.message);
        } else {
            log::info!("reminder {:?} has no pending timer to stop", self.message);
        }
        cancelled
    }

    /// Reminder text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Fire time.
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// True once the message has been delivered.
    pub fn sent(&self) -> bool {
        self.state() == FIRED
    }

    /// True while neither delivered nor stopped.
    pub fn is_pending(&self) -> bool {
        self.state() == PENDING
    }

    /// True once stopped before delivery.
    pub fn is_cancelled(&self) -> bool {
        self.state() == CANCELLED
    }

    /// Binds a reminder restored from storage to its event and channel.
    pub(crate) fn attach(&mut self, event_id: &str, notifier: Notifier) {
        self.delivery = Some(Delivery {
            event_id: event_id.to_string(),
            message: self.message.clone(),
            notifier,
        });
    }

    fn state(&self) -> u8 {
        self.shared.state.load(Ordering::Acquire)
    }
}

impl Drop for Reminder {
    fn drop(&mut self) {
        if let Some(timer) = self.shared.timer.lock().take() {
            timer.abort();
        }
    }
}

/// Copies carry the message, time and delivery state but no timer and no
/// notifier, so a copy can never fire or cancel the original.
impl Clone for Reminder {
    fn clone(&self) -> Self {
        let state = match self.state() {
            CANCELLED => CANCELLED,
            FIRED => FIRED,
            _ => PENDING,
        };
        Self {
            message: self.message.clone(),
            at: self.at,
            shared: Shared::with_state(state),
            delivery: None,
        }
    }
}

impl TryFrom<ReminderRecord> for Reminder {
    type Error = EventError;

    fn try_from(record: ReminderRecord) -> Result<Self, Self::Error> {
        if record.message.trim().is_empty() {
            return Err(EventError::EmptyMessage);
        }
        Ok(Self {
            message: record.message,
            at: record.at,
            shared: Shared::with_state(if record.sent { FIRED } else { PENDING }),
            delivery: None,
        })
    }
}

impl From<Reminder> for ReminderRecord {
    fn from(reminder: Reminder) -> Self {
        Self {
            message: reminder.message.clone(),
            at: reminder.at,
            sent: reminder.sent(),
        }
    }
}

impl fmt::Debug for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reminder")
            .field("message", &self.message)
            .field("at", &self.at)
            .field("sent", &self.sent())
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.state() {
            FIRED => "sent",
            CANCELLED => "cancelled",
            _ => "pending",
        };
        write!(
            f,
            "{:?}, at {}, status {}",
            self.message,
            format_date(&self.at),
            status
        )
    }
}
