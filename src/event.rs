//! Calendar event record and its validation rules.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    priority::{InvalidPriority, Priority},
    reminder::Reminder,
    runtime::{events::Notifier, scheduler::Scheduler},
    types::{EventId, InvalidDate, format_date, parse_date},
};

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9а-яА-ЯёЁ ]{3,50}$").expect("title regex"));

/// Validation failures for events and reminders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Title outside 3..=50 characters or containing disallowed characters.
    #[error("invalid title {0:?}: use 3 to 50 Latin or Cyrillic letters, digits and spaces")]
    InvalidTitle(String),
    /// Unparsable or non-existent date.
    #[error(transparent)]
    InvalidDate(#[from] InvalidDate),
    /// Priority other than high, medium or low.
    #[error(transparent)]
    InvalidPriority(#[from] InvalidPriority),
    /// Reminder message empty or whitespace only.
    #[error("reminder message is empty")]
    EmptyMessage,
}

/// Checks the title predicate.
pub fn validate_title(title: &str) -> Result<(), EventError> {
    if TITLE.is_match(title) {
        Ok(())
    } else {
        Err(EventError::InvalidTitle(title.to_string()))
    }
}

fn validate_fields(
    title: &str,
    date: &str,
    priority: &str,
) -> Result<(DateTime<FixedOffset>, Priority), EventError> {
    validate_title(title)?;
    let start_at = parse_date(date)?;
    let priority = Priority::validate(priority)?;
    Ok((start_at, priority))
}

/// Stored shape of an [`Event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event id.
    pub id: EventId,
    /// Title text.
    pub title: String,
    /// Start time in the calendar zone.
    pub start_at: DateTime<FixedOffset>,
    /// Priority literal.
    pub priority: Priority,
    /// Optional reminder.
    pub reminder: Option<Reminder>,
}

/// A titled, timestamped, prioritized calendar entry with at most one reminder.
///
/// Cloning yields a detached copy; see [`Reminder`]'s `Clone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EventRecord", into = "EventRecord")]
pub struct Event {
    id: EventId,
    title: String,
    start_at: DateTime<FixedOffset>,
    priority: Priority,
    reminder: Option<Reminder>,
}

impl Event {
    /// Validates every field and assigns a fresh id. Nothing is built on failure.
    pub fn new(title: &str, date: &str, priority: &str) -> Result<Self, EventError> {
        let (start_at, priority) = validate_fields(title, date, priority)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            start_at,
            priority,
            reminder: None,
        })
    }

    /// Re-validates all three fields, then overwrites them together.
    pub fn update(&mut self, title: &str, date: &str, priority: &str) -> Result<(), EventError> {
        let (start_at, priority) = validate_fields(title, date, priority)?;
        self.title = title.to_string();
        self.start_at = start_at;
        self.priority = priority;
        Ok(())
    }

    /// Replaces any existing reminder with a new one and starts it.
    ///
    /// The previous reminder is stopped only after the new one validated.
    pub fn add_reminder(
        &mut self,
        message: &str,
        at: DateTime<Utc>,
        notifier: Notifier,
        scheduler: &Scheduler,
    ) -> Result<(), EventError> {
        let reminder = Reminder::new(&self.id, message, at, notifier)?;
        if let Some(previous) = self.reminder.take() {
            log::info!("event {} replaces its reminder", self.id);
            previous.stop();
        }
        reminder.start(scheduler);
        self.reminder = Some(reminder);
        Ok(())
    }

    /// Stops and clears the reminder. Returns `false` when there was none.
    pub fn remove_reminder(&mut self) -> bool {
        match self.reminder.take() {
            Some(reminder) => {
                reminder.stop();
                log::info!("reminder removed from event {}", self.id);
                true
            }
            None => {
                log::info!("event {} has no reminder to remove", self.id);
                false
            }
        }
    }

    /// Binds a restored reminder to `notifier` and, when `arm` is set and it
    /// has not fired yet, starts it. Returns whether a timer was started.
    pub(crate) fn rearm(&mut self, notifier: &Notifier, scheduler: &Scheduler, arm: bool) -> bool {
        let Some(reminder) = self.reminder.as_mut() else {
            return false;
        };
        reminder.attach(&self.id, notifier.clone());
        if !arm || !reminder.is_pending() {
            return false;
        }
        reminder.start(scheduler);
        true
    }

    /// Unique id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Validated title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Start time in the calendar zone.
    pub fn start_at(&self) -> DateTime<FixedOffset> {
        self.start_at
    }

    /// Priority level.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Attached reminder, if any.
    pub fn reminder(&self) -> Option<&Reminder> {
        self.reminder.as_ref()
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = EventError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        validate_title(&record.title)?;
        Ok(Self {
            id: record.id,
            title: record.title,
            start_at: record.start_at,
            priority: record.priority,
            reminder: record.reminder,
        })
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            start_at: event.start_at,
            priority: event.priority,
            reminder: event.reminder,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}  Event: {}  Date: {}  Priority: {}  (Reminder: ",
            self.id,
            self.title,
            format_date(&self.start_at),
            self.priority
        )?;
        match &self.reminder {
            Some(reminder) => write!(f, "{reminder})"),
            None => f.write_str("not set)"),
        }
    }
}
