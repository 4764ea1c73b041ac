//! Calendar orchestration: the event map, persist-on-mutation and the
//! notification channel every reminder reports into.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use thiserror::Error;

use crate::{
    event::{Event, EventError},
    persist::{BlobStore, PersistError},
    runtime::{
        events::{NotificationStream, Notifier, notification_channel},
        scheduler::Scheduler,
    },
    types::{EventId, format_date, parse_date},
};

/// Calendar operation failure.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// Field validation failed; nothing was changed.
    #[error(transparent)]
    Event(#[from] EventError),
    /// No event with this id.
    #[error("event with id {0:?} not found")]
    NotFound(EventId),
    /// Reminder time is not in the future.
    #[error("reminder time {} has already passed", format_date(.0))]
    PastReminderDate(DateTime<Utc>),
    /// Store failed. In-memory changes made before the failure are kept.
    #[error("persistence failure: {0}")]
    Persist(#[from] PersistError),
}

impl CalendarError {
    /// True for validation failures raised before any state change.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Event(_) | Self::PastReminderDate(_))
    }
}

/// Calendar behaviour switches.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Start timers for unsent reminders after [`Calendar::load`].
    pub rearm_on_load: bool,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            rearm_on_load: true,
        }
    }
}

/// Owns every event. Lives on one control thread; reminder timers only ever
/// reach back through the notification channel.
pub struct Calendar {
    events: HashMap<EventId, Event>,
    store: Box<dyn BlobStore>,
    scheduler: Scheduler,
    notifier: Notifier,
    config: CalendarConfig,
}

impl Calendar {
    /// Empty calendar plus the stream its reminders deliver into.
    pub fn new(store: Box<dyn BlobStore>, scheduler: Scheduler) -> (Self, NotificationStream) {
        Self::with_config(store, scheduler, CalendarConfig::default())
    }

    /// Like [`Calendar::new`] with explicit configuration.
    pub fn with_config(
        store: Box<dyn BlobStore>,
        scheduler: Scheduler,
        config: CalendarConfig,
    ) -> (Self, NotificationStream) {
        let (notifier, stream) = notification_channel();
        let calendar = Self {
            events: HashMap::new(),
            store,
            scheduler,
            notifier,
            config,
        };
        (calendar, stream)
    }

    /// Creates, stores and persists a new event; returns a detached copy.
    ///
    /// On a persist failure the event stays in memory and the error is returned.
    pub fn add_event(&mut self, title: &str, date: &str, priority: &str) -> Result<Event, CalendarError> {
        let event = Event::new(title, date, priority)?;
        let copy = event.clone();
        let id = event.id().to_string();
        self.events.insert(id.clone(), event);
        log::info!("event {id} added");
        self.save()?;
        Ok(copy)
    }

    /// Detached copies of all events, keyed by id. Mutating them never touches
    /// the calendar.
    pub fn get_events(&self) -> HashMap<EventId, Event> {
        self.events
            .iter()
            .map(|(id, event)| (id.clone(), event.clone()))
            .collect()
    }

    /// Detached copy of one event.
    pub fn get_event(&self, id: &str) -> Option<Event> {
        self.events.get(id).cloned()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the calendar holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes an event, cancelling its reminder, and persists.
    pub fn delete_event(&mut self, id: &str) -> Result<(), CalendarError> {
        let event = self
            .events
            .remove(id)
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))?;
        drop(event);
        log::info!("event {id} deleted");
        self.save()
    }

    /// Re-validates and overwrites title, date and priority, then persists.
    pub fn edit_event(&mut self, id: &str, title: &str, date: &str, priority: &str) -> Result<(), CalendarError> {
        let event = self.event_mut(id)?;
        event.update(title, date, priority)?;
        log::info!("event {id} updated");
        self.save()
    }

    /// Attaches (or replaces) the event's reminder and persists.
    ///
    /// Checks run in order: unknown id, bad date, date not in the future,
    /// empty message.
    pub fn set_event_reminder(&mut self, id: &str, message: &str, date: &str) -> Result<(), CalendarError> {
        if !self.events.contains_key(id) {
            return Err(CalendarError::NotFound(id.to_string()));
        }
        let at = parse_date(date).map_err(EventError::from)?.with_timezone(&Utc);
        if at <= self.scheduler.now() {
            return Err(CalendarError::PastReminderDate(at));
        }

        let notifier = self.notifier.clone();
        let scheduler = self.scheduler.clone();
        self.event_mut(id)?
            .add_reminder(message, at, notifier, &scheduler)?;
        log::info!("reminder set for event {id} at {at}");
        self.save()
    }

    /// Removes the event's reminder, if any, and persists.
    ///
    /// A persist failure is logged and returned; the cancellation stands.
    pub fn cancel_event_reminder(&mut self, id: &str) -> Result<(), CalendarError> {
        self.event_mut(id)?.remove_reminder();
        self.save().inspect_err(|err| {
            log::error!("saving calendar after cancelling reminder of event {id} failed: {err}");
        })
    }

    /// Pushes a message onto the notification channel.
    pub fn notify(&self, event_id: &str, message: &str) -> bool {
        self.notifier.notify(event_id, message)
    }

    /// Sending half shared with every reminder.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Store location, for log lines.
    pub fn store_name(&self) -> String {
        self.store.name()
    }

    /// Serializes the whole event map into the store.
    pub fn save(&mut self) -> Result<(), CalendarError> {
        let data = serde_json::to_vec(&self.events).map_err(PersistError::from)?;
        self.store.save(&data).inspect_err(|err| {
            log::error!("saving calendar to {} failed: {err}", self.store.name());
        })?;
        Ok(())
    }

    /// Replaces the event map with the stored document.
    ///
    /// Timers of the replaced events are cancelled. With
    /// [`CalendarConfig::rearm_on_load`], unsent reminders are armed again;
    /// any whose time has passed fire at once. Returns the number armed.
    ///
    /// A document holding two events with the same id is rejected and the
    /// current map is left as it was.
    pub fn load(&mut self) -> Result<usize, CalendarError> {
        let data = self.store.load()?;
        let stored: HashMap<EventId, Event> = if data.is_empty() {
            HashMap::new()
        } else {
            serde_json::from_slice(&data).map_err(PersistError::from)?
        };

        let mut events = HashMap::with_capacity(stored.len());
        for (key, event) in stored {
            if key != event.id() {
                log::warn!("stored event keyed {key:?} carries id {:?}; using its id", event.id());
            }
            let id = event.id().to_string();
            if events.insert(id.clone(), event).is_some() {
                return Err(PersistError::Message(format!(
                    "stored calendar holds more than one event with id {id:?}"
                ))
                .into());
            }
        }
        self.events = events;

        let mut armed = 0;
        for event in self.events.values_mut() {
            if event.rearm(&self.notifier, &self.scheduler, self.config.rearm_on_load) {
                armed += 1;
            }
        }
        log::info!(
            "loaded {} events from {} ({armed} reminders armed)",
            self.events.len(),
            self.store.name()
        );
        Ok(armed)
    }

    /// Final save, then stops every timer and drops the sending half so the
    /// notification consumer can drain and exit.
    pub fn close(mut self) -> Result<(), CalendarError> {
        let saved = self.save();
        // Dropping a reminder aborts its timer task and with it the task's notifier.
        self.events.clear();
        log::info!(target: "system", "calendar closed");
        saved
    }

    fn event_mut(&mut self, id: &str) -> Result<&mut Event, CalendarError> {
        self.events
            .get_mut(id)
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))
    }
}
