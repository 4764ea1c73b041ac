//! Personal event calendar with one-shot reminders.
//!
//! A [`calendar::Calendar`] owns the events, persists the whole map after
//! every change and hands each armed reminder the sending half of a single
//! notification channel. Fired reminders come out of the
//! [`runtime::events::NotificationStream`], which exactly one consumer drains
//! (see [`runtime::dispatcher::spawn_dispatcher`]).
//!
//! # Examples
//!
//! ```
//! use evcal::{
//!     calendar::Calendar,
//!     persist::memory::MemoryStore,
//!     runtime::scheduler::Scheduler,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (mut calendar, _notifications) =
//!     Calendar::new(Box::new(MemoryStore::new()), Scheduler::current());
//! let event = calendar
//!     .add_event("Team sync", "2025-06-01 09:00", "medium")
//!     .expect("add event");
//! assert_eq!(event.title(), "Team sync");
//! assert_eq!(calendar.len(), 1);
//! # }
//! ```
#![warn(missing_docs)]

/// Event map orchestration and persistence-on-mutation.
pub mod calendar;
/// Command parsing and execution for the interactive front end.
pub mod cli;
/// Process configuration.
pub mod config;
/// Event record and validation.
pub mod event;
/// Persistent activity history.
pub mod history;
/// File logging bootstrap.
pub mod logging;
/// Blob-store abstraction and backends.
pub mod persist;
/// Priority levels.
pub mod priority;
/// Reminder state machine.
pub mod reminder;
/// Timers, notification channel and consumer loop.
pub mod runtime;
/// Shared ids and date helpers.
pub mod types;
