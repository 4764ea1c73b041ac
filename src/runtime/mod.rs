//! Timer scheduling and the notification channel with its consumer loop.

/// Single consumer loop and notification sinks.
pub mod dispatcher;
/// Notification payload and channel halves.
pub mod events;
/// Clock and timer scheduling.
pub mod scheduler;
